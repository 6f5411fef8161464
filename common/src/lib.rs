pub mod cart;
pub mod catalog;
pub mod config;
pub mod demo;
pub mod error;
pub mod filter;
pub mod models;
pub mod order;
pub mod payment;
pub mod seed;
pub mod session;
pub mod storage;
pub mod store;

pub use error::{ StoreError, StoreResult };
pub use store::MockStore;
