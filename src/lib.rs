pub mod alert;
pub mod binance;
pub mod config;
pub mod error;
pub mod event;
pub mod indicator;
pub mod model;
pub mod notify;
pub mod runtime;
pub mod state_store;
pub mod strategy;
