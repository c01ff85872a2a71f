pub mod adapter;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fixture;
pub mod metrics;
pub mod service;

pub use error::ServiceError;
pub use service::PermissionService;
