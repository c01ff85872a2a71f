pub mod ability;
pub mod assignment;
pub mod catalog;
pub mod domain;
pub mod engine;
