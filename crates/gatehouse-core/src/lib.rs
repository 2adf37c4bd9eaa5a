//! Core types and trait definitions for the Gatehouse visitor log.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod analytics;
pub mod audit;
pub mod error;
pub mod filter;
pub mod service;
pub mod store;
pub mod visitor;

pub use error::{Error, Result};
pub use service::VisitorService;
