//! Client construction and configuration
//!
//! `CosClient` ties the configuration, the signer and a transport together.
//! Storage and upload operations take a `&CosClient`.

pub mod config;
pub mod core;

pub use self::config::{CosConfig, LogLevel, DEFAULT_HOST};
pub use self::core::{CosClient, SignScope};
