//! # cotune-core
//!
//! Core crate for Cotune. Contains configuration schemas, typed
//! identifiers, track and player-state payloads, the listen-along wire
//! protocol, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Cotune crates.

pub mod config;
pub mod error;
pub mod message;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
