//! Core types and error handling shared across the crate.
//!
//! Exposes the [`IndexError`] taxonomy used by every discovery stage and the
//! CLI-facing error display helper. Kept deliberately small: domain types
//! live with the modules that own them (packages in [`crate::catalog`],
//! manifests in [`crate::manifest`]).

pub mod error;

pub use error::{IndexError, display_error};

/// Convenient result alias used throughout the crate.
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
