//! Incremental loader for the FDIC Summary of Deposits yearly archives.
//!
//! Each run works out which years are missing from the store, downloads the
//! `ALL_<year>.zip` archive for each, normalizes its CSV tables and commits
//! the year as one unit, stopping at the first failure.

pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod pipeline;
pub mod process;
pub mod progress;

pub use error::{LoadError, MalformedValueError, RunFailure, StoreError};
pub use pipeline::Pipeline;
