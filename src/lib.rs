//! buildstash - Go build caches for CI
//!
//! Derives a deterministic cache key from the toolchain, watched
//! environment variables and module manifests, restores the closest cached
//! entry before a job and saves afterwards only when needed.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod provider;
pub mod state;
pub mod ui;

pub use error::{BuildstashError, BuildstashResult};
