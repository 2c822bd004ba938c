//! Cache key derivation for Go build environments
//!
//! Keys are derived from the toolchain, selected environment variables and
//! module manifests, never from timestamps or directory listings.
//!
//! # Key Layout
//!
//! | Segment | Source | Changes when |
//! |---------|--------|--------------|
//! | prefix | `prefix-key`, `shared-key` or `key` + job, OS, arch | inputs or job change |
//! | env digest | Go version/arch and watched env vars | toolchain or env changes |
//! | content digest | every module's `go.mod` | dependencies change |

pub mod digest;
pub mod key;
pub mod runner;
pub mod toolchain;

pub use key::{CacheConfig, CachePath, KeyContext};
pub use runner::Runner;
pub use toolchain::{GoToolchain, Toolchain, ToolchainEnv};
