//! Cache storage backends
//!
//! - `local`: tar archives in a directory on this machine
//! - `none`: caching switched off

mod backend;
mod factory;
mod local;

pub use backend::CacheProvider;
pub use factory::{create_provider, DisabledProvider, ProviderKind};
pub use local::LocalProvider;
