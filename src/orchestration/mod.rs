//! The two cache phases
//!
//! - `restore`: derive-once keys in, hit/miss state out
//! - `save`: state in, at most one provider save out

pub mod restore;
pub mod save;
mod workaround;

pub use restore::{restore, RestoreOutcome};
pub use save::{save, SaveOptions, SaveOutcome};

#[cfg(test)]
pub(crate) mod testing;
