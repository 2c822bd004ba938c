//! Operator-facing output
//!
//! Plain styled lines on a terminal; inside GitHub Actions the same output
//! is folded into collapsible log groups and warnings become annotations.

mod context;
mod output;
mod report;

pub use context::UiContext;
pub use output::{end_group, group, key_value, list, step_info, step_ok, step_warn};
pub use report::cache_info;
