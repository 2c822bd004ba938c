//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Open a collapsible section
pub fn group(ctx: &UiContext, title: &str) {
    if ctx.use_workflow_commands() {
        println!("::group::{}", title);
    } else {
        println!();
        println!("{}", style(title).bold());
    }
}

/// Close the section opened by `group`
pub fn end_group(ctx: &UiContext) {
    if ctx.use_workflow_commands() {
        println!("::endgroup::");
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_workflow_commands() {
        println!("  {}: {}", key, value);
    } else {
        println!("  {}: {}", style(key).dim(), value);
    }
}

/// Print a labelled list, one item per line
pub fn list(ctx: &UiContext, key: &str, items: &[String]) {
    if items.is_empty() {
        key_value(ctx, key, "(none)");
        return;
    }
    key_value(ctx, key, "");
    for item in items {
        println!("    {}", item);
    }
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_workflow_commands() {
        println!("{}", message);
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_workflow_commands() {
        println!("{}", message);
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.use_workflow_commands() {
        println!("::warning::{}", message);
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}
