//! UI context for detecting the CI host

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Whether running as a GitHub Actions step
    github_actions: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            github_actions: std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true"),
        }
    }

    /// Create a plain-terminal context (for testing)
    pub fn plain() -> Self {
        Self {
            github_actions: false,
        }
    }

    /// Whether workflow commands (`::group::`, `::warning::`) should be emitted
    pub fn use_workflow_commands(&self) -> bool {
        self.github_actions
    }
}
