use tracing::{info, warn};

/// A patch step that could not be applied, with a hint for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Short name of the step (e.g. `wiring`, `import`).
    pub step: String,
    /// What went wrong.
    pub message: String,
    /// What the user should do by hand.
    pub suggestion: String,
}

/// Outcome of a best-effort patch: the new content plus what was applied,
/// skipped and left for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult {
    /// Document after every step that could be applied.
    pub content: String,
    /// Steps that changed the document.
    pub applied: Vec<String>,
    /// Steps skipped because the document already had them.
    pub skipped: Vec<String>,
    /// Steps that failed to find their anchor.
    pub warnings: Vec<Warning>,
}

impl PartialResult {
    /// Starts from an untouched document.
    pub fn unchanged(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            applied: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether at least one step changed the document.
    pub fn is_modified(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Records an applied step and its resulting content.
    pub fn apply(&mut self, step: impl Into<String>, content: String) {
        self.applied.push(step.into());
        self.content = content;
    }

    /// Records a step that was already present.
    pub fn skip(&mut self, step: impl Into<String>) {
        self.skipped.push(step.into());
    }

    /// Records a step that could not be applied.
    pub fn warn(
        &mut self,
        step: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.warnings.push(Warning {
            step: step.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        });
    }

    /// Emits skips and warnings as log events for `file`.
    pub fn report(&self, file: &str) {
        for step in &self.skipped {
            info!(file, step = %step, "already present, skipping");
        }
        for w in &self.warnings {
            warn!(file, step = %w.step, suggestion = %w.suggestion, "{}", w.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_tracks_content() {
        let mut res = PartialResult::unchanged("a");
        assert!(!res.is_modified());
        res.apply("append", "ab".into());
        assert!(res.is_modified());
        assert_eq!(res.content, "ab");
    }

    #[test]
    fn test_warn_keeps_content() {
        let mut res = PartialResult::unchanged("a");
        res.warn("wiring", "Could not find Complete() call", "wire manually");
        assert_eq!(res.content, "a");
        assert_eq!(res.warnings[0].step, "wiring");
        assert!(!res.is_modified());
    }
}
