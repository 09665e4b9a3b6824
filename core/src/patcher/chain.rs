use crate::error::AppResult;
use crate::patcher::common::{adjust_indentation, indent_unit, leading_whitespace};
use regex::Regex;

/// Describes a fluent builder chain: the call that terminates it and the
/// method names that identify its intermediate calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStyle {
    /// Terminal method name, e.g. `Complete`.
    pub terminal: String,
    /// Substrings identifying chained calls, e.g. `For(`, `With`, `Owns(`.
    pub chained_methods: Vec<String>,
    /// How many lines above the terminal call are searched for a sibling.
    pub lookback: usize,
}

impl Default for ChainStyle {
    fn default() -> Self {
        Self {
            terminal: "Complete".into(),
            chained_methods: vec!["For(".into(), "With".into(), "Owns(".into()],
            lookback: 5,
        }
    }
}

impl ChainStyle {
    fn is_chained_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let mentions_method = self.chained_methods.iter().any(|m| trimmed.contains(m.as_str()));
        if !mentions_method {
            return false;
        }
        // Leading-dot chains (`.With(..)`) and trailing-dot chains (`With(..).`).
        trimmed.starts_with('.')
            || (trimmed.ends_with('.')
                && self
                    .chained_methods
                    .iter()
                    .any(|m| trimmed.starts_with(m.as_str())))
    }

    fn detect_indentation(&self, before: &str, base_indent: &str) -> String {
        for line in before.lines().rev().take(self.lookback) {
            if self.is_chained_line(line) {
                let ws = leading_whitespace(line);
                if !ws.is_empty() {
                    return ws.to_string();
                }
            }
        }
        format!("{}{}", base_indent, indent_unit(base_indent))
    }
}

/// Inserts `code` as new chained call(s) right before the terminal call.
///
/// Returns `Ok(None)` when the document has no terminal call.
pub fn inject_before_terminal(
    content: &str,
    code: &str,
    style: &ChainStyle,
) -> AppResult<Option<String>> {
    let pattern = format!(
        r"(?m)^([ \t]*)\.?[ \t]*{}\(\s*\)",
        regex::escape(&style.terminal)
    );
    let re = Regex::new(&pattern)?;

    let Some(caps) = re.captures(content) else {
        return Ok(None);
    };
    let (Some(call), Some(base)) = (caps.get(0), caps.get(1)) else {
        return Ok(None);
    };

    let insert_pos = call.start();
    let indent = style.detect_indentation(&content[..insert_pos], base.as_str());

    let mut adjusted = adjust_indentation(code, &indent);
    if !adjusted.ends_with('\n') {
        adjusted.push('\n');
    }

    Ok(Some(format!(
        "{}{}{}",
        &content[..insert_pos],
        adjusted,
        &content[insert_pos..]
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETUP: &str = "func SetupFooWebhookWithManager(mgr ctrl.Manager) error {\n\treturn ctrl.NewWebhookManagedBy(mgr).\n\t\tFor(&v1.Foo{}).\n\t\tComplete()\n}\n";

    #[test]
    fn test_uses_sibling_indentation() {
        let out = inject_before_terminal(
            SETUP,
            "\tWithValidator(&FooCustomValidator{}).\n",
            &ChainStyle::default(),
        )
        .unwrap()
        .unwrap();
        assert!(out.contains(
            "\t\tFor(&v1.Foo{}).\n\t\tWithValidator(&FooCustomValidator{}).\n\t\tComplete()\n"
        ));
    }

    #[test]
    fn test_leading_dot_chain() {
        let src = "builder\n    .For(&Foo{})\n  .Complete()\n";
        let out = inject_before_terminal(src, "  .WithDefaulter(d)", &ChainStyle::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            "builder\n    .For(&Foo{})\n    .WithDefaulter(d)\n  .Complete()\n"
        );
    }

    #[test]
    fn test_fallback_adds_one_level() {
        let src = "func setup() error {\n\treturn b.\n\t\tComplete()\n}\n";
        let out = inject_before_terminal(src, "\tWithX().", &ChainStyle::default())
            .unwrap()
            .unwrap();
        assert!(out.contains("\t\t\tWithX().\n\t\tComplete()"));
    }

    #[test]
    fn test_sibling_outside_lookback_is_ignored() {
        let src = "\t.For(x)\n1\n2\n3\n4\n5\n  Complete()\n";
        let out = inject_before_terminal(src, " .WithY()", &ChainStyle::default())
            .unwrap()
            .unwrap();
        assert!(out.contains("\n      .WithY()\n  Complete()"));
    }

    #[test]
    fn test_no_terminal_call() {
        let out = inject_before_terminal("func a() {}\n", "x", &ChainStyle::default()).unwrap();
        assert!(out.is_none());
    }
}
