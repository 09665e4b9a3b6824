use crate::error::AppResult;
use crate::patcher::common::{indent_unit, last_line_indent};
use crate::patcher::outcome::PartialResult;
use regex::Regex;

/// Something to add to a Ginkgo test suite.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuiteAddition {
    /// Name used in reports.
    pub name: String,
    /// Text whose presence means the addition is already there.
    pub guard: String,
    /// Declaration for the `var ( .. )` block, e.g. `defaulter FooCustomDefaulter`.
    pub variable: Option<String>,
    /// Lines for the `BeforeEach` body.
    pub init: Vec<String>,
    /// Test block inserted before the closing `})` of `Describe`.
    pub context: Option<String>,
}

/// Adds `declaration` as the last entry of the first `var ( .. )` block.
///
/// The entry gets the indentation of the block's last declaration (a tab by
/// default). Returns `Ok(None)` when there is no var block.
pub fn add_to_var_block(content: &str, declaration: &str) -> AppResult<Option<String>> {
    let re = Regex::new(r"(?s)var\s*\(([^)]*?)(\s*)\)")?;
    let Some(body) = re.captures(content).and_then(|c| c.get(1)) else {
        return Ok(None);
    };
    if body.as_str().lines().any(|l| l.trim() == declaration.trim()) {
        return Ok(Some(content.to_string()));
    }
    let indent = last_line_indent(body.as_str()).unwrap_or("\t");
    let pos = body.end();
    Ok(Some(format!(
        "{}\n{}{}{}",
        &content[..pos],
        indent,
        declaration.trim(),
        &content[pos..]
    )))
}

/// Appends `lines` to the end of the first `BeforeEach(func() { .. })` body.
///
/// Returns `Ok(None)` when there is no `BeforeEach`.
pub fn add_to_before_each(content: &str, lines: &[String]) -> AppResult<Option<String>> {
    let re = Regex::new(r"(?s)BeforeEach\s*\(\s*func\s*\(\s*\)\s*\{(.*?)(\n([ \t]*)\}\s*\))")?;
    let Some(caps) = re.captures(content) else {
        return Ok(None);
    };
    let (Some(body), Some(closing_indent)) = (caps.get(1), caps.get(3)) else {
        return Ok(None);
    };
    let base = closing_indent.as_str();
    let indent = format!("{}{}", base, indent_unit(base));

    let mut insertion = String::new();
    for line in lines {
        insertion.push('\n');
        insertion.push_str(&indent);
        insertion.push_str(line.trim());
    }
    let pos = body.end();
    Ok(Some(format!(
        "{}{}{}",
        &content[..pos],
        insertion,
        &content[pos..]
    )))
}

/// Inserts `block` before the closing `})` of the top-level `Describe`.
///
/// Falls back to the last `})` line, then to appending at the end.
pub fn add_before_describe_end(content: &str, block: &str) -> AppResult<String> {
    let describe = Regex::new(r"var\s*_\s*=\s*Describe\(")?;
    let closing = Regex::new(r"\n\}\)\s*$")?;

    if describe.is_match(content) {
        if let Some(m) = closing.find(content) {
            let pos = m.start();
            return Ok(format!("{}{}{}", &content[..pos], block, &content[pos..]));
        }
    }
    if let Some(pos) = content.rfind("\n})\n") {
        return Ok(format!("{}{}{}", &content[..pos], block, &content[pos..]));
    }
    Ok(format!("{}{}\n", content.trim_end(), block))
}

/// Applies suite additions that are not already present.
pub fn patch_suite(document: &str, additions: &[SuiteAddition]) -> AppResult<PartialResult> {
    let mut result = PartialResult::unchanged(document);

    for add in additions {
        if result.content.contains(&add.guard) {
            result.skip(format!("{} already exists", add.name));
            continue;
        }

        if let Some(var) = &add.variable {
            match add_to_var_block(&result.content, var)? {
                Some(content) => result.apply(format!("var {}", var), content),
                None => result.warn(
                    "var",
                    "Could not find var block",
                    format!("Add '{}' to the var block", var),
                ),
            }
        }

        if !add.init.is_empty() {
            match add_to_before_each(&result.content, &add.init)? {
                Some(content) => result.apply(format!("init {}", add.name), content),
                None => result.warn(
                    "init",
                    "Could not find BeforeEach block",
                    format!("Add to BeforeEach:\n{}", add.init.join("\n")),
                ),
            }
        }

        if let Some(block) = &add.context {
            let content = add_before_describe_end(&result.content, block)?;
            result.apply(format!("tests {}", add.name), content);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SUITE: &str = "package v1\n\nvar _ = Describe(\"Foo Webhook\", func() {\n\tvar (\n\t\tobj *Foo\n\t)\n\n\tBeforeEach(func() {\n\t\tobj = &Foo{}\n\t})\n\n\tContext(\"existing\", func() {\n\t})\n\n})\n";

    #[test]
    fn test_add_to_var_block_uses_last_entry_indent() {
        let src = "var (\n\tobj *Foo\n)";
        let out = add_to_var_block(src, "validator FooCustomValidator")
            .unwrap()
            .unwrap();
        assert_eq!(out, "var (\n\tobj *Foo\n\tvalidator FooCustomValidator\n)");
    }

    #[test]
    fn test_add_to_var_block_missing() {
        assert_eq!(add_to_var_block("package a\n", "x int").unwrap(), None);
    }

    #[test]
    fn test_add_to_before_each() {
        let out = add_to_before_each(SUITE, &["validator = FooCustomValidator{}".into()])
            .unwrap()
            .unwrap();
        assert!(out.contains("\t\tobj = &Foo{}\n\t\tvalidator = FooCustomValidator{}\n\t})"));
    }

    #[test]
    fn test_add_before_describe_end() {
        let out = add_before_describe_end(SUITE, "\n\tContext(\"new\", func() {\n\t})\n").unwrap();
        assert!(out.ends_with("\tContext(\"new\", func() {\n\t})\n\n})\n"));
    }

    #[test]
    fn test_add_before_describe_end_appends_without_closing() {
        let out = add_before_describe_end("package a\n", "\nfunc x() {}").unwrap();
        assert_eq!(out, "package a\nfunc x() {}\n");
    }

    fn validator_addition() -> SuiteAddition {
        SuiteAddition {
            name: "validator".into(),
            guard: "validator FooCustomValidator".into(),
            variable: Some("validator FooCustomValidator".into()),
            init: vec!["validator = FooCustomValidator{}".into()],
            context: Some("\n\tContext(\"When creating or updating Foo under Validating Webhook\", func() {\n\t})\n".into()),
        }
    }

    #[test]
    fn test_patch_suite_idempotent() {
        let once = patch_suite(SUITE, &[validator_addition()]).unwrap();
        assert_eq!(once.applied.len(), 3);
        assert!(once.warnings.is_empty());
        assert!(once.content.contains("\t\tobj *Foo\n\t\tvalidator FooCustomValidator\n\t)"));

        let twice = patch_suite(&once.content, &[validator_addition()]).unwrap();
        assert_eq!(twice.content, once.content);
        assert!(!twice.is_modified());
    }

    #[test]
    fn test_patch_suite_warns_without_var_block() {
        let src = "package v1\n\nvar _ = Describe(\"x\", func() {\n})\n";
        let res = patch_suite(src, &[validator_addition()]).unwrap();
        assert_eq!(res.warnings.len(), 2);
        assert_eq!(res.warnings[0].message, "Could not find var block");
        assert!(res.content.contains("Validating Webhook"));
    }
}
