use crate::error::AppResult;
use crate::patcher::common::last_line_indent;
use regex::Regex;

/// A Go import, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    /// Local alias, if any.
    pub alias: Option<String>,
    /// Import path.
    pub path: String,
}

impl Import {
    /// Unaliased import.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            alias: None,
            path: path.into(),
        }
    }

    /// Aliased import.
    pub fn aliased(alias: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            path: path.into(),
        }
    }

    /// The import as it appears inside an import block.
    pub fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} \"{}\"", alias, self.path),
            None => format!("\"{}\"", self.path),
        }
    }
}

/// Result of [`ensure_import`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEdit {
    /// The document already imports the path.
    Present,
    /// The import was added; carries the new document.
    Inserted(String),
    /// Neither the sibling import nor an import block was found.
    NoAnchor,
}

fn import_line(path: &str) -> AppResult<Regex> {
    Ok(Regex::new(&format!(
        r#"(?m)^([ \t]*)(?:import[ \t]+)?(?:[\w.]+[ \t]+)?"{}"[ \t]*$"#,
        regex::escape(path)
    ))?)
}

/// Adds `import` to a Go file unless it is already there.
///
/// The import goes right after `after` when that sibling is imported,
/// otherwise at the end of the first `import ( .. )` block.
pub fn ensure_import(content: &str, import: &Import, after: Option<&str>) -> AppResult<ImportEdit> {
    if import_line(&import.path)?.is_match(content) {
        return Ok(ImportEdit::Present);
    }
    let rendered = import.render();

    if let Some(sibling) = after {
        if let Some(caps) = import_line(sibling)?.captures(content) {
            if let (Some(line), Some(indent)) = (caps.get(0), caps.get(1)) {
                let pos = line.end();
                return Ok(ImportEdit::Inserted(format!(
                    "{}\n{}{}{}",
                    &content[..pos],
                    indent.as_str(),
                    rendered,
                    &content[pos..]
                )));
            }
        }
    }

    let block = Regex::new(r"(?s)import\s*\(([^)]*?)(\s*)\)")?;
    let Some(body) = block.captures(content).and_then(|c| c.get(1)) else {
        return Ok(ImportEdit::NoAnchor);
    };
    let indent = last_line_indent(body.as_str()).unwrap_or("\t");
    let pos = body.end();
    Ok(ImportEdit::Inserted(format!(
        "{}\n{}{}{}",
        &content[..pos],
        indent,
        rendered,
        &content[pos..]
    )))
}
