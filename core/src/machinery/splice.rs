#![deny(missing_docs)]

//! # Text Splicer
//!
//! Inserts registered fragments right before the marker lines of a document.
//! Markers are never consumed, so several generation passes can keep appending
//! before the same anchor.

use crate::error::{AppError, AppResult};
use crate::machinery::fragments::CodeFragments;
use crate::machinery::marker::Marker;

/// Inserts the fragments of every marker found in `document`.
///
/// Fragments of one marker are emitted in registration order. A fragment with
/// no leading whitespace inherits the indentation of the marker line. Content
/// outside the insertion points is left byte-for-byte untouched.
pub fn splice(document: &str, fragments: &CodeFragments) -> String {
    let mut out = String::with_capacity(document.len());

    for line in document.split_inclusive('\n') {
        for (marker, codes) in fragments.iter() {
            if marker.equals_line(line) {
                let indent = leading_whitespace(line);
                for code in codes {
                    push_fragment(&mut out, code, indent);
                }
            }
        }
        out.push_str(line);
    }

    out
}

/// Markers of the registry that have no matching line in `document`.
pub fn missing_markers<'a>(document: &str, fragments: &'a CodeFragments) -> Vec<&'a Marker> {
    fragments
        .iter()
        .map(|(marker, _)| marker)
        .filter(|marker| !document.lines().any(|line| marker.equals_line(line)))
        .collect()
}

/// Idempotent insertion: skips fragments that are already present, requires
/// every remaining marker to exist, then splices.
pub fn insert_fragments(document: &str, fragments: &CodeFragments) -> AppResult<String> {
    let mut pending = fragments.clone();
    pending.remove_existing(document);

    if pending.is_empty() {
        return Ok(document.to_string());
    }

    let missing = missing_markers(document, &pending);
    if let Some(marker) = missing.first() {
        return Err(AppError::MarkerNotFound(format!(
            "'{}' in {}",
            marker,
            marker.path().display()
        )));
    }

    Ok(splice(document, &pending))
}

fn push_fragment(out: &mut String, code: &str, indent: &str) {
    let carries_indent = code.starts_with([' ', '\t']);
    for piece in code.split_inclusive('\n') {
        if !carries_indent && !piece.trim().is_empty() {
            out.push_str(indent);
        }
        out.push_str(piece);
    }
    if !code.ends_with('\n') {
        out.push('\n');
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CodeFragments {
        let mut reg = CodeFragments::new();
        reg.push(
            Marker::for_path("main.go", "imports"),
            "foo \"example.com/foo\"",
        );
        reg.push(
            Marker::for_path("main.go", "scheme"),
            "err = foo.AddToScheme(scheme.Scheme)",
        );
        reg
    }

    const MAIN: &str = "package main\n\nimport (\n\t// imports\n)\n\nfunc init() {\n\t// scheme\n}\n";

    #[test]
    fn test_imports_and_scheme_scenario() {
        let out = splice(MAIN, &registry());
        assert_eq!(
            out,
            "package main\n\nimport (\n\tfoo \"example.com/foo\"\n\t// imports\n)\n\nfunc init() {\n\terr = foo.AddToScheme(scheme.Scheme)\n\t// scheme\n}\n"
        );
    }

    #[test]
    fn test_markers_survive_and_order_kept() {
        let marker = Marker::for_path("main.go", "scheme");
        let mut reg = CodeFragments::new();
        reg.insert(marker, vec!["a()\n".into(), "b()\n".into(), "c()\n".into()]);

        let out = splice("x\n// scheme\ny", &reg);
        assert_eq!(out, "x\na()\nb()\nc()\n// scheme\ny");
    }

    #[test]
    fn test_marker_without_fragments_is_unchanged() {
        let reg = CodeFragments::new();
        assert_eq!(splice(MAIN, &reg), MAIN);
    }

    #[test]
    fn test_repeated_runs_keep_appending_before_marker() {
        let marker = Marker::for_path("main.go", "imports");
        let mut first = CodeFragments::new();
        first.push(marker.clone(), "a \"example.com/a\"\n");
        let mut second = CodeFragments::new();
        second.push(marker, "b \"example.com/b\"\n");

        let once = insert_fragments(MAIN, &first).unwrap();
        let twice = insert_fragments(&once, &second).unwrap();
        assert!(twice.contains("\ta \"example.com/a\"\n\tb \"example.com/b\"\n\t// imports\n"));
    }

    #[test]
    fn test_insert_fragments_is_idempotent() {
        let once = insert_fragments(MAIN, &registry()).unwrap();
        let twice = insert_fragments(&once, &registry()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_insert_fragments_missing_marker_is_fatal() {
        let mut reg = CodeFragments::new();
        reg.push(Marker::for_path("main.go", "webhook"), "setup()");
        let err = insert_fragments(MAIN, &reg).unwrap_err();
        assert!(matches!(err, AppError::MarkerNotFound(_)));
    }

    #[test]
    fn test_fragment_with_own_indentation_is_kept() {
        let mut reg = CodeFragments::new();
        reg.push(Marker::for_path("main.go", "scheme"), "    spaced()\n");
        let out = splice("\t// scheme\n", &reg);
        assert_eq!(out, "    spaced()\n\t// scheme\n");
    }
}
