#![deny(missing_docs)]

//! # File Operations
//!
//! Targeted text edits used by plugins that need to touch files outside of the
//! marker flow (e.g. uncommenting a block in a kustomization file).
//!
//! Every edit exists as a pure `&str -> String` function and as a file variant
//! that applies an ordered list of edits and writes the file once, keeping its
//! permissions.

use crate::error::{AppError, AppResult};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Inserts `code` right before the first occurrence of `target`.
pub fn insert_before(content: &str, target: &str, code: &str) -> AppResult<String> {
    let idx = find(content, target)?;
    Ok(format!("{}{}{}", &content[..idx], code, &content[idx..]))
}

/// Inserts `code` right after the first occurrence of `target`.
pub fn insert_after(content: &str, target: &str, code: &str) -> AppResult<String> {
    let idx = find(content, target)? + target.len();
    Ok(format!("{}{}{}", &content[..idx], code, &content[idx..]))
}

/// Replaces every occurrence of `target` with `code`.
pub fn replace(content: &str, target: &str, code: &str) -> AppResult<String> {
    find(content, target)?;
    Ok(content.replace(target, code))
}

/// Replaces every match of the `pattern` regex with `code` (`$1` expansion supported).
pub fn replace_regexp(content: &str, pattern: &str, code: &str) -> AppResult<String> {
    let re = Regex::new(pattern)?;
    let out = re.replace_all(content, code).into_owned();
    if out == content {
        return Err(not_found(pattern));
    }
    Ok(out)
}

/// Prefixes every line of `block` (found in `content`) with `prefix`.
///
/// Typical use is commenting out a scaffolded block with `"#"` or `"// "`.
pub fn add_prefix(content: &str, block: &str, prefix: &str) -> AppResult<String> {
    let idx = find(content, block)?;
    let modified = block
        .split('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!(
        "{}{}{}",
        &content[..idx],
        modified,
        &content[idx + block.len()..]
    ))
}

/// Removes `prefix` from every line of `block` (found in `content`).
pub fn remove_prefix(content: &str, block: &str, prefix: &str) -> AppResult<String> {
    let idx = find(content, block)?;
    let modified = block
        .split('\n')
        .map(|line| line.strip_prefix(prefix).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!(
        "{}{}{}",
        &content[..idx],
        modified,
        &content[idx + block.len()..]
    ))
}

/// Applies [`insert_before`] for every `(target, code)` pair, in order.
pub fn insert_before_in_file(path: &Path, insertions: &[(&str, &str)]) -> AppResult<()> {
    edit_file(path, |mut content| {
        for (target, code) in insertions {
            content = insert_before(&content, target, code)?;
        }
        Ok(content)
    })
}

/// Applies [`insert_after`] for every `(target, code)` pair, in order.
pub fn insert_after_in_file(path: &Path, insertions: &[(&str, &str)]) -> AppResult<()> {
    edit_file(path, |mut content| {
        for (target, code) in insertions {
            content = insert_after(&content, target, code)?;
        }
        Ok(content)
    })
}

/// Applies [`replace`] for every `(target, code)` pair, in order.
pub fn replace_in_file(path: &Path, replacements: &[(&str, &str)]) -> AppResult<()> {
    edit_file(path, |mut content| {
        for (target, code) in replacements {
            content = replace(&content, target, code)?;
        }
        Ok(content)
    })
}

/// Applies [`replace_regexp`] for every `(pattern, code)` pair, in order.
pub fn replace_regexp_in_file(path: &Path, replacements: &[(&str, &str)]) -> AppResult<()> {
    edit_file(path, |mut content| {
        for (pattern, code) in replacements {
            content = replace_regexp(&content, pattern, code)?;
        }
        Ok(content)
    })
}

/// File variant of [`add_prefix`].
pub fn add_prefix_in_file(path: &Path, block: &str, prefix: &str) -> AppResult<()> {
    edit_file(path, |content| add_prefix(&content, block, prefix))
}

/// File variant of [`remove_prefix`].
pub fn remove_prefix_in_file(path: &Path, block: &str, prefix: &str) -> AppResult<()> {
    edit_file(path, |content| remove_prefix(&content, block, prefix))
}

fn edit_file(path: &Path, edit: impl FnOnce(String) -> AppResult<String>) -> AppResult<()> {
    let permissions = fs::metadata(path)?.permissions();
    let content = fs::read_to_string(path)?;
    let updated = edit(content)?;
    fs::write(path, updated)?;
    fs::set_permissions(path, permissions)?;
    Ok(())
}

fn find(content: &str, target: &str) -> AppResult<usize> {
    content.find(target).ok_or_else(|| not_found(target))
}

fn not_found(target: &str) -> AppError {
    AppError::MarkerNotFound(format!("unable to find {:?}", target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_insert_before_and_after() {
        let src = "a\nMARK\nb\n";
        assert_eq!(insert_before(src, "MARK", "x\n").unwrap(), "a\nx\nMARK\nb\n");
        assert_eq!(insert_after(src, "MARK", "\ny").unwrap(), "a\nMARK\ny\nb\n");
    }

    #[test]
    fn test_insert_after_missing_target() {
        let err = insert_after("abc", "zzz", "x").unwrap_err();
        assert!(format!("{}", err).contains("unable to find \"zzz\""));
    }

    #[test]
    fn test_replace_all_occurrences() {
        assert_eq!(replace("a-a-a", "a", "b").unwrap(), "b-b-b");
        assert!(replace("abc", "z", "b").is_err());
    }

    #[test]
    fn test_replace_regexp_with_capture() {
        let out = replace_regexp("image: ctrl:v1", r"ctrl:(v\d)", "manager:$1").unwrap();
        assert_eq!(out, "image: manager:v1");
        assert!(replace_regexp("abc", r"\d+", "x").is_err());
    }

    #[test]
    fn test_prefix_round_trip_on_block() {
        let src = "resources:\n- ../crd\n- ../rbac\n";
        let block = "- ../crd\n- ../rbac";
        let commented = add_prefix(src, block, "#").unwrap();
        assert_eq!(commented, "resources:\n#- ../crd\n#- ../rbac\n");

        let restored = remove_prefix(&commented, "#- ../crd\n#- ../rbac", "#").unwrap();
        assert_eq!(restored, src);
    }

    #[test]
    fn test_file_edits_apply_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kustomization.yaml");
        fs::write(&path, "resources:\n- manager.yaml\n").unwrap();

        insert_after_in_file(&path, &[("resources:\n", "- service.yaml\n")]).unwrap();
        insert_before_in_file(&path, &[("- manager.yaml", "- namespace.yaml\n")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "resources:\n- service.yaml\n- namespace.yaml\n- manager.yaml\n"
        );
    }

    #[test]
    fn test_file_edit_failure_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.go");
        fs::write(&path, "package main\n").unwrap();

        let res = replace_in_file(&path, &[("package main", "package app"), ("missing", "x")]);
        assert!(res.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "package main\n");
    }
}
