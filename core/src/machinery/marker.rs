#![deny(missing_docs)]

//! # Marker Locator
//!
//! A marker is a comment line that a scaffolded file carries as a stable anchor,
//! e.g. `// +kubebuilder:scaffold:imports`. New code is always inserted right
//! before the marker line and the marker itself is kept so that later runs can
//! find it again.

use crate::error::{AppError, AppResult};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

/// Prefix used by the markers of kubebuilder-style projects.
pub const KUBEBUILDER_PREFIX: &str = "+kubebuilder:scaffold:";

/// Identifies an insertion point inside one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    path: PathBuf,
    comment: &'static str,
    prefix: String,
    value: String,
}

impl Marker {
    /// Creates a marker rendered as `<comment> <value>`.
    pub fn for_path(path: impl AsRef<Path>, value: &str) -> Self {
        Self::with_prefix("", path, value)
    }

    /// Creates a marker rendered as `<comment> <prefix><value>`.
    pub fn with_prefix(prefix: &str, path: impl AsRef<Path>, value: &str) -> Self {
        let path = path.as_ref();
        Self {
            path: path.to_path_buf(),
            comment: comment_for(path),
            prefix: prefix.to_string(),
            value: value.to_string(),
        }
    }

    /// Creates a marker using the [`KUBEBUILDER_PREFIX`].
    pub fn kubebuilder(path: impl AsRef<Path>, value: &str) -> Self {
        Self::with_prefix(KUBEBUILDER_PREFIX, path, value)
    }

    /// The file this marker belongs to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The marker name (without comment token or prefix).
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the given line is this marker (surrounding whitespace ignored).
    pub fn equals_line(&self, line: &str) -> bool {
        let Some(rest) = line.trim().strip_prefix(self.comment) else {
            return false;
        };
        let Some(rest) = rest.trim().strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        rest == self.value
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.comment, self.prefix, self.value)
    }
}

/// Selects the line-comment token for a file from its name or extension.
pub fn comment_for(path: &Path) -> &'static str {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if matches!(file_name.as_str(), "Makefile" | "Dockerfile" | "PROJECT") {
        return "#";
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml" | "sh" | "toml" | "mk" | "py" | "tpl") => "#",
        _ => "//",
    }
}

/// Returns the byte offset of the start of the first line equal to `marker`.
///
/// That offset is the point right before which fragments are inserted.
pub fn locate(document: &str, marker: &Marker) -> Option<usize> {
    let mut offset = 0;
    for line in document.split_inclusive('\n') {
        if marker.equals_line(line) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Like [`locate`] but a missing marker is an error.
pub fn locate_required(document: &str, marker: &Marker) -> AppResult<usize> {
    locate(document, marker).ok_or_else(|| {
        AppError::MarkerNotFound(format!("'{}' in {}", marker, marker.path().display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_go_marker() {
        let m = Marker::kubebuilder("cmd/main.go", "imports");
        assert_eq!(m.to_string(), "// +kubebuilder:scaffold:imports");
        let plain = Marker::for_path("main.go", "scheme");
        assert_eq!(plain.to_string(), "// scheme");
    }

    #[test]
    fn test_comment_token_by_file() {
        assert_eq!(comment_for(Path::new("config/crd/kustomization.yaml")), "#");
        assert_eq!(comment_for(Path::new("Makefile")), "#");
        assert_eq!(comment_for(Path::new("Dockerfile")), "#");
        assert_eq!(comment_for(Path::new("api/v1/types.go")), "//");
        assert_eq!(comment_for(Path::new("src/lib.rs")), "//");
    }

    #[test]
    fn test_equals_line_ignores_whitespace() {
        let m = Marker::kubebuilder("main.go", "scheme");
        assert!(m.equals_line("\t// +kubebuilder:scaffold:scheme\n"));
        assert!(m.equals_line("//+kubebuilder:scaffold:scheme"));
        assert!(!m.equals_line("// +kubebuilder:scaffold:schemes"));
        assert!(!m.equals_line("# +kubebuilder:scaffold:scheme"));
        assert!(!m.equals_line("x := 1 // +kubebuilder:scaffold:scheme"));
    }

    #[test]
    fn test_locate_offsets() {
        let doc = "package main\n\nimport (\n\t// imports\n)\n";
        let m = Marker::for_path("main.go", "imports");
        let pos = locate(doc, &m).unwrap();
        assert_eq!(&doc[pos..], "\t// imports\n)\n");
    }

    #[test]
    fn test_locate_missing_marker() {
        let m = Marker::for_path("main.go", "webhook");
        assert!(locate("package main\n", &m).is_none());
        let err = locate_required("package main\n", &m).unwrap_err();
        assert!(format!("{}", err).contains("// webhook"));
    }
}
