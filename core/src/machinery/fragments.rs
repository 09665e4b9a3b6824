#![deny(missing_docs)]

//! # Fragment Registry
//!
//! Ordered mapping from markers to the code fragments a builder wants to insert
//! before them. Building the registry is pure; nothing touches the filesystem.

use crate::machinery::marker::Marker;
use indexmap::IndexMap;

/// Fragments grouped by marker, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeFragments {
    entries: IndexMap<Marker, Vec<String>>,
}

impl CodeFragments {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `fragments` for `marker`.
    ///
    /// An empty list does not create an entry. Fragments for a marker that is
    /// already registered are appended after the existing ones.
    pub fn insert(&mut self, marker: Marker, fragments: Vec<String>) {
        if fragments.is_empty() {
            return;
        }
        self.entries.entry(marker).or_default().extend(fragments);
    }

    /// Registers a single fragment for `marker`.
    pub fn push(&mut self, marker: Marker, fragment: impl Into<String>) {
        self.insert(marker, vec![fragment.into()]);
    }

    /// Fragments registered for `marker`, if any.
    pub fn get(&self, marker: &Marker) -> Option<&[String]> {
        self.entries.get(marker).map(Vec::as_slice)
    }

    /// Iterates markers and their fragments in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Marker, &[String])> {
        self.entries.iter().map(|(m, f)| (m, f.as_slice()))
    }

    /// Number of markers with at least one fragment.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no fragment is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry whose marker is not part of `valid`.
    pub fn retain_markers(&mut self, valid: &[Marker]) {
        self.entries.retain(|marker, _| valid.contains(marker));
    }

    /// Drops the fragments that `content` already contains.
    ///
    /// Single-line fragments match a line of the document after trimming;
    /// multi-line fragments match when all their non-blank trimmed lines appear
    /// consecutively. Markers left without fragments are removed.
    pub fn remove_existing(&mut self, content: &str) {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        for fragments in self.entries.values_mut() {
            fragments.retain(|fragment| !fragment_present(&lines, fragment));
        }
        self.entries.retain(|_, fragments| !fragments.is_empty());
    }
}

fn fragment_present(lines: &[&str], fragment: &str) -> bool {
    let wanted: Vec<&str> = fragment
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if wanted.is_empty() {
        return true;
    }

    lines.windows(wanted.len()).any(|window| window == wanted.as_slice())
}
