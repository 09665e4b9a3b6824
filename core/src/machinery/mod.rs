#![deny(missing_docs)]

//! # Machinery
//!
//! Marker-based file generation.
//!
//! - **marker**: Locating named anchors in scaffolded files.
//! - **fragments**: Registering code fragments per marker.
//! - **splice**: Inserting fragments before markers.
//! - **operations**: Targeted edits (insert/replace/prefix) on existing files.
//! - **scaffold**: Running ordered template and inserter builders.

/// Marker definitions and lookup.
pub mod marker;

/// Fragment registry.
pub mod fragments;

/// Marker-based insertion.
pub mod splice;

/// Targeted text edits on files.
pub mod operations;

/// Builder execution.
pub mod scaffold;

pub use fragments::CodeFragments;
pub use marker::{locate, locate_required, Marker, KUBEBUILDER_PREFIX};
pub use scaffold::{
    Builder, FileModel, IfExistsAction, Inserter, Scaffold, ScaffoldReport, Template, Universe,
};
pub use splice::{insert_fragments, missing_markers, splice};
