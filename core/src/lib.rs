#![deny(missing_docs)]

//! # Opgen Core
//!
//! Core library for scaffolding and maintaining Kubernetes operator projects.
//!
//! - **machinery**: marker-based insertion of code fragments into scaffolded files.
//! - **patcher**: best-effort regex patching of user-edited Go sources.
//! - **webhook**: webhook skeletons and the patch plans applied to them.
//! - **configgen**: the filter pipeline producing a deployment manifest.

/// Shared error types.
pub mod error;

/// Marker-based file generation.
pub mod machinery;

/// Structural text patching.
pub mod patcher;

/// Webhook scaffolding.
pub mod webhook;

/// Manifest generation pipeline.
pub mod configgen;

/// Identifier and plural helpers.
pub mod naming;

pub use configgen::{build_pipeline, generate, KubebuilderConfigGen};
pub use error::{AppError, AppResult};
pub use machinery::{
    insert_fragments, splice, Builder, CodeFragments, IfExistsAction, Inserter, Marker,
    Scaffold, ScaffoldReport, Template,
};
pub use patcher::{Declaration, PartialResult, StructuralPatcher, Warning};
pub use webhook::{apply_webhook_patches, Resource, WebhookOptions};
