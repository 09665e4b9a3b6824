#![deny(missing_docs)]

//! # Code Patching
//!
//! Best-effort structural edits on Go sources using regular expressions.
//!
//! - **structs**: Appending type declarations and wiring them into builder chains.
//! - **files**: Modifying file-level items like imports.
//! - **chain**: Inserting calls into fluent builder chains.
//! - **workflows**: Test-suite recipes (var block, `BeforeEach`, `Describe`).
//!
//! Edits never fail on a missing anchor; they report a warning in the
//! returned [`PartialResult`] instead.

pub(crate) mod common;

/// Fluent builder-chain insertion.
pub mod chain;

/// File-level patching operations (e.g. imports).
pub mod files;

/// Patch outcome reporting.
pub mod outcome;

/// Declaration-level patching operations.
pub mod structs;

/// Test-suite patching workflows.
pub mod workflows;

pub use chain::{inject_before_terminal, ChainStyle};
pub use common::adjust_indentation;
pub use files::{ensure_import, Import, ImportEdit};
pub use outcome::{PartialResult, Warning};
pub use structs::{struct_signature, Declaration, RequiredImport, StructuralPatcher, Wiring};
pub use workflows::{
    add_before_describe_end, add_to_before_each, add_to_var_block, patch_suite, SuiteAddition,
};
