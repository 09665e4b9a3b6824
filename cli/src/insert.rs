#![deny(missing_docs)]

//! # Insert Command
//!
//! Applies a fragment registry to one file. The registry is a YAML mapping
//! from marker name to the fragments to insert before it:
//!
//! ```yaml
//! imports:
//!   - foo "example.com/foo"
//! scheme:
//!   - utilruntime.Must(foo.AddToScheme(scheme))
//! ```
//!
//! Fragments already present are skipped; a marker missing from the file
//! aborts the command without touching it.

use crate::error::CliResult;
use indexmap::IndexMap;
use opgen_core::machinery::{insert_fragments, CodeFragments, Marker, KUBEBUILDER_PREFIX};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Arguments for the insert command.
#[derive(clap::Args, Debug, Clone)]
pub struct InsertArgs {
    /// File to insert into.
    #[clap(long)]
    pub file: PathBuf,

    /// YAML file mapping marker names to fragment lists.
    #[clap(long)]
    pub fragments: PathBuf,

    /// Text between the comment token and the marker name.
    #[clap(long, default_value = KUBEBUILDER_PREFIX)]
    pub prefix: String,
}

fn load_registry(path: &Path, target: &Path, prefix: &str) -> CliResult<CodeFragments> {
    let raw: IndexMap<String, Vec<String>> = serde_yaml::from_str(&fs::read_to_string(path)?)?;
    let mut fragments = CodeFragments::new();
    for (marker, codes) in raw {
        fragments.insert(Marker::with_prefix(prefix, target, &marker), codes);
    }
    Ok(fragments)
}

/// Executes the insert command. Returns whether the file changed.
pub fn execute(args: &InsertArgs) -> CliResult<bool> {
    let fragments = load_registry(&args.fragments, &args.file, &args.prefix)?;
    let content = fs::read_to_string(&args.file)?;
    let updated = insert_fragments(&content, &fragments)?;
    if updated == content {
        info!(file = %args.file.display(), "nothing to insert");
        return Ok(false);
    }
    fs::write(&args.file, updated)?;
    info!(file = %args.file.display(), markers = fragments.len(), "inserted fragments");
    Ok(true)
}
