#![deny(missing_docs)]

//! # Create Webhook Command
//!
//! Adds admission and conversion webhooks for an API type.
//!
//! 1. Scaffolds the webhook and test-suite skeletons when they are missing.
//! 2. Registers the setup call in `cmd/main.go` (its markers are required).
//! 3. Patches the requested webhooks into both files on a best-effort basis;
//!    anchors that cannot be found are reported as warnings.

use crate::error::{CliError, CliResult};
use opgen_core::machinery::{Builder, Scaffold};
use opgen_core::webhook::{
    apply_webhook_patches, FilePatch, MainWebhookInserter, Resource, WebhookOptions,
    WebhookSkeleton, WebhookSuiteSkeleton,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PROJECT_FILE: &str = "PROJECT";

/// Arguments for `create webhook`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WebhookArgs {
    /// API group, e.g. `ship`.
    #[clap(long, default_value = "")]
    pub group: String,

    /// API version, e.g. `v1beta1`.
    #[clap(long)]
    pub version: String,

    /// Kind, e.g. `Frigate`.
    #[clap(long)]
    pub kind: String,

    /// Project domain; read from the PROJECT file when omitted.
    #[clap(long)]
    pub domain: Option<String>,

    /// Go module path; read from the PROJECT file when omitted.
    #[clap(long)]
    pub repo: Option<String>,

    /// Resource plural; derived from the kind when omitted.
    #[clap(long)]
    pub plural: Option<String>,

    /// Scaffold a defaulting (mutating) webhook.
    #[clap(long)]
    pub defaulting: bool,

    /// Scaffold a validating webhook.
    #[clap(long = "programmatic-validation")]
    pub validation: bool,

    /// Scaffold a conversion webhook.
    #[clap(long)]
    pub conversion: bool,

    /// Custom path for the defaulting webhook.
    #[clap(long)]
    pub defaulting_path: Option<String>,

    /// Custom path for the validating webhook.
    #[clap(long)]
    pub validation_path: Option<String>,

    /// The project keeps one directory per API group.
    #[clap(long)]
    pub multigroup: bool,

    /// The type is a built-in Kubernetes type.
    #[clap(long)]
    pub core: bool,

    /// Project root.
    #[clap(long, env = "OPGEN_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,
}

/// The fields of the PROJECT file this command uses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectConfig {
    domain: String,
    repo: String,
    #[serde(rename = "multigroup")]
    multi_group: bool,
}

fn read_project(root: &Path) -> CliResult<ProjectConfig> {
    let path = root.join(PROJECT_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    Ok(serde_yaml::from_str(&fs::read_to_string(path)?)?)
}

impl WebhookArgs {
    fn resource(&self, project: &ProjectConfig) -> Resource {
        let mut resource = Resource::new(&self.group, &self.version, &self.kind);
        resource.domain = self.domain.clone().unwrap_or_else(|| project.domain.clone());
        resource.repo = self.repo.clone().unwrap_or_else(|| project.repo.clone());
        resource.multi_group = self.multigroup || project.multi_group;
        resource.core = self.core;
        if let Some(plural) = &self.plural {
            resource.plural = plural.clone();
        }
        resource
    }

    fn options(&self) -> WebhookOptions {
        WebhookOptions {
            defaulting: self.defaulting,
            validation: self.validation,
            conversion: self.conversion,
            defaulting_path: self.defaulting_path.clone(),
            validation_path: self.validation_path.clone(),
        }
    }
}

/// Executes `create webhook`.
///
/// Succeeds when patching was partial; the returned patches carry the
/// warnings that were also logged.
pub fn execute(args: &WebhookArgs) -> CliResult<Vec<FilePatch>> {
    let options = args.options();
    if !(options.defaulting || options.validation || options.conversion) {
        return Err(CliError::General(
            "at least one of --defaulting, --programmatic-validation or --conversion is required"
                .to_string(),
        ));
    }

    let project = read_project(&args.project_dir)?;
    let resource = args.resource(&project);
    resource.validate()?;
    if resource.repo.is_empty() {
        return Err(CliError::General(
            "repo is unknown: pass --repo or create a PROJECT file".to_string(),
        ));
    }

    let skeleton = WebhookSkeleton {
        resource: &resource,
    };
    let suite = WebhookSuiteSkeleton {
        resource: &resource,
    };
    let main = MainWebhookInserter {
        resource: &resource,
    };
    let report = Scaffold::new(&args.project_dir).execute(&[
        Builder::Template(&skeleton),
        Builder::Template(&suite),
        Builder::Inserter(&main),
    ])?;
    for path in &report.written {
        info!(file = %path.display(), "wrote file");
    }

    let patches = apply_webhook_patches(&args.project_dir, &resource, &options)?;
    let mut warnings = 0;
    for patch in &patches {
        patch.result.report(&patch.path.display().to_string());
        warnings += patch.result.warnings.len();
    }
    if warnings > 0 {
        warn!(
            warnings,
            "webhook created with manual steps remaining, see the warnings above"
        );
    }
    Ok(patches)
}
