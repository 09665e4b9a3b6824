#![deny(missing_docs)]

//! # Config Generation
//!
//! Builds the combined deployment manifest of an operator project from a
//! `KubebuilderConfigGen` description.
//!
//! The work is a fixed sequence of filters over a list of parsed resources:
//!
//! 1. **generator**: base resources from project sources.
//! 2. **certificates**: development certificate injection.
//! 3. **resources**: built-in manager, RBAC and service resources.
//! 4. **patches**: built-in and user patch templates.
//! 5. **component-config**: component config ConfigMap wiring.
//! 6. **sort**: apply order.
//!
//! Any failing stage aborts the run; nothing is rendered.

/// Self-signed certificate injection.
pub mod cert;

/// Component config wiring.
pub mod component;

/// Filter trait and pipeline runner.
pub mod filter;

/// External resource sources.
pub mod generator;

/// Resource node helpers.
pub mod node;

/// Patch templates.
pub mod patches;

/// Built-in resources.
pub mod resources;

/// Resource matching.
pub mod selector;

/// Apply ordering.
pub mod sort;

/// Configuration document.
pub mod types;

pub use cert::{CertFilter, CertRequest, Certificate, CertificateIssuer};
pub use component::ComponentFilter;
pub use filter::{Filter, Pipeline};
pub use generator::{GeneratorFilter, ResourceSource};
pub use node::{parse_stream, render_stream, Node, ResourceExt};
pub use patches::{builtin_patches, PatchAction, PatchFilter, PatchTemplate};
pub use resources::ResourceFilter;
pub use selector::Selector;
pub use sort::SortFilter;
pub use types::{parse_duration, CertificateSourceType, KubebuilderConfigGen};

use crate::error::AppResult;
use tracing::info;

/// Assembles the standard pipeline for an already defaulted `config`.
///
/// `user_patches` are merged after the built-in patches, each selected by
/// its own kind, name and namespace.
pub fn build_pipeline<'a>(
    config: &'a KubebuilderConfigGen,
    source: &'a dyn ResourceSource,
    issuer: &'a dyn CertificateIssuer,
    user_patches: Vec<Node>,
) -> AppResult<Pipeline<'a>> {
    let mut templates = builtin_patches(config)?;
    templates.extend(user_patches.into_iter().map(PatchTemplate::from_document));

    Ok(Pipeline::new()
        .stage(GeneratorFilter::new(config, source))
        .stage(CertFilter::new(config, issuer))
        .stage(ResourceFilter::new(config))
        .stage(PatchFilter::new(templates))
        .stage(ComponentFilter::new(config))
        .stage(SortFilter))
}

/// Runs the standard pipeline and renders the manifest as a YAML stream.
pub fn generate(
    config: &KubebuilderConfigGen,
    source: &dyn ResourceSource,
    issuer: &dyn CertificateIssuer,
    user_patches: Vec<Node>,
) -> AppResult<String> {
    let pipeline = build_pipeline(config, source, issuer, user_patches)?;
    let nodes = pipeline.run(Vec::new())?;
    info!(
        project = config.name(),
        resources = nodes.len(),
        "generated manifest"
    );
    render_stream(&nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::path::Path;

    struct BrokenIssuer;

    impl CertificateIssuer for BrokenIssuer {
        fn issue(&self, _: &CertRequest) -> AppResult<Certificate> {
            Err(AppError::General("no openssl".into()))
        }
    }

    fn dev_config() -> KubebuilderConfigGen {
        let mut cfg = KubebuilderConfigGen::from_yaml(
            "metadata:\n  name: p\nspec:\n  controllerManager:\n    image: img\n  webhooks:\n    enable: true\n    certificateSource:\n      type: dev\n",
        )
        .unwrap();
        cfg.default_and_validate(Path::new(".")).unwrap();
        cfg
    }

    fn no_resources(_: &KubebuilderConfigGen) -> AppResult<Vec<Node>> {
        Ok(Vec::new())
    }

    #[test]
    fn test_stage_order() {
        let cfg = dev_config();
        let pipeline = build_pipeline(&cfg, &no_resources, &BrokenIssuer, Vec::new()).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "generator",
                "certificates",
                "resources",
                "patches",
                "component-config",
                "sort"
            ]
        );
    }

    #[test]
    fn test_failing_cert_stage_aborts() {
        let cfg = dev_config();
        let err = generate(&cfg, &no_resources, &BrokenIssuer, Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::General(ref m) if m == "no openssl"));
    }
}
