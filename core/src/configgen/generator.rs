use crate::configgen::filter::Filter;
use crate::configgen::node::Node;
use crate::configgen::types::KubebuilderConfigGen;
use crate::error::AppResult;
use tracing::info;

/// Produces the base resources (CRDs, RBAC, webhook configurations) from
/// project sources.
pub trait ResourceSource {
    /// Generates resources for `config`.
    fn generate(&self, config: &KubebuilderConfigGen) -> AppResult<Vec<Node>>;
}

impl<F> ResourceSource for F
where
    F: Fn(&KubebuilderConfigGen) -> AppResult<Vec<Node>>,
{
    fn generate(&self, config: &KubebuilderConfigGen) -> AppResult<Vec<Node>> {
        self(config)
    }
}

/// Appends the output of a [`ResourceSource`] to the resource list.
pub struct GeneratorFilter<'a> {
    config: &'a KubebuilderConfigGen,
    source: &'a dyn ResourceSource,
}

impl<'a> GeneratorFilter<'a> {
    /// Stage reading from `source`.
    pub fn new(config: &'a KubebuilderConfigGen, source: &'a dyn ResourceSource) -> Self {
        Self { config, source }
    }
}

impl Filter for GeneratorFilter<'_> {
    fn name(&self) -> &str {
        "generator"
    }

    fn filter(&self, mut input: Vec<Node>) -> AppResult<Vec<Node>> {
        let generated = self.source.generate(self.config)?;
        info!(
            count = generated.len(),
            source = %self.config.spec.crds.source_directory,
            "generated resources"
        );
        input.extend(generated);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configgen::node::ResourceExt;
    use crate::error::AppError;

    #[test]
    fn test_appends_generated_resources() {
        let config = KubebuilderConfigGen::default();
        let source = |_: &KubebuilderConfigGen| -> AppResult<Vec<Node>> {
            Ok(vec![serde_yaml::from_str("kind: CustomResourceDefinition").unwrap()])
        };
        let out = GeneratorFilter::new(&config, &source)
            .filter(vec![serde_yaml::from_str("kind: Namespace").unwrap()])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].kind(), "CustomResourceDefinition");
    }

    #[test]
    fn test_source_error_propagates() {
        let config = KubebuilderConfigGen::default();
        let source = |_: &KubebuilderConfigGen| -> AppResult<Vec<Node>> {
            Err(AppError::General("controller-gen failed".into()))
        };
        assert!(GeneratorFilter::new(&config, &source).filter(vec![]).is_err());
    }
}
