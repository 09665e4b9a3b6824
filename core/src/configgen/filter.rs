use crate::configgen::node::Node;
use crate::error::AppResult;
use tracing::{debug, error};

/// One transformation of the resource list.
pub trait Filter {
    /// Stage name used in logs.
    fn name(&self) -> &str;

    /// Transforms the resource list.
    fn filter(&self, input: Vec<Node>) -> AppResult<Vec<Node>>;
}

/// Stages applied in order. The first failing stage aborts the run and its
/// error is returned as-is; no partial output is produced.
#[derive(Default)]
pub struct Pipeline<'a> {
    stages: Vec<Box<dyn Filter + 'a>>,
}

impl<'a> Pipeline<'a> {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn stage(mut self, filter: impl Filter + 'a) -> Self {
        self.stages.push(Box::new(filter));
        self
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage over `input`.
    pub fn run(&self, input: Vec<Node>) -> AppResult<Vec<Node>> {
        let mut nodes = input;
        for stage in &self.stages {
            debug!(stage = stage.name(), resources = nodes.len(), "running stage");
            nodes = stage.filter(nodes).inspect_err(|e| {
                error!(stage = stage.name(), error = %e, "stage failed, aborting");
            })?;
        }
        Ok(nodes)
    }
}
