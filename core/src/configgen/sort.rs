use crate::configgen::filter::Filter;
use crate::configgen::node::{Node, ResourceExt};
use crate::error::AppResult;

/// Kinds that must be applied before others, in apply order.
pub const KIND_ORDER: [&str; 9] = [
    "Namespace",
    "CustomResourceDefinition",
    "Role",
    "ClusterRole",
    "RoleBinding",
    "ClusterRoleBinding",
    "Service",
    "Secret",
    "Deployment",
];

/// Orders resources so that dependencies come first.
///
/// Known kinds follow [`KIND_ORDER`], anything else comes after them grouped
/// by kind. Ties are broken by name; equal keys keep their input order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SortFilter;

fn sort_key(node: &Node) -> (usize, &str, &str) {
    let kind = node.kind();
    match KIND_ORDER.iter().position(|k| *k == kind) {
        Some(rank) => (rank, "", node.name()),
        None => (KIND_ORDER.len(), kind, node.name()),
    }
}

impl Filter for SortFilter {
    fn name(&self) -> &str {
        "sort"
    }

    fn filter(&self, mut input: Vec<Node>) -> AppResult<Vec<Node>> {
        input.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        Ok(input)
    }
}
