use crate::configgen::node::{Node, ResourceExt};
use indexmap::IndexMap;
use std::fmt;

type Matcher<'a> = Box<dyn Fn(&Node) -> bool + 'a>;

/// Picks resources by kind, name, namespace, labels and an optional custom
/// predicate. Every non-empty criterion must match.
#[derive(Default)]
pub struct Selector<'a> {
    kinds: Vec<String>,
    names: Vec<String>,
    namespaces: Vec<String>,
    labels: IndexMap<String, String>,
    matcher: Option<Matcher<'a>>,
}

impl fmt::Debug for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("kinds", &self.kinds)
            .field("names", &self.names)
            .field("namespaces", &self.namespaces)
            .field("labels", &self.labels)
            .field("matcher", &self.matcher.is_some())
            .finish()
    }
}

impl<'a> Selector<'a> {
    /// Selector that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to these kinds.
    pub fn kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Restricts to these names.
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Restricts to these namespaces.
    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces.extend(namespaces.into_iter().map(Into::into));
        self
    }

    /// Requires label `key` to equal `value`.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds a custom predicate.
    pub fn matching(mut self, matcher: impl Fn(&Node) -> bool + 'a) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    /// Whether `node` satisfies every criterion.
    pub fn matches(&self, node: &Node) -> bool {
        let any_of = |wanted: &[String], actual: &str| {
            wanted.is_empty() || wanted.iter().any(|w| w == actual)
        };
        any_of(&self.kinds, node.kind())
            && any_of(&self.names, node.name())
            && any_of(&self.namespaces, node.namespace())
            && self
                .labels
                .iter()
                .all(|(k, v)| node.label(k) == Some(v.as_str()))
            && self.matcher.as_ref().map_or(true, |m| m(node))
    }

    /// Mutable access to the matching nodes.
    pub fn select<'n>(&'n self, nodes: &'n mut [Node]) -> impl Iterator<Item = &'n mut Node> + 'n {
        nodes.iter_mut().filter(move |n| self.matches(n))
    }
}
