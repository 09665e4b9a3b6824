use crate::error::{AppError, AppResult};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// A parsed Kubernetes resource.
pub type Node = Value;

/// Accessors for the well-known fields of a resource.
pub trait ResourceExt {
    /// `kind`, or an empty string.
    fn kind(&self) -> &str;
    /// `metadata.name`, or an empty string.
    fn name(&self) -> &str;
    /// `metadata.namespace`, or an empty string.
    fn namespace(&self) -> &str;
    /// Value of label `key`.
    fn label(&self, key: &str) -> Option<&str>;
}

impl ResourceExt for Node {
    fn kind(&self) -> &str {
        self.get("kind").and_then(Value::as_str).unwrap_or_default()
    }

    fn name(&self) -> &str {
        get_path(self, &["metadata", "name"])
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn namespace(&self) -> &str {
        get_path(self, &["metadata", "namespace"])
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn label(&self, key: &str) -> Option<&str> {
        get_path(self, &["metadata", "labels", key]).and_then(Value::as_str)
    }
}

/// Looks up a nested mapping field.
pub fn get_path<'a>(node: &'a Node, path: &[&str]) -> Option<&'a Node> {
    path.iter().try_fold(node, |current, key| current.get(*key))
}

/// Mutable variant of [`get_path`].
pub fn get_path_mut<'a>(node: &'a mut Node, path: &[&str]) -> Option<&'a mut Node> {
    path.iter()
        .try_fold(node, |current, key| current.get_mut(*key))
}

/// Appends `item` to the list at `path` (created when missing) unless an
/// equal item is already there.
pub fn append_unique(node: &mut Node, path: &[&str], item: Node) -> AppResult<()> {
    if get_path(node, path).map_or(true, Value::is_null) {
        set_path(node, path, Value::Sequence(Vec::new()))?;
    }
    let list = get_path_mut(node, path)
        .and_then(Value::as_sequence_mut)
        .ok_or_else(|| AppError::General(format!("{} is not a list", path.join("."))))?;
    if !list.contains(&item) {
        list.push(item);
    }
    Ok(())
}

/// Element of the list at `path` whose `name` field equals `name`.
pub fn find_named_mut<'a>(node: &'a mut Node, path: &[&str], name: &str) -> Option<&'a mut Node> {
    get_path_mut(node, path)?
        .as_sequence_mut()?
        .iter_mut()
        .find(|item| item.get("name").and_then(Value::as_str) == Some(name))
}

/// Sets a nested field, creating intermediate mappings as needed.
///
/// Fails when an intermediate field holds something other than a mapping
/// or null.
pub fn set_path(node: &mut Node, path: &[&str], value: Node) -> AppResult<()> {
    let Some((last, parents)) = path.split_last() else {
        *node = value;
        return Ok(());
    };

    let mut current = node;
    for key in parents {
        current = child_mapping(current, key, path)?;
    }
    mapping_of(current, path)?.insert(Value::from(*last), value);
    Ok(())
}

fn mapping_of<'a>(node: &'a mut Node, path: &[&str]) -> AppResult<&'a mut Mapping> {
    if node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }
    node.as_mapping_mut().ok_or_else(|| {
        AppError::General(format!(
            "cannot set {}: parent is not a mapping",
            path.join(".")
        ))
    })
}

fn child_mapping<'a>(node: &'a mut Node, key: &str, path: &[&str]) -> AppResult<&'a mut Node> {
    let map = mapping_of(node, path)?;
    let entry = map
        .entry(Value::from(key))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    Ok(entry)
}

/// Merges `patch` into `target`.
///
/// Mappings merge recursively, a `null` in the patch deletes the field, and
/// anything else (including sequences) replaces the target value.
pub fn merge_patch(target: &mut Node, patch: &Node) {
    if !(target.is_mapping() && patch.is_mapping()) {
        *target = patch.clone();
        return;
    }
    let (Some(target_map), Some(patch_map)) = (target.as_mapping_mut(), patch.as_mapping()) else {
        return;
    };

    for (key, value) in patch_map {
        if value.is_null() {
            target_map.remove(key);
            continue;
        }
        let nested = value.is_mapping() && target_map.get(key).is_some_and(Value::is_mapping);
        if !nested {
            target_map.insert(key.clone(), value.clone());
        } else if let Some(existing) = target_map.get_mut(key) {
            merge_patch(existing, value);
        }
    }
}

/// Parses a multi-document YAML stream. Empty documents are dropped and
/// `kind: List` documents are flattened into their items.
pub fn parse_stream(text: &str) -> AppResult<Vec<Node>> {
    let mut nodes = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let node = Node::deserialize(document)?;
        if node.is_null() {
            continue;
        }
        if node.kind() == "List" {
            if let Some(items) = node.get("items").and_then(Value::as_sequence) {
                nodes.extend(items.iter().cloned());
            }
            continue;
        }
        nodes.push(node);
    }
    Ok(nodes)
}

/// Renders resources as a `---` separated YAML stream.
pub fn render_stream(nodes: &[Node]) -> AppResult<String> {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&serde_yaml::to_string(node)?);
    }
    Ok(out)
}

/// Converts a JSON value built with `serde_json::json!` into a node.
pub fn from_json(value: serde_json::Value) -> AppResult<Node> {
    Ok(serde_yaml::to_value(value)?)
}
