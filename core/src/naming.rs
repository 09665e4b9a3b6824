#![deny(missing_docs)]

//! # Naming Utilities
//!
//! Helper functions for deriving file names and resource plurals from a
//! resource kind.

/// Lower-cases a kind for use in paths and webhook names (`CronJob` -> `cronjob`).
pub fn to_lower_kind(kind: &str) -> String {
    kind.to_lowercase()
}

/// Lower-case English plural of a kind (`Policy` -> `policies`).
pub fn pluralize(kind: &str) -> String {
    let word = kind.to_lowercase();
    if word.is_empty() {
        return word;
    }
    const IRREGULAR: [(&str, &str); 4] = [
        ("person", "people"),
        ("child", "children"),
        ("index", "indices"),
        ("endpoints", "endpoints"),
    ];
    if let Some((_, plural)) = IRREGULAR.iter().find(|(single, _)| *single == word) {
        return (*plural).to_string();
    }

    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y') {
        let vowel_before = stem.ends_with(['a', 'e', 'i', 'o', 'u']);
        if !vowel_before {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_kind() {
        assert_eq!(to_lower_kind("FirstMate"), "firstmate");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("Frigate"), "frigates");
        assert_eq!(pluralize("Policy"), "policies");
        assert_eq!(pluralize("Gateway"), "gateways");
        assert_eq!(pluralize("Ingress"), "ingresses");
        assert_eq!(pluralize("Box"), "boxes");
        assert_eq!(pluralize("Person"), "people");
        assert_eq!(pluralize(""), "");
    }
}
