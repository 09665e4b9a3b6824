use crate::error::{AppError, AppResult};
use crate::naming::{pluralize, to_lower_kind};
use std::path::PathBuf;

const CORE_GROUP: &str = "core";

/// Group/version/kind of an API type plus the project facts needed to place
/// and reference its webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Project domain, e.g. `example.com`.
    pub domain: String,
    /// API group, e.g. `ship`.
    pub group: String,
    /// API version, e.g. `v1beta1`.
    pub version: String,
    /// Kind, e.g. `Frigate`.
    pub kind: String,
    /// Lower-case plural resource name.
    pub plural: String,
    /// Go module path of the project.
    pub repo: String,
    /// Built-in Kubernetes type (k8s.io/api).
    pub core: bool,
    /// Project uses one directory per group.
    pub multi_group: bool,
}

impl Resource {
    /// Resource with the regular plural of `kind`.
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            domain: String::new(),
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: pluralize(kind),
            repo: String::new(),
            core: false,
            multi_group: false,
        }
    }

    /// Checks that group, version and kind are usable in Go and URL paths.
    pub fn validate(&self) -> AppResult<()> {
        if self.version.is_empty() {
            return Err(AppError::Validation("version cannot be empty".into()));
        }
        if !self.version.starts_with('v')
            || !self.version.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(AppError::Validation(format!(
                "version must match v<N>[alpha|beta<M>], got {:?}",
                self.version
            )));
        }
        let mut kind_chars = self.kind.chars();
        match kind_chars.next() {
            Some(c) if c.is_ascii_uppercase() => {}
            _ => {
                return Err(AppError::Validation(format!(
                    "kind must start with an uppercase letter, got {:?}",
                    self.kind
                )))
            }
        }
        if !kind_chars.all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Validation(format!(
                "kind must be alphanumeric, got {:?}",
                self.kind
            )));
        }
        let group_ok = self
            .group
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
        if !group_ok {
            return Err(AppError::Validation(format!(
                "group must be a lower-case DNS subdomain, got {:?}",
                self.group
            )));
        }
        if self.group.is_empty() && self.domain.is_empty() {
            return Err(AppError::Validation(
                "either group or domain must be set".into(),
            ));
        }
        Ok(())
    }

    /// `<group>.<domain>`, or whichever of the two is set.
    pub fn qualified_group(&self) -> String {
        match (self.group.is_empty(), self.domain.is_empty()) {
            (true, _) => self.domain.clone(),
            (false, true) => self.group.clone(),
            (false, false) => format!("{}.{}", self.group, self.domain),
        }
    }

    fn is_core_group(&self) -> bool {
        self.core && self.qualified_group() == CORE_GROUP
    }

    /// Value of the `groups=` field of webhook markers.
    pub fn group_value(&self) -> String {
        if self.is_core_group() {
            "\"\"".to_string()
        } else {
            self.qualified_group()
        }
    }

    /// Lower-case kind.
    pub fn kind_lower(&self) -> String {
        to_lower_kind(&self.kind)
    }

    /// Go import alias of the API package, e.g. `shipv1beta1`.
    pub fn import_alias(&self) -> String {
        let base = if self.group.is_empty() {
            self.domain.split('.').next().unwrap_or_default()
        } else {
            self.group.as_str()
        };
        let cleaned: String = base.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        format!("{}{}", cleaned.to_lowercase(), self.version)
    }

    /// Go import path of the API package.
    pub fn package_path(&self) -> String {
        if self.core {
            let group = if self.group.is_empty() {
                CORE_GROUP
            } else {
                self.group.as_str()
            };
            return format!("k8s.io/api/{}/{}", group, self.version);
        }
        if self.multi_group && !self.group.is_empty() {
            format!("{}/api/{}/{}", self.repo, self.group, self.version)
        } else {
            format!("{}/api/{}", self.repo, self.version)
        }
    }

    fn webhook_dir(&self) -> PathBuf {
        let mut dir = PathBuf::from("internal").join("webhook");
        if self.multi_group && !self.group.is_empty() {
            dir.push(&self.group);
        }
        dir.push(&self.version);
        dir
    }

    /// Webhook implementation file, relative to the project root.
    pub fn webhook_path(&self) -> PathBuf {
        self.webhook_dir()
            .join(format!("{}_webhook.go", self.kind_lower()))
    }

    /// Webhook test file, relative to the project root.
    pub fn webhook_test_path(&self) -> PathBuf {
        self.webhook_dir()
            .join(format!("{}_webhook_test.go", self.kind_lower()))
    }

    /// Go package name of the webhook files.
    pub fn webhook_package(&self) -> &str {
        &self.version
    }

    /// Alias used by `cmd/main.go` for the webhook package.
    pub fn webhook_import_alias(&self) -> String {
        if self.multi_group && !self.group.is_empty() {
            format!("webhook{}{}", self.group.to_lowercase().replace(['.', '-'], ""), self.version)
        } else {
            format!("webhook{}", self.version)
        }
    }

    /// Go import path of the webhook package.
    pub fn webhook_import_path(&self) -> String {
        let dir = self
            .webhook_dir()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.repo, dir)
    }

    /// Default path served by the mutating webhook.
    pub fn defaulting_path(&self) -> String {
        self.webhook_url("mutate")
    }

    /// Default path served by the validating webhook.
    pub fn validation_path(&self) -> String {
        self.webhook_url("validate")
    }

    fn webhook_url(&self, verb: &str) -> String {
        let group = if self.is_core_group() {
            String::new()
        } else {
            self.qualified_group().replace('.', "-")
        };
        format!("/{}-{}-{}-{}", verb, group, self.version, self.kind_lower())
    }
}
