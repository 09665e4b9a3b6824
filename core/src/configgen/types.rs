use crate::error::{AppError, AppResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// `apiVersion` of the config-gen resource.
pub const API_VERSION: &str = "kubebuilder.sigs.k8s.io/v1alpha1";
/// `kind` of the config-gen resource.
pub const KIND: &str = "KubebuilderConfigGen";

const DEFAULT_SOURCE_DIRECTORY: &str = "./...";
const DEFAULT_CERT_DURATION: &str = "1h";

/// Describes how to generate the manifests of a controller-runtime project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubebuilderConfigGen {
    /// Must be [`API_VERSION`] when set.
    pub api_version: String,
    /// Must be [`KIND`] when set.
    pub kind: String,
    /// Project name, namespace and common metadata.
    pub metadata: ObjectMeta,
    /// What to generate.
    pub spec: ConfigGenSpec,
    /// Values computed while defaulting.
    #[serde(skip)]
    pub status: ConfigGenStatus,
}

/// Metadata of the generated project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    /// Used to derive resource names. Required.
    pub name: String,
    /// Namespace for the controller resources; defaults to `<name>-system`.
    pub namespace: String,
    /// Labels added to generated resources.
    pub labels: IndexMap<String, String>,
    /// Annotations added to generated resources.
    pub annotations: IndexMap<String, String>,
}

/// Desired configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigGenSpec {
    /// CRD and RBAC generation.
    pub crds: Crds,
    /// The controller-manager Deployment.
    pub controller_manager: ControllerManager,
    /// Webhooks and their certificates.
    pub webhooks: Webhooks,
}

/// How CRDs are generated from source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Crds {
    /// Go package pattern handed to the generator; defaults to `./...`.
    pub source_directory: String,
}

/// The controller-manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerManager {
    /// Container image. Required.
    pub image: String,
    /// Metrics exposure.
    pub metrics: Metrics,
    /// File-based (component config) manager options.
    pub component_config: ComponentConfig,
}

/// Metrics exposure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    /// Serve metrics directly instead of through the auth proxy.
    pub disable_auth_proxy: bool,
    /// Generate a prometheus ServiceMonitor.
    pub enable_service_monitor: bool,
}

/// Component config options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentConfig {
    /// Use component config rather than flags.
    pub enable: bool,
    /// File holding the component config, relative to the project file.
    pub config_filepath: String,
}

/// Webhook generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Webhooks {
    /// Generate webhook resources.
    pub enable: bool,
    /// CRD names that use a conversion webhook.
    #[serde(alias = "enableConversion")]
    pub conversions: IndexMap<String, bool>,
    /// Where webhook certificates come from.
    pub certificate_source: CertificateSource,
}

impl Webhooks {
    /// Whether the CRD named `name` uses a conversion webhook.
    pub fn converts(&self, name: &str) -> bool {
        self.conversions.get(name).copied().unwrap_or(false)
    }
}

/// Discriminator of [`CertificateSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CertificateSourceType {
    /// The user wires certificates in.
    #[default]
    Manual,
    /// cert-manager Issuer and Certificate resources.
    CertManager,
    /// Self-signed certificate generated at build time.
    Dev,
}

/// Where webhook certificates come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificateSource {
    /// Source type.
    #[serde(rename = "type")]
    pub source_type: CertificateSourceType,
    /// Options of the `dev` source.
    pub dev_certificate: Option<DevCertificate>,
}

/// Options of the `dev` certificate source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevCertificate {
    /// Validity as a Go duration string (`1h`, `90m`, `2h30m`).
    #[serde(alias = "duration")]
    pub cert_duration: String,
}

/// Runtime values produced while defaulting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigGenStatus {
    /// Contents of the component config file.
    pub component_config: String,
    /// Parsed dev certificate validity.
    pub cert_duration: Option<Duration>,
}

impl KubebuilderConfigGen {
    /// Parses a config-gen document.
    pub fn from_yaml(text: &str) -> AppResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Project namespace (after defaulting).
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Validates required fields, then fills in defaults.
    ///
    /// Relative component config paths are resolved against `base_dir`.
    pub fn default_and_validate(&mut self, base_dir: &Path) -> AppResult<()> {
        if self.api_version.is_empty() {
            self.api_version = API_VERSION.to_string();
        } else if self.api_version != API_VERSION {
            return Err(AppError::Validation(format!(
                "unsupported apiVersion {:?}, expected {}",
                self.api_version, API_VERSION
            )));
        }
        if self.kind.is_empty() {
            self.kind = KIND.to_string();
        } else if self.kind != KIND {
            return Err(AppError::Validation(format!(
                "unsupported kind {:?}, expected {}",
                self.kind, KIND
            )));
        }
        if self.metadata.name.is_empty() {
            return Err(AppError::Validation(
                "must specify metadata.name field".into(),
            ));
        }
        if self.spec.controller_manager.image.is_empty() {
            return Err(AppError::Validation(
                "must specify spec.controllerManager.image field".into(),
            ));
        }

        if self.metadata.namespace.is_empty() {
            self.metadata.namespace = format!("{}-system", self.metadata.name);
        }
        if self.spec.crds.source_directory.is_empty() {
            self.spec.crds.source_directory = DEFAULT_SOURCE_DIRECTORY.to_string();
        }

        let filepath = &self.spec.controller_manager.component_config.config_filepath;
        if !filepath.is_empty() {
            self.status.component_config = fs::read_to_string(base_dir.join(filepath))?;
        }

        let source = &mut self.spec.webhooks.certificate_source;
        if source.source_type == CertificateSourceType::Dev {
            let dev = source.dev_certificate.get_or_insert_with(DevCertificate::default);
            if dev.cert_duration.is_empty() {
                dev.cert_duration = DEFAULT_CERT_DURATION.to_string();
            }
            self.status.cert_duration = Some(parse_duration(&dev.cert_duration)?);
        }
        Ok(())
    }
}

/// Parses a Go-style duration such as `1h`, `90m`, `1h30m` or `1.5h`.
pub fn parse_duration(text: &str) -> AppResult<Duration> {
    let invalid = || AppError::Validation(format!("invalid duration {:?}", text));
    if text.is_empty() {
        return Err(invalid());
    }

    let mut total = 0f64;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let value: f64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            _ => return Err(invalid()),
        };
        total += value * seconds;
        rest = &rest[unit_len..];
    }
    Ok(Duration::from_secs_f64(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
apiVersion: kubebuilder.sigs.k8s.io/v1alpha1
kind: KubebuilderConfigGen
metadata:
  name: project
spec:
  controllerManager:
    image: org/project:v0.1.0
"#;

    #[test]
    fn test_defaults() {
        let mut cfg = KubebuilderConfigGen::from_yaml(MINIMAL).unwrap();
        cfg.default_and_validate(Path::new(".")).unwrap();
        assert_eq!(cfg.namespace(), "project-system");
        assert_eq!(cfg.spec.crds.source_directory, "./...");
        assert_eq!(
            cfg.spec.webhooks.certificate_source.source_type,
            CertificateSourceType::Manual
        );
        assert!(cfg.status.cert_duration.is_none());
    }

    #[test]
    fn test_missing_name() {
        let mut cfg = KubebuilderConfigGen::from_yaml("spec:\n  controllerManager:\n    image: x\n").unwrap();
        let err = cfg.default_and_validate(Path::new(".")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation Error: must specify metadata.name field"
        );
    }

    #[test]
    fn test_missing_image() {
        let mut cfg = KubebuilderConfigGen::from_yaml("metadata:\n  name: p\n").unwrap();
        let err = cfg.default_and_validate(Path::new(".")).unwrap_err();
        assert!(err
            .to_string()
            .contains("must specify spec.controllerManager.image field"));
    }

    #[test]
    fn test_wrong_kind() {
        let mut cfg =
            KubebuilderConfigGen::from_yaml("kind: Kustomization\nmetadata:\n  name: p\n").unwrap();
        assert!(matches!(
            cfg.default_and_validate(Path::new(".")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_dev_certificate_defaults() {
        let text = format!(
            "{}  webhooks:\n    enable: true\n    conversions:\n      bars.example.com: true\n    certificateSource:\n      type: dev\n",
            MINIMAL
        );
        let mut cfg = KubebuilderConfigGen::from_yaml(&text).unwrap();
        cfg.default_and_validate(Path::new(".")).unwrap();
        let dev = cfg.spec.webhooks.certificate_source.dev_certificate.clone().unwrap();
        assert_eq!(dev.cert_duration, "1h");
        assert_eq!(cfg.status.cert_duration, Some(Duration::from_secs(3600)));
        assert!(cfg.spec.webhooks.converts("bars.example.com"));
        assert!(!cfg.spec.webhooks.converts("foos.example.com"));
    }

    #[test]
    fn test_component_config_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cc.yaml"), "health:\n  healthProbeBindAddress: :8081\n").unwrap();
        let text = format!(
            "{}    componentConfig:\n      enable: true\n      configFilepath: cc.yaml\n",
            MINIMAL
        );
        let mut cfg = KubebuilderConfigGen::from_yaml(&text).unwrap();
        cfg.default_and_validate(dir.path()).unwrap();
        assert!(cfg.status.component_config.contains("healthProbeBindAddress"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5d").is_err());
    }
}
