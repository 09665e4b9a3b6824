use crate::configgen::filter::Filter;
use crate::configgen::node::{from_json, set_path, Node, ResourceExt};
use crate::configgen::selector::Selector;
use crate::configgen::types::{CertificateSourceType, KubebuilderConfigGen};
use crate::error::AppResult;
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Name of the Service in front of the webhook server.
pub const WEBHOOK_SERVICE: &str = "webhook-service";
/// Name of the TLS Secret mounted by the webhook server.
pub const WEBHOOK_CERT_SECRET: &str = "webhook-server-cert";
/// Common name of development certificates.
pub const DEV_COMMON_NAME: &str = "kb-dev-controller-manager";

const CONVERT_PATH: &str = "/convert";

/// What to put in a self-signed certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertRequest {
    /// Subject common name.
    pub common_name: String,
    /// Subject alternative names.
    pub hosts: Vec<String>,
    /// Validity.
    pub duration: Duration,
}

impl CertRequest {
    /// Request for the webhook service of `namespace`.
    pub fn for_webhook_service(namespace: &str, duration: Duration) -> Self {
        Self {
            common_name: DEV_COMMON_NAME.to_string(),
            hosts: vec![
                format!("{}.{}.svc", WEBHOOK_SERVICE, namespace),
                format!("{}.{}.svc.cluster.local", WEBHOOK_SERVICE, namespace),
            ],
            duration,
        }
    }
}

/// PEM encoded certificate and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Certificate, PEM.
    pub cert_pem: Vec<u8>,
    /// Private key, PEM.
    pub key_pem: Vec<u8>,
}

/// Creates certificates; the cryptography lives behind this trait.
pub trait CertificateIssuer {
    /// Issues a self-signed certificate.
    fn issue(&self, request: &CertRequest) -> AppResult<Certificate>;
}

/// Injects a development certificate into webhook configurations and
/// conversion CRDs, and emits the TLS Secret holding it.
///
/// Does nothing unless the certificate source is `dev`.
pub struct CertFilter<'a> {
    config: &'a KubebuilderConfigGen,
    issuer: &'a dyn CertificateIssuer,
}

impl<'a> CertFilter<'a> {
    /// Stage using `issuer`.
    pub fn new(config: &'a KubebuilderConfigGen, issuer: &'a dyn CertificateIssuer) -> Self {
        Self { config, issuer }
    }
}

impl Filter for CertFilter<'_> {
    fn name(&self) -> &str {
        "certificates"
    }

    fn filter(&self, mut input: Vec<Node>) -> AppResult<Vec<Node>> {
        let webhooks = &self.config.spec.webhooks;
        if webhooks.certificate_source.source_type != CertificateSourceType::Dev {
            return Ok(input);
        }
        let namespace = self.config.namespace();
        let duration = self
            .config
            .status
            .cert_duration
            .unwrap_or(Duration::from_secs(3600));

        let cert = self
            .issuer
            .issue(&CertRequest::for_webhook_service(namespace, duration))?;
        let ca_bundle = general_purpose::STANDARD.encode(&cert.cert_pem);
        let key = general_purpose::STANDARD.encode(&cert.key_pem);

        let webhook_configs = Selector::new().kinds([
            "ValidatingWebhookConfiguration",
            "MutatingWebhookConfiguration",
        ]);
        for config in webhook_configs.select(&mut input) {
            let Some(entries) = config.get_mut("webhooks").and_then(Node::as_sequence_mut) else {
                continue;
            };
            for entry in entries {
                set_path(entry, &["clientConfig", "caBundle"], ca_bundle.as_str().into())?;
                set_path(
                    entry,
                    &["clientConfig", "service", "namespace"],
                    namespace.into(),
                )?;
            }
        }

        let conversions = Selector::new()
            .kinds(["CustomResourceDefinition"])
            .matching(|n| webhooks.converts(n.name()));
        for crd in conversions.select(&mut input) {
            info!(crd = crd.name(), "wiring conversion webhook");
            set_path(crd, &["spec", "conversion", "strategy"], "Webhook".into())?;
            let client = |leaf: &[&'static str]| {
                let mut path = vec!["spec", "conversion", "webhook", "clientConfig"];
                path.extend_from_slice(leaf);
                path
            };
            set_path(crd, &client(&["caBundle"]), ca_bundle.as_str().into())?;
            set_path(crd, &client(&["service", "name"]), WEBHOOK_SERVICE.into())?;
            set_path(crd, &client(&["service", "namespace"]), namespace.into())?;
            set_path(crd, &client(&["service", "path"]), CONVERT_PATH.into())?;
        }

        input.push(from_json(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "type": "kubernetes.io/tls",
            "metadata": {
                "name": WEBHOOK_CERT_SECRET,
                "namespace": namespace,
            },
            "data": {
                "tls.crt": ca_bundle,
                "tls.key": key,
            },
        }))?);
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configgen::node::{get_path, parse_stream};
    use crate::error::AppError;
    use std::cell::RefCell;
    use std::path::Path;

    struct FakeIssuer {
        requests: RefCell<Vec<CertRequest>>,
    }

    impl CertificateIssuer for FakeIssuer {
        fn issue(&self, request: &CertRequest) -> AppResult<Certificate> {
            self.requests.borrow_mut().push(request.clone());
            Ok(Certificate {
                cert_pem: b"CERT".to_vec(),
                key_pem: b"KEY".to_vec(),
            })
        }
    }

    struct BrokenIssuer;

    impl CertificateIssuer for BrokenIssuer {
        fn issue(&self, _: &CertRequest) -> AppResult<Certificate> {
            Err(AppError::General("openssl not found".into()))
        }
    }

    fn config(source: &str) -> KubebuilderConfigGen {
        let mut cfg = KubebuilderConfigGen::from_yaml(&format!(
            "metadata:\n  name: p\nspec:\n  controllerManager:\n    image: img\n  webhooks:\n    enable: true\n    conversions:\n      bars.example.com: true\n    certificateSource:\n      type: {}\n",
            source
        ))
        .unwrap();
        cfg.default_and_validate(Path::new(".")).unwrap();
        cfg
    }

    fn input() -> Vec<Node> {
        parse_stream("kind: MutatingWebhookConfiguration\nmetadata:\n  name: m\nwebhooks:\n- name: mfoo.kb.io\n  clientConfig:\n    service:\n      name: webhook-service\n      namespace: system\n---\nkind: CustomResourceDefinition\nmetadata:\n  name: bars.example.com\nspec: {}\n---\nkind: CustomResourceDefinition\nmetadata:\n  name: foos.example.com\nspec: {}\n").unwrap()
    }

    #[test]
    fn test_dev_certificate_is_injected() {
        let cfg = config("dev");
        let issuer = FakeIssuer {
            requests: RefCell::new(Vec::new()),
        };
        let out = CertFilter::new(&cfg, &issuer).filter(input()).unwrap();

        let requests = issuer.requests.borrow();
        let req = &requests[0];
        assert_eq!(req.common_name, "kb-dev-controller-manager");
        assert_eq!(
            req.hosts,
            vec![
                "webhook-service.p-system.svc".to_string(),
                "webhook-service.p-system.svc.cluster.local".to_string()
            ]
        );
        assert_eq!(req.duration, Duration::from_secs(3600));

        let hook = &out[0]["webhooks"][0]["clientConfig"];
        assert_eq!(hook["caBundle"].as_str(), Some("Q0VSVA=="));
        assert_eq!(hook["service"]["namespace"].as_str(), Some("p-system"));

        let converted = get_path(&out[1], &["spec", "conversion"]).unwrap();
        assert_eq!(converted["strategy"].as_str(), Some("Webhook"));
        assert_eq!(
            converted["webhook"]["clientConfig"]["service"]["path"].as_str(),
            Some("/convert")
        );
        assert!(get_path(&out[2], &["spec", "conversion"]).is_none());

        let secret = out.last().unwrap();
        assert_eq!(secret.kind(), "Secret");
        assert_eq!(secret["data"]["tls.key"].as_str(), Some("S0VZ"));
    }

    #[test]
    fn test_other_sources_pass_through() {
        let cfg = config("certManager");
        let out = CertFilter::new(&cfg, &BrokenIssuer).filter(input()).unwrap();
        assert_eq!(out, input());
    }

    #[test]
    fn test_issuer_error_propagates() {
        let cfg = config("dev");
        let err = CertFilter::new(&cfg, &BrokenIssuer).filter(input()).unwrap_err();
        assert!(matches!(err, AppError::General(ref m) if m == "openssl not found"));
    }
}
