use crate::configgen::cert::{WEBHOOK_CERT_SECRET, WEBHOOK_SERVICE};
use crate::configgen::filter::Filter;
use crate::configgen::node::{from_json, Node};
use crate::configgen::types::{CertificateSourceType, KubebuilderConfigGen};
use crate::error::AppResult;
use serde_json::{json, Value};
use tracing::debug;

/// Name of the controller-manager Deployment and ServiceAccount.
pub const CONTROLLER_MANAGER: &str = "controller-manager";
/// Name of the ConfigMap holding the component config.
pub const MANAGER_CONFIG: &str = "manager-config";
/// Label selecting the controller-manager pods.
pub const CONTROL_PLANE_LABEL: &str = "control-plane";

const AUTH_PROXY_IMAGE: &str = "gcr.io/kubebuilder/kube-rbac-proxy:v0.8.0";
const SERVING_CERT: &str = "serving-cert";
const SELFSIGNED_ISSUER: &str = "selfsigned-issuer";

/// Appends the resources every project needs besides the generated ones:
/// namespace, controller-manager, RBAC for leader election, services and
/// optional monitoring, component config and cert-manager resources.
pub struct ResourceFilter<'a> {
    config: &'a KubebuilderConfigGen,
}

impl<'a> ResourceFilter<'a> {
    /// Stage for `config`.
    pub fn new(config: &'a KubebuilderConfigGen) -> Self {
        Self { config }
    }

    fn metadata(&self, name: &str, namespaced: bool) -> Value {
        let mut labels = json!({ CONTROL_PLANE_LABEL: CONTROLLER_MANAGER });
        if let Some(map) = labels.as_object_mut() {
            for (k, v) in &self.config.metadata.labels {
                map.insert(k.clone(), json!(v));
            }
        }
        let mut meta = json!({ "name": name, "labels": labels });
        if namespaced {
            meta["namespace"] = json!(self.config.namespace());
        }
        if !self.config.metadata.annotations.is_empty() {
            meta["annotations"] = json!(self.config.metadata.annotations);
        }
        meta
    }

    fn manager_container(&self) -> Value {
        let cm = &self.config.spec.controller_manager;
        let mut args = vec![json!("--health-probe-bind-address=:8081")];
        if cm.metrics.disable_auth_proxy {
            args.push(json!("--metrics-bind-address=:8080"));
        } else {
            args.push(json!("--metrics-bind-address=127.0.0.1:8080"));
        }
        if !cm.component_config.enable {
            args.push(json!("--leader-elect"));
        }
        let probe = |path: &str, delay: u32| {
            json!({
                "httpGet": { "path": path, "port": 8081 },
                "initialDelaySeconds": delay,
                "periodSeconds": if delay > 5 { 20 } else { 10 },
            })
        };
        json!({
            "name": "manager",
            "image": cm.image,
            "command": ["/manager"],
            "args": args,
            "securityContext": { "allowPrivilegeEscalation": false },
            "livenessProbe": probe("/healthz", 15),
            "readinessProbe": probe("/readyz", 5),
            "resources": {
                "limits": { "cpu": "100m", "memory": "30Mi" },
                "requests": { "cpu": "100m", "memory": "20Mi" },
            },
        })
    }

    fn deployment(&self) -> Value {
        let mut containers = vec![self.manager_container()];
        if !self.config.spec.controller_manager.metrics.disable_auth_proxy {
            containers.insert(
                0,
                json!({
                    "name": "kube-rbac-proxy",
                    "image": AUTH_PROXY_IMAGE,
                    "args": [
                        "--secure-listen-address=0.0.0.0:8443",
                        "--upstream=http://127.0.0.1:8080/",
                        "--logtostderr=true",
                        "--v=10",
                    ],
                    "ports": [{ "containerPort": 8443, "name": "https" }],
                }),
            );
        }
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": self.metadata(CONTROLLER_MANAGER, true),
            "spec": {
                "replicas": 1,
                "selector": { "matchLabels": { CONTROL_PLANE_LABEL: CONTROLLER_MANAGER } },
                "template": {
                    "metadata": { "labels": { CONTROL_PLANE_LABEL: CONTROLLER_MANAGER } },
                    "spec": {
                        "serviceAccountName": CONTROLLER_MANAGER,
                        "securityContext": { "runAsNonRoot": true },
                        "terminationGracePeriodSeconds": 10,
                        "containers": containers,
                    },
                },
            },
        })
    }

    fn rbac(&self) -> Vec<Value> {
        let subject = json!([{
            "kind": "ServiceAccount",
            "name": CONTROLLER_MANAGER,
            "namespace": self.config.namespace(),
        }]);
        let mut resources = vec![
            json!({
                "apiVersion": "rbac.authorization.k8s.io/v1",
                "kind": "Role",
                "metadata": self.metadata("leader-election-role", true),
                "rules": [
                    {
                        "apiGroups": ["", "coordination.k8s.io"],
                        "resources": ["configmaps", "leases"],
                        "verbs": ["get", "list", "watch", "create", "update", "patch", "delete"],
                    },
                    {
                        "apiGroups": [""],
                        "resources": ["events"],
                        "verbs": ["create", "patch"],
                    },
                ],
            }),
            json!({
                "apiVersion": "rbac.authorization.k8s.io/v1",
                "kind": "RoleBinding",
                "metadata": self.metadata("leader-election-rolebinding", true),
                "roleRef": {
                    "apiGroup": "rbac.authorization.k8s.io",
                    "kind": "Role",
                    "name": "leader-election-role",
                },
                "subjects": subject,
            }),
            json!({
                "apiVersion": "rbac.authorization.k8s.io/v1",
                "kind": "ClusterRoleBinding",
                "metadata": self.metadata("manager-rolebinding", false),
                "roleRef": {
                    "apiGroup": "rbac.authorization.k8s.io",
                    "kind": "ClusterRole",
                    "name": "manager-role",
                },
                "subjects": subject,
            }),
        ];
        if !self.config.spec.controller_manager.metrics.disable_auth_proxy {
            resources.push(json!({
                "apiVersion": "rbac.authorization.k8s.io/v1",
                "kind": "ClusterRole",
                "metadata": self.metadata("proxy-role", false),
                "rules": [
                    {
                        "apiGroups": ["authentication.k8s.io"],
                        "resources": ["tokenreviews"],
                        "verbs": ["create"],
                    },
                    {
                        "apiGroups": ["authorization.k8s.io"],
                        "resources": ["subjectaccessreviews"],
                        "verbs": ["create"],
                    },
                ],
            }));
            resources.push(json!({
                "apiVersion": "rbac.authorization.k8s.io/v1",
                "kind": "ClusterRoleBinding",
                "metadata": self.metadata("proxy-rolebinding", false),
                "roleRef": {
                    "apiGroup": "rbac.authorization.k8s.io",
                    "kind": "ClusterRole",
                    "name": "proxy-role",
                },
                "subjects": subject,
            }));
        }
        resources
    }

    fn metrics_service(&self) -> Value {
        let port = if self.config.spec.controller_manager.metrics.disable_auth_proxy {
            json!({ "name": "http", "port": 8080, "targetPort": 8080 })
        } else {
            json!({ "name": "https", "port": 8443, "targetPort": "https" })
        };
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": self.metadata("controller-manager-metrics-service", true),
            "spec": {
                "ports": [port],
                "selector": { CONTROL_PLANE_LABEL: CONTROLLER_MANAGER },
            },
        })
    }

    fn service_monitor(&self) -> Value {
        let disable_proxy = self.config.spec.controller_manager.metrics.disable_auth_proxy;
        let mut endpoint = json!({ "path": "/metrics", "port": if disable_proxy { "http" } else { "https" } });
        if !disable_proxy {
            merge_json(
                &mut endpoint,
                json!({
                    "scheme": "https",
                    "bearerTokenFile": "/var/run/secrets/kubernetes.io/serviceaccount/token",
                    "tlsConfig": { "insecureSkipVerify": true },
                }),
            );
        }
        json!({
            "apiVersion": "monitoring.coreos.com/v1",
            "kind": "ServiceMonitor",
            "metadata": self.metadata("controller-manager-metrics-monitor", true),
            "spec": {
                "endpoints": [endpoint],
                "selector": { "matchLabels": { CONTROL_PLANE_LABEL: CONTROLLER_MANAGER } },
            },
        })
    }

    fn webhook_service(&self) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": self.metadata(WEBHOOK_SERVICE, true),
            "spec": {
                "ports": [{ "port": 443, "protocol": "TCP", "targetPort": 9443 }],
                "selector": { CONTROL_PLANE_LABEL: CONTROLLER_MANAGER },
            },
        })
    }

    fn cert_manager(&self) -> Vec<Value> {
        let ns = self.config.namespace();
        vec![
            json!({
                "apiVersion": "cert-manager.io/v1",
                "kind": "Issuer",
                "metadata": self.metadata(SELFSIGNED_ISSUER, true),
                "spec": { "selfSigned": {} },
            }),
            json!({
                "apiVersion": "cert-manager.io/v1",
                "kind": "Certificate",
                "metadata": self.metadata(SERVING_CERT, true),
                "spec": {
                    "dnsNames": [
                        format!("{}.{}.svc", WEBHOOK_SERVICE, ns),
                        format!("{}.{}.svc.cluster.local", WEBHOOK_SERVICE, ns),
                    ],
                    "issuerRef": { "kind": "Issuer", "name": SELFSIGNED_ISSUER },
                    "secretName": WEBHOOK_CERT_SECRET,
                },
            }),
        ]
    }
}

fn merge_json(target: &mut Value, patch: Value) {
    if let (Some(t), Value::Object(p)) = (target.as_object_mut(), patch) {
        t.extend(p);
    }
}

/// `namespace/name` of the cert-manager Certificate, as referenced by CA
/// injection annotations.
pub fn serving_cert_ref(config: &KubebuilderConfigGen) -> String {
    format!("{}/{}", config.namespace(), SERVING_CERT)
}

impl Filter for ResourceFilter<'_> {
    fn name(&self) -> &str {
        "resources"
    }

    fn filter(&self, mut input: Vec<Node>) -> AppResult<Vec<Node>> {
        let spec = &self.config.spec;
        let mut resources = vec![
            json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": self.metadata(self.config.namespace(), false),
            }),
            json!({
                "apiVersion": "v1",
                "kind": "ServiceAccount",
                "metadata": self.metadata(CONTROLLER_MANAGER, true),
            }),
            self.deployment(),
            self.metrics_service(),
        ];
        resources.extend(self.rbac());

        if spec.controller_manager.metrics.enable_service_monitor {
            resources.push(self.service_monitor());
        }
        if spec.controller_manager.component_config.enable {
            resources.push(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": self.metadata(MANAGER_CONFIG, true),
                "data": {},
            }));
        }
        if spec.webhooks.enable {
            resources.push(self.webhook_service());
            if spec.webhooks.certificate_source.source_type == CertificateSourceType::CertManager {
                resources.extend(self.cert_manager());
            }
        }

        debug!(count = resources.len(), "adding built-in resources");
        for resource in resources {
            input.push(from_json(resource)?);
        }
        Ok(input)
    }
}
