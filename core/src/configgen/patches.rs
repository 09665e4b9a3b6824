use crate::configgen::cert::{WEBHOOK_CERT_SECRET, WEBHOOK_SERVICE};
use crate::configgen::filter::Filter;
use crate::configgen::node::{
    append_unique, find_named_mut, from_json, merge_patch, set_path, Node, ResourceExt,
};
use crate::configgen::resources::{serving_cert_ref, CONTROLLER_MANAGER, CONTROL_PLANE_LABEL};
use crate::configgen::selector::Selector;
use crate::configgen::types::{CertificateSourceType, KubebuilderConfigGen};
use crate::error::AppResult;
use serde_json::json;
use tracing::debug;

type PatchFn<'a> = Box<dyn Fn(&mut Node) -> AppResult<()> + 'a>;

const WEBHOOK_PORT: u16 = 9443;
const CERT_MOUNT_PATH: &str = "/tmp/k8s-webhook-server/serving-certs";
pub(crate) const CONTAINERS: [&str; 4] = ["spec", "template", "spec", "containers"];
pub(crate) const VOLUMES: [&str; 4] = ["spec", "template", "spec", "volumes"];

/// How a template changes the resources it selects.
pub enum PatchAction<'a> {
    /// Merge a partial document.
    Merge(Node),
    /// Run a function on each selected resource.
    Apply(PatchFn<'a>),
}

/// A patch applied to every resource matched by its selector.
pub struct PatchTemplate<'a> {
    /// Which resources to patch.
    pub selector: Selector<'a>,
    /// What to do with them.
    pub action: PatchAction<'a>,
}

impl<'a> PatchTemplate<'a> {
    /// Merge `patch` into selected resources.
    pub fn merge(selector: Selector<'a>, patch: Node) -> Self {
        Self {
            selector,
            action: PatchAction::Merge(patch),
        }
    }

    /// Run `f` on selected resources.
    pub fn apply(selector: Selector<'a>, f: impl Fn(&mut Node) -> AppResult<()> + 'a) -> Self {
        Self {
            selector,
            action: PatchAction::Apply(Box::new(f)),
        }
    }

    /// A user supplied patch document, selected by its own kind, name and
    /// namespace.
    pub fn from_document(patch: Node) -> Self {
        let mut selector = Selector::new()
            .kinds([patch.kind().to_string()])
            .names([patch.name().to_string()]);
        if !patch.namespace().is_empty() {
            selector = selector.namespaces([patch.namespace().to_string()]);
        }
        Self::merge(selector, patch)
    }

    fn run(&self, nodes: &mut [Node]) -> AppResult<usize> {
        let mut count = 0;
        for node in self.selector.select(nodes) {
            match &self.action {
                PatchAction::Merge(patch) => merge_patch(node, patch),
                PatchAction::Apply(f) => f(node)?,
            }
            count += 1;
        }
        Ok(count)
    }
}

/// Patches for the resources produced by the generator and built-in stages.
pub fn builtin_patches(config: &KubebuilderConfigGen) -> AppResult<Vec<PatchTemplate<'_>>> {
    let namespace = config.namespace();
    let webhooks = &config.spec.webhooks;
    let cert_manager = webhooks.certificate_source.source_type == CertificateSourceType::CertManager;
    let mut patches = Vec::new();

    patches.push(PatchTemplate::merge(
        Selector::new()
            .kinds(["CustomResourceDefinition"])
            .matching(move |n| webhooks.converts(n.name())),
        from_json(json!({
            "spec": {
                "conversion": {
                    "strategy": "Webhook",
                    "webhook": {
                        "conversionReviewVersions": ["v1"],
                        "clientConfig": {
                            "service": {
                                "name": WEBHOOK_SERVICE,
                                "namespace": namespace,
                                "path": "/convert",
                            },
                        },
                    },
                },
            },
        }))?,
    ));

    if webhooks.enable {
        patches.push(PatchTemplate::apply(
            Selector::new()
                .kinds(["Deployment"])
                .names([CONTROLLER_MANAGER])
                .namespaces([namespace])
                .label(CONTROL_PLANE_LABEL, CONTROLLER_MANAGER),
            mount_webhook_cert,
        ));
        patches.push(PatchTemplate::apply(
            Selector::new().kinds([
                "ValidatingWebhookConfiguration",
                "MutatingWebhookConfiguration",
            ]),
            move |node| {
                let Some(entries) = node.get_mut("webhooks").and_then(Node::as_sequence_mut) else {
                    return Ok(());
                };
                for entry in entries {
                    set_path(entry, &["clientConfig", "service", "namespace"], namespace.into())?;
                }
                Ok(())
            },
        ));
    }

    if cert_manager {
        let annotation = from_json(json!({
            "metadata": {
                "annotations": { "cert-manager.io/inject-ca-from": serving_cert_ref(config) },
            },
        }))?;
        patches.push(PatchTemplate::merge(
            Selector::new()
                .kinds([
                    "CustomResourceDefinition",
                    "ValidatingWebhookConfiguration",
                    "MutatingWebhookConfiguration",
                ])
                .matching(move |n| {
                    n.kind() != "CustomResourceDefinition" || webhooks.converts(n.name())
                }),
            annotation,
        ));
    }

    Ok(patches)
}

fn mount_webhook_cert(deployment: &mut Node) -> AppResult<()> {
    if let Some(manager) = find_named_mut(deployment, &CONTAINERS, "manager") {
        append_unique(
            manager,
            &["ports"],
            from_json(json!({
                "containerPort": WEBHOOK_PORT,
                "name": "webhook-server",
                "protocol": "TCP",
            }))?,
        )?;
        append_unique(
            manager,
            &["volumeMounts"],
            from_json(json!({
                "mountPath": CERT_MOUNT_PATH,
                "name": "cert",
                "readOnly": true,
            }))?,
        )?;
    }
    append_unique(
        deployment,
        &VOLUMES,
        from_json(json!({
            "name": "cert",
            "secret": { "defaultMode": 420, "secretName": WEBHOOK_CERT_SECRET },
        }))?,
    )
}

/// Applies patch templates in order.
pub struct PatchFilter<'a> {
    templates: Vec<PatchTemplate<'a>>,
}

impl<'a> PatchFilter<'a> {
    /// Stage applying `templates`.
    pub fn new(templates: Vec<PatchTemplate<'a>>) -> Self {
        Self { templates }
    }
}

impl Filter for PatchFilter<'_> {
    fn name(&self) -> &str {
        "patches"
    }

    fn filter(&self, mut input: Vec<Node>) -> AppResult<Vec<Node>> {
        for (i, template) in self.templates.iter().enumerate() {
            let patched = template.run(&mut input)?;
            debug!(template = i, patched, "applied patch template");
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configgen::node::{get_path, parse_stream};
    use crate::configgen::resources::ResourceFilter;
    use std::path::Path;

    fn config(webhooks: &str) -> KubebuilderConfigGen {
        let mut cfg = KubebuilderConfigGen::from_yaml(&format!(
            "metadata:\n  name: p\nspec:\n  controllerManager:\n    image: img\n{}",
            webhooks
        ))
        .unwrap();
        cfg.default_and_validate(Path::new(".")).unwrap();
        cfg
    }

    #[test]
    fn test_user_patch_selects_by_identity() {
        let mut nodes = parse_stream(
            "kind: Deployment\nmetadata:\n  name: a\n  namespace: ns\nspec:\n  replicas: 1\n---\nkind: Deployment\nmetadata:\n  name: b\n  namespace: ns\nspec:\n  replicas: 1\n",
        )
        .unwrap();
        let patch = parse_stream("kind: Deployment\nmetadata:\n  name: b\n  namespace: ns\nspec:\n  replicas: 3\n")
            .unwrap()
            .remove(0);
        let filter = PatchFilter::new(vec![PatchTemplate::from_document(patch)]);
        nodes = filter.filter(nodes).unwrap();
        assert_eq!(nodes[0]["spec"]["replicas"].as_u64(), Some(1));
        assert_eq!(nodes[1]["spec"]["replicas"].as_u64(), Some(3));
    }

    #[test]
    fn test_webhook_patches_on_builtin_deployment() {
        let cfg = config("  webhooks:\n    enable: true\n    conversions:\n      bars.example.com: true\n    certificateSource:\n      type: certManager\n");
        let mut nodes = ResourceFilter::new(&cfg).filter(vec![]).unwrap();
        nodes.extend(
            parse_stream("kind: CustomResourceDefinition\nmetadata:\n  name: bars.example.com\n---\nkind: CustomResourceDefinition\nmetadata:\n  name: foos.example.com\n---\nkind: ValidatingWebhookConfiguration\nmetadata:\n  name: v\nwebhooks:\n- name: vbar.kb.io\n  clientConfig:\n    service:\n      namespace: system\n").unwrap(),
        );

        let filter = PatchFilter::new(builtin_patches(&cfg).unwrap());
        let out = filter.filter(nodes).unwrap();

        let deploy = out.iter().find(|n| n.kind() == "Deployment").unwrap();
        let pod = &deploy["spec"]["template"]["spec"];
        assert_eq!(pod["volumes"][0]["secret"]["secretName"].as_str(), Some("webhook-server-cert"));
        let manager = pod["containers"]
            .as_sequence()
            .unwrap()
            .iter()
            .find(|c| c["name"].as_str() == Some("manager"))
            .unwrap();
        assert_eq!(manager["ports"][0]["containerPort"].as_u64(), Some(9443));

        let bars = out.iter().find(|n| n.name() == "bars.example.com").unwrap();
        assert_eq!(
            get_path(bars, &["spec", "conversion", "strategy"]).and_then(Node::as_str),
            Some("Webhook")
        );
        assert_eq!(
            bars["metadata"]["annotations"]["cert-manager.io/inject-ca-from"].as_str(),
            Some("p-system/serving-cert")
        );
        let foos = out.iter().find(|n| n.name() == "foos.example.com").unwrap();
        assert!(get_path(foos, &["spec", "conversion"]).is_none());
        assert!(get_path(foos, &["metadata", "annotations"]).is_none());

        let hook = out
            .iter()
            .find(|n| n.kind() == "ValidatingWebhookConfiguration")
            .unwrap();
        assert_eq!(
            hook["webhooks"][0]["clientConfig"]["service"]["namespace"].as_str(),
            Some("p-system")
        );
    }

    #[test]
    fn test_patching_twice_is_stable() {
        let cfg = config("  webhooks:\n    enable: true\n");
        let nodes = ResourceFilter::new(&cfg).filter(vec![]).unwrap();
        let once = PatchFilter::new(builtin_patches(&cfg).unwrap())
            .filter(nodes)
            .unwrap();
        let twice = PatchFilter::new(builtin_patches(&cfg).unwrap())
            .filter(once.clone())
            .unwrap();
        assert_eq!(once, twice);
    }
}
