use crate::error::AppResult;
use crate::machinery::{CodeFragments, IfExistsAction, Inserter, Marker, Template, Universe};
use crate::webhook::resource::Resource;
use std::path::PathBuf;

/// Minimal webhook file: a setup function whose builder chain ends with
/// `Complete()`. Defaulter and validator types are patched in afterwards.
#[derive(Debug, Clone)]
pub struct WebhookSkeleton<'a> {
    /// Resource the webhook serves.
    pub resource: &'a Resource,
}

impl Template for WebhookSkeleton<'_> {
    fn path(&self) -> PathBuf {
        self.resource.webhook_path()
    }

    fn if_exists_action(&self) -> IfExistsAction {
        IfExistsAction::Skip
    }

    fn validate(&self) -> AppResult<()> {
        self.resource.validate()
    }

    fn body(&self, universe: &Universe) -> AppResult<String> {
        let r = self.resource;
        Ok(format!(
            r#"{boilerplate}package {package}

import (
	ctrl "sigs.k8s.io/controller-runtime"
	logf "sigs.k8s.io/controller-runtime/pkg/log"

	{alias} "{import_path}"
)

// nolint:unused
// log is for logging in this package.
var {lower}log = logf.Log.WithName("{lower}-resource")

// Setup{kind}WebhookWithManager registers the webhook for {kind} in the manager.
func Setup{kind}WebhookWithManager(mgr ctrl.Manager) error {{
	return ctrl.NewWebhookManagedBy(mgr).
		For(&{alias}.{kind}{{}}).
		Complete()
}}
"#,
            boilerplate = universe.boilerplate,
            package = r.webhook_package(),
            alias = r.import_alias(),
            import_path = r.package_path(),
            lower = r.kind_lower(),
            kind = r.kind,
        ))
    }
}

/// Minimal Ginkgo suite for a webhook, with the anchors the suite patcher uses.
#[derive(Debug, Clone)]
pub struct WebhookSuiteSkeleton<'a> {
    /// Resource the webhook serves.
    pub resource: &'a Resource,
}

impl Template for WebhookSuiteSkeleton<'_> {
    fn path(&self) -> PathBuf {
        self.resource.webhook_test_path()
    }

    fn if_exists_action(&self) -> IfExistsAction {
        IfExistsAction::Skip
    }

    fn body(&self, universe: &Universe) -> AppResult<String> {
        let r = self.resource;
        Ok(format!(
            r#"{boilerplate}package {package}

import (
	. "github.com/onsi/ginkgo/v2"
	. "github.com/onsi/gomega"

	{alias} "{import_path}"
)

var _ = Describe("{kind} Webhook", func() {{
	var (
		obj    *{alias}.{kind}
		oldObj *{alias}.{kind}
	)

	BeforeEach(func() {{
		obj = &{alias}.{kind}{{}}
		oldObj = &{alias}.{kind}{{}}
		Expect(oldObj).NotTo(BeNil(), "Expected oldObj to be initialized")
		Expect(obj).NotTo(BeNil(), "Expected obj to be initialized")
	}})

	AfterEach(func() {{
	}})
}})
"#,
            boilerplate = universe.boilerplate,
            package = r.webhook_package(),
            alias = r.import_alias(),
            import_path = r.package_path(),
            kind = r.kind,
        ))
    }
}

const MAIN_PATH: &str = "cmd/main.go";

/// Registers the webhook package and its setup call in `cmd/main.go`.
#[derive(Debug, Clone)]
pub struct MainWebhookInserter<'a> {
    /// Resource the webhook serves.
    pub resource: &'a Resource,
}

impl Inserter for MainWebhookInserter<'_> {
    fn path(&self) -> PathBuf {
        PathBuf::from(MAIN_PATH)
    }

    fn markers(&self) -> Vec<Marker> {
        vec![
            Marker::kubebuilder(MAIN_PATH, "imports"),
            Marker::kubebuilder(MAIN_PATH, "webhook"),
        ]
    }

    fn code_fragments(&self) -> CodeFragments {
        let r = self.resource;
        let alias = r.webhook_import_alias();
        let mut fragments = CodeFragments::new();
        fragments.push(
            Marker::kubebuilder(MAIN_PATH, "imports"),
            format!("{} \"{}\"", alias, r.webhook_import_path()),
        );
        fragments.push(
            Marker::kubebuilder(MAIN_PATH, "webhook"),
            format!(
                "// nolint:goconst\nif os.Getenv(\"ENABLE_WEBHOOKS\") != \"false\" {{\n\tif err := {alias}.Setup{kind}WebhookWithManager(mgr); err != nil {{\n\t\tsetupLog.Error(err, \"Failed to create webhook\", \"webhook\", \"{kind}\")\n\t\tos.Exit(1)\n\t}}\n}}\n",
                alias = alias,
                kind = r.kind,
            ),
        );
        fragments
    }
}
