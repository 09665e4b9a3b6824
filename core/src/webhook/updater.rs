use crate::error::AppResult;
use crate::patcher::{
    patch_suite, struct_signature, Declaration, Import, PartialResult, RequiredImport,
    StructuralPatcher, SuiteAddition, Wiring,
};
use crate::webhook::resource::Resource;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ADMISSION_IMPORT: &str = "sigs.k8s.io/controller-runtime/pkg/webhook/admission";
const WEBHOOK_IMPORT: &str = "sigs.k8s.io/controller-runtime/pkg/webhook";
const ADMISSION_REVIEW_VERSIONS: &str = "v1";

/// Which webhooks to add for a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookOptions {
    /// Mutating (defaulting) webhook.
    pub defaulting: bool,
    /// Validating webhook.
    pub validation: bool,
    /// Conversion webhook.
    pub conversion: bool,
    /// Overrides the default mutating path.
    pub defaulting_path: Option<String>,
    /// Overrides the default validating path.
    pub validation_path: Option<String>,
}

fn context_import() -> RequiredImport {
    RequiredImport {
        import: Import::new("context"),
        after: None,
    }
}

/// Declarations that turn a webhook skeleton into a defaulting and/or
/// validating webhook.
pub fn webhook_declarations(resource: &Resource, options: &WebhookOptions) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    if options.defaulting {
        declarations.push(defaulter_declaration(resource, options));
    }
    if options.validation {
        declarations.push(validator_declaration(resource, options));
    }
    declarations
}

fn defaulter_declaration(r: &Resource, options: &WebhookOptions) -> Declaration {
    let kind = &r.kind;
    let lower = r.kind_lower();
    let ty = format!("{}CustomDefaulter", kind);
    let path = options
        .defaulting_path
        .clone()
        .unwrap_or_else(|| r.defaulting_path());

    let mut wiring = format!("\t\tWithDefaulter(&{}{{}}).", ty);
    if let Some(custom) = &options.defaulting_path {
        wiring.push_str(&format!("\n\t\tWithDefaulterCustomPath(\"{}\").", custom));
    }
    wiring.push('\n');

    let code = format!(
        r#"
// +kubebuilder:webhook:path={path},mutating=true,failurePolicy=fail,sideEffects=None,groups={groups},resources={plural},verbs=create;update,versions={version},name=m{lower}-{version}.kb.io,admissionReviewVersions={arv}

// {ty} struct is responsible for setting default values on the custom resource of the
// Kind {kind} when those are created or updated.
type {ty} struct {{
	// TODO(user): Add more fields as needed for defaulting
}}

// Default implements webhook.CustomDefaulter so a webhook will be registered for the Kind {kind}.
func (d *{ty}) Default(_ context.Context, obj *{alias}.{kind}) error {{
	{lower}log.Info("Defaulting for {kind}", "name", obj.GetName())

	// TODO(user): fill in your defaulting logic.

	return nil
}}
"#,
        path = path,
        groups = r.group_value(),
        plural = r.plural,
        version = r.version,
        lower = lower,
        arv = ADMISSION_REVIEW_VERSIONS,
        ty = ty,
        kind = kind,
        alias = r.import_alias(),
    );

    Declaration {
        name: ty.clone(),
        signature: struct_signature(&ty),
        code,
        wiring: Some(Wiring {
            guard: format!("WithDefaulter(&{}{{}})", ty),
            code: wiring,
        }),
        imports: vec![context_import()],
    }
}

fn validator_declaration(r: &Resource, options: &WebhookOptions) -> Declaration {
    let kind = &r.kind;
    let lower = r.kind_lower();
    let ty = format!("{}CustomValidator", kind);
    let alias = r.import_alias();
    let path = options
        .validation_path
        .clone()
        .unwrap_or_else(|| r.validation_path());

    let mut wiring = format!("\t\tWithValidator(&{}{{}}).", ty);
    if let Some(custom) = &options.validation_path {
        wiring.push_str(&format!("\n\t\tWithValidatorCustomPath(\"{}\").", custom));
    }
    wiring.push('\n');

    let mut code = format!(
        r#"
// +kubebuilder:webhook:path={path},mutating=false,failurePolicy=fail,sideEffects=None,groups={groups},resources={plural},verbs=create;update,versions={version},name=v{lower}-{version}.kb.io,admissionReviewVersions={arv}

// {ty} struct is responsible for validating the {kind} resource
// when it is created, updated, or deleted.
type {ty} struct {{
	// TODO(user): Add more fields as needed for validation
}}
"#,
        path = path,
        groups = r.group_value(),
        plural = r.plural,
        version = r.version,
        lower = lower,
        arv = ADMISSION_REVIEW_VERSIONS,
        ty = ty,
        kind = kind,
    );

    for (method, params, subject, moment) in [
        ("ValidateCreate", "obj", "obj", "creation"),
        ("ValidateUpdate", "oldObj, newObj", "newObj", "update"),
        ("ValidateDelete", "obj", "obj", "deletion"),
    ] {
        code.push_str(&format!(
            r#"
// {method} implements webhook.CustomValidator so a webhook will be registered for the type {kind}.
func (v *{ty}) {method}(_ context.Context, {params} *{alias}.{kind}) (admission.Warnings, error) {{
	{lower}log.Info("Validation for {kind} upon {moment}", "name", {subject}.GetName())

	// TODO(user): fill in your validation logic upon object {moment}.

	return nil, nil
}}
"#
        ));
    }

    Declaration {
        name: ty.clone(),
        signature: struct_signature(&ty),
        code,
        wiring: Some(Wiring {
            guard: format!("WithValidator(&{}{{}})", ty),
            code: wiring,
        }),
        imports: vec![
            context_import(),
            RequiredImport {
                import: Import::new(ADMISSION_IMPORT),
                after: Some(WEBHOOK_IMPORT.to_string()),
            },
        ],
    }
}

/// Additions for the webhook test suite of `resource`.
pub fn suite_additions(resource: &Resource, options: &WebhookOptions) -> Vec<SuiteAddition> {
    let kind = &resource.kind;
    let mut additions = Vec::new();

    for (enabled, var, ty, title, body) in [
        (
            options.validation,
            "validator",
            format!("{}CustomValidator", kind),
            format!("When creating or updating {} under Validating Webhook", kind),
            "\t\t// TODO (user): Add logic for validating webhooks\n\t\t// Example:\n\t\t// It(\"Should deny creation if a required field is missing\", func() {\n\t\t//     obj.SomeRequiredField = \"\"\n\t\t//     Expect(validator.ValidateCreate(ctx, obj)).Error().To(HaveOccurred())\n\t\t// })\n",
        ),
        (
            options.defaulting,
            "defaulter",
            format!("{}CustomDefaulter", kind),
            format!("When creating {} under Defaulting Webhook", kind),
            "\t\t// TODO (user): Add logic for defaulting webhooks\n\t\t// Example:\n\t\t// It(\"Should apply defaults when a required field is empty\", func() {\n\t\t//     obj.SomeFieldWithDefault = \"\"\n\t\t//     defaulter.Default(ctx, obj)\n\t\t//     Expect(obj.SomeFieldWithDefault).To(Equal(\"default_value\"))\n\t\t// })\n",
        ),
    ] {
        if !enabled {
            continue;
        }
        additions.push(SuiteAddition {
            name: ty.clone(),
            guard: format!("{} {}", var, ty),
            variable: Some(format!("{} {}", var, ty)),
            init: vec![
                format!("{} = {}{{}}", var, ty),
                format!(
                    "Expect({}).NotTo(BeNil(), \"Expected {} to be initialized\")",
                    var, var
                ),
            ],
            context: Some(format!(
                "\n\tContext(\"{}\", func() {{\n{}\t}})\n",
                title, body
            )),
        });
    }

    if options.conversion {
        additions.push(SuiteAddition {
            name: format!("{} conversion", kind),
            guard: "Conversion Webhook".into(),
            variable: None,
            init: Vec::new(),
            context: Some(format!(
                "\n\tContext(\"When creating {kind} under Conversion Webhook\", func() {{\n\t\t// TODO (user): Add logic to convert the object to the desired version and verify the conversion\n\t\t// Example:\n\t\t// It(\"Should convert the object correctly\", func() {{\n\t\t//     convertedObj := &{alias}.{kind}{{}}\n\t\t//     Expect(obj.ConvertTo(convertedObj)).To(Succeed())\n\t\t// }})\n\t}})\n",
                kind = kind,
                alias = resource.import_alias(),
            )),
        });
    }
    additions
}

/// Outcome of patching one webhook file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// What was applied, skipped or left to the user.
    pub result: PartialResult,
}

/// Patches the webhook and webhook test files of `resource` under `root`.
///
/// Both files are optional: an unreadable file is skipped with a warning.
/// Files are only rewritten when a step changed them.
pub fn apply_webhook_patches(
    root: &Path,
    resource: &Resource,
    options: &WebhookOptions,
) -> AppResult<Vec<FilePatch>> {
    let mut patches = Vec::new();

    let webhook_path = resource.webhook_path();
    if let Some(content) = read_optional(root, &webhook_path) {
        let declarations = webhook_declarations(resource, options);
        let result = StructuralPatcher::new().patch(&content, &declarations)?;
        persist(root, &webhook_path, &result)?;
        patches.push(FilePatch {
            path: webhook_path,
            result,
        });
    }

    let test_path = resource.webhook_test_path();
    if let Some(content) = read_optional(root, &test_path) {
        let result = patch_suite(&content, &suite_additions(resource, options))?;
        persist(root, &test_path, &result)?;
        patches.push(FilePatch {
            path: test_path,
            result,
        });
    }

    Ok(patches)
}

fn read_optional(root: &Path, path: &Path) -> Option<String> {
    match fs::read_to_string(root.join(path)) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "unable to read file, skipping update");
            None
        }
    }
}

fn persist(root: &Path, path: &Path, result: &PartialResult) -> AppResult<()> {
    if result.is_modified() {
        debug!(file = %path.display(), steps = result.applied.len(), "writing patched file");
        fs::write(root.join(path), &result.content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frigate() -> Resource {
        Resource {
            domain: "testproject.org".into(),
            repo: "example.com/project".into(),
            ..Resource::new("ship", "v1", "Frigate")
        }
    }

    fn both() -> WebhookOptions {
        WebhookOptions {
            defaulting: true,
            validation: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_declarations_for_options() {
        let decls = webhook_declarations(&frigate(), &both());
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].name, "FrigateCustomDefaulter");
        assert!(decls[0]
            .code
            .contains("path=/mutate-ship-testproject-org-v1-frigate,mutating=true"));
        assert!(decls[0].code.contains("name=mfrigate-v1.kb.io"));
        assert!(decls[1].code.contains("name=vfrigate-v1.kb.io"));
        assert!(decls[1].code.contains("func (v *FrigateCustomValidator) ValidateUpdate(_ context.Context, oldObj, newObj *shipv1.Frigate)"));
        assert_eq!(decls[1].imports[1].import.path, ADMISSION_IMPORT);
    }

    #[test]
    fn test_custom_path_wiring() {
        let opts = WebhookOptions {
            defaulting: true,
            defaulting_path: Some("/custom-mutate".into()),
            ..Default::default()
        };
        let decls = webhook_declarations(&frigate(), &opts);
        let wiring = decls[0].wiring.as_ref().unwrap();
        assert_eq!(
            wiring.code,
            "\t\tWithDefaulter(&FrigateCustomDefaulter{}).\n\t\tWithDefaulterCustomPath(\"/custom-mutate\").\n"
        );
        assert!(decls[0].code.contains("path=/custom-mutate,"));
    }

    #[test]
    fn test_suite_additions() {
        let opts = WebhookOptions {
            conversion: true,
            ..both()
        };
        let adds = suite_additions(&frigate(), &opts);
        assert_eq!(adds.len(), 3);
        assert_eq!(adds[0].variable.as_deref(), Some("validator FrigateCustomValidator"));
        assert_eq!(adds[1].init[0], "defaulter = FrigateCustomDefaulter{}");
        assert_eq!(adds[2].guard, "Conversion Webhook");
        assert!(adds[2].context.as_ref().unwrap().contains("&shipv1.Frigate{}"));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let patches = apply_webhook_patches(dir.path(), &frigate(), &both()).unwrap();
        assert!(patches.is_empty());
    }
}
