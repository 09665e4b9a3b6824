use crate::error::AppResult;
use crate::patcher::chain::{inject_before_terminal, ChainStyle};
use crate::patcher::files::{ensure_import, Import, ImportEdit};
use crate::patcher::outcome::PartialResult;
use regex::Regex;

/// Builder-chain call(s) that register a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiring {
    /// Text whose presence means the wiring is already done.
    pub guard: String,
    /// Chained call(s) to insert before the terminal call.
    pub code: String,
}

/// An import a declaration depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredImport {
    /// The import to add.
    pub import: Import,
    /// Existing import to place it after, if present.
    pub after: Option<String>,
}

/// A type (plus its methods) to append to a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Name used in reports.
    pub name: String,
    /// Regex that matches when the declaration already exists.
    pub signature: String,
    /// Code appended at the end of the file.
    pub code: String,
    /// Optional builder-chain wiring.
    pub wiring: Option<Wiring>,
    /// Imports added along with the declaration.
    pub imports: Vec<RequiredImport>,
}

/// Regex matching `type <name> struct`.
pub fn struct_signature(type_name: &str) -> String {
    format!(r"type\s+{}\s+struct", regex::escape(type_name))
}

/// Appends missing declarations to a file and wires them into a builder chain.
#[derive(Debug, Clone, Default)]
pub struct StructuralPatcher {
    chain: ChainStyle,
}

impl StructuralPatcher {
    /// Patcher for the default `...Complete()` chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Patcher for a custom chain.
    pub fn with_chain_style(chain: ChainStyle) -> Self {
        Self { chain }
    }

    /// Applies every declaration not already in `document`.
    ///
    /// Missing anchors for imports or wiring become warnings; the
    /// declaration code is still appended.
    pub fn patch(&self, document: &str, declarations: &[Declaration]) -> AppResult<PartialResult> {
        let mut result = PartialResult::unchanged(document);
        let mut appended = String::new();

        for decl in declarations {
            if Regex::new(&decl.signature)?.is_match(document) {
                result.skip(format!("{} already exists", decl.name));
                continue;
            }

            for req in &decl.imports {
                match ensure_import(&result.content, &req.import, req.after.as_deref())? {
                    ImportEdit::Inserted(content) => {
                        result.apply(format!("import {}", req.import.path), content)
                    }
                    ImportEdit::Present => {}
                    ImportEdit::NoAnchor => result.warn(
                        "import",
                        format!("Could not find an import block for {}", req.import.path),
                        format!("Add import {}", req.import.render()),
                    ),
                }
            }

            if let Some(wiring) = &decl.wiring {
                if !result.content.contains(&wiring.guard) {
                    match inject_before_terminal(&result.content, &wiring.code, &self.chain)? {
                        Some(content) => result.apply(format!("wire {}", decl.name), content),
                        None => result.warn(
                            "wiring",
                            format!("Could not find {}() call", self.chain.terminal),
                            format!(
                                "Add the following before {}():\n{}",
                                self.chain.terminal,
                                wiring.code.trim_end()
                            ),
                        ),
                    }
                }
            }

            appended.push_str(&decl.code);
            result.applied.push(decl.name.clone());
        }

        if !appended.is_empty() {
            let base = result.content.trim_end_matches('\n');
            result.content = format!("{}\n{}", base, appended);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "package v1\n\nimport (\n\tctrl \"sigs.k8s.io/controller-runtime\"\n)\n\nfunc SetupFooWebhookWithManager(mgr ctrl.Manager) error {\n\treturn ctrl.NewWebhookManagedBy(mgr).\n\t\tFor(&Foo{}).\n\t\tComplete()\n}\n";

    fn defaulter() -> Declaration {
        Declaration {
            name: "FooCustomDefaulter".into(),
            signature: struct_signature("FooCustomDefaulter"),
            code: "\ntype FooCustomDefaulter struct{}\n".into(),
            wiring: Some(Wiring {
                guard: "WithDefaulter(".into(),
                code: "\t\tWithDefaulter(&FooCustomDefaulter{}).\n".into(),
            }),
            imports: vec![RequiredImport {
                import: Import::new("context"),
                after: None,
            }],
        }
    }

    #[test]
    fn test_patch_appends_wires_and_imports() {
        let res = StructuralPatcher::new().patch(SRC, &[defaulter()]).unwrap();
        assert!(res.is_modified());
        assert!(res.warnings.is_empty());
        assert!(res.content.contains("\tctrl \"sigs.k8s.io/controller-runtime\"\n\t\"context\"\n)"));
        assert!(res
            .content
            .contains("\t\tFor(&Foo{}).\n\t\tWithDefaulter(&FooCustomDefaulter{}).\n\t\tComplete()"));
        assert!(res.content.ends_with("}\n\ntype FooCustomDefaulter struct{}\n"));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let patcher = StructuralPatcher::new();
        let once = patcher.patch(SRC, &[defaulter()]).unwrap();
        let twice = patcher.patch(&once.content, &[defaulter()]).unwrap();
        assert_eq!(twice.content, once.content);
        assert!(!twice.is_modified());
        assert_eq!(twice.skipped.len(), 1);
    }

    #[test]
    fn test_missing_chain_warns_but_appends() {
        let src = "package v1\n\nimport (\n\t\"context\"\n)\n";
        let res = StructuralPatcher::new().patch(src, &[defaulter()]).unwrap();
        assert_eq!(res.warnings.len(), 1);
        assert_eq!(res.warnings[0].message, "Could not find Complete() call");
        assert!(res.content.contains("type FooCustomDefaulter struct{}"));
    }
}
