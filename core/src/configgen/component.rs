use crate::configgen::filter::Filter;
use crate::configgen::node::{append_unique, find_named_mut, from_json, set_path, Node};
use crate::configgen::patches::{CONTAINERS, VOLUMES};
use crate::configgen::resources::{CONTROLLER_MANAGER, MANAGER_CONFIG};
use crate::configgen::selector::Selector;
use crate::configgen::types::KubebuilderConfigGen;
use crate::error::{AppError, AppResult};
use serde_json::json;

/// Key of the component config inside the ConfigMap and the file name the
/// manager reads it from.
pub const COMPONENT_CONFIG_FILE: &str = "controller_manager_config.yaml";

const STAGE: &str = "component-config";

/// Fills the manager ConfigMap with the component config and points the
/// manager container at it.
pub struct ComponentFilter<'a> {
    config: &'a KubebuilderConfigGen,
}

impl<'a> ComponentFilter<'a> {
    /// Stage for `config`.
    pub fn new(config: &'a KubebuilderConfigGen) -> Self {
        Self { config }
    }
}

impl Filter for ComponentFilter<'_> {
    fn name(&self) -> &str {
        STAGE
    }

    fn filter(&self, mut input: Vec<Node>) -> AppResult<Vec<Node>> {
        if !self.config.spec.controller_manager.component_config.enable {
            return Ok(input);
        }
        let namespace = self.config.namespace();

        let config_maps = Selector::new()
            .kinds(["ConfigMap"])
            .names([MANAGER_CONFIG])
            .namespaces([namespace]);
        let Some(config_map) = config_maps.select(&mut input).next() else {
            return Err(AppError::Pipeline {
                stage: STAGE.into(),
                message: format!("ConfigMap {}/{} not found", namespace, MANAGER_CONFIG),
            });
        };
        set_path(
            config_map,
            &["data", COMPONENT_CONFIG_FILE],
            self.config.status.component_config.as_str().into(),
        )?;

        let deployments = Selector::new()
            .kinds(["Deployment"])
            .names([CONTROLLER_MANAGER])
            .namespaces([namespace]);
        for deployment in deployments.select(&mut input) {
            if let Some(manager) = find_named_mut(deployment, &CONTAINERS, "manager") {
                append_unique(
                    manager,
                    &["args"],
                    format!("--config={}", COMPONENT_CONFIG_FILE).into(),
                )?;
                append_unique(
                    manager,
                    &["volumeMounts"],
                    from_json(json!({
                        "name": MANAGER_CONFIG,
                        "mountPath": format!("/{}", COMPONENT_CONFIG_FILE),
                        "subPath": COMPONENT_CONFIG_FILE,
                    }))?,
                )?;
            }
            append_unique(
                deployment,
                &VOLUMES,
                from_json(json!({
                    "name": MANAGER_CONFIG,
                    "configMap": { "name": MANAGER_CONFIG },
                }))?,
            )?;
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configgen::node::{get_path, ResourceExt};
    use crate::configgen::resources::ResourceFilter;
    use std::path::Path;

    fn config(enable: bool) -> KubebuilderConfigGen {
        let mut cfg = KubebuilderConfigGen::from_yaml(&format!(
            "metadata:\n  name: p\nspec:\n  controllerManager:\n    image: img\n    componentConfig:\n      enable: {}\n",
            enable
        ))
        .unwrap();
        cfg.default_and_validate(Path::new(".")).unwrap();
        cfg.status.component_config = "kind: ControllerManagerConfig\n".into();
        cfg
    }

    #[test]
    fn test_component_config_is_mounted() {
        let cfg = config(true);
        let nodes = ResourceFilter::new(&cfg).filter(vec![]).unwrap();
        let out = ComponentFilter::new(&cfg).filter(nodes).unwrap();

        let cm = out.iter().find(|n| n.kind() == "ConfigMap").unwrap();
        assert_eq!(
            cm["data"][COMPONENT_CONFIG_FILE].as_str(),
            Some("kind: ControllerManagerConfig\n")
        );

        let deploy = out.iter().find(|n| n.kind() == "Deployment").unwrap();
        let manager = deploy["spec"]["template"]["spec"]["containers"]
            .as_sequence()
            .unwrap()
            .iter()
            .find(|c| c["name"].as_str() == Some("manager"))
            .unwrap();
        assert!(manager["args"]
            .as_sequence()
            .unwrap()
            .contains(&Node::from("--config=controller_manager_config.yaml")));
        assert_eq!(
            get_path(deploy, &VOLUMES).unwrap()[0]["configMap"]["name"].as_str(),
            Some("manager-config")
        );
    }

    #[test]
    fn test_missing_config_map_fails() {
        let cfg = config(true);
        let err = ComponentFilter::new(&cfg).filter(vec![]).unwrap_err();
        assert!(matches!(err, AppError::Pipeline { ref stage, .. } if stage == "component-config"));
    }

    #[test]
    fn test_disabled_passes_through() {
        let cfg = config(false);
        let out = ComponentFilter::new(&cfg).filter(vec![]).unwrap();
        assert!(out.is_empty());
    }
}
