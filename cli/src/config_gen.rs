#![deny(missing_docs)]

//! # Config-Gen Command
//!
//! Generates the deployment manifest of a project from a `KubebuilderConfigGen`
//! resource file.
//!
//! 1. **Load**: the project file (or the legacy kustomize plugin environment)
//!    is parsed, validated and defaulted before anything runs.
//! 2. **Generate**: base resources come from `controller-gen` or from a
//!    directory of pre-generated manifests.
//! 3. **Pipeline**: certificates, built-in resources, patches, component
//!    config and sorting are applied by the core pipeline.
//!
//! The command can also install itself as a kustomize exec plugin.

use crate::error::{CliError, CliResult};
use crate::executor::{run_checked, CommandExecutor};
use opgen_core::configgen::{
    generate, parse_stream, CertRequest, Certificate, CertificateIssuer, KubebuilderConfigGen,
    Node, ResourceSource,
};
use opgen_core::AppResult;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Environment variable kustomize uses to hand the plugin configuration to
/// legacy exec plugins.
pub const PLUGIN_CONFIG_ENV: &str = "KUSTOMIZE_PLUGIN_CONFIG_STRING";

/// Set by the installed plugin script.
pub const FUNCTION_ENV: &str = "KUSTOMIZE_FUNCTION";

const PLUGIN_DIR: &str = "kustomize/plugin/kubebuilder.sigs.k8s.io/v1alpha1/kubebuilderconfiggen";
const PLUGIN_FILE: &str = "KubebuilderConfigGen";
const PLUGIN_SCRIPT: &str = "#!/bin/bash\nKUSTOMIZE_FUNCTION=true opgen config-gen\n";

/// Arguments for the config-gen command.
#[derive(clap::Args, Debug, Clone)]
#[clap(args_conflicts_with_subcommands = true)]
pub struct ConfigGenArgs {
    /// Extra actions.
    #[clap(subcommand)]
    pub action: Option<ConfigGenAction>,

    /// Path to the KubebuilderConfigGen resource file.
    pub project_file: Option<PathBuf>,

    /// Patch documents merged into the resources they name.
    pub patches: Vec<PathBuf>,

    /// Write the manifest here instead of stdout.
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    /// controller-gen binary used to generate CRDs, RBAC and webhook configs.
    #[clap(long, env = "OPGEN_CONTROLLER_GEN", default_value = "controller-gen")]
    pub controller_gen: String,

    /// Read base resources from this directory instead of running controller-gen.
    #[clap(long)]
    pub manifests_dir: Option<PathBuf>,

    /// openssl binary used for development certificates.
    #[clap(long, env = "OPGEN_OPENSSL", default_value = "openssl")]
    pub openssl: String,
}

/// Sub-actions of config-gen.
#[derive(clap::Subcommand, Debug, Clone)]
pub enum ConfigGenAction {
    /// Install config-gen as a kustomize plugin.
    InstallAsPlugin,
}

/// Executes the config-gen command.
pub fn execute(args: &ConfigGenArgs, executor: &dyn CommandExecutor) -> CliResult<()> {
    if let Some(ConfigGenAction::InstallAsPlugin) = args.action {
        let root = plugin_root(env::var("XDG_CONFIG_HOME").ok(), env::var("HOME").ok())?;
        let path = install_as_plugin(&root)?;
        info!(path = %path.display(), "kustomize plugin installed");
        return Ok(());
    }

    let (config, base_dir) = load_config(args)?;
    let patches = read_patches(&args.patches)?;
    let issuer = OpensslIssuer {
        executor,
        program: &args.openssl,
    };

    let manifest = match &args.manifests_dir {
        Some(dir) => generate(&config, &ManifestDirSource::new(dir), &issuer, patches)?,
        None => {
            let source = ControllerGenSource {
                executor,
                program: &args.controller_gen,
                base_dir: &base_dir,
            };
            generate(&config, &source, &issuer, patches)?
        }
    };

    match &args.output {
        Some(path) => fs::write(path, manifest)?,
        None => print!("{}", manifest),
    }
    Ok(())
}

/// Loads, validates and defaults the project configuration.
///
/// Without a project file the configuration is read from
/// [`PLUGIN_CONFIG_ENV`] when running as a kustomize plugin.
fn load_config(args: &ConfigGenArgs) -> CliResult<(KubebuilderConfigGen, PathBuf)> {
    let (text, base_dir) = match &args.project_file {
        Some(path) => {
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (fs::read_to_string(path)?, base)
        }
        None => {
            let in_plugin = env::var(FUNCTION_ENV).is_ok_and(|v| v == "true");
            match env::var(PLUGIN_CONFIG_ENV) {
                Ok(text) if in_plugin => (text, env::current_dir()?),
                _ => {
                    return Err(CliError::General(
                        "missing PROJECT_FILE argument".to_string(),
                    ))
                }
            }
        }
    };

    let mut config = KubebuilderConfigGen::from_yaml(&text)?;
    config.default_and_validate(&base_dir)?;
    debug!(project = config.name(), namespace = config.namespace(), "loaded configuration");
    Ok((config, base_dir))
}

fn read_patches(paths: &[PathBuf]) -> CliResult<Vec<Node>> {
    let mut patches = Vec::new();
    for path in paths {
        patches.extend(parse_stream(&fs::read_to_string(path)?)?);
    }
    Ok(patches)
}

/// Reads every `.yaml`/`.yml` file below a directory, in path order.
pub struct ManifestDirSource {
    dir: PathBuf,
}

impl ManifestDirSource {
    /// Source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ResourceSource for ManifestDirSource {
    fn generate(&self, _: &KubebuilderConfigGen) -> AppResult<Vec<Node>> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
            .collect();
        files.sort();

        let mut nodes = Vec::new();
        for file in files {
            debug!(file = %file.display(), "reading manifest");
            nodes.extend(parse_stream(&fs::read_to_string(&file)?)?);
        }
        Ok(nodes)
    }
}

/// Runs `controller-gen` into a scratch directory and reads the result.
pub struct ControllerGenSource<'a> {
    executor: &'a dyn CommandExecutor,
    program: &'a str,
    base_dir: &'a Path,
}

impl ResourceSource for ControllerGenSource<'_> {
    fn generate(&self, config: &KubebuilderConfigGen) -> AppResult<Vec<Node>> {
        let out = tempfile::tempdir()?;
        let paths = format!(
            "paths={}",
            self.base_dir.join(&config.spec.crds.source_directory).display()
        );
        let output = format!("output:dir={}", out.path().display());

        let mut args = vec!["crd", "rbac:roleName=manager-role"];
        if config.spec.webhooks.enable {
            args.push("webhook");
        }
        args.push(&paths);
        args.push(&output);

        run_checked(self.executor, self.program, &args)?;
        ManifestDirSource::new(out.path()).generate(config)
    }
}

/// Issues self-signed certificates with `openssl req -x509`.
pub struct OpensslIssuer<'a> {
    executor: &'a dyn CommandExecutor,
    program: &'a str,
}

impl CertificateIssuer for OpensslIssuer<'_> {
    fn issue(&self, request: &CertRequest) -> AppResult<Certificate> {
        let dir = tempfile::tempdir()?;
        let key = dir.path().join("tls.key");
        let cert = dir.path().join("tls.crt");
        let days = request.duration.as_secs().div_ceil(86_400).max(1).to_string();
        let subject = format!("/CN={}", request.common_name);
        let san = format!(
            "subjectAltName={}",
            request
                .hosts
                .iter()
                .map(|h| format!("DNS:{}", h))
                .collect::<Vec<_>>()
                .join(",")
        );
        let key_arg = key.to_string_lossy();
        let cert_arg = cert.to_string_lossy();

        run_checked(
            self.executor,
            self.program,
            &[
                "req", "-x509", "-newkey", "rsa:2048", "-nodes", "-keyout", &key_arg, "-out",
                &cert_arg, "-days", &days, "-subj", &subject, "-addext", &san,
            ],
        )?;

        Ok(Certificate {
            cert_pem: fs::read(&cert)?,
            key_pem: fs::read(&key)?,
        })
    }
}

/// Directory holding kustomize plugins: `$XDG_CONFIG_HOME`, else
/// `$HOME/.config`.
pub fn plugin_root(xdg_config_home: Option<String>, home: Option<String>) -> CliResult<PathBuf> {
    match (xdg_config_home.filter(|s| !s.is_empty()), home) {
        (Some(xdg), _) => Ok(PathBuf::from(xdg)),
        (None, Some(home)) => Ok(PathBuf::from(home).join(".config")),
        (None, None) => Err(CliError::General(
            "neither XDG_CONFIG_HOME nor HOME is set".to_string(),
        )),
    }
}

/// Writes the plugin script below `root` unless it already exists.
pub fn install_as_plugin(root: &Path) -> CliResult<PathBuf> {
    let dir = root.join(PLUGIN_DIR);
    let path = dir.join(PLUGIN_FILE);
    if path.exists() {
        info!(path = %path.display(), "plugin already installed, leaving it untouched");
        return Ok(path);
    }
    fs::create_dir_all(&dir)?;
    fs::write(&path, PLUGIN_SCRIPT)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o500))?;
    }
    Ok(path)
}
