#![deny(missing_docs)]

//! # Scaffold
//!
//! Runs an ordered list of builders against a project directory.
//!
//! - **Templates** render whole files.
//! - **Inserters** splice code fragments before explicit markers of files that
//!   were scaffolded earlier (either on disk or by a template of the same run).
//!
//! Nothing is written until every builder succeeded, so a failing builder leaves
//! the project tree untouched.

use crate::error::{AppError, AppResult};
use crate::machinery::fragments::CodeFragments;
use crate::machinery::marker::Marker;
use crate::machinery::splice::insert_fragments;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What to do when the target file of a builder already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExistsAction {
    /// Keep the existing file.
    Skip,
    /// Fail the whole run.
    #[default]
    Error,
    /// Replace the existing file.
    Overwrite,
}

/// Values shared with every template of a run.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    /// License header prepended by templates that want one.
    pub boilerplate: String,
}

/// A builder that renders a complete file.
pub trait Template {
    /// Path relative to the project root.
    fn path(&self) -> PathBuf;

    /// Behaviour when the file already exists.
    fn if_exists_action(&self) -> IfExistsAction {
        IfExistsAction::Error
    }

    /// Checks the builder input before anything is rendered.
    fn validate(&self) -> AppResult<()> {
        Ok(())
    }

    /// Renders the file content.
    fn body(&self, universe: &Universe) -> AppResult<String>;
}

/// A builder that inserts fragments before markers of an existing file.
pub trait Inserter {
    /// Path relative to the project root.
    fn path(&self) -> PathBuf;

    /// Markers this builder is allowed to target.
    fn markers(&self) -> Vec<Marker>;

    /// Fragments to insert, keyed by marker.
    fn code_fragments(&self) -> CodeFragments;
}

/// One entry of the ordered builder list handed to [`Scaffold::execute`].
pub enum Builder<'a> {
    /// Whole-file template.
    Template(&'a dyn Template),
    /// Marker inserter.
    Inserter(&'a dyn Inserter),
}

/// In-memory state of one file during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileModel {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Full content to write.
    pub contents: String,
    /// Behaviour when the file exists at write time.
    pub if_exists_action: IfExistsAction,
}

/// Files touched by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldReport {
    /// Files that were written.
    pub written: Vec<PathBuf>,
    /// Files that existed and were kept.
    pub skipped: Vec<PathBuf>,
}

/// Executes builders against a project root.
#[derive(Debug, Clone)]
pub struct Scaffold {
    root: PathBuf,
    universe: Universe,
}

impl Scaffold {
    /// Creates a scaffold rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            universe: Universe::default(),
        }
    }

    /// Sets the boilerplate made available to templates.
    pub fn with_boilerplate(mut self, boilerplate: impl Into<String>) -> Self {
        self.universe.boilerplate = boilerplate.into();
        self
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs the builders in order, then persists the resulting models.
    pub fn execute(&self, builders: &[Builder<'_>]) -> AppResult<ScaffoldReport> {
        let mut models: IndexMap<PathBuf, FileModel> = IndexMap::new();

        for builder in builders {
            match builder {
                Builder::Template(t) => {
                    t.validate()?;
                    self.build_file_model(*t, &mut models)?;
                }
                Builder::Inserter(i) => self.update_file_model(*i, &mut models)?,
            }
        }

        let mut report = ScaffoldReport::default();
        for model in models.values() {
            if self.write_file(model)? {
                report.written.push(model.path.clone());
            } else {
                report.skipped.push(model.path.clone());
            }
        }
        Ok(report)
    }

    fn build_file_model(
        &self,
        template: &dyn Template,
        models: &mut IndexMap<PathBuf, FileModel>,
    ) -> AppResult<()> {
        let path = template.path();
        let action = template.if_exists_action();

        if models.contains_key(&path) {
            match action {
                IfExistsAction::Skip => return Ok(()),
                IfExistsAction::Error => {
                    return Err(AppError::General(format!(
                        "model already exists for {}",
                        path.display()
                    )))
                }
                IfExistsAction::Overwrite => {}
            }
        }

        let contents = template.body(&self.universe)?;
        debug!(path = %path.display(), "rendered template");
        models.insert(
            path.clone(),
            FileModel {
                path,
                contents,
                if_exists_action: action,
            },
        );
        Ok(())
    }

    fn update_file_model(
        &self,
        inserter: &dyn Inserter,
        models: &mut IndexMap<PathBuf, FileModel>,
    ) -> AppResult<()> {
        let mut model = self.load_previous_model(inserter, models)?;

        let mut fragments = inserter.code_fragments();
        fragments.retain_markers(&inserter.markers());
        fragments.remove_existing(&model.contents);
        if fragments.is_empty() {
            debug!(path = %model.path.display(), "no fragments left to insert");
            return Ok(());
        }

        model.contents = insert_fragments(&model.contents, &fragments)?;
        model.if_exists_action = IfExistsAction::Overwrite;
        models.insert(model.path.clone(), model);
        Ok(())
    }

    fn load_previous_model(
        &self,
        inserter: &dyn Inserter,
        models: &IndexMap<PathBuf, FileModel>,
    ) -> AppResult<FileModel> {
        let path = inserter.path();

        if let Some(model) = models.get(&path) {
            if !self.root.join(&path).exists() {
                return Ok(model.clone());
            }
            return match model.if_exists_action {
                // The file on disk wins; fall back to the model if it cannot be read.
                IfExistsAction::Skip => Ok(self
                    .load_model_from_file(&path)
                    .unwrap_or_else(|_| model.clone())),
                IfExistsAction::Error => Err(AppError::FileExists(path.display().to_string())),
                IfExistsAction::Overwrite => Ok(model.clone()),
            };
        }

        self.load_model_from_file(&path)
    }

    fn load_model_from_file(&self, path: &Path) -> AppResult<FileModel> {
        let contents = fs::read_to_string(self.root.join(path))?;
        Ok(FileModel {
            path: path.to_path_buf(),
            contents,
            if_exists_action: IfExistsAction::Error,
        })
    }

    /// Writes a model; returns `false` when an existing file was kept.
    fn write_file(&self, model: &FileModel) -> AppResult<bool> {
        let full = self.root.join(&model.path);

        if full.exists() {
            match model.if_exists_action {
                IfExistsAction::Overwrite => {}
                IfExistsAction::Skip => return Ok(false),
                IfExistsAction::Error => {
                    return Err(AppError::FileExists(model.path.display().to_string()))
                }
            }
        }

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, &model.contents)?;
        debug!(path = %full.display(), "wrote file");
        Ok(true)
    }
}
