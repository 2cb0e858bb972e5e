//! Model directory enumeration and loading.
//!
//! A model directory is laid out in one of two ways:
//!
//! - **Static-weight mode**: the directory contains `*.pfm` files. Each file
//!   is one model; its identifier is taken from `<id>_AB.pfm`, or from
//!   `<id>.pfm` otherwise.
//! - **Evaluable mode**: no `*.pfm` file is present. Every subdirectory
//!   holding a serialized model (`model.json`, or a legacy `model.pkl`) is
//!   one model identified by the subdirectory name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::constants::{MODEL_JSON, MODEL_PICKLE, PFM_EXTENSION};
use crate::model::{ConvMotifModel, Model, StaticWeightModel};
use crate::types::ScanError;

/// Where a model's artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocator {
    /// A `.pfm` file
    StaticWeights(PathBuf),
    /// A directory holding a serialized evaluable model
    Directory(PathBuf),
}

impl ModelLocator {
    pub fn path(&self) -> &Path {
        match self {
            Self::StaticWeights(path) | Self::Directory(path) => path,
        }
    }
}

/// Model identifiers a run is restricted to.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::model::store::IncludeList;
///
/// let include = IncludeList::parse("CTCF,MAX")?;
/// assert!(include.contains("MAX"));
/// assert!(!include.contains("SP1"));
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncludeList {
    ids: Vec<String>,
}

impl IncludeList {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses an include list given on the command line.
    ///
    /// If `spec` names an existing file, each line is one identifier with
    /// `#` comments stripped. Otherwise `spec` is a comma-separated list.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Io`] if the file cannot be read and
    /// [`ScanError::Configuration`] if no identifier remains.
    pub fn parse(spec: &str) -> Result<Self, ScanError> {
        let path = Path::new(spec);
        let ids: Vec<String> = if path.is_file() {
            fs::read_to_string(path)?
                .lines()
                .map(|line| line.split('#').next().unwrap_or("").trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            spec.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        };

        if ids.is_empty() {
            return Err(ScanError::Configuration(format!(
                "include list {:?} names no models",
                spec
            )));
        }
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Adds identifiers not already present
    pub fn extend<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.contains(&id) {
                self.ids.push(id);
            }
        }
    }
}

/// Enumerates the models of a directory.
pub struct ModelStore;

impl ModelStore {
    /// Lists every model in `dir`, keyed and sorted by identifier.
    ///
    /// An empty or absent `include` list keeps every model.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Io`] if the directory cannot be read and
    /// [`ScanError::Configuration`] if no model matches.
    pub fn enumerate(
        dir: &Path,
        include: Option<&IncludeList>,
    ) -> Result<BTreeMap<String, ModelLocator>, ScanError> {
        let mut pfm_files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                subdirs.push(path);
            } else if path.extension().is_some_and(|ext| ext == PFM_EXTENSION) {
                pfm_files.push(path);
            }
        }

        let mut models = BTreeMap::new();
        if pfm_files.is_empty() {
            for path in subdirs {
                if !path.join(MODEL_JSON).is_file() && !path.join(MODEL_PICKLE).is_file() {
                    continue;
                }
                if let Some(name) = path.file_name() {
                    let id = name.to_string_lossy().into_owned();
                    models.insert(id, ModelLocator::Directory(path));
                }
            }
        } else {
            let patterns = PfmNamePatterns::new()?;
            for path in pfm_files {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if let Some(id) = patterns.identifier(&name) {
                    models.insert(id, ModelLocator::StaticWeights(path));
                }
            }
        }

        if let Some(include) = include.filter(|list| !list.is_empty()) {
            models.retain(|id, _| include.contains(id));
        }

        if models.is_empty() {
            return Err(ScanError::Configuration(format!(
                "Could not find any models that match criteria in {}",
                dir.display()
            )));
        }
        log::debug!("Found {} models in {}", models.len(), dir.display());
        Ok(models)
    }
}

/// File name patterns identifying static-weight models.
struct PfmNamePatterns {
    antibody: Regex,
    plain: Regex,
}

impl PfmNamePatterns {
    fn new() -> Result<Self, ScanError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ScanError::Configuration(format!("bad model name pattern: {}", e)))
        };
        Ok(Self {
            antibody: compile(r"(\w+)_AB\.pfm")?,
            plain: compile(r"([-\w]+)\.pfm")?,
        })
    }

    /// Identifier of a `.pfm` file name, if it has exactly one.
    ///
    /// The plain pattern is only consulted when the antibody pattern finds
    /// nothing; several antibody matches leave the file unnamed.
    fn identifier(&self, file_name: &str) -> Option<String> {
        let mut found = captures(&self.antibody, file_name);
        if found.is_empty() {
            found = captures(&self.plain, file_name);
        }
        match found.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }
}

fn captures(regex: &Regex, text: &str) -> Vec<String> {
    regex
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Turns a [`ModelLocator`] into a loaded [`Model`].
///
/// Workers share one loader and call it once per job.
pub trait ModelLoader: Send + Sync {
    fn load(&self, locator: &ModelLocator) -> Result<Model, ScanError>;
}

/// Loads `.pfm` files and `model.json` directories from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileModelLoader;

impl ModelLoader for FileModelLoader {
    fn load(&self, locator: &ModelLocator) -> Result<Model, ScanError> {
        match locator {
            ModelLocator::StaticWeights(path) => Ok(Model::Static(StaticWeightModel::from_file(path)?)),
            ModelLocator::Directory(dir) => {
                let json = dir.join(MODEL_JSON);
                if json.is_file() {
                    Ok(Model::Evaluable(Box::new(ConvMotifModel::from_file(json)?)))
                } else if dir.join(MODEL_PICKLE).is_file() {
                    Err(ScanError::model_load(
                        dir,
                        format!("{} is not a loadable format, export the model as {}", MODEL_PICKLE, MODEL_JSON),
                    ))
                } else {
                    Err(ScanError::model_load(dir, format!("no {} found", MODEL_JSON)))
                }
            }
        }
    }
}
