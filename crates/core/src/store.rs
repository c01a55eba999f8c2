use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::options::{FieldUpdate, ModelOptions};

/// Store for the server-native recipe_options.json document: a flat
/// mapping of model id to [`ModelOptions`].
///
/// Reads never fail - a missing or malformed file is an empty document,
/// and the next successful write heals it. Every mutation rewrites the
/// whole file through a temp-file-and-rename so a crash cannot leave a
/// partial document behind.
pub struct OptionsStore {
    path: PathBuf,
}

impl OptionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document; used by the render path so a page with N
    /// models costs one file read.
    pub fn all(&self) -> BTreeMap<String, ModelOptions> {
        read_document(&self.path)
    }

    /// Options for a single model; empty record if unknown.
    pub fn get(&self, model: &str) -> ModelOptions {
        self.all().remove(model).unwrap_or_default()
    }

    /// Apply a per-field update to a model's entry and rewrite the
    /// document. An entry left with no fields is removed entirely.
    pub fn set(
        &self,
        model: &str,
        ctx_size: FieldUpdate<u64>,
        args: FieldUpdate<String>,
        backend: FieldUpdate<String>,
    ) -> Result<()> {
        let mut all = self.all();
        let mut entry = all.remove(model).unwrap_or_default();

        ctx_size.apply(&mut entry.ctx_size);
        args.apply(&mut entry.llamacpp_args);
        backend.apply(&mut entry.llamacpp_backend);

        if !entry.is_empty() {
            all.insert(model.to_string(), entry);
        }

        write_document(&self.path, &all)
    }
}

/// Store for the manager's own preferences file, currently just the list
/// of models hidden from the UI.
pub struct PrefsStore {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Prefs {
    #[serde(default)]
    disabled: BTreeSet<String>,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The hidden-model set; empty when the file does not exist.
    pub fn disabled(&self) -> BTreeSet<String> {
        read_document::<Prefs>(&self.path).disabled
    }

    pub fn is_disabled(&self, model: &str) -> bool {
        self.disabled().contains(model)
    }

    /// Set-membership update; re-disabling or re-enabling is a no-op.
    /// The list is persisted sorted (BTreeSet serializes in order).
    pub fn set_disabled(&self, model: &str, disabled: bool) -> Result<()> {
        let mut prefs: Prefs = read_document(&self.path);
        if disabled {
            prefs.disabled.insert(model.to_string());
        } else {
            prefs.disabled.remove(model);
        }
        write_document(&self.path, &prefs)
    }
}

fn read_document<T: DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
            tracing::warn!("ignoring malformed {}: {}", path.display(), err);
            T::default()
        }),
        Err(_) => T::default(),
    }
}

/// Atomic rewrite: serialize next to the target, then rename over it.
fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(err) = fs::create_dir_all(parent) {
                // Not fatal on its own; the write below reports the real problem.
                tracing::warn!("could not create {}: {}", parent.display(), err);
            }
        }
    }

    let json = serde_json::to_string_pretty(value).map_err(|err| Error::StorageWrite {
        path: path.to_path_buf(),
        source: err.into(),
    })?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|err| Error::StorageWrite {
        path: tmp.clone(),
        source: err,
    })?;
    fs::rename(&tmp, path).map_err(|err| Error::StorageWrite {
        path: path.to_path_buf(),
        source: err,
    })?;

    Ok(())
}
