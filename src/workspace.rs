#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The scratch directory one student's code is graded in.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};

/// Default scratch workspace, relative to the working directory.
pub const WORKING_FOLDER: &str = "work";

/// Compiled-module cache directory cleared between students.
pub const PYCACHE_DIR: &str = "__pycache__";

/// Scratch directory shared by every student of a batch, one at a time.
///
/// The directory is deleted when the workspace is dropped.
#[derive(Debug)]
pub struct Workspace {
    /// Directory root.
    root: PathBuf,
}

impl Workspace {
    /// Creates the workspace directory. An existing non-empty directory is
    /// refused, since it would be deleted at the end of the batch.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.is_dir()
            && fs::read_dir(&root)
                .with_context(|| format!("Could not list {}", root.display()))?
                .next()
                .is_some()
        {
            bail!(
                "Workspace {} already exists and is not empty; remove it first",
                root.display()
            );
        }
        fs::create_dir_all(&root)
            .with_context(|| format!("Could not create workspace {}", root.display()))?;
        tracing::debug!("Created workspace {}", root.display());
        Ok(Self { root })
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name` inside the workspace.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Copies `src` into the workspace as `name`.
    pub fn stage(&self, src: &Path, name: &str) -> Result<PathBuf> {
        let dst = self.path(name);
        fs::copy(src, &dst)
            .with_context(|| format!("Could not copy {} to {}", src.display(), dst.display()))?;
        Ok(dst)
    }

    /// Writes `contents` into the workspace as `name`.
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let dst = self.path(name);
        fs::write(&dst, contents).with_context(|| format!("Could not write {}", dst.display()))?;
        Ok(dst)
    }

    /// Removes `name` if it exists.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Could not remove {}", path.display())),
        }
    }

    /// Removes a student's files and the module cache so the next student
    /// starts clean.
    pub fn clear<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in names {
            self.remove(name)?;
        }
        let cache = self.path(PYCACHE_DIR);
        if cache.exists() {
            fs::remove_dir_all(&cache)
                .with_context(|| format!("Could not remove {}", cache.display()))?;
        }
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.root)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("Could not remove workspace {}: {e}", self.root.display());
        }
    }
}
