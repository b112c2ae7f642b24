use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ConfigError;

const RUNTIME_EXTENSION: &str = ".js";
const DECLARATION_EXTENSION: &str = ".d.ts";

/// Walks a build directory and picks out the files that can back an export.
pub struct ArtifactDiscovery {
    build_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Location on disk, rooted at the build directory as it was given.
    pub path: PathBuf,
    /// Path relative to the build directory with `/` separators, extension included.
    pub relative: String,
    pub kind: ArtifactKind,
    /// `relative` with the recognized extension stripped.
    pub module_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Runtime,
    Declaration,
}

impl ArtifactKind {
    /// Classify a relative path, returning the kind and the path with its
    /// extension removed. Declarations are matched first so `x.d.ts` never
    /// falls through to another rule.
    pub fn classify(relative: &str) -> Option<(Self, &str)> {
        let (kind, stripped) = if let Some(stem) = relative.strip_suffix(DECLARATION_EXTENSION) {
            (ArtifactKind::Declaration, stem)
        } else if let Some(stem) = relative.strip_suffix(RUNTIME_EXTENSION) {
            (ArtifactKind::Runtime, stem)
        } else {
            return None;
        };

        if stripped.is_empty() || stripped.ends_with('/') {
            return None;
        }

        Some((kind, stripped))
    }
}

/// All artifacts that share one module path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleGroup {
    pub module_path: String,
    pub runtime: Option<Artifact>,
    pub declaration: Option<Artifact>,
}

impl ModuleGroup {
    fn new(module_path: &str) -> Self {
        Self {
            module_path: module_path.to_string(),
            ..Self::default()
        }
    }

    /// Last segment of the module path.
    pub fn basename(&self) -> &str {
        self.module_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.module_path)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.runtime.iter().chain(self.declaration.iter())
    }
}

impl ArtifactDiscovery {
    pub fn new(build_dir: impl AsRef<Path>) -> Self {
        Self {
            build_dir: build_dir.as_ref().to_path_buf(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Check that the build directory exists and is a directory.
    pub fn validate(&self) -> Result<()> {
        if !self.build_dir.exists() {
            return Err(ConfigError::BuildDirNotFound(self.build_dir.clone()).into());
        }
        if !self.build_dir.is_dir() {
            return Err(ConfigError::BuildDirNotADirectory(self.build_dir.clone()).into());
        }
        Ok(())
    }

    pub fn discover(&self) -> Result<Vec<Artifact>> {
        self.validate()?;

        let mut artifacts = Vec::new();

        for entry in WalkDir::new(&self.build_dir) {
            let entry = entry.with_context(|| {
                format!("Failed to walk build directory {}", self.build_dir.display())
            })?;

            if !entry.path().is_file() {
                continue;
            }

            let relative = self.relative_path(entry.path())?;
            let Some((kind, module_path)) = ArtifactKind::classify(&relative) else {
                continue;
            };

            artifacts.push(Artifact {
                path: entry.path().to_path_buf(),
                module_path: module_path.to_string(),
                kind,
                relative,
            });
        }

        tracing::debug!(
            "Found {} artifacts in {}",
            artifacts.len(),
            self.build_dir.display()
        );

        Ok(artifacts)
    }

    fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.build_dir).with_context(|| {
            format!(
                "{} is not inside build directory {}",
                path.display(),
                self.build_dir.display()
            )
        })?;

        let segments: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();

        Ok(segments.join("/"))
    }
}

/// Group artifacts by module path. Traversal order does not matter; the
/// result is keyed and ordered by module path.
pub fn group_artifacts(artifacts: Vec<Artifact>) -> BTreeMap<String, ModuleGroup> {
    let mut groups: BTreeMap<String, ModuleGroup> = BTreeMap::new();

    for artifact in artifacts {
        let group = groups
            .entry(artifact.module_path.clone())
            .or_insert_with_key(|key| ModuleGroup::new(key));

        match artifact.kind {
            ArtifactKind::Runtime => group.runtime = Some(artifact),
            ArtifactKind::Declaration => group.declaration = Some(artifact),
        }
    }

    groups
}
