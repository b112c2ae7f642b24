use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::artifact_discovery::{Artifact, ModuleGroup};

/// Export key to descriptor, ordered by key so output is stable.
pub type ExportMap = BTreeMap<String, ExportDescriptor>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
}

/// Builds export descriptors with paths relative to the manifest directory.
pub struct ExportsGenerator {
    manifest_dir: PathBuf,
}

impl ExportsGenerator {
    pub fn new(manifest_dir: impl AsRef<Path>) -> Self {
        Self {
            manifest_dir: manifest_dir.as_ref().to_path_buf(),
        }
    }

    pub fn generate(&self, groups: &BTreeMap<String, ModuleGroup>) -> Result<ExportMap> {
        let mut exports = ExportMap::new();

        for group in groups.values() {
            let descriptor = self.descriptor(group)?;
            exports.insert(export_key(&group.module_path), descriptor);
        }

        Ok(exports)
    }

    pub fn descriptor(&self, group: &ModuleGroup) -> Result<ExportDescriptor> {
        let runtime = group
            .runtime
            .as_ref()
            .map(|artifact| self.reference(artifact))
            .transpose()?;
        let types = group
            .declaration
            .as_ref()
            .map(|artifact| self.reference(artifact))
            .transpose()?;

        Ok(ExportDescriptor {
            import: runtime.clone(),
            require: runtime,
            types,
        })
    }

    fn reference(&self, artifact: &Artifact) -> Result<String> {
        let relative = pathdiff::diff_paths(&artifact.path, &self.manifest_dir)
            .ok_or_else(|| {
                anyhow!(
                    "Cannot express {} relative to {}",
                    artifact.path.display(),
                    self.manifest_dir.display()
                )
            })
            .with_context(|| format!("Failed to build export for {}", artifact.module_path))?;

        Ok(format!("./{}", to_slash(&relative)))
    }
}

/// `./` followed by the module path.
pub fn export_key(module_path: &str) -> String {
    format!("./{}", module_path)
}

/// Join path components with `/` whatever the host separator is.
pub fn to_slash(path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .map(|component| match component {
            Component::ParentDir => "..".to_string(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect();

    segments.join("/")
}
