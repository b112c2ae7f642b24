use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::exports::ExportMap;

pub const MANIFEST_FILE_NAME: &str = "package.json";
const EXPORTS_FIELD: &str = "exports";

/// A package.json held as an ordered document. Only `exports` is ever
/// replaced; every other field is written back untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    fields: Map<String, Value>,
}

impl PackageManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest from {}", path.display()))?;

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .with_context(|| format!("Failed to parse manifest JSON from {}", path.display()))?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ConfigError::ManifestNotAnObject(path.to_path_buf()).into()),
        }
    }

    pub fn exports(&self) -> Option<&Value> {
        self.fields.get(EXPORTS_FIELD)
    }

    /// A copy of this manifest with `exports` replaced wholesale. An existing
    /// field keeps its position; a new one goes last.
    pub fn with_exports(&self, exports: &ExportMap) -> Result<Self> {
        let exports = serde_json::to_value(exports).context("Failed to serialize exports")?;

        let mut fields = self.fields.clone();
        fields.insert(EXPORTS_FIELD.to_string(), exports);

        Ok(Self { fields })
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.fields)
            .context("Failed to serialize manifest to JSON")?;
        json.push('\n');
        Ok(json)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_pretty_string()?;

        fs::write(path, json)
            .with_context(|| format!("Failed to write manifest to {}", path.display()))?;

        tracing::debug!("Wrote manifest {}", path.display());

        Ok(())
    }
}

/// Pick the manifest to update. An explicit path wins; otherwise walk up from
/// `build_dir` until `cwd` (or the filesystem root) looking for package.json,
/// then fall back to `cwd/package.json`.
pub fn locate_manifest(explicit: Option<&Path>, build_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    if let Some(explicit) = explicit {
        let path = cwd.join(explicit);
        if !path.is_file() {
            return Err(ConfigError::ManifestMissing(path).into());
        }
        return Ok(path);
    }

    // `ancestors` ends at the root, so the walk is bounded even when `cwd`
    // is not above `build_dir`.
    for dir in build_dir.ancestors() {
        let candidate = dir.join(MANIFEST_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!("Found manifest {}", candidate.display());
            return Ok(candidate);
        }
        if dir == cwd {
            break;
        }
    }

    let fallback = cwd.join(MANIFEST_FILE_NAME);
    if fallback.is_file() {
        return Ok(fallback);
    }

    Err(ConfigError::ManifestNotFound {
        from: build_dir.to_path_buf(),
        to: cwd.to_path_buf(),
    }
    .into())
}
