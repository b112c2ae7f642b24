use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact_discovery::{ArtifactDiscovery, group_artifacts};
use crate::exclusion::{Excluded, ExclusionRules};
use crate::exports::{ExportMap, ExportsGenerator};
use crate::manifest::{PackageManifest, locate_manifest};

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct Options {
    pub build_dir: PathBuf,
    pub manifest_path: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub placeholder: Option<String>,
    pub dry_run: bool,
    /// Base for relative `build_dir` and `manifest_path`, and the upper
    /// bound of the manifest search.
    pub cwd: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub manifest_path: PathBuf,
    pub exports: ExportMap,
    pub excluded: Vec<Excluded>,
    pub written: bool,
}

impl Report {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }
}

/// Collect, group, filter and synthesize, then persist the manifest once
/// everything has been computed.
pub fn generate(options: &Options) -> Result<Report> {
    let cwd = canonical(&options.cwd)?;

    let discovery = ArtifactDiscovery::new(cwd.join(&options.build_dir));
    discovery.validate()?;
    let build_dir = canonical(discovery.build_dir())?;
    let discovery = ArtifactDiscovery::new(&build_dir);

    let manifest_path = locate_manifest(options.manifest_path.as_deref(), &build_dir, &cwd)?;
    let manifest_path = canonical(&manifest_path)?;
    let manifest_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.clone());
    tracing::debug!("Using manifest {}", manifest_path.display());

    let manifest = PackageManifest::load(&manifest_path)?;

    let groups = group_artifacts(discovery.discover()?);
    tracing::debug!("Grouped into {} modules", groups.len());

    let rules = ExclusionRules::new(options.exclude.iter().cloned(), options.placeholder.clone());
    let (retained, excluded) = rules.apply(groups)?;

    let exports = ExportsGenerator::new(&manifest_dir).generate(&retained)?;
    let updated = manifest.with_exports(&exports)?;

    let written = !options.dry_run;
    if written {
        updated.write(&manifest_path)?;
    }

    Ok(Report {
        manifest_path,
        exports,
        excluded,
        written,
    })
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve {}", path.display()))
}
