use std::path::PathBuf;

use thiserror::Error;

/// Configuration problems that stop a run before anything is generated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Build directory does not exist: {}", .0.display())]
    BuildDirNotFound(PathBuf),

    #[error("Build path is not a directory: {}", .0.display())]
    BuildDirNotADirectory(PathBuf),

    #[error("Could not find package.json (searched from {} up to {})", .from.display(), .to.display())]
    ManifestNotFound { from: PathBuf, to: PathBuf },

    #[error("Manifest file does not exist: {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("Manifest root is not a JSON object: {}", .0.display())]
    ManifestNotAnObject(PathBuf),
}
