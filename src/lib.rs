pub mod artifact_discovery;
pub mod exclusion;
pub mod exports;
pub mod manifest;
pub mod generator;
pub mod error;
pub mod cli;

pub use generator::{Options, Report, generate};
pub use manifest::PackageManifest;
