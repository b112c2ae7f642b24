use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact_discovery::ModuleGroup;

/// Marker used when none is configured.
pub const DEFAULT_PLACEHOLDER: &str = "$RESERVED$";

/// Rules deciding which module groups are left out of the export map.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    names: BTreeSet<String>,
    marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excluded {
    pub module_path: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    Name,
    Marker { file: PathBuf },
}

impl ExclusionRules {
    /// An empty marker disables content exclusion.
    pub fn new<I, S>(names: I, marker: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            marker: marker.filter(|m| !m.is_empty()),
        }
    }

    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Split groups into the ones kept and the ones dropped. Either rule on
    /// its own is enough to drop a whole group.
    pub fn apply(
        &self,
        groups: BTreeMap<String, ModuleGroup>,
    ) -> Result<(BTreeMap<String, ModuleGroup>, Vec<Excluded>)> {
        let mut retained = BTreeMap::new();
        let mut excluded = Vec::new();

        for (module_path, group) in groups {
            match self.check(&group)? {
                Some(reason) => {
                    match &reason {
                        ExclusionReason::Name => {
                            tracing::debug!("Excluding {} by name", module_path);
                        }
                        ExclusionReason::Marker { file } => {
                            tracing::warn!(
                                "Excluding {}: {} contains placeholder",
                                module_path,
                                file.display()
                            );
                        }
                    }
                    excluded.push(Excluded {
                        module_path,
                        reason,
                    });
                }
                None => {
                    retained.insert(module_path, group);
                }
            }
        }

        Ok((retained, excluded))
    }

    pub fn check(&self, group: &ModuleGroup) -> Result<Option<ExclusionReason>> {
        if self.names.contains(group.basename()) {
            return Ok(Some(ExclusionReason::Name));
        }

        let Some(marker) = self.marker.as_deref() else {
            return Ok(None);
        };

        for artifact in group.artifacts() {
            if file_contains(&artifact.path, marker)? {
                return Ok(Some(ExclusionReason::Marker {
                    file: artifact.path.clone(),
                }));
            }
        }

        Ok(None)
    }
}

fn file_contains(path: &Path, marker: &str) -> Result<bool> {
    let contents =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let needle = marker.as_bytes();

    Ok(contents.windows(needle.len()).any(|window| window == needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact_discovery::{Artifact, ArtifactDiscovery, ArtifactKind, group_artifacts};
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn groups(root: &Path) -> BTreeMap<String, ModuleGroup> {
        group_artifacts(ArtifactDiscovery::new(root).discover().unwrap())
    }

    #[test]
    fn test_name_exclusion_matches_basename_anywhere() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "foo.js", "");
        write(tmp.path(), "bar/foo.js", "");
        write(tmp.path(), "bar/baz.js", "");
        write(tmp.path(), "foobar.js", "");

        let rules = ExclusionRules::new(["foo"], None);
        let (retained, excluded) = rules.apply(groups(tmp.path())).unwrap();

        let kept: Vec<&str> = retained.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["bar/baz", "foobar"]);
        assert_eq!(excluded.len(), 2);
        assert!(excluded.iter().all(|e| e.reason == ExclusionReason::Name));
    }

    #[test]
    fn test_marker_in_either_file_drops_group() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.js", "export const a = 1;");
        write(tmp.path(), "a.d.ts", "// $RESERVED$");
        write(tmp.path(), "b.js", "throw '$RESERVED$';");
        write(tmp.path(), "b.d.ts", "export {};");
        write(tmp.path(), "c.js", "export {};");

        let rules = ExclusionRules::new(Vec::<String>::new(), Some(DEFAULT_PLACEHOLDER.to_string()));
        let (retained, excluded) = rules.apply(groups(tmp.path())).unwrap();

        let kept: Vec<&str> = retained.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["c"]);

        let dropped: Vec<&str> = excluded.iter().map(|e| e.module_path.as_str()).collect();
        assert_eq!(dropped, vec!["a", "b"]);
        assert!(matches!(
            &excluded[0].reason,
            ExclusionReason::Marker { file } if file.ends_with("a.d.ts")
        ));
    }

    #[test]
    fn test_empty_marker_disables_content_check() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.js", "$RESERVED$");

        let rules = ExclusionRules::new(Vec::<String>::new(), Some(String::new()));
        assert_eq!(rules.marker(), None);

        let (retained, excluded) = rules.apply(groups(tmp.path())).unwrap();
        assert_eq!(retained.len(), 1);
        assert!(excluded.is_empty());
    }

    #[test]
    fn test_name_match_wins_without_reading_files() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone/foo.js");
        let group = ModuleGroup {
            module_path: "gone/foo".to_string(),
            runtime: Some(Artifact {
                path: missing,
                relative: "gone/foo.js".to_string(),
                kind: ArtifactKind::Runtime,
                module_path: "gone/foo".to_string(),
            }),
            declaration: None,
        };

        // Reading the missing file would fail, so a clean result means the
        // content check never ran.
        let rules = ExclusionRules::new(["foo"], Some(DEFAULT_PLACEHOLDER.to_string()));
        assert_eq!(rules.check(&group).unwrap(), Some(ExclusionReason::Name));
    }

    #[test]
    fn test_name_and_marker_match_drop_group_once() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "lib/foo.js", "$RESERVED$");
        write(tmp.path(), "lib/foo.d.ts", "$RESERVED$");

        let rules = ExclusionRules::new(["foo"], Some(DEFAULT_PLACEHOLDER.to_string()));
        let (retained, excluded) = rules.apply(groups(tmp.path())).unwrap();

        assert!(retained.is_empty());
        assert_eq!(
            excluded,
            vec![Excluded {
                module_path: "lib/foo".to_string(),
                reason: ExclusionReason::Name,
            }]
        );
    }

    #[test]
    fn test_marker_found_in_non_utf8_file() {
        let tmp = TempDir::new().unwrap();
        let mut contents = vec![0xff, 0xfe, 0x00, 0xc3];
        contents.extend_from_slice(DEFAULT_PLACEHOLDER.as_bytes());
        contents.push(0x80);
        fs::write(tmp.path().join("binary.js"), contents).unwrap();
        write(tmp.path(), "clean.js", "export {};");

        let rules = ExclusionRules::new(Vec::<String>::new(), Some(DEFAULT_PLACEHOLDER.to_string()));
        let (retained, excluded) = rules.apply(groups(tmp.path())).unwrap();

        let kept: Vec<&str> = retained.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["clean"]);
        assert_eq!(excluded[0].module_path, "binary");
    }

    #[test]
    fn test_custom_marker() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "internal/helper.js", "/* @internal */");
        write(tmp.path(), "public.js", "$RESERVED$");

        let rules = ExclusionRules::new(Vec::<String>::new(), Some("@internal".to_string()));
        let (retained, _) = rules.apply(groups(tmp.path())).unwrap();

        let kept: Vec<&str> = retained.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["public"]);
    }
}
