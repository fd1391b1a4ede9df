use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use log::{info, warn};

use super::CommandPack;
use crate::error::PackError;

pub const DEFAULT_PACK_ID: &str = "beginner";

static PACK_DIR: Dir = include_dir!("resources/packs");

/// Somewhere packs can be loaded from by id.
pub trait PackSource: Send {
    fn name(&self) -> &str;
    fn load(&self, pack_id: &str) -> Result<CommandPack, PackError>;
}

/// Ids become file names, so keep them to a safe alphabet.
fn validate_id(pack_id: &str) -> Result<(), PackError> {
    let valid = !pack_id.is_empty()
        && pack_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PackError::InvalidId(pack_id.to_string()))
    }
}

/// Reads `<dir>/<pack_id>.json`.
#[derive(Debug, Clone)]
pub struct DirPackSource {
    dir: PathBuf,
}

impl DirPackSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl PackSource for DirPackSource {
    fn name(&self) -> &str {
        "directory"
    }

    fn load(&self, pack_id: &str) -> Result<CommandPack, PackError> {
        validate_id(pack_id)?;
        let path = self.dir.join(format!("{pack_id}.json"));
        let json = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => PackError::NotFound(pack_id.to_string()),
            _ => PackError::Io {
                pack_id: pack_id.to_string(),
                source,
            },
        })?;
        CommandPack::from_json_str(&json, pack_id)
    }
}

/// Packs compiled into the binary from `resources/packs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPackSource;

impl BuiltinPackSource {
    /// Ids of all built-in packs, sorted.
    pub fn pack_ids() -> Vec<String> {
        let mut ids: Vec<String> = PACK_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|f| f.path().file_stem()?.to_str().map(str::to_string))
            .collect();
        ids.sort();
        ids
    }
}

impl PackSource for BuiltinPackSource {
    fn name(&self) -> &str {
        "built-in"
    }

    fn load(&self, pack_id: &str) -> Result<CommandPack, PackError> {
        validate_id(pack_id)?;
        let file = PACK_DIR
            .get_file(format!("{pack_id}.json"))
            .ok_or_else(|| PackError::NotFound(pack_id.to_string()))?;
        let json = file
            .contents_utf8()
            .ok_or_else(|| PackError::Shape(pack_id.to_string()))?;
        CommandPack::from_json_str(json, pack_id)
    }
}

/// A loaded pack and whether it is the emergency fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct PackLoad {
    pub pack: CommandPack,
    pub fell_back: bool,
}

/// Try each source in order; if all fail, use the built-in fallback list.
pub fn load_with_fallback(sources: &[&dyn PackSource], pack_id: &str) -> PackLoad {
    for source in sources {
        match source.load(pack_id) {
            Ok(pack) => {
                info!(
                    "loaded pack `{}` ({} commands) from {} source",
                    pack.pack_id,
                    pack.len(),
                    source.name()
                );
                return PackLoad {
                    pack,
                    fell_back: false,
                };
            }
            Err(err) => warn!("{} source: {err}", source.name()),
        }
    }

    warn!("pack `{pack_id}` unavailable, using the built-in fallback list");
    PackLoad {
        pack: CommandPack::fallback(pack_id),
        fell_back: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_packs_are_valid() {
        let ids = BuiltinPackSource::pack_ids();
        assert!(ids.contains(&DEFAULT_PACK_ID.to_string()));
        for id in ids {
            let pack = BuiltinPackSource.load(&id).unwrap();
            assert_eq!(pack.pack_id, id);
            assert!(!pack.is_empty());
        }
    }

    #[test]
    fn test_builtin_missing_pack() {
        assert_matches!(
            BuiltinPackSource.load("does-not-exist"),
            Err(PackError::NotFound(_))
        );
    }

    #[test]
    fn test_pack_ids_are_validated() {
        let dir = tempdir().unwrap();
        let source = DirPackSource::new(dir.path());
        assert_matches!(source.load("../etc/passwd"), Err(PackError::InvalidId(_)));
        assert_matches!(source.load(""), Err(PackError::InvalidId(_)));
    }

    #[test]
    fn test_dir_source_reads_json() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("custom.json"),
            r#"{"title": "Custom", "commands": ["ls", {"command": "pwd", "tags": ["Nav"]}]}"#,
        )
        .unwrap();

        let pack = DirPackSource::new(dir.path()).load("custom").unwrap();
        assert_eq!(pack.pack_id, "custom");
        assert_eq!(pack.title, "Custom");
        assert_eq!(pack.commands[1].tags, vec!["nav"]);
    }

    #[test]
    fn test_dir_source_missing_file() {
        let dir = tempdir().unwrap();
        assert_matches!(
            DirPackSource::new(dir.path()).load("nope"),
            Err(PackError::NotFound(id)) if id == "nope"
        );
    }

    #[test]
    fn test_load_with_fallback_prefers_first_working_source() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("beginner.json"), "{}").unwrap();
        let dir_source = DirPackSource::new(dir.path());

        let load = load_with_fallback(&[&dir_source, &BuiltinPackSource], DEFAULT_PACK_ID);
        assert!(!load.fell_back);
        assert_eq!(load.pack, BuiltinPackSource.load(DEFAULT_PACK_ID).unwrap());
    }

    #[test]
    fn test_load_with_fallback_uses_builtin_list() {
        let load = load_with_fallback(&[&BuiltinPackSource], "missing");
        assert!(load.fell_back);
        assert_eq!(load.pack.pack_id, "missing");
        assert_eq!(load.pack.title, "Fallback Ops");

        let load = load_with_fallback(&[], "anything");
        assert!(load.fell_back);
    }
}
