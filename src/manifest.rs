//! Project manifest (`jay.json`), matching the original's `jeem.json`
//! project file and its `init`/`start`/`test`/`run` CLI verbs (§6.1).

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, JayError, JayResult};

pub const MANIFEST_FILE: &str = "jay.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Entry-point file. Kept for parity with the original's manifest shape;
    /// `jayc` itself is always invoked with an explicit file argument, so
    /// this field is read but never required.
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub scripts: IndexMap<String, String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl Manifest {
    pub fn load(dir: &Path) -> JayResult<Manifest> {
        let path = dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| JayError::new(path.display().to_string(), 0, ErrorKind::Other(format!("{e}"))))?;
        serde_json::from_str(&text)
            .map_err(|e| JayError::new(path.display().to_string(), 0, ErrorKind::Other(format!("invalid manifest: {e}"))))
    }

    /// Scaffolds a new project directory: `jay.json` plus a starter
    /// `main.jay` and `test.jay`, matching jeem.c's `init` verb.
    pub fn init(dir: &Path, name: &str) -> JayResult<()> {
        std::fs::create_dir_all(dir)
            .map_err(|e| JayError::new(dir.display().to_string(), 0, ErrorKind::Other(format!("{e}"))))?;

        let mut scripts = IndexMap::new();
        scripts.insert("start".to_string(), "main.jay".to_string());
        scripts.insert("test".to_string(), "test.jay".to_string());
        let manifest = Manifest { name: name.to_string(), version: default_version(), main: Some("main.jay".to_string()), scripts };

        let manifest_json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| JayError::new(dir.display().to_string(), 0, ErrorKind::Other(format!("{e}"))))?;
        write(dir.join(MANIFEST_FILE), manifest_json)?;
        write(dir.join("main.jay"), "print(\"hello from jay\");\n")?;
        write(dir.join("test.jay"), "assert(1 + 1 == 2, \"math still works\");\nprint(\"all tests passed\");\n")?;
        Ok(())
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(|s| s.as_str())
    }
}

fn write(path: std::path::PathBuf, contents: impl AsRef<[u8]>) -> JayResult<()> {
    std::fs::write(&path, contents).map_err(|e| JayError::new(path.display().to_string(), 0, ErrorKind::Other(format!("{e}"))))
}
