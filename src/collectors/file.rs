use crate::collectors::{nodes_from_value, InventorySource};
use crate::models::host::NodeAttributes;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Node records exported to disk, e.g. with `knife node show -l -F json`.
/// `path` is either one JSON file or a directory of `*.json` files.
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InventorySource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<NodeAttributes>> {
        if self.path.is_dir() {
            let mut files: Vec<PathBuf> = fs::read_dir(&self.path)
                .with_context(|| format!("reading {}", self.path.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            files.sort();
            tracing::debug!(dir = %self.path.display(), files = files.len(), "reading node files");

            let mut nodes = Vec::new();
            for file in &files {
                nodes.extend(read_file(file)?);
            }
            Ok(nodes)
        } else {
            read_file(&self.path)
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<NodeAttributes>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let v: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(nodes_from_value(v))
}
