//! Reading and writing layout documents on disk.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::common::config::Config;
use crate::layout::PanelTree;

pub fn load(path: &Path, config: &Config) -> anyhow::Result<PanelTree> {
    let mut buf = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut buf))
        .with_context(|| format!("reading layout {}", path.display()))?;
    let tree = PanelTree::from_json_str_with(&buf, config)
        .with_context(|| format!("loading layout {}", path.display()))?;
    debug!(path = %path.display(), nodes = tree.len(), "loaded layout file");
    Ok(tree)
}

/// Writes the tree as a pretty-printed document, creating parent directories.
pub fn save(tree: &PanelTree, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut json = tree.to_json_pretty()?;
    json.push('\n');
    File::create(path)
        .and_then(|mut file| file.write_all(json.as_bytes()))
        .with_context(|| format!("writing layout {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PaneDto, PanelDto, PanelRowDto};

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts/main.json");

        let mut tree = PanelTree::new();
        let root = tree.root_id().to_owned();
        tree.add_row(
            &root,
            PanelRowDto::new([PanelDto::new([PaneDto::new("notesTool:noteId=1")]).into()]),
            None,
        )
        .unwrap();
        save(&tree, &path).unwrap();

        let loaded = load(&path, &Config::default()).unwrap();
        assert_eq!(loaded.to_json(), tree.to_json());
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{ "kind": "panelRow", "children": [] }"#).unwrap();
        let err = load(&path, &Config::default()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"), "{err:#}");

        assert!(load(&dir.path().join("missing.json"), &Config::default()).is_err());
    }
}
