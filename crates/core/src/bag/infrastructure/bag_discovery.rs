use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::shared::constants::BAG_METADATA_FILENAME;

/// Resolves `path` to a bag directory.
///
/// Accepts either the bag directory itself or its `metadata.yaml`.
pub fn is_bag(path: &Path) -> Option<PathBuf> {
    if path.is_dir() && path.join(BAG_METADATA_FILENAME).is_file() {
        return Some(path.to_path_buf());
    }
    let is_metadata = path.file_name().is_some_and(|name| name == BAG_METADATA_FILENAME);
    if is_metadata && path.is_file() {
        if let Some(parent) = path.parent() {
            return Some(parent.to_path_buf());
        }
    }
    log::warn!("'{}' is not a valid rosbag", path.display());
    None
}

/// Finds every bag under `root`, sorted by path.
///
/// `root` may itself be a bag. Unreadable directories are logged and
/// skipped.
pub fn discover_bags(root: &Path) -> Vec<PathBuf> {
    let mut metadata: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {e}", root.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(BAG_METADATA_FILENAME))
        })
        .map(|entry| entry.into_path())
        .collect();
    metadata.sort();

    let mut bags: Vec<PathBuf> = metadata.iter().filter_map(|path| is_bag(path)).collect();
    bags.dedup();
    bags
}
