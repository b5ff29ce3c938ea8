use std::path::{Path, PathBuf};

pub const INKDESK_DIR: &str = ".inkdesk";
pub const CONFIG_FILE: &str = ".inkdesk/config.yaml";

pub fn inkdesk_dir(root: &Path) -> PathBuf {
    root.join(INKDESK_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Walk upward from `start` to the first directory containing `.inkdesk/`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(INKDESK_DIR).is_dir())
        .map(Path::to_path_buf)
}
