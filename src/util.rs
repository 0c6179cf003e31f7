use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::Result;

/// Normalizes a dataset key to an absolute HDF5 path.
///
/// `"features"`, `"/features"` and `"//features/"` all map to `"/features"`.
pub fn normalize_key(key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    ensure!(!parts.is_empty(), "invalid dataset key: {:?}", key);
    ensure!(
        parts.iter().all(|&p| p != "." && p != ".."),
        "relative components are not allowed in dataset key: {:?}",
        key
    );
    Ok(format!("/{}", parts.join("/")))
}

/// Lists regular files in `dir` whose extension matches `extension`, sorted by path.
///
/// The extension is compared without the leading dot (`"h5"` and `".h5"` are equivalent).
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    ensure!(dir.is_dir(), "not a directory: {}", dir.display());
    let dir = match dir.to_str() {
        Some(dir) => Pattern::escape(dir),
        None => fail!("non-UTF-8 directory path: {}", dir.display()),
    };
    let pattern = format!("{}/*.{}", dir, Pattern::escape(extension.trim_start_matches('.')));
    let mut files = vec![];
    for path in glob::glob(&pattern)? {
        let path = path?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
