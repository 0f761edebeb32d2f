//! Directory-tree walk for manifest files (§4.1, §6.1).

use std::path::{Path, PathBuf};

use super::error::LoaderError;

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Return every manifest file under `path`, recursively if `path` is a
/// directory, or just `path` itself if it is a file.
pub fn manifest_files(path: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    walk_dir(path, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), LoaderError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let entry_path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk_dir(&entry_path, files)?;
        } else if file_type.is_file() && has_manifest_extension(&entry_path) {
            files.push(entry_path);
        }
    }
    Ok(())
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_manifest_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.json"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();

        let mut files = manifest_files(dir.path()).unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn single_file_path_returns_just_that_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.yaml");
        fs::write(&file, "").unwrap();
        let files = manifest_files(&file).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.YAML"), "").unwrap();
        let files = manifest_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }
}
