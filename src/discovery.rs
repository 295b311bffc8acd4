//! Discovery Module for the Lamia compiler
//!
//! Finds `.lamia` sources under a directory and maps them to output folders.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SOURCE_EXTENSION: &str = "lamia";

pub fn is_lamia_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
}

/// Recursively find all .lamia files in a directory, sorted by path.
pub fn find_lamia_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && is_lamia_file(path) {
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => log::warn!("Skipping unreadable entry under {}: {}", dir.display(), e),
        }
    }

    files.sort();
    files
}

/// A single file is taken as is, whatever its extension; a directory is walked.
pub fn collect_inputs(input: &Path) -> Vec<PathBuf> {
    if input.is_dir() {
        find_lamia_files(input)
    } else {
        vec![input.to_path_buf()]
    }
}

/// Output directory for `file`, mirroring its position under `input_root`.
pub fn output_dir_for(input_root: &Path, file: &Path, output_root: &Path) -> PathBuf {
    if !input_root.is_dir() {
        return output_root.to_path_buf();
    }
    match file.parent().and_then(|parent| parent.strip_prefix(input_root).ok()) {
        Some(relative) => output_root.join(relative),
        None => output_root.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_finds_nested_sources_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pages/deep")).unwrap();
        fs::write(dir.path().join("b.lamia"), "").unwrap();
        fs::write(dir.path().join("pages/deep/a.lamia"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = find_lamia_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(files.iter().all(|f| is_lamia_file(f)));
    }

    #[test]
    fn test_output_dir_mirrors_input_tree() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pages/home.lamia");
        let out = Path::new("/out");
        assert_eq!(output_dir_for(dir.path(), &file, out), Path::new("/out/pages"));
        assert_eq!(output_dir_for(&file, &file, out), Path::new("/out"));
    }

    #[test]
    fn test_single_file_input() {
        let inputs = collect_inputs(Path::new("app.lamia"));
        assert_eq!(inputs, vec![PathBuf::from("app.lamia")]);
    }
}
