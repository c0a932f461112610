use std::fs;
use std::path::PathBuf;

use crate::domain::AppError;
use crate::ports::DescriptorCatalog;

const DESCRIPTOR_EXTENSION: &str = "tdl";

/// Descriptor catalog backed by a directory of `<image-id>.tdl` files.
#[derive(Debug, Clone)]
pub struct FilesystemDescriptorCatalog {
    root: PathBuf,
}

impl FilesystemDescriptorCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DescriptorCatalog for FilesystemDescriptorCatalog {
    fn locate(&self, image_id: &str) -> Result<PathBuf, AppError> {
        let not_found = || AppError::DescriptorNotFound(image_id.to_string());

        // Image ids become file names; anything that could escape the root is rejected.
        if image_id.is_empty() || image_id.contains(['/', '\\']) || image_id.starts_with('.') {
            return Err(not_found());
        }

        let exact = self.root.join(format!("{}.{}", image_id, DESCRIPTOR_EXTENSION));
        if exact.is_file() {
            return Ok(exact);
        }

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Err(not_found()),
        };

        let mut matches: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
                    && path
                        .file_stem()
                        .is_some_and(|stem| stem.to_string_lossy().eq_ignore_ascii_case(image_id))
            })
            .collect();
        matches.sort();

        matches.into_iter().next().ok_or_else(not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog_with(files: &[&str]) -> (TempDir, FilesystemDescriptorCatalog) {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::write(dir.path().join(file), "<template/>").unwrap();
        }
        let catalog = FilesystemDescriptorCatalog::new(dir.path());
        (dir, catalog)
    }

    #[test]
    fn finds_exact_file_name() {
        let (dir, catalog) = catalog_with(&["F17-x86_64-cfntools.tdl", "U10-x86_64-cfntools.tdl"]);
        assert_eq!(
            catalog.locate("F17-x86_64-cfntools").unwrap(),
            dir.path().join("F17-x86_64-cfntools.tdl")
        );
    }

    #[test]
    fn falls_back_to_case_insensitive_match() {
        let (dir, catalog) = catalog_with(&["F17-X86_64-CFNTOOLS.TDL"]);
        assert_eq!(
            catalog.locate("f17-x86_64-cfntools").unwrap(),
            dir.path().join("F17-X86_64-CFNTOOLS.TDL")
        );
    }

    #[test]
    fn reports_missing_descriptor() {
        let (_dir, catalog) = catalog_with(&["F17.tdl"]);
        let err = catalog.locate("F16").unwrap_err();
        assert!(matches!(err, AppError::DescriptorNotFound(ref id) if id == "F16"));
    }

    #[test]
    fn missing_root_is_not_found() {
        let catalog = FilesystemDescriptorCatalog::new("/nonexistent/prebake/descriptors");
        assert!(matches!(catalog.locate("F17"), Err(AppError::DescriptorNotFound(_))));
    }

    #[test]
    fn rejects_path_like_ids() {
        let (_dir, catalog) = catalog_with(&["F17.tdl"]);
        assert!(catalog.locate("../F17").is_err());
        assert!(catalog.locate("").is_err());
    }
}
