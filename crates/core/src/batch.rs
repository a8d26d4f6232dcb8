use crate::GateError;
use std::path::{Path, PathBuf};

/// The files selected for resizing, in the order the user picked them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchContext {
    files: Vec<PathBuf>,
}

impl BatchContext {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn first(&self) -> Option<&Path> {
        self.files.first().map(PathBuf::as_path)
    }

    pub fn has_multiple_files(&self) -> bool {
        self.files.len() > 1
    }

    pub fn contains_gif(&self) -> bool {
        self.files.iter().any(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("gif"))
                .unwrap_or(false)
        })
    }
}

/// Size of the first file in the batch, read once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbedDimensions {
    #[default]
    Pending,
    Known { width: u32, height: u32 },
    Failed,
}

/// Read an image's pixel size from its header without decoding it. Blocking.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32), GateError> {
    image::image_dimensions(path).map_err(|e| GateError::ImageProbeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_flags() {
        let single = BatchContext::new(["a.png"]);
        assert!(!single.has_multiple_files());
        assert!(!single.contains_gif());

        let many = BatchContext::new(["a.png", "b.GIF"]);
        assert!(many.has_multiple_files());
        assert!(many.contains_gif());
        assert_eq!(many.len(), 2);

        assert!(BatchContext::default().is_empty());
    }

    #[test]
    fn reads_header_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::new(7, 5).save(&path).unwrap();

        assert_eq!(read_dimensions(&path).unwrap(), (7, 5));
    }

    #[test]
    fn unreadable_file_is_an_image_probe_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"nope").unwrap();

        match read_dimensions(&path) {
            Err(GateError::ImageProbeFailed { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
