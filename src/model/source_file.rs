use color_eyre::{eyre, Report};
use std::path::{Path, PathBuf};

/// A local file handed to the tracker for upload.
///
/// Name, size and MIME type are captured once, when the file is picked, and
/// copied onto the record at enqueue time.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = file_name(&path);
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        SourceFile {
            path,
            name,
            size,
            mime_type,
        }
    }

    /// Reads metadata for `path`; anything but a regular file is rejected
    pub async fn from_path(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(Report::msg(format!("Not a regular file: {}", path.display())));
        }
        Ok(SourceFile::new(path, metadata.len()))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
