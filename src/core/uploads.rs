use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::warn;

/// Images attached to the next outgoing message, as data URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingUploads {
    images: Vec<String>,
}

impl PendingUploads {
    /// Read and encode an image file. Unreadable files are logged and skipped.
    pub fn add_file(&mut self, path: &Path) -> bool {
        match std::fs::read(path) {
            Ok(bytes) => {
                self.add_bytes(mime_for(path), &bytes);
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "dropping unreadable upload");
                false
            }
        }
    }

    pub fn add_bytes(&mut self, mime: &str, bytes: &[u8]) {
        self.images
            .push(format!("data:{mime};base64,{}", STANDARD.encode(bytes)));
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Hand the images to a message and reset the list.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.images)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn encodes_files_as_data_urls() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let mut uploads = PendingUploads::default();
        assert!(uploads.add_file(file.path()));
        assert_eq!(uploads.images(), ["data:image/png;base64,iVBORw=="]);
    }

    #[test]
    fn unreadable_files_are_dropped() {
        let missing = {
            let file = NamedTempFile::new().unwrap();
            file.path().to_path_buf()
        };
        let mut uploads = PendingUploads::default();
        assert!(!uploads.add_file(&missing));
        assert!(uploads.is_empty());
    }

    #[test]
    fn take_empties_the_list() {
        let mut uploads = PendingUploads::default();
        uploads.add_bytes("image/gif", b"GIF89a");
        uploads.add_bytes("image/gif", b"GIF87a");
        assert_eq!(uploads.remove(5), None);
        assert!(uploads.remove(0).is_some());
        assert_eq!(uploads.take().len(), 1);
        assert!(uploads.is_empty());
    }
}
