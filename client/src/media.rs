use crate::error::{ClientError, ClientResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "heic", "heif", "webp"];
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];

/// Largest video the service accepts
pub const MAX_VIDEO_BYTES: u64 = 500 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A locally picked file, held in memory until it is uploaded or discarded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSelection {
    pub uri: PathBuf,
    pub width: u32,
    pub height: u32,
    pub media_type: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip)]
    extension: String,
}

impl MediaSelection {
    /// Inspect a local file and build a selection from it.
    ///
    /// Image dimensions come from the file header. Formats the decoder does not
    /// know (HEIC) keep 0x0 and are left for the service to convert.
    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or_else(|| {
                ClientError::InvalidInput(format!("{} has no file extension", path.display()))
            })?;

        let media_type = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Video
        } else {
            return Err(ClientError::InvalidInput(format!(
                "unsupported file type: .{}",
                extension
            )));
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;
        if !metadata.is_file() {
            return Err(ClientError::InvalidInput(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let (width, height) = match media_type {
            MediaKind::Image => match image::image_dimensions(path) {
                Ok(dims) => dims,
                Err(e) => {
                    tracing::debug!("Could not read dimensions of {}: {}", path.display(), e);
                    (0, 0)
                }
            },
            MediaKind::Video => {
                if metadata.len() > MAX_VIDEO_BYTES {
                    return Err(ClientError::InvalidInput(
                        "videos must be 500MB or smaller".to_string(),
                    ));
                }
                (0, 0)
            }
        };

        tracing::debug!(
            "Selected {:?} {} ({}x{})",
            media_type,
            path.display(),
            width,
            height
        );

        Ok(Self {
            uri: path.to_path_buf(),
            width,
            height,
            media_type,
            duration: None,
            extension,
        })
    }

    pub fn is_image(&self) -> bool {
        self.media_type == MediaKind::Image
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn mime_type(&self) -> &'static str {
        match (self.media_type, self.extension.as_str()) {
            (MediaKind::Image, "png") => "image/png",
            (MediaKind::Image, "heic" | "heif") => "image/heic",
            (MediaKind::Image, "webp") => "image/webp",
            (MediaKind::Image, _) => "image/jpeg",
            (MediaKind::Video, "mov") => "video/quicktime",
            (MediaKind::Video, "avi") => "video/x-msvideo",
            (MediaKind::Video, _) => "video/mp4",
        }
    }

    /// File name sent in the multipart upload; HEIC is announced as jpg
    pub fn upload_file_name(&self, stem: &str) -> String {
        let ext = match self.extension.as_str() {
            "heic" | "heif" => "jpg",
            other => other,
        };
        format!("{}.{}", stem, ext)
    }

    pub async fn read_bytes(&self) -> ClientResult<Vec<u8>> {
        tokio::fs::read(&self.uri)
            .await
            .map_err(|e| io_error(&self.uri, e))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ClientError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => {
            ClientError::PermissionDenied(path.display().to_string())
        }
        std::io::ErrorKind::NotFound => ClientError::NotFound(path.display().to_string()),
        _ => ClientError::from(err),
    }
}
