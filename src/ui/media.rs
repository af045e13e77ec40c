//! URL media classification by file extension.

/// Capabilities granted to sandboxed HTML previews and media frames.
/// Top-level navigation is not granted.
pub const SANDBOX_POLICY: &str = "allow-scripts allow-forms allow-modals allow-same-origin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
    Model,
    Html,
    Link,
}

impl MediaKind {
    /// Rendered inline inside a framed player or preview.
    pub fn is_framed(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Audio | MediaKind::Html)
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
            MediaKind::Model => "model",
            MediaKind::Html => "html",
            MediaKind::Link => "link",
        }
    }
}

const VIDEO: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv"];
const AUDIO: &[&str] = &["mp3", "wav", "ogg", "oga", "m4a", "flac", "aac"];
const IMAGE: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "avif", "ico",
];
const MODEL: &[&str] = &["glb", "gltf", "obj", "stl", "fbx", "usdz"];
const HTML: &[&str] = &["html", "htm"];

/// Classify `url` by the extension of its last path segment.
///
/// Query string and fragment are ignored. URLs without an extension, and
/// `data:` URLs, are plain links.
pub fn media_kind(url: &str) -> MediaKind {
    let Some(ext) = extension(url) else {
        return MediaKind::Link;
    };
    let ext = ext.to_ascii_lowercase();
    let table: [(&[&str], MediaKind); 5] = [
        (VIDEO, MediaKind::Video),
        (AUDIO, MediaKind::Audio),
        (IMAGE, MediaKind::Image),
        (MODEL, MediaKind::Model),
        (HTML, MediaKind::Html),
    ];
    table
        .into_iter()
        .find(|(exts, _)| exts.contains(&ext.as_str()))
        .map(|(_, kind)| kind)
        .unwrap_or(MediaKind::Link)
}

fn extension(url: &str) -> Option<&str> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let url = &url[..end];

    let path = match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            // The host has no extension worth sniffing.
            &rest[rest.find('/')?..]
        }
        None if url.starts_with("data:") => return None,
        None => url,
    };

    let last = path.rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}
