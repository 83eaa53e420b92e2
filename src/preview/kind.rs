use serde::Serialize;

const IMAGE: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "avif", "tif", "tiff",
];
const AUDIO: &[&str] = &["mp3", "wav", "ogg", "oga", "flac", "m4a", "aac", "opus"];
const VIDEO: &[&str] = &["mp4", "m4v", "webm", "mov", "mkv", "avi", "ogv"];
const TEXT: &[&str] = &["txt", "log", "md", "markdown", "rst", "out", "err"];
const CODE: &[&str] = &[
    "json", "jsonl", "yaml", "yml", "toml", "ini", "cfg", "conf", "py", "ipynb", "js", "mjs",
    "ts", "tsx", "jsx", "rs", "go", "java", "kt", "c", "h", "cc", "cpp", "hpp", "cs", "rb",
    "php", "sh", "bash", "zsh", "sql", "r", "scala", "swift", "lua", "css", "scss", "proto",
];
const HTML: &[&str] = &["html", "htm"];
const TABLE: &[&str] = &["csv", "tsv", "xml"];

/// Preview family of a file, decided by its extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Svg,
    Audio,
    Video,
    Pdf,
    Text,
    Code,
    Html,
    Table,
    Unsupported,
}

impl ContentKind {
    pub fn classify(name: &str) -> Self {
        let Some(ext) = extension(name) else {
            return ContentKind::Unsupported;
        };
        let ext = ext.as_str();

        if IMAGE.contains(&ext) {
            ContentKind::Image
        } else if ext == "svg" {
            ContentKind::Svg
        } else if AUDIO.contains(&ext) {
            ContentKind::Audio
        } else if VIDEO.contains(&ext) {
            ContentKind::Video
        } else if ext == "pdf" {
            ContentKind::Pdf
        } else if TEXT.contains(&ext) {
            ContentKind::Text
        } else if CODE.contains(&ext) {
            ContentKind::Code
        } else if HTML.contains(&ext) {
            ContentKind::Html
        } else if TABLE.contains(&ext) {
            ContentKind::Table
        } else {
            ContentKind::Unsupported
        }
    }
}

/// Lowercased extension of the last path segment, if any.
pub fn extension(name: &str) -> Option<String> {
    let base = name.rsplit('/').next().unwrap_or(name);
    let (_, ext) = base.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// MIME type used when exposing a file of this name as a blob.
pub fn mime_type(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("avif") => "image/avif",
        Some("tif" | "tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg" | "oga" | "opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("mp4" | "m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("ogv") => "video/ogg",
        Some("pdf") => "application/pdf",
        Some("html" | "htm") => "text/html",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(ContentKind::classify("a/b/photo.JPG"), ContentKind::Image);
        assert_eq!(ContentKind::classify("logo.svg"), ContentKind::Svg);
        assert_eq!(ContentKind::classify("clip.webm"), ContentKind::Video);
        assert_eq!(ContentKind::classify("song.flac"), ContentKind::Audio);
        assert_eq!(ContentKind::classify("paper.pdf"), ContentKind::Pdf);
        assert_eq!(ContentKind::classify("notes.md"), ContentKind::Text);
        assert_eq!(ContentKind::classify("config.json"), ContentKind::Code);
        assert_eq!(ContentKind::classify("report.html"), ContentKind::Html);
        assert_eq!(ContentKind::classify("metrics.csv"), ContentKind::Table);
    }

    #[test]
    fn unknown_or_missing_extension_is_unsupported() {
        assert_eq!(ContentKind::classify("model.safetensors"), ContentKind::Unsupported);
        assert_eq!(ContentKind::classify("Makefile"), ContentKind::Unsupported);
        assert_eq!(ContentKind::classify("dir.v2/README"), ContentKind::Unsupported);
        assert_eq!(ContentKind::classify("trailing."), ContentKind::Unsupported);
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type("x.pdf"), "application/pdf");
        assert_eq!(mime_type("x.jpeg"), "image/jpeg");
        assert_eq!(mime_type("x.unknown"), "application/octet-stream");
    }
}
