//! File intake: turning dropped files into something the engine can hold.
//!
//! The logo slot only accepts images. Bytes are sniffed rather than trusted by extension, then
//! decoded once into RGBA so every renderer paints from the same pixels. The original bytes
//! survive as a base64 data URL for backends that embed the source (SVG).

use std::fmt;
use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};

use crate::error::{Error, Result};

/// A file handed over by a picker or drop zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads a file from disk, naming it after the last path component.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// A decoded logo image.
#[derive(Clone, PartialEq)]
pub struct LogoAsset {
    data_url: String,
    image: RgbaImage,
}

impl LogoAsset {
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl fmt::Debug for LogoAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        f.debug_struct("LogoAsset")
            .field("width", &w)
            .field("height", &h)
            .field("data_url_len", &self.data_url.len())
            .finish()
    }
}

fn decode_image(bytes: &[u8]) -> Result<(ImageFormat, RgbaImage)> {
    let format = image::guess_format(bytes)
        .map_err(|e| Error::UnsupportedImage(e.to_string()))?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    Ok((format, decoded.to_rgba8()))
}

// The media type always comes from the sniffed format, never from caller-supplied text.
fn to_data_url(format: ImageFormat, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", format.to_mime_type(), STANDARD.encode(bytes))
}

/// Decodes raw logo bytes.
///
/// # Errors
///
/// [`Error::UnsupportedImage`] when the bytes are not a recognizable image, [`Error::Image`]
/// when they are recognized but corrupt.
pub fn decode_logo(bytes: &[u8]) -> Result<LogoAsset> {
    let (format, image) = decode_image(bytes)?;
    Ok(LogoAsset {
        data_url: to_data_url(format, bytes),
        image,
    })
}

/// Accepts a logo that already arrives as a base64 `data:image/...` URL.
///
/// The stored URL is rebuilt from the decoded bytes, so its media type is the sniffed one and
/// any parameters on the original are dropped.
pub fn parse_data_url(data_url: &str) -> Result<LogoAsset> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| Error::InvalidDataUrl("missing data: scheme".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidDataUrl("missing ',' separator".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| Error::InvalidDataUrl("only base64 payloads are supported".into()))?;
    if !mime.starts_with("image/") {
        return Err(Error::UnsupportedImage(mime.to_string()));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::InvalidDataUrl(e.to_string()))?;
    let (format, image) = decode_image(&bytes)?;
    Ok(LogoAsset {
        data_url: to_data_url(format, &bytes),
        image,
    })
}
