//! Error type shared by the intake and rendering layers.
//!
//! State transitions never return these: a failed logo decode degrades to "no logo" inside
//! [`crate::state::QrState::finish_logo_drop`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("payload cannot be encoded at level H: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("not a supported image: {0}")]
    UnsupportedImage(String),
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
    #[error("invalid color {0:?}, expected #rrggbb or #rgb")]
    InvalidColor(String),
    #[error("logo decoder panicked before reporting")]
    DecodeAborted,
}

pub type Result<T> = std::result::Result<T, Error>;
