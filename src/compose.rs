//! The composition engine.
//!
//! [`compose`] reads a [`QrState`] and returns the full set of rendering instructions: what
//! the symbol encodes, how it is colored, whether a logo is embedded in it, and whether a logo
//! layer is drawn behind it. It is a pure function: identical state always yields identical
//! output, and nothing is cached between calls.

use std::sync::Arc;

use crate::intake::LogoAsset;
use crate::state::{LogoMode, Opacity, QrColor, QrState};

/// Logical edge length of the symbol.
pub const SYMBOL_SIZE: u32 = 200;
/// Logical edge length of an embedded icon, one fifth of the symbol.
pub const ICON_SIZE: u32 = 40;

/// QR error correction levels, lowest to highest redundancy.
///
/// [`compose`] always asks for [`ErrorCorrection::High`]; the lower levels exist because a
/// [`SymbolSpec`] handed to a renderer from elsewhere may carry any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

impl From<ErrorCorrection> for qrcode::EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => qrcode::EcLevel::L,
            ErrorCorrection::Medium => qrcode::EcLevel::M,
            ErrorCorrection::Quartile => qrcode::EcLevel::Q,
            ErrorCorrection::High => qrcode::EcLevel::H,
        }
    }
}

/// Fill behind the symbol's light modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Transparent,
    Solid(QrColor),
}

/// How a background image is fitted to the symbol's square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Scale to cover the whole square, cropping the overflow around the center.
    Cover,
}

/// A logo embedded in the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub source: Arc<LogoAsset>,
    pub width: u32,
    pub height: u32,
    /// Left edge in logical units; `None` centers horizontally.
    pub x: Option<u32>,
    /// Top edge in logical units; `None` centers vertically.
    pub y: Option<u32>,
    /// Clear the modules underneath instead of painting over them.
    pub excavate: bool,
}

/// Parameters handed to a symbol renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSpec {
    pub payload: String,
    pub size: u32,
    pub error_correction: ErrorCorrection,
    pub foreground: QrColor,
    pub background: Fill,
    pub embedded_image: Option<EmbeddedImage>,
}

/// A logo layer drawn underneath the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundLayer {
    pub source: Arc<LogoAsset>,
    pub opacity: Opacity,
    pub fit: Fit,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub symbol: SymbolSpec,
    pub background: Option<BackgroundLayer>,
}

/// Computes the rendering instructions for `state`.
///
/// Returns `None` when the payload is empty; there is nothing to draw and that is not an error.
///
/// # Example
///
/// ```rust
/// use qrcompose::compose::{compose, ErrorCorrection, Fill};
/// use qrcompose::state::QrState;
///
/// assert!(compose(&QrState::new()).is_none());
///
/// let state = QrState::new().edit_payload("https://acme.test");
/// let composition = compose(&state).unwrap();
/// assert_eq!(composition.symbol.payload, "https://acme.test");
/// assert_eq!(composition.symbol.error_correction, ErrorCorrection::High);
/// assert_eq!(composition.symbol.background, Fill::Transparent);
/// assert!(composition.symbol.embedded_image.is_none());
/// assert!(composition.background.is_none());
/// ```
pub fn compose(state: &QrState) -> Option<Composition> {
    if state.payload().is_empty() {
        return None;
    }

    let logo = state.logo().cloned();
    let (embedded_image, background) = match (logo, state.logo_mode()) {
        (None, _) => (None, None),
        (Some(source), LogoMode::Icon) => (
            Some(EmbeddedImage {
                source,
                width: ICON_SIZE,
                height: ICON_SIZE,
                x: None,
                y: None,
                excavate: true,
            }),
            None,
        ),
        (Some(source), LogoMode::Background) => (
            None,
            Some(BackgroundLayer {
                source,
                opacity: state.opacity(),
                fit: Fit::Cover,
            }),
        ),
    };

    Some(Composition {
        symbol: SymbolSpec {
            payload: state.payload().to_string(),
            size: SYMBOL_SIZE,
            error_correction: ErrorCorrection::High,
            foreground: state.color(),
            background: Fill::Transparent,
            embedded_image,
        },
        background,
    })
}
