//! The view state and its transitions.
//!
//! [`QrState`] is a single immutable record. Each user action is a method that takes the old
//! state by value and returns the new one, so every intermediate state can be composed and
//! compared on its own.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::{placeholder_share_url, DocumentRef};
use crate::error::{Error, Result};
use crate::intake::LogoAsset;

/// Which input drives the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrType {
    #[default]
    Link,
    Document,
}

/// How a logo is composited with the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogoMode {
    /// Embedded in the center of the symbol with the modules underneath excavated.
    #[default]
    Icon,
    /// Drawn full-bleed behind a transparent symbol.
    Background,
}

impl FromStr for LogoMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icon" => Ok(LogoMode::Icon),
            "background" => Ok(LogoMode::Background),
            other => Err(format!("unknown logo mode {other:?}, expected icon or background")),
        }
    }
}

/// Background layer opacity, held in tenths so it can only take the slider's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opacity(u8);

impl Opacity {
    pub const MIN: Opacity = Opacity(1);
    pub const MAX: Opacity = Opacity(9);

    /// Clamps to [0.1, 0.9] and snaps to the nearest 0.1. Non-finite input yields the default.
    pub fn new(value: f32) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        let tenths = (value * 10.0).round().clamp(Self::MIN.0 as f32, Self::MAX.0 as f32);
        Opacity(tenths as u8)
    }

    pub fn value(self) -> f32 {
        self.0 as f32 / 10.0
    }

    pub fn tenths(self) -> u8 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Opacity(3)
    }
}

impl fmt::Display for Opacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

/// Foreground color of the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QrColor([u8; 3]);

impl QrColor {
    pub const BLACK: QrColor = QrColor([0, 0, 0]);

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        QrColor([r, g, b])
    }

    pub fn channels(self) -> [u8; 3] {
        self.0
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for QrColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let invalid = || Error::InvalidColor(s.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(QrColor([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            3 => {
                let mut out = [0u8; 3];
                for (slot, i) in out.iter_mut().zip(0..3) {
                    let d = channel(&hex[i..i + 1])?;
                    *slot = d * 16 + d;
                }
                Ok(QrColor(out))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for QrColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Proof that a logo drop was started. Only the most recently issued ticket can land a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogoTicket(u64);

impl LogoTicket {
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// Everything the form knows at one instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QrState {
    qr_type: QrType,
    payload: String,
    logo: Option<Arc<LogoAsset>>,
    logo_mode: LogoMode,
    opacity: Opacity,
    color: QrColor,
    document: Option<DocumentRef>,
    logo_seq: u64,
}

impl QrState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn qr_type(&self) -> QrType {
        self.qr_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn logo(&self) -> Option<&Arc<LogoAsset>> {
        self.logo.as_ref()
    }

    pub fn logo_mode(&self) -> LogoMode {
        self.logo_mode
    }

    pub fn opacity(&self) -> Opacity {
        self.opacity
    }

    pub fn color(&self) -> QrColor {
        self.color
    }

    pub fn document(&self) -> Option<&DocumentRef> {
        self.document.as_ref()
    }

    /// The mode toggle is only offered once a logo is present.
    pub fn shows_logo_mode_toggle(&self) -> bool {
        self.logo.is_some()
    }

    /// The opacity slider is only offered in background mode.
    pub fn shows_opacity_slider(&self) -> bool {
        self.logo.is_some() && self.logo_mode == LogoMode::Background
    }

    /// Switches the top-level input. The payload carries over untouched.
    pub fn select_type(self, qr_type: QrType) -> Self {
        debug!(?qr_type, "select qr type");
        Self { qr_type, ..self }
    }

    /// A keystroke in the link/text field. Ignored in document mode, where the payload is
    /// derived.
    pub fn edit_payload(self, text: impl Into<String>) -> Self {
        if self.qr_type != QrType::Link {
            debug!("payload edit ignored outside link mode");
            return self;
        }
        Self {
            payload: text.into(),
            ..self
        }
    }

    /// A document drop. Recomputes the payload as the placeholder share link for `doc`.
    pub fn drop_document(self, doc: DocumentRef) -> Self {
        if self.qr_type != QrType::Document {
            debug!(name = doc.name(), "document drop ignored outside document mode");
            return self;
        }
        let payload = placeholder_share_url(doc.name());
        debug!(%payload, "document dropped");
        Self {
            payload,
            document: Some(doc),
            ..self
        }
    }

    /// Starts a logo drop and issues the ticket its decode must present.
    pub fn begin_logo_drop(self) -> (Self, LogoTicket) {
        let logo_seq = self.logo_seq + 1;
        debug!(seq = logo_seq, "logo drop started");
        (Self { logo_seq, ..self }, LogoTicket(logo_seq))
    }

    pub fn is_latest_logo_ticket(&self, ticket: LogoTicket) -> bool {
        ticket.0 == self.logo_seq
    }

    /// Lands a finished decode. Stale tickets are discarded; a failed decode leaves no logo.
    pub fn finish_logo_drop(self, ticket: LogoTicket, decoded: Result<LogoAsset>) -> Self {
        if !self.is_latest_logo_ticket(ticket) {
            debug!(
                seq = ticket.0,
                latest = self.logo_seq,
                "stale logo decode discarded"
            );
            return self;
        }
        match decoded {
            Ok(asset) => {
                debug!(seq = ticket.0, ?asset, "logo decoded");
                Self {
                    logo: Some(Arc::new(asset)),
                    ..self
                }
            }
            Err(e) => {
                warn!(seq = ticket.0, error = %e, "logo decode failed, continuing without logo");
                Self { logo: None, ..self }
            }
        }
    }

    /// Removes the logo and invalidates any decode still in flight.
    pub fn clear_logo(self) -> Self {
        debug!("logo cleared");
        Self {
            logo: None,
            logo_seq: self.logo_seq + 1,
            ..self
        }
    }

    pub fn set_logo_mode(self, logo_mode: LogoMode) -> Self {
        debug!(?logo_mode, "logo mode set");
        Self { logo_mode, ..self }
    }

    pub fn set_opacity(self, value: f32) -> Self {
        let opacity = Opacity::new(value);
        debug!(%opacity, requested = value, "opacity set");
        Self { opacity, ..self }
    }

    pub fn set_color(self, color: QrColor) -> Self {
        debug!(%color, "color set");
        Self { color, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn logo() -> LogoAsset {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        crate::intake::decode_logo(&png).unwrap()
    }

    #[test]
    fn test_defaults() {
        let state = QrState::new();
        assert_eq!(state.qr_type(), QrType::Link);
        assert_eq!(state.payload(), "");
        assert_eq!(state.logo_mode(), LogoMode::Icon);
        assert_eq!(state.opacity().value(), 0.3);
        assert_eq!(state.color(), QrColor::BLACK);
        assert!(state.logo().is_none());
        assert!(!state.shows_logo_mode_toggle());
        assert!(!state.shows_opacity_slider());
    }

    #[test]
    fn test_opacity_clamps_and_snaps() {
        assert_eq!(Opacity::new(0.0), Opacity::MIN);
        assert_eq!(Opacity::new(-3.0), Opacity::MIN);
        assert_eq!(Opacity::new(1.0), Opacity::MAX);
        assert_eq!(Opacity::new(0.74).value(), 0.7);
        assert_eq!(Opacity::new(0.76).value(), 0.8);
        assert_eq!(Opacity::new(f32::NAN), Opacity::default());
        assert_eq!(Opacity::new(f32::INFINITY), Opacity::default());
        assert_eq!(Opacity::new(0.7).to_string(), "0.7");
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("#FF8800".parse::<QrColor>().unwrap(), QrColor::rgb(255, 136, 0));
        assert_eq!("1e90ff".parse::<QrColor>().unwrap(), QrColor::rgb(30, 144, 255));
        assert_eq!("#0f8".parse::<QrColor>().unwrap(), QrColor::rgb(0, 255, 136));
        assert_eq!(QrColor::rgb(255, 136, 0).to_hex(), "#ff8800");
        for bad in ["", "#12", "#12345", "#gg0000", "#+1+1+1", "#ééé"] {
            assert!(bad.parse::<QrColor>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_logo_mode_from_str() {
        assert_eq!("Background".parse::<LogoMode>().unwrap(), LogoMode::Background);
        assert_eq!("icon".parse::<LogoMode>().unwrap(), LogoMode::Icon);
        assert!("overlay".parse::<LogoMode>().is_err());
    }

    #[test]
    fn test_edit_payload_only_in_link_mode() {
        let state = QrState::new().edit_payload("hello");
        assert_eq!(state.payload(), "hello");
        let state = state.select_type(QrType::Document).edit_payload("typed");
        assert_eq!(state.payload(), "hello");
    }

    #[test]
    fn test_document_payload_carries_back_to_link() {
        let state = QrState::new()
            .select_type(QrType::Document)
            .drop_document(DocumentRef::new("report.pdf"))
            .select_type(QrType::Link);
        assert_eq!(state.payload(), "https://example.com/shared-document/report.pdf");
        assert_eq!(state.document().map(DocumentRef::name), Some("report.pdf"));
        let state = state.edit_payload("https://acme.test");
        assert_eq!(state.payload(), "https://acme.test");
    }

    #[test]
    fn test_document_drop_replaces_previous() {
        let state = QrState::new()
            .select_type(QrType::Document)
            .drop_document(DocumentRef::new("a.pdf"))
            .drop_document(DocumentRef::new("b.pdf"));
        assert_eq!(state.payload(), "https://example.com/shared-document/b.pdf");
    }

    #[test]
    fn test_document_drop_ignored_in_link_mode() {
        let state = QrState::new()
            .edit_payload("keep")
            .drop_document(DocumentRef::new("a.pdf"));
        assert_eq!(state.payload(), "keep");
        assert!(state.document().is_none());
    }

    #[test]
    fn test_latest_logo_drop_wins_when_finished_out_of_order() {
        let (state, first) = QrState::new().begin_logo_drop();
        let (state, second) = state.begin_logo_drop();
        let newer = logo();
        let state = state.finish_logo_drop(second, Ok(newer.clone()));
        let state = state.finish_logo_drop(first, Err(Error::DecodeAborted));
        assert_eq!(state.logo().map(|l| l.as_ref()), Some(&newer));
    }

    #[test]
    fn test_stale_logo_finishing_first_is_ignored() {
        let (state, first) = QrState::new().begin_logo_drop();
        let (state, second) = state.begin_logo_drop();
        let state = state.finish_logo_drop(first, Ok(logo()));
        assert!(state.logo().is_none());
        assert!(state.is_latest_logo_ticket(second));
    }

    #[test]
    fn test_failed_decode_leaves_logo_unset() {
        let (state, t1) = QrState::new().begin_logo_drop();
        let state = state.finish_logo_drop(t1, Ok(logo()));
        assert!(state.logo().is_some());
        let (state, t2) = state.begin_logo_drop();
        let state = state.finish_logo_drop(t2, Err(Error::UnsupportedImage("pdf".into())));
        assert!(state.logo().is_none());
    }

    #[test]
    fn test_mode_switch_keeps_logo() {
        let (state, t) = QrState::new().begin_logo_drop();
        let state = state.finish_logo_drop(t, Ok(logo()));
        let before = state.logo().cloned();
        let state = state
            .set_logo_mode(LogoMode::Background)
            .set_logo_mode(LogoMode::Icon);
        assert!(Arc::ptr_eq(before.as_ref().unwrap(), state.logo().unwrap()));
    }

    #[test]
    fn test_clear_logo_invalidates_in_flight_decode() {
        let (state, t) = QrState::new().begin_logo_drop();
        let state = state.clear_logo().finish_logo_drop(t, Ok(logo()));
        assert!(state.logo().is_none());
    }

    #[test]
    fn test_controls_visibility() {
        let (state, t) = QrState::new().begin_logo_drop();
        let state = state.finish_logo_drop(t, Ok(logo()));
        assert!(state.shows_logo_mode_toggle());
        assert!(!state.shows_opacity_slider());
        let state = state.set_logo_mode(LogoMode::Background);
        assert!(state.shows_opacity_slider());
    }
}
