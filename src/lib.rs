//! # qrcompose
//!
//! A Rust library for composing QR codes with logos, colors and translucent backgrounds.
//!
//! `qrcompose` models a QR code form as one immutable state record. Named transitions move it
//! from one state to the next, and a pure composition step turns a state into rendering
//! instructions. The symbol is always encoded at error correction level H, so a centered logo
//! can replace the modules beneath it without breaking the code.
//!
//! ## Features
//!
//! - Encode free-form text/URLs, or a placeholder share link built from a dropped document.
//! - Embed a logo as a 1:5 centered icon with the underlying modules excavated.
//! - Or draw the logo full-bleed behind a transparent symbol at 0.1 to 0.9 opacity.
//! - Custom foreground color on a transparent background.
//! - Render as RGBA images, PNG files, SVG documents or console previews.
//! - Decode logos off-thread; the latest drop always wins.
//!
//! ## Example
//!
//! Compose and render a symbol:
//!
//! ```rust
//! use qrcompose::compose::compose;
//! use qrcompose::helper::{RasterRenderer, SymbolRenderer};
//! use qrcompose::state::QrState;
//!
//! let state = QrState::new()
//!     .edit_payload("https://acme.test")
//!     .set_color("#1e3a8a".parse().unwrap());
//! let composition = compose(&state).expect("payload is not empty");
//! let img = RasterRenderer::default().render(&composition).unwrap();
//! assert_eq!(img.dimensions(), (200, 200));
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The view state and its transitions.
//! - [`compose`]: The composition engine.
//! - [`helper`]: Rendering backends for composed symbols.
//! - [`intake`]: Reading and decoding dropped files.
//! - [`loader`]: Off-thread logo decoding with last-writer-wins.
//! - [`document`]: Placeholder document share links.

pub mod compose;
pub mod document;
pub mod error;
pub mod helper;
pub mod intake;
pub mod loader;
pub mod state;

pub use error::{Error, Result};
