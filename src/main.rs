use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use qrcompose::compose::compose;
use qrcompose::document::DocumentRef;
use qrcompose::helper::{print_qr, save_composition, ModuleGrid};
use qrcompose::intake::DroppedFile;
use qrcompose::loader::LogoLoader;
use qrcompose::state::{LogoMode, QrColor, QrState, QrType};

const DECODE_TIMEOUT: Duration = Duration::from_secs(30);

/// Compose a QR code from text or a document, with an optional logo.
#[derive(Parser, Debug)]
#[command(name = "qrcompose", version, about)]
struct Cli {
    /// Text or URL to encode
    #[arg(long, conflicts_with = "document")]
    text: Option<String>,

    /// Document to "share"; only its file name is used
    #[arg(long)]
    document: Option<PathBuf>,

    /// Logo image to place on or behind the symbol
    #[arg(long)]
    logo: Option<PathBuf>,

    /// How the logo is composited: icon or background
    #[arg(long, env = "QRCOMPOSE_MODE", default_value = "icon")]
    mode: LogoMode,

    /// Background logo opacity, clamped to 0.1..=0.9
    #[arg(long, env = "QRCOMPOSE_OPACITY", default_value_t = 0.3)]
    opacity: f32,

    /// Foreground color as #rrggbb or #rgb
    #[arg(long, env = "QRCOMPOSE_COLOR", default_value = "#000000")]
    color: String,

    /// Edge length of raster output, in pixels
    #[arg(long, env = "QRCOMPOSE_PIXELS", default_value_t = 200)]
    pixels: u32,

    /// Output file; .svg writes SVG, anything else a raster image
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print the module grid to the terminal
    #[arg(long)]
    preview: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let color: QrColor = cli.color.parse().context("invalid --color")?;

    let mut state = QrState::new()
        .set_color(color)
        .set_logo_mode(cli.mode)
        .set_opacity(cli.opacity);

    if let Some(path) = &cli.document {
        let doc = DocumentRef::from_path(path)
            .with_context(|| format!("failed to open document {}", path.display()))?;
        state = state.select_type(QrType::Document).drop_document(doc);
    } else if let Some(text) = &cli.text {
        state = state.edit_payload(text.as_str());
    }

    if let Some(path) = &cli.logo {
        let loader = LogoLoader::new();
        let (next, ticket) = state.begin_logo_drop();
        match DroppedFile::read(path) {
            Ok(file) => {
                loader.submit(ticket, file);
                state = loader.settle(next, ticket, DECODE_TIMEOUT);
            }
            Err(e) => {
                state = next.finish_logo_drop(ticket, Err(e));
            }
        }
        if state.logo().is_none() {
            tracing::warn!("continuing without logo {}", path.display());
        }
    }

    let Some(composition) = compose(&state) else {
        tracing::info!("nothing to encode, pass --text or --document");
        return Ok(());
    };
    tracing::info!(payload = %composition.symbol.payload, "composed symbol");

    if cli.preview {
        let grid = ModuleGrid::encode(&composition.symbol).context("failed to encode payload")?;
        print_qr(&grid);
    }

    if let Some(out) = &cli.out {
        save_composition(&composition, out, cli.pixels)
            .with_context(|| format!("failed to write {}", out.display()))?;
        tracing::info!("wrote {}", out.display());
    }

    Ok(())
}
