//! Symbol rendering backends.
//!
//! The composition engine decides *what* to draw; this module draws it. The QR symbol itself
//! comes from the `qrcode` crate, and everything layered around it (excavation, icon, background
//! logo, colors) is applied here, either into an RGBA raster or an SVG document.

use std::fs;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use qrcode::{Color, QrCode};

use crate::compose::{BackgroundLayer, Composition, EmbeddedImage, Fill, Fit, SymbolSpec};
use crate::error::Result;
use crate::intake::LogoAsset;

/*---- Module grid ----*/

/// A rectangle of modules, in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CellRect {
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// The dark/light modules of an encoded symbol, after excavation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGrid {
    width: usize,
    modules: Vec<bool>,
    excavated: Option<CellRect>,
}

impl ModuleGrid {
    /// Encodes `spec.payload` at `spec.error_correction` and clears the cells under an
    /// excavating embedded image.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Encode`] when the payload does not fit in any QR version at that level.
    pub fn encode(spec: &SymbolSpec) -> Result<Self> {
        let code = QrCode::with_error_correction_level(
            spec.payload.as_bytes(),
            spec.error_correction.into(),
        )?;
        let width = code.width();
        let mut modules: Vec<bool> = code
            .to_colors()
            .into_iter()
            .map(|c| c == Color::Dark)
            .collect();

        let excavated = excavation_region(width, spec);
        if let Some(rect) = excavated {
            for y in rect.y..rect.y + rect.height {
                for x in rect.x..rect.x + rect.width {
                    modules[y * width + x] = false;
                }
            }
        }
        Ok(Self {
            width,
            modules,
            excavated,
        })
    }

    /// Modules per side.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns whether the module at (x, y) is dark. Out-of-range coordinates are light.
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let w = self.width as i32;
        (0..w).contains(&x) && (0..w).contains(&y) && self.modules[(y * w + x) as usize]
    }

    pub fn excavated(&self) -> Option<CellRect> {
        self.excavated
    }
}

/// The cells hidden under the embedded image, when it asks for excavation.
///
/// The image's logical size is scaled into cells by `module_count / spec.size`. An image
/// without explicit coordinates is centered. The origin is floored and the extent ceiled so
/// every partially covered cell is cleared.
pub fn excavation_region(module_count: usize, spec: &SymbolSpec) -> Option<CellRect> {
    let image = spec.embedded_image.as_ref().filter(|i| i.excavate)?;
    let (x, y, w, h) = image_cells(module_count, spec.size, image);
    let fx = x.floor();
    let fy = y.floor();
    let clamp = |v: f64| (v.max(0.0) as usize).min(module_count);
    let left = clamp(fx);
    let top = clamp(fy);
    let right = clamp(fx + (w + x - fx).ceil());
    let bottom = clamp(fy + (h + y - fy).ceil());
    Some(CellRect {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    })
}

// Position and size of an embedded image in (fractional) cell units.
fn image_cells(module_count: usize, size: u32, image: &EmbeddedImage) -> (f64, f64, f64, f64) {
    let cells = module_count as f64;
    let size = size as f64;
    let w = image.width as f64 * cells / size;
    let h = image.height as f64 * cells / size;
    let x = image.x.map_or(cells / 2.0 - w / 2.0, |x| x as f64 * cells / size);
    let y = image.y.map_or(cells / 2.0 - h / 2.0, |y| y as f64 * cells / size);
    (x, y, w, h)
}

/*---- Renderers ----*/

/// Turns a [`Composition`] into something drawable.
pub trait SymbolRenderer {
    type Output;

    fn render(&self, composition: &Composition) -> Result<Self::Output>;
}

/// Renders to an RGBA image `pixels` wide and high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterRenderer {
    pub pixels: u32,
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self {
            pixels: crate::compose::SYMBOL_SIZE,
        }
    }
}

impl SymbolRenderer for RasterRenderer {
    type Output = RgbaImage;

    fn render(&self, composition: &Composition) -> Result<RgbaImage> {
        let grid = ModuleGrid::encode(&composition.symbol)?;
        Ok(generate_image_buffer(&grid, composition, self.pixels.max(1)))
    }
}

/// Renders to an SVG document string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SvgRenderer;

impl SymbolRenderer for SvgRenderer {
    type Output = String;

    fn render(&self, composition: &Composition) -> Result<String> {
        let grid = ModuleGrid::encode(&composition.symbol)?;
        Ok(to_svg_string(&grid, composition))
    }
}

fn fill_pixel(fill: Fill) -> Rgba<u8> {
    match fill {
        Fill::Transparent => Rgba([0, 0, 0, 0]),
        Fill::Solid(color) => {
            let [r, g, b] = color.channels();
            Rgba([r, g, b, 255])
        }
    }
}

/// Paints the background layer, the symbol, then the icon, bottom to top.
pub fn generate_image_buffer(grid: &ModuleGrid, composition: &Composition, pixels: u32) -> RgbaImage {
    let symbol = &composition.symbol;
    let mut img = match &composition.background {
        Some(layer) => background_pixels(layer, pixels),
        None => RgbaImage::from_pixel(pixels, pixels, Rgba([0, 0, 0, 0])),
    };

    let light = fill_pixel(symbol.background);
    let [r, g, b] = symbol.foreground.channels();
    let dark = Rgba([r, g, b, 255]);
    let cells = grid.width() as u64;

    for y in 0..pixels {
        for x in 0..pixels {
            let qr_x = (x as u64 * cells / pixels as u64) as i32;
            let qr_y = (y as u64 * cells / pixels as u64) as i32;
            if grid.get_module(qr_x, qr_y) {
                img.put_pixel(x, y, dark);
            } else if light[3] != 0 {
                img.put_pixel(x, y, light);
            }
        }
    }

    if let Some(icon) = &symbol.embedded_image {
        let scale = pixels as f64 / symbol.size as f64;
        let w = ((icon.width as f64 * scale).round() as u32).max(1);
        let h = ((icon.height as f64 * scale).round() as u32).max(1);
        let left = icon
            .x
            .map_or((pixels as i64 - w as i64) / 2, |x| (x as f64 * scale) as i64);
        let top = icon
            .y
            .map_or((pixels as i64 - h as i64) / 2, |y| (y as f64 * scale) as i64);
        let resized = imageops::resize(icon.source.image(), w, h, FilterType::Triangle);
        paint_over(&mut img, &resized, left, top);
    }

    img
}

fn background_pixels(layer: &BackgroundLayer, pixels: u32) -> RgbaImage {
    let mut img = match layer.fit {
        Fit::Cover => cover_fit(&layer.source, pixels),
    };
    let tenths = layer.opacity.tenths() as u32;
    for p in img.pixels_mut() {
        p[3] = ((p[3] as u32 * tenths + 5) / 10) as u8;
    }
    img
}

// Source-over compositing of `top` onto `dst` at (left, top_y). Opaque pixels are copied as is.
fn paint_over(dst: &mut RgbaImage, top: &RgbaImage, left: i64, top_y: i64) {
    for (x, y, src) in top.enumerate_pixels() {
        let dx = left + x as i64;
        let dy = top_y + y as i64;
        if dx < 0 || dy < 0 || dx >= dst.width() as i64 || dy >= dst.height() as i64 {
            continue;
        }
        let (dx, dy) = (dx as u32, dy as u32);
        match src[3] {
            0 => {}
            255 => dst.put_pixel(dx, dy, *src),
            sa => {
                let under = *dst.get_pixel(dx, dy);
                let sa = sa as u32;
                let da = under[3] as u32 * (255 - sa) / 255;
                let out_a = sa + da;
                let mut out = [0u8; 4];
                for c in 0..3 {
                    out[c] = ((src[c] as u32 * sa + under[c] as u32 * da) / out_a) as u8;
                }
                out[3] = out_a as u8;
                dst.put_pixel(dx, dy, Rgba(out));
            }
        }
    }
}

// Scales the logo to cover a square, then crops the overflow evenly from both sides.
fn cover_fit(logo: &LogoAsset, pixels: u32) -> RgbaImage {
    let (iw, ih) = logo.dimensions();
    let scale = f64::max(pixels as f64 / iw as f64, pixels as f64 / ih as f64);
    let rw = ((iw as f64 * scale).ceil() as u32).max(pixels);
    let rh = ((ih as f64 * scale).ceil() as u32).max(pixels);
    let resized = imageops::resize(logo.image(), rw, rh, FilterType::Triangle);
    imageops::crop_imm(&resized, (rw - pixels) / 2, (rh - pixels) / 2, pixels, pixels).to_image()
}

/*---- SVG ----*/

// Escapes text for use inside a double-quoted XML attribute.
fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn svg_fill(fill: Fill) -> Option<String> {
    match fill {
        Fill::Transparent => None,
        Fill::Solid(color) => Some(color.to_hex()),
    }
}

/// Returns an SVG document depicting the composition, one viewBox unit per module.
///
/// The string always uses Unix newlines (\n), regardless of the platform.
pub fn to_svg_string(grid: &ModuleGrid, composition: &Composition) -> String {
    let symbol = &composition.symbol;
    let cells = grid.width();
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{0}\" viewBox=\"0 0 {1} {1}\" shape-rendering=\"crispEdges\">\n",
        symbol.size, cells
    );
    if let Some(layer) = &composition.background {
        result += &format!(
            "\t<image href=\"{}\" x=\"0\" y=\"0\" width=\"{1}\" height=\"{1}\" preserveAspectRatio=\"xMidYMid slice\" opacity=\"{2}\"/>\n",
            escape_attr(layer.source.data_url()),
            cells,
            layer.opacity
        );
    }
    if let Some(fill) = svg_fill(symbol.background) {
        result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n", fill);
    }
    result += "\t<path d=\"";
    let mut first = true;
    for y in 0..cells as i32 {
        for x in 0..cells as i32 {
            if grid.get_module(x, y) {
                if !first {
                    result += " ";
                }
                first = false;
                result += &format!("M{},{}h1v1h-1z", x, y);
            }
        }
    }
    result += &format!("\" fill=\"{}\"/>\n", symbol.foreground.to_hex());
    if let Some(icon) = &symbol.embedded_image {
        let (x, y, w, h) = image_cells(cells, symbol.size, icon);
        result += &format!(
            "\t<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\"/>\n",
            escape_attr(icon.source.data_url()),
            x,
            y,
            w,
            h
        );
    }
    result += "</svg>\n";
    result
}

/*---- Utilities ----*/

/// Prints the module grid to the console, with a four-module quiet zone.
pub fn print_qr(grid: &ModuleGrid) {
    let border: i32 = 4;
    let size = grid.width() as i32;
    for y in -border..size + border {
        for x in -border..size + border {
            let c: char = if grid.get_module(x, y) { '█' } else { ' ' };
            print!("{0}{0}", c);
        }
        println!();
    }
    println!();
}

/// Renders the composition and writes it to `path`.
///
/// A `.svg` extension selects the SVG backend. Anything else goes through the raster backend
/// and `image`'s extension-based encoder (PNG is the usual choice, since it keeps the
/// transparency). Missing parent directories are created.
///
/// # Arguments
///
/// * `composition` - What to draw.
/// * `path` - Destination file.
/// * `pixels` - Edge length of the raster output; ignored for SVG.
pub fn save_composition(composition: &Composition, path: &Path, pixels: u32) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let is_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        fs::write(path, SvgRenderer.render(composition)?)?;
    } else {
        RasterRenderer { pixels }.render(composition)?.save(path)?;
    }
    Ok(())
}
