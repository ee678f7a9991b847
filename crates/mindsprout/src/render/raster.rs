//! Raster and PDF export of SVG surfaces.
//!
//! The SVG produced by [`SvgSurface::to_svg`](crate::render::SvgSurface::to_svg) always carries
//! explicit `width`/`height` (already multiplied by the viewport zoom), so the output size is
//! that size times [`RasterOptions::scale`].

use crate::render::SvgSurface;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("SVG could not be parsed: {0}")]
    SvgParse(#[from] usvg::Error),
    #[error("output size {width}x{height} is not drawable")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("invalid background color `{0}`")]
    InvalidBackground(String),
    #[error("JPEG output needs an opaque background, got `{0}`")]
    TranslucentBackground(String),
    #[error("PNG encoding failed: {0}")]
    Png(String),
    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
    #[error("PDF conversion failed: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, RasterError>;

/// Output encodings supported by [`export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    Pdf,
}

impl RasterFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for RasterFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unsupported raster format `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Device pixel ratio applied on top of the SVG's own size.
    pub scale: f32,
    /// `None` keeps transparency (PNG only).
    pub background: Option<String>,
    pub jpeg_quality: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.5,
            background: Some("white".to_string()),
            jpeg_quality: 90,
        }
    }
}

/// Renders the current surface in `format`.
pub fn export(surface: &SvgSurface, format: RasterFormat, options: &RasterOptions) -> Result<Vec<u8>> {
    let svg = surface.to_svg();
    tracing::debug!(?format, scale = options.scale, "exporting surface");
    match format {
        RasterFormat::Png => svg_to_png(&svg, options),
        RasterFormat::Jpeg => svg_to_jpeg(&svg, options),
        RasterFormat::Pdf => svg_to_pdf(&svg),
    }
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let pixmap = rasterize(svg, options)?;
    pixmap
        .encode_png()
        .map_err(|err| RasterError::Png(err.to_string()))
}

pub fn svg_to_jpeg(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let background = options.background.as_deref().unwrap_or("white");
    let color = parse_color(background)?;
    if color.alpha() < 1.0 {
        return Err(RasterError::TranslucentBackground(background.to_string()));
    }
    let opaque = RasterOptions {
        background: Some(background.to_string()),
        ..options.clone()
    };
    let pixmap = rasterize(svg, &opaque)?;

    // Pixels are premultiplied; with an opaque background that equals straight RGB.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::new();
    let quality = options.jpeg_quality.clamp(1, 100);
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality).encode(
        &rgb,
        pixmap.width(),
        pixmap.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Vector PDF; text is resolved against the system font database.
pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = svg2pdf::usvg::Tree::from_str(svg, &opt)
        .map_err(|err| RasterError::Pdf(err.to_string()))?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|err| RasterError::Pdf(err.to_string()))
}

fn rasterize(svg: &str, options: &RasterOptions) -> Result<tiny_skia::Pixmap> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &opt)?;

    let scale = if options.scale.is_finite() && options.scale > 0.0 {
        options.scale
    } else {
        1.0
    };
    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or(RasterError::EmptyCanvas { width, height })?;

    if let Some(background) = options.background.as_deref() {
        pixmap.fill(parse_color(background)?);
    }
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

/// Accepts `transparent`, `white`, `black` and `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`.
fn parse_color(text: &str) -> Result<tiny_skia::Color> {
    let invalid = || RasterError::InvalidBackground(text.to_string());
    let trimmed = text.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "transparent" => return Ok(tiny_skia::Color::TRANSPARENT),
        "white" => return Ok(tiny_skia::Color::WHITE),
        "black" => return Ok(tiny_skia::Color::BLACK),
        _ => {}
    }

    let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |digits: &str| -> Result<u8> {
        let value = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
        Ok(if digits.len() == 1 { value * 17 } else { value })
    };
    let width = match hex.len() {
        3 | 4 => 1,
        6 | 8 => 2,
        _ => return Err(invalid()),
    };
    let mut channels = [255u8; 4];
    for (slot, start) in (0..hex.len()).step_by(width).enumerate() {
        channels[slot] = channel(&hex[start..start + width])?;
    }
    let [r, g, b, a] = channels;
    Ok(tiny_skia::Color::from_rgba8(r, g, b, a))
}
