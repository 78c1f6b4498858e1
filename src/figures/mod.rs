//! Static figures for the incidence/model comparison and the lag scan.
//!
//! Figures are drawn with `plotters` against any backend. The output format
//! follows the file extension: SVG and PNG are written directly, PDF is
//! rendered to SVG first and converted by an external program.

pub mod external;
pub mod incidence;
pub mod lag;
pub mod layout;

use anyhow::{Result, bail};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use external::ExternalTools;

/// Pixels per inch used to size figures given in inches.
pub const PIXELS_PER_INCH: f64 = 100.0;

/// A figure that can draw itself onto any plotters backend.
pub trait Figure {
    /// Size in inches.
    fn size_inches(&self) -> (f64, f64);

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static;

    fn size_pixels(&self) -> (u32, u32) {
        let (w, h) = self.size_inches();
        (
            (w * PIXELS_PER_INCH).round() as u32,
            (h * PIXELS_PER_INCH).round() as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureFormat {
    Svg,
    Png,
    Pdf,
}

impl FigureFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("svg") => Ok(Self::Svg),
            Some("png") => Ok(Self::Png),
            Some("pdf") => Ok(Self::Pdf),
            _ => bail!(
                "unsupported figure format for {} (expected .pdf, .svg or .png)",
                path.display()
            ),
        }
    }
}

/// Renders `figure` to `path`. PDF output goes through the configured converter.
pub fn render_figure<F: Figure>(figure: &F, path: &Path, tools: &ExternalTools) -> Result<FigureFormat> {
    let format = FigureFormat::from_path(path)?;
    let size = figure.size_pixels();
    debug!(path = %path.display(), ?format, width = size.0, height = size.1, "Rendering figure");

    match format {
        FigureFormat::Svg => draw_svg(figure, path, size)?,
        FigureFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            root.fill(&WHITE)?;
            figure.draw(&root)?;
            root.present()?;
        }
        FigureFormat::Pdf => {
            let svg = intermediate_svg_path(path);
            draw_svg(figure, &svg, size)?;
            let converted = tools.pdf_converter.run(&svg, path);
            std::fs::remove_file(&svg)?;
            converted?;
        }
    }

    info!(path = %path.display(), "Figure written");
    Ok(format)
}

/// Crops a PDF figure in place with the configured cropper, if any.
pub fn crop_figure(path: &Path, format: FigureFormat, tools: &ExternalTools) -> Result<()> {
    match (&tools.crop, format) {
        (Some(crop), FigureFormat::Pdf) => Ok(crop.run(path, path)?),
        (Some(_), _) => {
            debug!(path = %path.display(), "Skipping crop for non-PDF figure");
            Ok(())
        }
        (None, _) => Ok(()),
    }
}

fn draw_svg<F: Figure>(figure: &F, path: &Path, size: (u32, u32)) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    figure.draw(&root)?;
    root.present()?;
    Ok(())
}

fn intermediate_svg_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".svg");
    PathBuf::from(name)
}
