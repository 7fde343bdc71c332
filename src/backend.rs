//! Turns a `Drawing` into bytes through plotters.

use crate::ir::{DrawCommand, Drawing, Style};
use crate::OutputFormat;
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;

pub fn encode(drawing: &Drawing, format: OutputFormat) -> Result<Vec<u8>> {
    if drawing.width == 0 || drawing.height == 0 {
        anyhow::bail!("Cannot render a {}x{} canvas", drawing.width, drawing.height);
    }
    match format {
        OutputFormat::Png => encode_png(drawing),
        OutputFormat::Svg => encode_svg(drawing).map(String::into_bytes),
    }
}

pub fn encode_png(drawing: &Drawing) -> Result<Vec<u8>> {
    let (width, height) = (drawing.width, drawing.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        paint(&root, drawing)?;
        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(&buffer, width, height, image::ColorType::Rgb8)
        .context("Failed to encode PNG")?;
    Ok(png_bytes)
}

pub fn encode_svg(drawing: &Drawing) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (drawing.width, drawing.height)).into_drawing_area();
        paint(&root, drawing)?;
        root.present().context("Failed to present drawing")?;
    }
    Ok(svg)
}

fn paint<DB>(root: &DrawingArea<DB, Shift>, drawing: &Drawing) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    for cmd in drawing.flatten() {
        match cmd {
            DrawCommand::Rect { tl, br, style } => {
                for shape in shape_styles(&style) {
                    root.draw(&Rectangle::new([px(tl), px(br)], shape))
                        .context("Failed to draw rectangle")?;
                }
            }
            DrawCommand::Circle { center, radius, style } => {
                let radius = radius.round().max(1.0) as i32;
                for shape in shape_styles(&style) {
                    root.draw(&Circle::new(px(center), radius, shape))
                        .context("Failed to draw circle")?;
                }
            }
            DrawCommand::Line { from, to, style } => {
                if let Some(shape) = stroke_style(&style) {
                    root.draw(&PathElement::new(vec![px(from), px(to)], shape))
                        .context("Failed to draw line")?;
                }
            }
            DrawCommand::Polyline { points, style } => {
                if let Some(shape) = stroke_style(&style) {
                    let points: Vec<_> = points.into_iter().map(px).collect();
                    root.draw(&PathElement::new(points, shape))
                        .context("Failed to draw polyline")?;
                }
            }
            // flatten() never yields groups
            DrawCommand::Group { .. } => {}
        }
    }
    Ok(())
}

fn px((x, y): (f64, f64)) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

/// Fill first, then outline, so a stroked and filled shape keeps its edge.
fn shape_styles(style: &Style) -> Vec<ShapeStyle> {
    let fill = style.fill.map(|color| color.mix(style.opacity).filled());
    fill.into_iter().chain(stroke_style(style)).collect()
}

fn stroke_style(style: &Style) -> Option<ShapeStyle> {
    let width = style.stroke_width.round().max(1.0) as u32;
    style
        .stroke
        .map(|color| color.mix(style.opacity).stroke_width(width))
}
