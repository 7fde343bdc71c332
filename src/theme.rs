//! Theme resolution.
//!
//! `ThemeOverrides` is the loosely specified, mergeable form carried on a spec;
//! `Theme` is the fully concrete form the assembler and geometries draw with.

use crate::error::{PlotError, Result};
use plotters::style::RGBColor;
use serde::Deserialize;

/// Categorical palette indexed by `color_index`, cycled when exhausted.
pub const DEFAULT_PALETTE: [RGBColor; 8] = [
    RGBColor(0x4c, 0x72, 0xb0),
    RGBColor(0xdd, 0x84, 0x52),
    RGBColor(0x55, 0xa8, 0x68),
    RGBColor(0xc4, 0x4e, 0x52),
    RGBColor(0x81, 0x72, 0xb3),
    RGBColor(0x93, 0x78, 0x60),
    RGBColor(0xda, 0x8b, 0xc3),
    RGBColor(0x8c, 0x8c, 0x8c),
];

/// Fully resolved theme.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: RGBColor,
    pub panel_background: RGBColor,
    pub grid: RGBColor,
    pub axis: RGBColor,
    /// Mark color for layers without a color index.
    pub mark: RGBColor,
    pub palette: Vec<RGBColor>,
    pub stroke_width: f64,
    pub point_radius: f64,
    pub opacity: f64,
    pub grid_lines: usize,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: RGBColor(255, 255, 255),
            panel_background: RGBColor(234, 234, 242),
            grid: RGBColor(255, 255, 255),
            axis: RGBColor(64, 64, 64),
            mark: RGBColor(0x4c, 0x72, 0xb0),
            palette: DEFAULT_PALETTE.to_vec(),
            stroke_width: 2.0,
            point_radius: 3.0,
            opacity: 0.8,
            grid_lines: 6,
        }
    }
}

impl Theme {
    /// Color for a mark: palette entry when indexed, theme mark color otherwise.
    pub fn mark_color(&self, color_index: Option<usize>) -> RGBColor {
        match color_index {
            Some(idx) if !self.palette.is_empty() => self.palette[idx % self.palette.len()],
            _ => self.mark,
        }
    }
}

/// Partial theme carried on a spec. Colors are strings (`#RRGGBB`, `#RGB`, names, `grayNN`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ThemeOverrides {
    pub background: Option<String>,
    pub panel_background: Option<String>,
    pub grid: Option<String>,
    pub axis: Option<String>,
    pub mark: Option<String>,
    pub palette: Option<Vec<String>>,
    pub stroke_width: Option<f64>,
    pub point_radius: Option<f64>,
    pub opacity: Option<f64>,
}

impl ThemeOverrides {
    /// Field-wise merge, `other` wins.
    pub fn merge(&self, other: &ThemeOverrides) -> ThemeOverrides {
        ThemeOverrides {
            background: other.background.clone().or_else(|| self.background.clone()),
            panel_background: other.panel_background.clone().or_else(|| self.panel_background.clone()),
            grid: other.grid.clone().or_else(|| self.grid.clone()),
            axis: other.axis.clone().or_else(|| self.axis.clone()),
            mark: other.mark.clone().or_else(|| self.mark.clone()),
            palette: other.palette.clone().or_else(|| self.palette.clone()),
            stroke_width: other.stroke_width.or(self.stroke_width),
            point_radius: other.point_radius.or(self.point_radius),
            opacity: other.opacity.or(self.opacity),
        }
    }

    pub fn resolve(&self) -> Result<Theme> {
        let base = Theme::default();
        let color = |value: &Option<String>, fallback: RGBColor| -> Result<RGBColor> {
            match value {
                Some(s) => require_color(s),
                None => Ok(fallback),
            }
        };

        let palette = match &self.palette {
            Some(names) if !names.is_empty() => {
                names.iter().map(|s| require_color(s)).collect::<Result<Vec<_>>>()?
            }
            _ => base.palette.clone(),
        };

        Ok(Theme {
            background: color(&self.background, base.background)?,
            panel_background: color(&self.panel_background, base.panel_background)?,
            grid: color(&self.grid, base.grid)?,
            axis: color(&self.axis, base.axis)?,
            mark: color(&self.mark, base.mark)?,
            palette,
            stroke_width: self.stroke_width.unwrap_or(base.stroke_width),
            point_radius: self.point_radius.unwrap_or(base.point_radius),
            opacity: self.opacity.unwrap_or(base.opacity).clamp(0.0, 1.0),
            grid_lines: base.grid_lines,
        })
    }
}

fn require_color(s: &str) -> Result<RGBColor> {
    parse_color(s).ok_or_else(|| PlotError::InvalidData(format!("Invalid color '{}'", s)))
}

/// Parse a color string into RGBColor, supporting hex (#RRGGBB, #RGB) and named colors
pub fn parse_color(color_str: &str) -> Option<RGBColor> {
    let color_str = color_str.trim();

    if color_str.starts_with('#') {
        return parse_hex_color(color_str);
    }

    match color_str.to_lowercase().as_str() {
        "white" => Some(RGBColor(255, 255, 255)),
        "black" => Some(RGBColor(0, 0, 0)),
        "red" => Some(RGBColor(255, 0, 0)),
        "green" => Some(RGBColor(0, 128, 0)),
        "blue" => Some(RGBColor(0, 0, 255)),
        "orange" => Some(RGBColor(255, 165, 0)),
        "purple" => Some(RGBColor(128, 0, 128)),
        "gray" | "grey" => Some(RGBColor(128, 128, 128)),
        "darkgray" | "darkgrey" => Some(RGBColor(64, 64, 64)),
        "lightgray" | "lightgrey" => Some(RGBColor(192, 192, 192)),
        // gray0 = black, gray100 = white
        s if s.starts_with("gray") || s.starts_with("grey") => {
            let n = s[4..].parse::<u8>().ok().filter(|&n| n <= 100)?;
            let v = (n as f64 * 2.55).round() as u8;
            Some(RGBColor(v, v, v))
        }
        _ => None,
    }
}

fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(RGBColor(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(RGBColor(r, g, b))
        }
        _ => None,
    }
}
