// Library exports for splomgraph

pub mod data;
pub mod error;
pub mod ir;
pub mod parser;
pub mod runtime;
pub mod theme;

// Pipeline stages
pub mod algebra;
pub mod resolve;
pub mod defaults;
pub mod spread;
pub mod transform;
pub mod geom;
pub mod scale;
pub mod assemble;
pub mod backend;

pub use algebra::{blend, cross, layer, layers, merge};
pub use assemble::{plot, Renderer};
pub use data::{Dataset, Value};
pub use defaults::{apply_defaults, when_diagonal, when_off_diagonal, DefaultOverrides};
pub use error::{PlotError, Result};
pub use ir::{Drawing, DrawCommand, Layer, LayerPatch, Layout, PlotProps, PlotType, Spec, TransformKind};
pub use resolve::resolve_roles;
pub use spread::{assign_color_indices, spread};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Edge length of one grid cell.
    #[serde(default = "default_panel_size")]
    pub panel_size: u32,
    #[serde(default = "default_margin")]
    pub margin: u32,
    #[serde(default)]
    pub format: OutputFormat,
    /// Base theme; a spec's own theme overrides win over it.
    #[serde(default)]
    pub theme: theme::ThemeOverrides,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_panel_size() -> u32 { 250 }
fn default_margin() -> u32 { 30 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            panel_size: default_panel_size(),
            margin: default_margin(),
            format: OutputFormat::Png,
            theme: theme::ThemeOverrides::default(),
        }
    }
}
