use crate::algebra::{layer, layers};
use crate::assemble::Renderer;
use crate::backend;
use crate::data::Dataset;
use crate::defaults::{when_diagonal, when_off_diagonal};
use crate::ir::{LayerPatch, Layout, PlotType, Spec, TransformKind};
use crate::parser::{parse_program, Axis, Expr, Modifier, Program};
use crate::resolve::resolve_roles;
use crate::RenderOptions;
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// Parse `dsl`, build the spec over `data`, render and encode it.
pub fn render_program(dsl: &str, data: Dataset, options: &RenderOptions) -> Result<Vec<u8>> {
    let spec = compile(dsl, Arc::new(data))?;
    let drawing = Renderer::new(options.clone())
        .render(spec)
        .context("Failed to render plot")?;
    tracing::info!(width = drawing.width, height = drawing.height, format = ?options.format, "encoding drawing");
    backend::encode(&drawing, options.format)
}

/// Parse `dsl` and turn it into a resolved spec with every modifier applied.
pub fn compile(dsl: &str, data: Arc<Dataset>) -> Result<Spec> {
    let program = parse_program(dsl)
        .map(|(_, program)| program)
        .map_err(|e| anyhow!("Parse error: {}", e))?;
    build_spec(&program, &data)
}

pub fn build_spec(program: &Program, data: &Arc<Dataset>) -> Result<Spec> {
    check_columns(&program.expr, data)?;
    let mut spec = eval(&program.expr, data);

    // Must be known before role resolution decides on a grid
    if program.modifiers.contains(&Modifier::Overlay) {
        spec.props.layout = Some(Layout::Overlay);
    }
    let mut spec = resolve_roles(spec).context("Failed to resolve layer roles")?;

    for modifier in &program.modifiers {
        spec = apply_modifier(spec, modifier);
    }
    tracing::debug!(layers = spec.layers.len(), modifiers = program.modifiers.len(), "built spec");
    Ok(spec)
}

fn eval(expr: &Expr, data: &Arc<Dataset>) -> Spec {
    match expr {
        Expr::Layer(cols) => layer(data, cols.iter().cloned()),
        Expr::Layers(cols) => layers(data, cols.iter().cloned()),
        Expr::Splom(cols) => layers(data, cols.iter().cloned()) * layers(data, cols.iter().cloned()),
        Expr::Cross(lhs, rhs) => eval(lhs, data) * eval(rhs, data),
        Expr::Blend(lhs, rhs) => eval(lhs, data) + eval(rhs, data),
    }
}

fn check_columns(expr: &Expr, data: &Dataset) -> Result<()> {
    match expr {
        Expr::Layer(cols) | Expr::Layers(cols) | Expr::Splom(cols) => {
            for col in cols {
                data.column(col)
                    .with_context(|| format!("Available columns: {:?}", data.headers()))?;
            }
            Ok(())
        }
        Expr::Cross(lhs, rhs) | Expr::Blend(lhs, rhs) => {
            check_columns(lhs, data)?;
            check_columns(rhs, data)
        }
    }
}

fn apply_modifier(spec: Spec, modifier: &Modifier) -> Spec {
    match modifier {
        Modifier::Color(col) => {
            let patch = LayerPatch {
                color_column: Some(col.clone()),
                ..Default::default()
            };
            spec.map_layers(|l| patch.apply(l))
        }
        Modifier::Facet(col) => {
            let patch = LayerPatch {
                facet_column: Some(col.clone()),
                ..Default::default()
            };
            spec.map_layers(|l| patch.apply(l))
        }
        Modifier::Geom(kind) => {
            let patch = LayerPatch::plot_type(PlotType::new(kind.clone()));
            spec.map_layers(|l| patch.apply(l))
        }
        Modifier::Diagonal(kind) => when_diagonal(spec, &LayerPatch::plot_type(PlotType::new(kind.clone()))),
        Modifier::OffDiagonal(kind) => {
            when_off_diagonal(spec, &LayerPatch::plot_type(PlotType::new(kind.clone())))
        }
        Modifier::Smooth { window } => {
            let patch = LayerPatch {
                window: *window,
                ..LayerPatch::transform(TransformKind::SMOOTH)
            };
            // Only layers with both roles have something to smooth
            spec.map_layers(|l| if l.x.is_some() && l.y.is_some() { patch.apply(l) } else { l })
        }
        Modifier::Domain { axis: Axis::X, min, max } => spec.with_x_domain(*min, *max),
        Modifier::Domain { axis: Axis::Y, min, max } => spec.with_y_domain(*min, *max),
        Modifier::Overlay => spec,
    }
}

/// CSV, or JSON when the file extension says so. `None` reads CSV from stdin.
pub fn load_dataset(path: Option<&Path>) -> Result<Dataset> {
    let Some(path) = path else {
        return Dataset::from_csv_reader(std::io::stdin().lock()).context("Failed to read CSV from stdin");
    };

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
        Dataset::from_json(&value).with_context(|| format!("Invalid JSON data in {}", path.display()))
    } else {
        Dataset::from_csv_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read CSV from {}", path.display()))
    }
}

/// `RenderOptions` from a JSON config file; defaults when no path is given.
pub fn load_options(path: Option<&Path>) -> Result<RenderOptions> {
    let Some(path) = path else {
        return Ok(RenderOptions::default());
    };
    let mut raw = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut raw))
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}
