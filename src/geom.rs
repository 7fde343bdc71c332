use crate::error::{PlotError, Result};
use crate::ir::{DrawCommand, Layer, PlotType, Style};
use crate::scale::{extent, LinearScale};
use crate::theme::Theme;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const HISTOGRAM_BINS: usize = 10;

/// Pixel box of one panel. Marks are drawn inside `margin..size - margin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelFrame {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl PanelFrame {
    pub fn x_range(&self) -> (f64, f64) {
        (self.margin, self.width - self.margin)
    }

    /// Inverted: data grows upward, pixels grow downward.
    pub fn y_range(&self) -> (f64, f64) {
        (self.height - self.margin, self.margin)
    }
}

/// What a geometry gets besides its layer. Scales are absent when the panel
/// had no values for that axis; geometries that need one report a render error.
#[derive(Debug, Clone, Copy)]
pub struct GeomContext<'a> {
    pub x_scale: Option<&'a LinearScale>,
    pub y_scale: Option<&'a LinearScale>,
    pub frame: PanelFrame,
    pub theme: &'a Theme,
}

impl<'a> GeomContext<'a> {
    pub fn x_scale(&self) -> Result<&'a LinearScale> {
        self.x_scale
            .ok_or_else(|| PlotError::Render("No values to compute a domain for the x axis".to_string()))
    }

    pub fn y_scale(&self) -> Result<&'a LinearScale> {
        self.y_scale
            .ok_or_else(|| PlotError::Render("No values to compute a domain for the y axis".to_string()))
    }

    fn opacity(&self, layer: &Layer) -> f64 {
        layer.opacity.unwrap_or(self.theme.opacity)
    }
}

pub type GeomFn = Arc<dyn Fn(&Layer, &GeomContext<'_>) -> Result<Vec<DrawCommand>> + Send + Sync>;

/// Geometries keyed by plot type. `Default` registers scatter, line and histogram.
#[derive(Clone)]
pub struct GeomRegistry {
    handlers: HashMap<PlotType, GeomFn>,
}

impl GeomRegistry {
    pub fn empty() -> Self {
        GeomRegistry {
            handlers: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, plot_type: PlotType, handler: F) -> &mut Self
    where
        F: Fn(&Layer, &GeomContext<'_>) -> Result<Vec<DrawCommand>> + Send + Sync + 'static,
    {
        self.handlers.insert(plot_type, Arc::new(handler));
        self
    }

    pub fn contains(&self, plot_type: &PlotType) -> bool {
        self.handlers.contains_key(plot_type)
    }

    pub fn render(&self, layer: &Layer, ctx: &GeomContext<'_>) -> Result<Vec<DrawCommand>> {
        let plot_type = layer
            .plot_type
            .as_ref()
            .ok_or_else(|| PlotError::UnknownGeometry("<unset>".to_string()))?;
        let handler = self
            .handlers
            .get(plot_type)
            .ok_or_else(|| PlotError::UnknownGeometry(plot_type.to_string()))?;
        handler(layer, ctx)
    }
}

impl Default for GeomRegistry {
    fn default() -> Self {
        let mut registry = GeomRegistry::empty();
        registry
            .register(PlotType::SCATTER, scatter)
            .register(PlotType::LINE, line)
            .register(PlotType::HISTOGRAM, histogram);
        registry
    }
}

impl fmt::Debug for GeomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().map(PlotType::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("GeomRegistry").field("plot_types", &kinds).finish()
    }
}

fn xy_roles<'l>(layer: &'l Layer, geom: &str) -> Result<(&'l str, &'l str)> {
    match (&layer.x, &layer.y) {
        (Some(x), Some(y)) => Ok((x.as_str(), y.as_str())),
        _ => Err(PlotError::InvalidData(format!(
            "{} layer over {:?} needs both x and y roles",
            geom, layer.columns
        ))),
    }
}

/// One filled circle per row with both x and y present.
pub fn scatter(layer: &Layer, ctx: &GeomContext<'_>) -> Result<Vec<DrawCommand>> {
    let (x, y) = xy_roles(layer, "scatter")?;
    let (xs, ys) = (ctx.x_scale()?, ctx.y_scale()?);
    let points = layer.dataset()?.numeric_pairs(x, y)?;
    let style = Style::filled(ctx.theme.mark_color(layer.color_index), ctx.opacity(layer));
    let radius = layer.point_radius.unwrap_or(ctx.theme.point_radius);

    Ok(points
        .into_iter()
        .map(|(px, py)| DrawCommand::Circle {
            center: (xs.map(px), ys.map(py)),
            radius,
            style: style.clone(),
        })
        .collect())
}

/// A single polyline through the points, sorted by x.
pub fn line(layer: &Layer, ctx: &GeomContext<'_>) -> Result<Vec<DrawCommand>> {
    let (x, y) = xy_roles(layer, "line")?;
    let (xs, ys) = (ctx.x_scale()?, ctx.y_scale()?);
    let mut points = layer.dataset()?.numeric_pairs(x, y)?;
    if points.len() < 2 {
        return Ok(Vec::new());
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let width = layer.stroke_width.unwrap_or(ctx.theme.stroke_width);
    let style = Style::stroked(ctx.theme.mark_color(layer.color_index), width, ctx.opacity(layer));

    Ok(vec![DrawCommand::Polyline {
        points: points.into_iter().map(|(px, py)| (xs.map(px), ys.map(py))).collect(),
        style,
    }])
}

/// Fixed-width bins over the x column; the y scale comes from the bin counts.
pub fn histogram(layer: &Layer, ctx: &GeomContext<'_>) -> Result<Vec<DrawCommand>> {
    let x = layer.x.as_deref().ok_or_else(|| {
        PlotError::InvalidData(format!("histogram layer over {:?} needs an x role", layer.columns))
    })?;
    let xs = ctx.x_scale()?;
    let values = layer.dataset()?.numeric_values(x)?;
    let hist = match Histogram::from_values(&values, HISTOGRAM_BINS) {
        Some(hist) => hist,
        None => return Ok(Vec::new()),
    };

    let max_count = hist.counts.iter().copied().max().unwrap_or(0) as f64;
    let ys = LinearScale::new((0.0, max_count), ctx.frame.y_range());
    let baseline = ctx.frame.y_range().0;
    let style = Style::filled(ctx.theme.mark_color(layer.color_index), ctx.opacity(layer));

    Ok(hist
        .counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let (lo, hi) = hist.bin_edges(i);
            let top = if max_count > 0.0 { ys.map(count as f64) } else { baseline };
            DrawCommand::Rect {
                tl: (xs.map(lo), top),
                br: (xs.map(hi), baseline),
                style: style.clone(),
            }
        })
        .collect())
}

/// Equal-width binning over `[min, max]` of the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// `None` when there is nothing to bin. A zero-width range uses unit-width bins.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Self> {
        let bins = bins.max(1);
        let (min, max) = extent(values.iter().copied())?;
        let range = max - min;
        let width = if range == 0.0 { 1.0 } else { range / bins as f64 };

        let mut hist = Histogram {
            min,
            width,
            counts: vec![0; bins],
        };
        for &v in values.iter().filter(|v| v.is_finite()) {
            let idx = hist.bin_index(v);
            hist.counts[idx] += 1;
        }
        Some(hist)
    }

    /// Values at the domain maximum land in the last bin.
    pub fn bin_index(&self, value: f64) -> usize {
        let raw = ((value - self.min) / self.width).floor();
        (raw.max(0.0) as usize).min(self.counts.len() - 1)
    }

    pub fn bin_edges(&self, index: usize) -> (f64, f64) {
        let lo = self.min + index as f64 * self.width;
        (lo, lo + self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Value};
    use approx::assert_relative_eq;
    use plotters::style::RGBColor;

    fn frame() -> PanelFrame {
        PanelFrame {
            width: 120.0,
            height: 120.0,
            margin: 10.0,
        }
    }

    fn layer(xs: &[f64], ys: &[f64]) -> Layer {
        let col = |v: &[f64]| v.iter().map(|&x| Value::Number(x)).collect::<Vec<_>>();
        let data = Dataset::from_columns(vec![("x", col(xs)), ("y", col(ys))]).unwrap();
        Layer::new(Arc::new(data)).with_x("x").with_y("y")
    }

    #[test]
    fn test_histogram_bins_scenario() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let hist = Histogram::from_values(&values, HISTOGRAM_BINS).unwrap();
        assert_eq!(hist.counts.len(), 10);
        assert_relative_eq!(hist.width, 0.8);
        assert_eq!(hist.bin_index(9.0), 9);
        assert_eq!(hist.bin_index(1.0), 0);
        assert_eq!(hist.counts.iter().sum::<usize>(), 9);
        assert_eq!(hist.counts[9], 1);
    }

    #[test]
    fn test_histogram_constant_values() {
        let hist = Histogram::from_values(&[3.0, 3.0], 10).unwrap();
        assert_eq!(hist.counts[0], 2);
        assert!(Histogram::from_values(&[], 10).is_none());
    }

    #[test]
    fn test_scatter_points_and_palette_color() {
        let theme = Theme::default();
        let xs = LinearScale::new((0.0, 10.0), frame().x_range());
        let ys = LinearScale::new((0.0, 10.0), frame().y_range());
        let ctx = GeomContext {
            x_scale: Some(&xs),
            y_scale: Some(&ys),
            frame: frame(),
            theme: &theme,
        };

        let mut l = layer(&[0.0, 10.0], &[0.0, 10.0]).with_plot_type(PlotType::SCATTER);
        l.color_index = Some(theme.palette.len() + 2);
        let cmds = GeomRegistry::default().render(&l, &ctx).unwrap();

        assert_eq!(cmds.len(), 2);
        match &cmds[0] {
            DrawCommand::Circle { center, style, .. } => {
                assert_eq!(*center, (10.0, 110.0));
                assert_eq!(style.fill, Some(theme.palette[2]));
            }
            other => panic!("Expected circle, got {:?}", other),
        }
    }

    #[test]
    fn test_line_sorted_polyline_with_layer_width() {
        let theme = Theme::default();
        let xs = LinearScale::new((0.0, 2.0), (0.0, 2.0));
        let ys = LinearScale::new((0.0, 2.0), (0.0, 2.0));
        let ctx = GeomContext {
            x_scale: Some(&xs),
            y_scale: Some(&ys),
            frame: frame(),
            theme: &theme,
        };

        let mut l = layer(&[2.0, 0.0, 1.0], &[2.0, 0.0, 1.0]).with_plot_type(PlotType::LINE);
        l.stroke_width = Some(4.0);
        let cmds = line(&l, &ctx).unwrap();
        match &cmds[..] {
            [DrawCommand::Polyline { points, style }] => {
                assert_eq!(points, &vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
                assert_eq!(style.stroke_width, 4.0);
                assert_eq!(style.stroke, Some(theme.mark));
            }
            other => panic!("Expected one polyline, got {:?}", other),
        }
    }

    #[test]
    fn test_histogram_rects_fill_panel_height() {
        let theme = Theme::default();
        let xs = LinearScale::new((1.0, 9.0), frame().x_range());
        let ctx = GeomContext {
            x_scale: Some(&xs),
            y_scale: None,
            frame: frame(),
            theme: &theme,
        };
        let l = layer(&[1.0, 1.0, 9.0], &[0.0, 0.0, 0.0]);
        let cmds = histogram(&l, &ctx).unwrap();
        assert_eq!(cmds.len(), HISTOGRAM_BINS);
        match &cmds[0] {
            DrawCommand::Rect { tl, br, .. } => {
                assert_relative_eq!(tl.0, 10.0);
                assert_relative_eq!(tl.1, 10.0);
                assert_relative_eq!(br.1, 110.0);
            }
            other => panic!("Expected rect, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_scale_is_render_error() {
        let theme = Theme::default();
        let ctx = GeomContext {
            x_scale: None,
            y_scale: None,
            frame: frame(),
            theme: &theme,
        };
        let err = scatter(&layer(&[1.0], &[1.0]), &ctx).unwrap_err();
        assert!(matches!(err, PlotError::Render(_)));
    }

    #[test]
    fn test_unknown_geometry() {
        let theme = Theme::default();
        let ctx = GeomContext {
            x_scale: None,
            y_scale: None,
            frame: frame(),
            theme: &theme,
        };
        let l = layer(&[1.0], &[1.0]).with_plot_type(PlotType::new("violin"));
        let err = GeomRegistry::default().render(&l, &ctx).unwrap_err();
        assert!(matches!(err, PlotError::UnknownGeometry(ref g) if g == "violin"));
    }

    #[test]
    fn test_builtin_geometries_registered() {
        let registry = GeomRegistry::default();
        for p in [PlotType::SCATTER, PlotType::LINE, PlotType::HISTOGRAM] {
            assert!(registry.contains(&p));
        }
        assert!(!registry.contains(&PlotType::new("violin")));
    }

    #[test]
    fn test_register_custom_geometry() {
        let mut registry = GeomRegistry::default();
        registry.register(PlotType::new("dot"), |_, _| {
            Ok(vec![DrawCommand::Circle {
                center: (0.0, 0.0),
                radius: 1.0,
                style: Style::filled(RGBColor(0, 0, 0), 1.0),
            }])
        });
        let theme = Theme::default();
        let ctx = GeomContext {
            x_scale: None,
            y_scale: None,
            frame: frame(),
            theme: &theme,
        };
        let l = Layer::default().with_plot_type(PlotType::new("dot"));
        assert_eq!(registry.render(&l, &ctx).unwrap().len(), 1);
    }
}
