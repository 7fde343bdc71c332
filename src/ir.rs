use crate::data::{Dataset, Value};
use crate::error::{PlotError, Result};
use crate::theme::ThemeOverrides;
use plotters::style::RGBColor;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Symbols
// =============================================================================

/// Names the geometry a layer is drawn with. Open set: any name registered
/// with a [`crate::geom::GeomRegistry`] is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlotType(Cow<'static, str>);

impl PlotType {
    pub const SCATTER: PlotType = PlotType(Cow::Borrowed("scatter"));
    pub const LINE: PlotType = PlotType(Cow::Borrowed("line"));
    pub const HISTOGRAM: PlotType = PlotType(Cow::Borrowed("histogram"));

    pub fn new(name: impl Into<String>) -> Self {
        PlotType(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names the statistical transform applied before geometry. Open set, like [`PlotType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformKind(Cow<'static, str>);

impl TransformKind {
    pub const IDENTITY: TransformKind = TransformKind(Cow::Borrowed("identity"));
    pub const SMOOTH: TransformKind = TransformKind(Cow::Borrowed("smooth"));

    pub fn new(name: impl Into<String>) -> Self {
        TransformKind(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Spec / Layer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// All layers share one panel.
    Overlay,
    /// Layers are placed in panels by `grid_row`/`grid_col`.
    Grid,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformOptions {
    /// Moving-average window for the smooth transform.
    pub window: Option<usize>,
}

/// One renderable unit. Every field except `columns` is optional so that
/// stages can tell "unset" apart from a value a caller chose.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    pub data: Option<Arc<Dataset>>,
    /// Positional columns, before role resolution.
    pub columns: Vec<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub diagonal: Option<bool>,
    pub grid_row: Option<usize>,
    pub grid_col: Option<usize>,
    pub plot_type: Option<PlotType>,
    pub color_column: Option<String>,
    pub facet_column: Option<String>,
    pub color_value: Option<Value>,
    pub facet_value: Option<Value>,
    pub color_index: Option<usize>,
    pub transform: Option<TransformKind>,
    pub transform_options: TransformOptions,
    pub stroke_width: Option<f64>,
    pub point_radius: Option<f64>,
    pub opacity: Option<f64>,
}

impl Layer {
    pub fn new(data: Arc<Dataset>) -> Self {
        Layer {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn is_diagonal(&self) -> bool {
        self.diagonal.unwrap_or(false)
    }

    /// A layer with a color or facet value has already been spread.
    pub fn is_spread(&self) -> bool {
        self.color_value.is_some() || self.facet_value.is_some()
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_x(mut self, x: impl Into<String>) -> Self {
        self.x = Some(x.into());
        self
    }

    pub fn with_y(mut self, y: impl Into<String>) -> Self {
        self.y = Some(y.into());
        self
    }

    pub fn with_plot_type(mut self, plot_type: PlotType) -> Self {
        self.plot_type = Some(plot_type);
        self
    }

    pub fn with_color_column(mut self, column: impl Into<String>) -> Self {
        self.color_column = Some(column.into());
        self
    }

    pub fn with_facet_column(mut self, column: impl Into<String>) -> Self {
        self.facet_column = Some(column.into());
        self
    }

    pub fn with_transform(mut self, transform: TransformKind) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_data(mut self, data: Arc<Dataset>) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn dataset(&self) -> Result<&Dataset> {
        self.data.as_deref().ok_or_else(|| {
            PlotError::InvalidData(format!(
                "Layer over {:?} has no dataset",
                self.columns
            ))
        })
    }
}

/// A partial set of rendering properties applied onto layers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerPatch {
    pub plot_type: Option<PlotType>,
    pub transform: Option<TransformKind>,
    pub window: Option<usize>,
    pub stroke_width: Option<f64>,
    pub point_radius: Option<f64>,
    pub opacity: Option<f64>,
    pub color_column: Option<String>,
    pub facet_column: Option<String>,
}

impl LayerPatch {
    pub fn plot_type(plot_type: PlotType) -> Self {
        LayerPatch {
            plot_type: Some(plot_type),
            ..Default::default()
        }
    }

    pub fn transform(transform: TransformKind) -> Self {
        LayerPatch {
            transform: Some(transform),
            ..Default::default()
        }
    }

    /// Set every property the patch carries, overwriting the layer's own.
    pub fn apply(&self, mut layer: Layer) -> Layer {
        self.merge_into(&mut layer, true);
        layer
    }

    /// Set only the properties the layer does not carry yet.
    pub fn fill(&self, mut layer: Layer) -> Layer {
        self.merge_into(&mut layer, false);
        layer
    }

    /// Field-wise union, `self` wins.
    pub fn or(&self, fallback: &LayerPatch) -> LayerPatch {
        LayerPatch {
            plot_type: self.plot_type.clone().or_else(|| fallback.plot_type.clone()),
            transform: self.transform.clone().or_else(|| fallback.transform.clone()),
            window: self.window.or(fallback.window),
            stroke_width: self.stroke_width.or(fallback.stroke_width),
            point_radius: self.point_radius.or(fallback.point_radius),
            opacity: self.opacity.or(fallback.opacity),
            color_column: self.color_column.clone().or_else(|| fallback.color_column.clone()),
            facet_column: self.facet_column.clone().or_else(|| fallback.facet_column.clone()),
        }
    }

    fn merge_into(&self, layer: &mut Layer, overwrite: bool) {
        set(&mut layer.plot_type, &self.plot_type, overwrite);
        set(&mut layer.transform, &self.transform, overwrite);
        set(&mut layer.transform_options.window, &self.window, overwrite);
        set(&mut layer.stroke_width, &self.stroke_width, overwrite);
        set(&mut layer.point_radius, &self.point_radius, overwrite);
        set(&mut layer.opacity, &self.opacity, overwrite);
        set(&mut layer.color_column, &self.color_column, overwrite);
        set(&mut layer.facet_column, &self.facet_column, overwrite);
    }
}

fn set<T: Clone>(dst: &mut Option<T>, src: &Option<T>, overwrite: bool) {
    if src.is_some() && (overwrite || dst.is_none()) {
        *dst = src.clone();
    }
}

/// Plot-wide properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotProps {
    pub layout: Option<Layout>,
    /// Fixed x limits, bypassing domain computation.
    pub x_domain: Option<(f64, f64)>,
    pub y_domain: Option<(f64, f64)>,
    pub theme: ThemeOverrides,
}

impl PlotProps {
    /// Field-wise merge, `other` wins.
    pub fn merge(&self, other: &PlotProps) -> PlotProps {
        PlotProps {
            layout: other.layout.or(self.layout),
            x_domain: other.x_domain.or(self.x_domain),
            y_domain: other.y_domain.or(self.y_domain),
            theme: self.theme.merge(&other.theme),
        }
    }
}

/// The declarative intermediate representation every stage consumes and returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spec {
    pub layers: Vec<Layer>,
    pub props: PlotProps,
}

impl Spec {
    pub fn new(layers: Vec<Layer>) -> Self {
        Spec {
            layers,
            props: PlotProps::default(),
        }
    }

    /// Carries neither layers nor plot-wide properties.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.props == PlotProps::default()
    }

    pub fn is_grid(&self) -> bool {
        self.props.layout == Some(Layout::Grid)
    }

    pub fn with_props(mut self, props: PlotProps) -> Self {
        self.props = props;
        self
    }

    pub fn with_x_domain(mut self, min: f64, max: f64) -> Self {
        self.props.x_domain = Some((min, max));
        self
    }

    pub fn with_y_domain(mut self, min: f64, max: f64) -> Self {
        self.props.y_domain = Some((min, max));
        self
    }

    /// Apply `f` to every layer, keeping plot-wide properties.
    pub fn map_layers(self, f: impl FnMut(Layer) -> Layer) -> Spec {
        Spec {
            layers: self.layers.into_iter().map(f).collect(),
            props: self.props,
        }
    }
}

// =============================================================================
// Draw commands
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<RGBColor>,
    pub stroke: Option<RGBColor>,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Style {
    pub fn filled(color: RGBColor, opacity: f64) -> Self {
        Style {
            fill: Some(color),
            stroke: None,
            stroke_width: 0.0,
            opacity,
        }
    }

    pub fn stroked(color: RGBColor, width: f64, opacity: f64) -> Self {
        Style {
            fill: None,
            stroke: Some(color),
            stroke_width: width,
            opacity,
        }
    }
}

/// A primitive in pixel coordinates (origin top-left), or a translated group of them.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        tl: (f64, f64),
        br: (f64, f64),
        style: Style,
    },
    Circle {
        center: (f64, f64),
        radius: f64,
        style: Style,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        style: Style,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        style: Style,
    },
    Group {
        dx: f64,
        dy: f64,
        children: Vec<DrawCommand>,
    },
}

impl DrawCommand {
    /// Shift a primitive by `(dx, dy)`. Groups absorb the offset.
    pub fn translated(&self, dx: f64, dy: f64) -> DrawCommand {
        let mv = |(x, y): (f64, f64)| (x + dx, y + dy);
        match self {
            DrawCommand::Rect { tl, br, style } => DrawCommand::Rect {
                tl: mv(*tl),
                br: mv(*br),
                style: style.clone(),
            },
            DrawCommand::Circle { center, radius, style } => DrawCommand::Circle {
                center: mv(*center),
                radius: *radius,
                style: style.clone(),
            },
            DrawCommand::Line { from, to, style } => DrawCommand::Line {
                from: mv(*from),
                to: mv(*to),
                style: style.clone(),
            },
            DrawCommand::Polyline { points, style } => DrawCommand::Polyline {
                points: points.iter().copied().map(mv).collect(),
                style: style.clone(),
            },
            DrawCommand::Group { dx: gx, dy: gy, children } => DrawCommand::Group {
                dx: gx + dx,
                dy: gy + dy,
                children: children.clone(),
            },
        }
    }
}

/// The rendering boundary: a canvas size plus a tree of draw commands, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<DrawCommand>,
}

impl Drawing {
    /// All primitives in paint order with group offsets applied.
    pub fn flatten(&self) -> Vec<DrawCommand> {
        let mut out = Vec::new();
        flatten_into(&self.commands, 0.0, 0.0, &mut out);
        out
    }
}

fn flatten_into(commands: &[DrawCommand], dx: f64, dy: f64, out: &mut Vec<DrawCommand>) {
    for cmd in commands {
        match cmd {
            DrawCommand::Group { dx: gx, dy: gy, children } => {
                flatten_into(children, dx + gx, dy + gy, out)
            }
            other => out.push(other.translated(dx, dy)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_fill_keeps_existing() {
        let layer = Layer::default().with_plot_type(PlotType::LINE);
        let patch = LayerPatch {
            plot_type: Some(PlotType::SCATTER),
            opacity: Some(0.5),
            ..Default::default()
        };
        let filled = patch.fill(layer);
        assert_eq!(filled.plot_type, Some(PlotType::LINE));
        assert_eq!(filled.opacity, Some(0.5));
    }

    #[test]
    fn test_patch_apply_overwrites() {
        let layer = Layer::default().with_plot_type(PlotType::LINE);
        let applied = LayerPatch::plot_type(PlotType::HISTOGRAM).apply(layer);
        assert_eq!(applied.plot_type, Some(PlotType::HISTOGRAM));
    }

    #[test]
    fn test_plot_type_const_equals_owned() {
        assert_eq!(PlotType::SCATTER, PlotType::new("scatter"));
        assert_ne!(PlotType::SCATTER, PlotType::new("line"));
    }

    #[test]
    fn test_props_merge_later_wins() {
        let a = PlotProps {
            layout: Some(Layout::Overlay),
            x_domain: Some((0.0, 1.0)),
            ..Default::default()
        };
        let b = PlotProps {
            x_domain: Some((5.0, 6.0)),
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert_eq!(merged.layout, Some(Layout::Overlay));
        assert_eq!(merged.x_domain, Some((5.0, 6.0)));
    }

    #[test]
    fn test_flatten_applies_nested_offsets() {
        let style = Style::filled(RGBColor(0, 0, 0), 1.0);
        let drawing = Drawing {
            width: 10,
            height: 10,
            commands: vec![DrawCommand::Group {
                dx: 5.0,
                dy: 1.0,
                children: vec![DrawCommand::Group {
                    dx: 1.0,
                    dy: 1.0,
                    children: vec![DrawCommand::Circle {
                        center: (1.0, 1.0),
                        radius: 2.0,
                        style,
                    }],
                }],
            }],
        };
        match &drawing.flatten()[..] {
            [DrawCommand::Circle { center, .. }] => assert_eq!(*center, (7.0, 3.0)),
            other => panic!("Expected one circle, got {:?}", other),
        }
    }
}
