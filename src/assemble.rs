use crate::defaults::{apply_defaults, DefaultOverrides};
use crate::error::{PlotError, Result};
use crate::geom::{GeomContext, GeomRegistry, PanelFrame};
use crate::ir::{DrawCommand, Drawing, Layer, Spec, Style};
use crate::resolve::resolve_roles;
use crate::scale::{compute_domain, ticks, LinearScale};
use crate::spread::{assign_color_indices, spread};
use crate::theme::Theme;
use crate::transform::TransformRegistry;
use crate::RenderOptions;
use std::collections::BTreeMap;

/// Render a spec with the built-in transforms, geometries and options.
pub fn plot(spec: Spec) -> Result<Drawing> {
    Renderer::default().render(spec)
}

/// Turns a spec into a `Drawing`. Holds the transform and geometry registries
/// so callers can register their own handlers before rendering.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub transforms: TransformRegistry,
    pub geoms: GeomRegistry,
    pub options: RenderOptions,
    pub defaults: Option<DefaultOverrides>,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer {
            options,
            ..Default::default()
        }
    }

    pub fn with_defaults(mut self, defaults: DefaultOverrides) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// resolve -> defaults -> spread -> color indices. Every step is idempotent,
    /// so an already-prepared spec comes back unchanged.
    pub fn prepare(&self, spec: Spec) -> Result<Spec> {
        let spec = resolve_roles(spec)?;
        let spec = apply_defaults(spec, self.defaults.as_ref());
        let spec = spread(spec)?;
        Ok(assign_color_indices(spec))
    }

    /// Fail before drawing anything if a layer names an unregistered
    /// transform or geometry.
    pub fn check_handlers(&self, spec: &Spec) -> Result<()> {
        for layer in &spec.layers {
            if let Some(kind) = layer.transform.as_ref().filter(|k| !self.transforms.contains(k)) {
                return Err(PlotError::UnknownTransform(kind.to_string()));
            }
            if let Some(plot_type) = layer.plot_type.as_ref().filter(|p| !self.geoms.contains(p)) {
                return Err(PlotError::UnknownGeometry(plot_type.to_string()));
            }
        }
        Ok(())
    }

    pub fn render(&self, spec: Spec) -> Result<Drawing> {
        let spec = self.prepare(spec)?;
        self.check_handlers(&spec)?;
        let theme = self.options.theme.merge(&spec.props.theme).resolve()?;

        if spec.layers.iter().any(|l| l.grid_row.is_some()) {
            self.render_grid(&spec, &theme)
        } else {
            self.render_single(&spec, &theme)
        }
    }

    fn render_single(&self, spec: &Spec, theme: &Theme) -> Result<Drawing> {
        let (width, height) = (self.options.width, self.options.height);
        let frame = PanelFrame {
            width: width as f64,
            height: height as f64,
            margin: self.options.margin as f64,
        };
        let layers: Vec<&Layer> = spec.layers.iter().collect();

        let mut commands = vec![canvas_background(width, height, theme)];
        commands.extend(self.render_panel(&layers, spec, frame, theme)?);

        tracing::debug!(layers = layers.len(), width, height, "rendered single panel");
        Ok(Drawing {
            width,
            height,
            commands,
        })
    }

    fn render_grid(&self, spec: &Spec, theme: &Theme) -> Result<Drawing> {
        let mut cells: BTreeMap<(usize, usize), Vec<&Layer>> = BTreeMap::new();
        for layer in &spec.layers {
            let key = (layer.grid_row.unwrap_or(0), layer.grid_col.unwrap_or(0));
            cells.entry(key).or_default().push(layer);
        }

        let max_row = cells.keys().map(|(r, _)| *r).max().unwrap_or(0);
        let max_col = cells.keys().map(|(_, c)| *c).max().unwrap_or(0);
        let panel = self.options.panel_size;
        let width = (max_col as u32 + 1) * panel;
        let height = (max_row as u32 + 1) * panel;

        let frame = PanelFrame {
            width: panel as f64,
            height: panel as f64,
            margin: self.options.margin.min(panel / 4) as f64,
        };

        let mut commands = vec![canvas_background(width, height, theme)];
        for ((row, col), layers) in &cells {
            let children = self.render_panel(layers, spec, frame, theme)?;
            commands.push(DrawCommand::Group {
                dx: (*col as u32 * panel) as f64,
                dy: (*row as u32 * panel) as f64,
                children,
            });
        }

        tracing::debug!(cells = cells.len(), rows = max_row + 1, cols = max_col + 1, "rendered grid");
        Ok(Drawing {
            width,
            height,
            commands,
        })
    }

    /// One panel in its own coordinate system: domains pooled over just these
    /// layers (after transforms), then background, grid, axes and marks.
    fn render_panel(
        &self,
        layers: &[&Layer],
        spec: &Spec,
        frame: PanelFrame,
        theme: &Theme,
    ) -> Result<Vec<DrawCommand>> {
        let transformed = layers
            .iter()
            .map(|layer| self.transforms.apply(layer))
            .collect::<Result<Vec<_>>>()?;

        let x_scale = match spec.props.x_domain {
            Some(domain) => Some(domain),
            None => pooled_domain(&transformed, "x", |l| l.x.as_deref())?,
        }
        .map(|domain| LinearScale::new(domain, frame.x_range()));
        let y_scale = match spec.props.y_domain {
            Some(domain) => Some(domain),
            None => pooled_domain(&transformed, "y", |l| l.y.as_deref())?,
        }
        .map(|domain| LinearScale::new(domain, frame.y_range()));

        let mut commands = panel_chrome(frame, theme);
        let ctx = GeomContext {
            x_scale: x_scale.as_ref(),
            y_scale: y_scale.as_ref(),
            frame,
            theme,
        };
        for layer in &transformed {
            commands.extend(self.geoms.render(layer, &ctx)?);
        }
        Ok(commands)
    }
}

/// Domain over the non-null values of every layer's `role` column. `None`
/// when nothing contributes; geometries needing the axis report that.
fn pooled_domain(
    layers: &[Layer],
    axis: &str,
    role: impl Fn(&Layer) -> Option<&str>,
) -> Result<Option<(f64, f64)>> {
    let mut values = Vec::new();
    for layer in layers {
        if let (Some(column), Some(data)) = (role(layer), layer.data.as_deref()) {
            values.extend(data.numeric_values(column)?);
        }
    }
    Ok(compute_domain(axis, values).ok())
}

fn canvas_background(width: u32, height: u32, theme: &Theme) -> DrawCommand {
    DrawCommand::Rect {
        tl: (0.0, 0.0),
        br: (width as f64, height as f64),
        style: Style::filled(theme.background, 1.0),
    }
}

/// Panel background, evenly spaced grid lines on both axes, then the two axis lines.
fn panel_chrome(frame: PanelFrame, theme: &Theme) -> Vec<DrawCommand> {
    let (left, right) = frame.x_range();
    let (bottom, top) = frame.y_range();
    let grid = Style::stroked(theme.grid, 1.0, 1.0);
    let axis = Style::stroked(theme.axis, 1.0, 1.0);

    let mut commands = vec![DrawCommand::Rect {
        tl: (left, top),
        br: (right, bottom),
        style: Style::filled(theme.panel_background, 1.0),
    }];
    for x in ticks(left, right, theme.grid_lines) {
        commands.push(DrawCommand::Line {
            from: (x, top),
            to: (x, bottom),
            style: grid.clone(),
        });
    }
    for y in ticks(top, bottom, theme.grid_lines) {
        commands.push(DrawCommand::Line {
            from: (left, y),
            to: (right, y),
            style: grid.clone(),
        });
    }
    commands.push(DrawCommand::Line {
        from: (left, top),
        to: (left, bottom),
        style: axis.clone(),
    });
    commands.push(DrawCommand::Line {
        from: (left, bottom),
        to: (right, bottom),
        style: axis,
    });
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{cross, layer, layers};
    use crate::data::{Dataset, Value};
    use crate::ir::{Layout, PlotProps, PlotType, TransformKind};
    use std::sync::Arc;

    fn data() -> Arc<Dataset> {
        Arc::new(
            Dataset::from_columns(vec![
                ("x", [1.0, 2.0, 3.0, 4.0, 5.0].map(Value::Number).to_vec()),
                ("y", [2.0, 4.0, 6.0, 8.0, 10.0].map(Value::Number).to_vec()),
                ("color", ["a", "a", "b", "b", "a"].map(Value::from).to_vec()),
            ])
            .unwrap(),
        )
    }

    fn circles(drawing: &Drawing) -> Vec<DrawCommand> {
        drawing
            .flatten()
            .into_iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
            .collect()
    }

    #[test]
    fn test_single_panel_scatter() {
        let drawing = plot(layer(&data(), ["x", "y"])).unwrap();
        assert_eq!((drawing.width, drawing.height), (800, 600));
        assert_eq!(circles(&drawing).len(), 5);

        // canvas + panel background + 6 + 6 grid lines + 2 axes before any mark
        let first_mark = drawing
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::Circle { .. }))
            .unwrap();
        assert_eq!(first_mark, 16);
    }

    #[test]
    fn test_scatter_corners_hit_panel_edges() {
        let drawing = plot(layer(&data(), ["x", "y"])).unwrap();
        let centers: Vec<_> = circles(&drawing)
            .into_iter()
            .map(|c| match c {
                DrawCommand::Circle { center, .. } => center,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(centers[0], (30.0, 570.0));
        assert_eq!(centers[4], (770.0, 30.0));
    }

    #[test]
    fn test_color_spread_uses_palette() {
        let spec = layer(&data(), ["x", "y"]).map_layers(|l| l.with_color_column("color"));
        let drawing = plot(spec).unwrap();
        let theme = Theme::default();
        let fills: Vec<_> = circles(&drawing)
            .into_iter()
            .map(|c| match c {
                DrawCommand::Circle { style, .. } => style.fill,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(fills.len(), 5);
        assert_eq!(fills.iter().filter(|f| **f == Some(theme.palette[0])).count(), 3);
        assert_eq!(fills.iter().filter(|f| **f == Some(theme.palette[1])).count(), 2);
    }

    #[test]
    fn test_prepared_spec_renders_the_same() {
        let spec = layer(&data(), ["x", "y"]).map_layers(|l| l.with_color_column("color"));
        let renderer = Renderer::default();
        let prepared = renderer.prepare(spec.clone()).unwrap();
        assert_eq!(renderer.prepare(prepared.clone()).unwrap(), prepared);

        let direct = plot(spec).unwrap();
        let staged = plot(prepared).unwrap();
        assert_eq!((staged.width, staged.height), (800, 600));
        assert_eq!(staged, direct);
    }

    #[test]
    fn test_grid_canvas_and_cells() {
        let d = data();
        let spec = cross([layers(&d, ["x", "y"]), layers(&d, ["x", "y"])]);
        let drawing = plot(spec).unwrap();
        assert_eq!((drawing.width, drawing.height), (500, 500));

        let offsets: Vec<_> = drawing
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Group { dx, dy, .. } => Some((*dx, *dy)),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![(0.0, 0.0), (250.0, 0.0), (0.0, 250.0), (250.0, 250.0)]);

        // two off-diagonal scatter cells of five points each
        assert_eq!(circles(&drawing).len(), 10);
        let rects = drawing
            .flatten()
            .into_iter()
            .filter(|c| matches!(c, DrawCommand::Rect { .. }))
            .count();
        // canvas + four panel backgrounds + two histograms
        assert_eq!(rects, 1 + 4 + 20);
    }

    #[test]
    fn test_grid_cells_are_isolated() {
        let d = data();
        let spec = cross([layers(&d, ["x", "y"]), layers(&d, ["x", "y"])]);
        let drawing = plot(spec).unwrap();
        // cell (row 0, col 1) plots y against x; its max point sits in the top right
        match &drawing.commands[2] {
            DrawCommand::Group { children, .. } => {
                let last = children
                    .iter()
                    .rev()
                    .find_map(|c| match c {
                        DrawCommand::Circle { center, .. } => Some(*center),
                        _ => None,
                    })
                    .unwrap();
                assert_eq!(last, (220.0, 30.0));
            }
            other => panic!("Expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_domain_override() {
        let spec = layer(&data(), ["x", "y"]).with_x_domain(0.0, 10.0);
        let drawing = plot(spec).unwrap();
        match &circles(&drawing)[0] {
            DrawCommand::Circle { center, .. } => assert_eq!(center.0, 30.0 + 740.0 * 0.1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_all_null_axis_is_render_error() {
        let d = Arc::new(
            Dataset::from_columns(vec![
                ("x", vec![Value::Number(1.0), Value::Number(2.0)]),
                ("y", vec![Value::Null, Value::Null]),
            ])
            .unwrap(),
        );
        let err = plot(layer(&d, ["x", "y"])).unwrap_err();
        assert!(matches!(err, PlotError::Render(_)));
    }

    #[test]
    fn test_histogram_only_panel_needs_no_y_domain() {
        let spec = layer(&data(), ["x"]).map_layers(|l| l.with_plot_type(PlotType::HISTOGRAM));
        let drawing = plot(spec).unwrap();
        let rects = drawing
            .flatten()
            .into_iter()
            .filter(|c| matches!(c, DrawCommand::Rect { .. }))
            .count();
        assert_eq!(rects, 2 + 10);
    }

    #[test]
    fn test_unknown_transform_surfaces() {
        let spec = layer(&data(), ["x", "y"]).map_layers(|l| l.with_transform(TransformKind::new("loess")));
        assert!(matches!(plot(spec), Err(PlotError::UnknownTransform(_))));
    }

    #[test]
    fn test_unknown_geometry_in_later_panel_fails_early() {
        let d = data();
        let spec = cross([layers(&d, ["x", "y"]), layers(&d, ["x", "y"])]);
        let renderer = Renderer::default();
        let spec = renderer
            .prepare(spec)
            .unwrap()
            .map_layers(|l| match (l.grid_row, l.grid_col) {
                (Some(1), Some(1)) => l.with_plot_type(PlotType::new("violin")),
                _ => l,
            });
        let err = renderer.check_handlers(&spec).unwrap_err();
        assert!(matches!(err, PlotError::UnknownGeometry(ref g) if g == "violin"));
        assert!(matches!(renderer.render(spec), Err(PlotError::UnknownGeometry(_))));
    }

    #[test]
    fn test_registered_handlers_pass_check() {
        let mut renderer = Renderer::default();
        renderer.geoms.register(PlotType::new("dot"), |_, _| Ok(Vec::new()));
        let spec = layer(&data(), ["x", "y"]).map_layers(|l| l.with_plot_type(PlotType::new("dot")));
        let spec = renderer.prepare(spec).unwrap();
        assert!(renderer.check_handlers(&spec).is_ok());
        assert!(renderer.render(spec).is_ok());
    }

    #[test]
    fn test_layer_order_is_paint_order() {
        let d = data();
        let spec = layer(&d, ["x", "y"]).map_layers(|l| l.with_plot_type(PlotType::LINE))
            + layer(&d, ["x", "y"]);
        let spec = spec.with_props(PlotProps {
            layout: Some(Layout::Overlay),
            ..Default::default()
        });
        let drawing = plot(spec).unwrap();
        let kinds: Vec<_> = drawing.commands[16..]
            .iter()
            .map(|c| matches!(c, DrawCommand::Polyline { .. }))
            .collect();
        assert_eq!(kinds.len(), 6);
        assert!(kinds[0]);
        assert!(kinds[1..].iter().all(|k| !k));
    }

    #[test]
    fn test_spec_theme_wins_over_options_theme() {
        let mut options = RenderOptions::default();
        options.theme.background = Some("black".to_string());
        options.theme.mark = Some("red".to_string());
        let mut spec = layer(&data(), ["x", "y"]);
        spec.props.theme.mark = Some("#00ff00".to_string());

        let drawing = Renderer::new(options).render(spec).unwrap();
        match &drawing.commands[0] {
            DrawCommand::Rect { style, .. } => assert_eq!(style.fill, Some(plotters::style::RGBColor(0, 0, 0))),
            other => panic!("Expected background rect, got {:?}", other),
        }
        match &circles(&drawing)[0] {
            DrawCommand::Circle { style, .. } => {
                assert_eq!(style.fill, Some(plotters::style::RGBColor(0, 255, 0)))
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_renderer_default_buckets() {
        use crate::ir::LayerPatch;
        let renderer = Renderer::default().with_defaults(DefaultOverrides {
            diagonal: LayerPatch::default(),
            off_diagonal: LayerPatch::plot_type(PlotType::LINE),
        });
        let drawing = renderer.render(layer(&data(), ["x", "y"])).unwrap();
        let polylines = drawing
            .flatten()
            .into_iter()
            .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
            .count();
        assert_eq!(polylines, 1);
        assert!(circles(&drawing).is_empty());
    }

    #[test]
    fn test_invalid_theme_color() {
        let mut spec = layer(&data(), ["x", "y"]);
        spec.props.theme.axis = Some("not-a-color".to_string());
        assert!(matches!(plot(spec), Err(PlotError::InvalidData(_))));
    }

    #[test]
    fn test_custom_renderer_options() {
        let renderer = Renderer::new(RenderOptions {
            width: 200,
            height: 100,
            ..Default::default()
        });
        let drawing = renderer.render(layer(&data(), ["x", "y"])).unwrap();
        assert_eq!((drawing.width, drawing.height), (200, 100));
    }
}
