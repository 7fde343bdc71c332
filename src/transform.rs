use crate::data::{Dataset, Value};
use crate::error::{PlotError, Result};
use crate::ir::{Layer, TransformKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_SMOOTH_WINDOW: usize = 5;

pub type TransformFn = Arc<dyn Fn(&Layer) -> Result<Layer> + Send + Sync>;

/// Statistical transforms keyed by name. `Default` registers the built-ins
/// (`identity`, `smooth`); callers may register more.
#[derive(Clone)]
pub struct TransformRegistry {
    handlers: HashMap<TransformKind, TransformFn>,
}

impl TransformRegistry {
    pub fn empty() -> Self {
        TransformRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Register (or replace) the handler for `kind`.
    pub fn register<F>(&mut self, kind: TransformKind, handler: F) -> &mut Self
    where
        F: Fn(&Layer) -> Result<Layer> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn contains(&self, kind: &TransformKind) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Run the layer's transform (identity when unset).
    pub fn apply(&self, layer: &Layer) -> Result<Layer> {
        let kind = layer.transform.clone().unwrap_or(TransformKind::IDENTITY);
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| PlotError::UnknownTransform(kind.to_string()))?;
        handler(layer)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        let mut registry = TransformRegistry::empty();
        registry
            .register(TransformKind::IDENTITY, |layer| Ok(layer.clone()))
            .register(TransformKind::SMOOTH, smooth);
        registry
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().map(TransformKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("TransformRegistry").field("kinds", &kinds).finish()
    }
}

/// Centered moving average of y over points sorted by x. The layer's data is
/// replaced by a two-column (x, smoothed y) dataset.
pub fn smooth(layer: &Layer) -> Result<Layer> {
    let (x, y) = match (&layer.x, &layer.y) {
        (Some(x), Some(y)) => (x.clone(), y.clone()),
        _ => {
            return Err(PlotError::InvalidData(
                "smooth transform needs both x and y roles".to_string(),
            ))
        }
    };

    let mut points = layer.dataset()?.numeric_pairs(&x, &y)?;
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let window = layer.transform_options.window.unwrap_or(DEFAULT_SMOOTH_WINDOW);
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let smoothed = moving_average(&ys, window);

    let y_out = if x == y { format!("{}_smooth", y) } else { y };
    let data = Dataset::from_columns(vec![
        (x.clone(), points.iter().map(|p| Value::Number(p.0)).collect()),
        (y_out.clone(), smoothed.into_iter().map(Value::Number).collect()),
    ])?;

    let mut out = layer.clone();
    out.data = Some(Arc::new(data));
    out.x = Some(x);
    out.y = Some(y_out);
    Ok(out)
}

/// Each output averages the inputs within `window / 2` positions on either
/// side, truncated at the ends.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(values.len() - 1);
            let slice = &values[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
