//! Combinators that build specs from datasets and positional columns.
//!
//! `cross` pairs layers (Cartesian product), `blend` stacks them. Both are
//! also available as `*` and `+` on [`Spec`].

use crate::data::Dataset;
use crate::ir::{Layer, Spec, TransformOptions};
use std::ops::{Add, Mul};
use std::sync::Arc;

/// Concatenate positional columns; every other field takes `b`'s value when set.
pub fn merge(a: &Layer, b: &Layer) -> Layer {
    fn pick<T: Clone>(a: &Option<T>, b: &Option<T>) -> Option<T> {
        b.clone().or_else(|| a.clone())
    }

    Layer {
        data: pick(&a.data, &b.data),
        columns: a.columns.iter().chain(&b.columns).cloned().collect(),
        x: pick(&a.x, &b.x),
        y: pick(&a.y, &b.y),
        diagonal: pick(&a.diagonal, &b.diagonal),
        grid_row: pick(&a.grid_row, &b.grid_row),
        grid_col: pick(&a.grid_col, &b.grid_col),
        plot_type: pick(&a.plot_type, &b.plot_type),
        color_column: pick(&a.color_column, &b.color_column),
        facet_column: pick(&a.facet_column, &b.facet_column),
        color_value: pick(&a.color_value, &b.color_value),
        facet_value: pick(&a.facet_value, &b.facet_value),
        color_index: pick(&a.color_index, &b.color_index),
        transform: pick(&a.transform, &b.transform),
        transform_options: TransformOptions {
            window: pick(&a.transform_options.window, &b.transform_options.window),
        },
        stroke_width: pick(&a.stroke_width, &b.stroke_width),
        point_radius: pick(&a.point_radius, &b.point_radius),
        opacity: pick(&a.opacity, &b.opacity),
    }
}

/// Cartesian product of the operands' layers, left to right.
pub fn cross(specs: impl IntoIterator<Item = Spec>) -> Spec {
    specs
        .into_iter()
        .filter(|s| !s.is_empty())
        .reduce(cross_pair)
        .unwrap_or_default()
}

fn cross_pair(acc: Spec, next: Spec) -> Spec {
    let props = acc.props.merge(&next.props);
    if acc.layers.is_empty() || next.layers.is_empty() {
        let layers = acc.layers.into_iter().chain(next.layers).collect();
        return Spec { layers, props };
    }

    let layers = acc
        .layers
        .iter()
        .flat_map(|a| next.layers.iter().map(move |b| merge(a, b)))
        .collect();
    Spec { layers, props }
}

/// Concatenate the operands' layers, left to right.
pub fn blend(specs: impl IntoIterator<Item = Spec>) -> Spec {
    specs
        .into_iter()
        .filter(|s| !s.is_empty())
        .reduce(|mut acc, next| {
            acc.props = acc.props.merge(&next.props);
            acc.layers.extend(next.layers);
            acc
        })
        .unwrap_or_default()
}

/// A one-layer spec over `data`. Zero columns is a valid bare-dataset layer.
pub fn layer<S: Into<String>>(data: &Arc<Dataset>, columns: impl IntoIterator<Item = S>) -> Spec {
    Spec::new(vec![Layer::new(Arc::clone(data)).with_columns(columns)])
}

/// One single-column layer per entry, blended.
pub fn layers<S: Into<String>>(data: &Arc<Dataset>, columns: impl IntoIterator<Item = S>) -> Spec {
    blend(columns.into_iter().map(|c| layer(data, [c])))
}

impl Mul for Spec {
    type Output = Spec;

    fn mul(self, rhs: Spec) -> Spec {
        cross([self, rhs])
    }
}

impl Add for Spec {
    type Output = Spec;

    fn add(self, rhs: Spec) -> Spec {
        blend([self, rhs])
    }
}
