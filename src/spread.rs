use crate::data::Value;
use crate::error::Result;
use crate::ir::{Layer, Spec};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Expand every layer with a color (or else facet) column into one layer per
/// distinct value, each over its own row subset. Already-spread layers pass
/// through, so re-applying is a no-op.
pub fn spread(spec: Spec) -> Result<Spec> {
    let Spec { layers, props } = spec;
    let before = layers.len();

    let mut out = Vec::with_capacity(layers.len());
    for layer in layers {
        out.extend(spread_layer(layer)?);
    }

    tracing::debug!(before, after = out.len(), "spread layers by group");
    Ok(Spec { layers: out, props })
}

fn spread_layer(layer: Layer) -> Result<Vec<Layer>> {
    if layer.is_spread() {
        return Ok(vec![layer]);
    }

    if layer.color_column.is_some() && layer.facet_column.is_some() {
        tracing::warn!(
            color = ?layer.color_column,
            facet = ?layer.facet_column,
            "layer sets both color and facet columns; spreading by color only"
        );
    }

    if let Some(column) = layer.color_column.clone() {
        partition(&layer, &column, |l, key| l.color_value = Some(key))
    } else if let Some(column) = layer.facet_column.clone() {
        partition(&layer, &column, |l, key| l.facet_value = Some(key))
    } else {
        Ok(vec![layer])
    }
}

fn partition(layer: &Layer, column: &str, tag: impl Fn(&mut Layer, Value)) -> Result<Vec<Layer>> {
    let groups = layer.dataset()?.group_by(column)?;
    Ok(groups
        .into_iter()
        .map(|(key, subset)| {
            let mut part = layer.clone();
            part.data = Some(Arc::new(subset));
            tag(&mut part, key);
            part
        })
        .collect())
}

/// Index every layer's `color_value` by its rank among all distinct color
/// values in the spec, sorted ascending.
pub fn assign_color_indices(spec: Spec) -> Spec {
    let distinct: BTreeSet<&Value> = spec
        .layers
        .iter()
        .filter_map(|l| l.color_value.as_ref())
        .filter(|v| !v.is_null())
        .collect();

    let index: BTreeMap<Value, usize> = distinct
        .into_iter()
        .enumerate()
        .map(|(i, v)| (v.clone(), i))
        .collect();

    spec.map_layers(|mut layer| {
        if let Some(idx) = layer.color_value.as_ref().and_then(|v| index.get(v)) {
            layer.color_index = Some(*idx);
        }
        layer
    })
}
