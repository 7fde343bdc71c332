use crate::error::{PlotError, Result};
use crate::ir::{Layer, Layout, Spec};
use std::collections::HashMap;

/// Resolve positional columns to x/y roles, flag diagonal layers, and
/// detect scatter-plot-matrix grids. Safe to re-apply.
///
/// The layout is decided once: a spec that does not qualify as a grid is
/// marked `Overlay`, and an `Overlay` spec is never turned into a grid. Spread
/// layers that each carry two columns would otherwise look like a grid on a
/// later pass.
pub fn resolve_roles(spec: Spec) -> Result<Spec> {
    let Spec { layers, mut props } = spec;

    let mut layers = layers
        .into_iter()
        .map(resolve_layer)
        .collect::<Result<Vec<_>>>()?;

    let forced_overlay = props.layout == Some(Layout::Overlay);
    let is_grid = !forced_overlay && layers.len() > 1 && layers.iter().all(|l| l.columns.len() == 2);
    if is_grid {
        assign_grid_positions(&mut layers);
        props.layout = Some(Layout::Grid);
    } else if props.layout.is_none() {
        props.layout = Some(Layout::Overlay);
    }

    tracing::debug!(layers = layers.len(), grid = is_grid, "resolved layer roles");
    Ok(Spec { layers, props })
}

fn resolve_layer(mut layer: Layer) -> Result<Layer> {
    if layer.x.is_some() || layer.y.is_some() {
        if let (Some(x), Some(y)) = (&layer.x, &layer.y) {
            layer.diagonal = Some(x == y);
        }
        return Ok(layer);
    }

    match layer.columns.as_slice() {
        [] => {}
        [x] => layer.x = Some(x.clone()),
        [x, y] => {
            layer.diagonal = Some(x == y);
            layer.x = Some(x.clone());
            layer.y = Some(y.clone());
        }
        columns => {
            return Err(PlotError::AmbiguousColumns {
                columns: columns.to_vec(),
                layer: Box::new(layer),
            })
        }
    }
    Ok(layer)
}

/// Column index from the x variable, row index from the y variable, both in
/// order of first appearance.
fn assign_grid_positions(layers: &mut [Layer]) {
    let x_index = first_appearance_index(layers.iter().filter_map(|l| l.x.as_deref()));
    let y_index = first_appearance_index(layers.iter().filter_map(|l| l.y.as_deref()));

    for layer in layers.iter_mut() {
        let col = layer.x.as_deref().and_then(|x| x_index.get(x).copied());
        let row = layer.y.as_deref().and_then(|y| y_index.get(y).copied());
        layer.grid_col = col;
        layer.grid_row = row;
    }
}

fn first_appearance_index<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for name in names {
        let next = index.len();
        index.entry(name.to_string()).or_insert(next);
    }
    index
}
