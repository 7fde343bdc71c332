use crate::ir::{LayerPatch, PlotType, Spec};

/// Per-bucket defaults, chosen by each layer's `diagonal` flag.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultOverrides {
    pub diagonal: LayerPatch,
    pub off_diagonal: LayerPatch,
}

impl Default for DefaultOverrides {
    fn default() -> Self {
        DefaultOverrides {
            diagonal: LayerPatch::plot_type(PlotType::HISTOGRAM),
            off_diagonal: LayerPatch::plot_type(PlotType::SCATTER),
        }
    }
}

impl DefaultOverrides {
    /// Caller buckets layered over the built-ins; properties a bucket leaves
    /// unset fall back to the built-in bucket.
    pub fn with_builtins(&self) -> Self {
        let builtin = DefaultOverrides::default();
        DefaultOverrides {
            diagonal: self.diagonal.or(&builtin.diagonal),
            off_diagonal: self.off_diagonal.or(&builtin.off_diagonal),
        }
    }
}

/// Fill unset rendering properties from the matching bucket. Values a layer
/// already carries are never overwritten.
pub fn apply_defaults(spec: Spec, overrides: Option<&DefaultOverrides>) -> Spec {
    let overrides = overrides.map(DefaultOverrides::with_builtins).unwrap_or_default();
    let spec = spec.map_layers(|layer| {
        let bucket = if layer.is_diagonal() {
            &overrides.diagonal
        } else {
            &overrides.off_diagonal
        };
        bucket.fill(layer)
    });
    tracing::debug!(layers = spec.layers.len(), "applied layer defaults");
    spec
}

/// Apply `patch` to every diagonal layer, overwriting.
pub fn when_diagonal(spec: Spec, patch: &LayerPatch) -> Spec {
    spec.map_layers(|layer| if layer.is_diagonal() { patch.apply(layer) } else { layer })
}

/// Apply `patch` to every off-diagonal layer, overwriting.
pub fn when_off_diagonal(spec: Spec, patch: &LayerPatch) -> Spec {
    spec.map_layers(|layer| if layer.is_diagonal() { layer } else { patch.apply(layer) })
}
