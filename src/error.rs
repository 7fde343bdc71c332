use crate::ir::Layer;

/// Errors raised by the spec pipeline stages.
#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    /// A layer carries three or more positional columns and no explicit x/y.
    #[error("Ambiguous columns {columns:?}: set x and y explicitly on the layer")]
    AmbiguousColumns {
        columns: Vec<String>,
        layer: Box<Layer>,
    },

    /// A panel could not be laid out, e.g. an axis has no values to build a domain from.
    #[error("Render error: {0}")]
    Render(String),

    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),

    #[error("Unknown geometry '{0}'")]
    UnknownGeometry(String),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, PlotError>;
