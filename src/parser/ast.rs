// Abstract Syntax Tree for the splom DSL

/// Algebra expression over the input dataset's columns
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `layer(a, b)`: one layer over the listed columns
    Layer(Vec<String>),
    /// `layers(a, b, c)`: one single-column layer per entry
    Layers(Vec<String>),
    /// `splom(a, b, c)`: `layers(a, b, c) * layers(a, b, c)`
    Splom(Vec<String>),
    /// `lhs * rhs`
    Cross(Box<Expr>, Box<Expr>),
    /// `lhs + rhs`
    Blend(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Pipeline stage applied after the expression, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Color(String),
    Facet(String),
    /// Plot type for every layer, overwriting defaults
    Geom(String),
    /// Plot type for diagonal layers only
    Diagonal(String),
    OffDiagonal(String),
    Smooth { window: Option<usize> },
    Domain { axis: Axis, min: f64, max: f64 },
    /// Keep all layers in a single panel even when they would form a grid
    Overlay,
}

/// A whole DSL program: `expr | modifier | modifier ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub expr: Expr,
    pub modifiers: Vec<Modifier>,
}
