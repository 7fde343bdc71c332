// Pipeline parser: `expr | modifier | modifier ...`

use super::ast::{Axis, Modifier, Program};
use super::expr::parse_expr;
use super::lexer::{column_name, identifier, number_literal, unsigned_literal, ws};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded, separated_pair},
    IResult,
};

/// Parse a complete program. Trailing input is an error.
pub fn parse_program(input: &str) -> IResult<&str, Program> {
    let (input, expr) = parse_expr(input)?;
    let (input, modifiers) = many0(preceded(ws(char('|')), parse_modifier))(input)?;
    let (input, _) = ws(eof)(input)?;

    let modifiers = modifiers.into_iter().flatten().collect();
    Ok((input, Program { expr, modifiers }))
}

fn parse_modifier(input: &str) -> IResult<&str, Vec<Modifier>> {
    alt((
        map(single("color", column_name), |c| vec![Modifier::Color(c)]),
        map(single("facet", column_name), |c| vec![Modifier::Facet(c)]),
        map(single("geom", identifier), |g| vec![Modifier::Geom(g)]),
        map(single("offdiagonal", geom_arg), |g| vec![Modifier::OffDiagonal(g)]),
        map(single("diagonal", geom_arg), |g| vec![Modifier::Diagonal(g)]),
        map(parse_smooth, |m| vec![m]),
        parse_domain,
        value(vec![Modifier::Overlay], preceded(ws(tag("overlay")), pair_parens)),
    ))(input)
}

/// `name(arg)`
fn single<'a, O, F>(name: &'static str, arg: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(ws(tag(name)), delimited(ws(char('(')), ws(arg), ws(char(')'))))
}

fn pair_parens(input: &str) -> IResult<&str, ()> {
    value((), preceded(ws(char('(')), ws(char(')'))))(input)
}

/// `geom: kind`
fn geom_arg(input: &str) -> IResult<&str, String> {
    preceded(ws(tag("geom:")), ws(identifier))(input)
}

/// `smooth()` or `smooth(window: n)`
fn parse_smooth(input: &str) -> IResult<&str, Modifier> {
    let (input, _) = ws(tag("smooth"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, window) = opt(preceded(ws(tag("window:")), ws(unsigned_literal)))(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, Modifier::Smooth { window }))
}

/// `domain(x: lo..hi)`, `domain(y: lo..hi)` or both, comma separated
fn parse_domain(input: &str) -> IResult<&str, Vec<Modifier>> {
    let (input, _) = ws(tag("domain"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, limits) = separated_list1(
        ws(char(',')),
        alt((
            map(preceded(ws(tag("x:")), ws(range)), |(min, max)| Modifier::Domain {
                axis: Axis::X,
                min,
                max,
            }),
            map(preceded(ws(tag("y:")), ws(range)), |(min, max)| Modifier::Domain {
                axis: Axis::Y,
                min,
                max,
            }),
        )),
    )(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, limits))
}

fn range(input: &str) -> IResult<&str, (f64, f64)> {
    separated_pair(number_literal, tag(".."), number_literal)(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Expr;

    #[test]
    fn test_expr_only() {
        let (_, program) = parse_program("splom(a, b)").unwrap();
        assert_eq!(program.expr, Expr::Splom(vec!["a".to_string(), "b".to_string()]));
        assert!(program.modifiers.is_empty());
    }

    #[test]
    fn test_modifiers_in_order() {
        let (_, program) = parse_program(
            "splom(a, b) | color(species) | diagonal(geom: line) | offdiagonal(geom: scatter) | smooth(window: 3)",
        )
        .unwrap();
        assert_eq!(
            program.modifiers,
            vec![
                Modifier::Color("species".to_string()),
                Modifier::Diagonal("line".to_string()),
                Modifier::OffDiagonal("scatter".to_string()),
                Modifier::Smooth { window: Some(3) },
            ]
        );
    }

    #[test]
    fn test_domain_both_axes() {
        let (_, program) = parse_program("layer(x, y) | domain(x: 0..10, y: -1.5..2)").unwrap();
        assert_eq!(
            program.modifiers,
            vec![
                Modifier::Domain { axis: Axis::X, min: 0.0, max: 10.0 },
                Modifier::Domain { axis: Axis::Y, min: -1.5, max: 2.0 },
            ]
        );
    }

    #[test]
    fn test_geom_facet_overlay_and_bare_smooth() {
        let (_, program) =
            parse_program("layer(x, y) + layer(x, y) | geom(line) | facet(\"site id\") | smooth() | overlay()").unwrap();
        assert_eq!(
            program.modifiers,
            vec![
                Modifier::Geom("line".to_string()),
                Modifier::Facet("site id".to_string()),
                Modifier::Smooth { window: None },
                Modifier::Overlay,
            ]
        );
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        assert!(parse_program("layer(x) | bogus(1)").is_err());
        assert!(parse_program("layer(x) layer(y)").is_err());
    }
}
