// Algebra expression parser: `*` (cross) binds tighter than `+` (blend)

use super::ast::Expr;
use super::lexer::{column_name, ws};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::map,
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded},
    IResult,
};

pub fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, (first, rest)) = pair(parse_term, many0(preceded(ws(char('+')), parse_term)))(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, next| Expr::Blend(Box::new(acc), Box::new(next)));
    Ok((input, expr))
}

fn parse_term(input: &str) -> IResult<&str, Expr> {
    let (input, (first, rest)) = pair(parse_atom, many0(preceded(ws(char('*')), parse_atom)))(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, next| Expr::Cross(Box::new(acc), Box::new(next)));
    Ok((input, expr))
}

fn parse_atom(input: &str) -> IResult<&str, Expr> {
    alt((
        parse_call,
        delimited(ws(char('(')), parse_expr, ws(char(')'))),
    ))(input)
}

/// `layers(...)` is tried before `layer(...)` so the shorter keyword never
/// claims the longer one's prefix.
fn parse_call(input: &str) -> IResult<&str, Expr> {
    alt((
        map(call("layers"), Expr::Layers),
        map(call("layer"), Expr::Layer),
        map(call("splom"), Expr::Splom),
    ))(input)
}

fn call<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<String>> {
    preceded(
        ws(tag(name)),
        delimited(
            ws(char('(')),
            separated_list0(ws(char(',')), ws(column_name)),
            ws(char(')')),
        ),
    )
}
