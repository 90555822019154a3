// Parser for command-line pass-through parameters
//
// Format: key=value[, key=value ...] where value is a boolean, an integer,
// a float, a "quoted string" or a bare word.

use crate::error::{ChartError, Result};
use crate::options::Param;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    multi::{many0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, separated_pair, terminated},
    IResult,
};

fn is_bare_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        String::from,
    )(input)
}

pub fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        String::from,
    )(input)
}

/// A token must not run straight into more word characters.
fn word_end(input: &str) -> IResult<&str, ()> {
    not(satisfy(is_bare_char))(input)
}

fn bool_literal(input: &str) -> IResult<&str, bool> {
    terminated(
        alt((value(true, tag("true")), value(false, tag("false")))),
        word_end,
    )(input)
}

fn int_literal(input: &str) -> IResult<&str, i64> {
    map_res(
        terminated(
            recognize(pair(opt(char('-')), digit1)),
            not(one_of(".eE")),
        ),
        |s: &str| s.parse::<i64>(),
    )(input)
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    terminated(double, word_end)(input)
}

fn bare_word(input: &str) -> IResult<&str, String> {
    map(take_while1(is_bare_char), String::from)(input)
}

fn param_value(input: &str) -> IResult<&str, Param> {
    alt((
        map(bool_literal, Param::Bool),
        map(terminated(int_literal, word_end), Param::Int),
        map(float_literal, Param::Float),
        map(string_literal, Param::Text),
        map(bare_word, Param::Text),
    ))(input)
}

fn param(input: &str) -> IResult<&str, (String, Param)> {
    separated_pair(ws(identifier), ws(char('=')), ws(param_value))(input)
}

/// Parse `key=value` pairs separated by commas.
pub fn parse_params(input: &str) -> Result<Vec<(String, Param)>> {
    all_consuming(separated_list1(ws(char(',')), param))(input)
        .map(|(_, params)| params)
        .map_err(|e| ChartError::Param(format!("could not parse '{}': {:?}", input, e)))
}

/// Parse an axis range written as `min,max`.
pub fn parse_limits(input: &str) -> Result<(f64, f64)> {
    all_consuming(separated_pair(ws(double), char(','), ws(double)))(input)
        .map(|(_, limits)| limits)
        .map_err(|_| ChartError::Param(format!("expected 'min,max', got '{}'", input)))
}
