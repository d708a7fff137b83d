//! The reader: source text to a lazy sequence of forms.
//!
//! `read` returns an iterator over the top-level forms of a source string.
//! Tokenization is permissive: any contiguous run of non-delimiter
//! characters is a token, classified afterwards as a number, a keyword, a
//! special literal, or a symbol. This is what lets `1+` be a symbol while
//! `1e2` is a number. The reader produces trees exactly as written - no
//! macro expansion, no symbol resolution.
//!
//! Unterminated strings and lists are fatal: the iterator yields one
//! positioned error and stops consuming input.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    error::ErrorKind,
};

use crate::MAX_PARSE_DEPTH;
use crate::ast::Value;
use crate::{Error, ParseError, ParseErrorKind};

/// Characters that end a token. Everything else, whitespace aside, can
/// appear in a symbol.
const DELIMITERS: &str = "();\"";

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && !DELIMITERS.contains(c)
}

/// Skip whitespace and `;` comments.
fn skip_trivia(input: &str) -> &str {
    let mut rest = input;
    loop {
        rest = rest.trim_start();
        if let Some(comment) = rest.strip_prefix(';') {
            match comment.find('\n') {
                Some(i) => rest = &comment[i + 1..],
                None => return "",
            }
        } else {
            return rest;
        }
    }
}

/// Parse one form, tracking nesting depth.
fn parse_form(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    let input = skip_trivia(input);
    alt((|i| parse_list(i, depth), parse_string, parse_token)).parse(input)
}

/// Parse a parenthesized list. A missing `)` at end of input is fatal.
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (mut rest, _) = char('(').parse(input)?;
    let mut items = Vec::new();
    loop {
        rest = skip_trivia(rest);
        if let Some(after) = rest.strip_prefix(')') {
            return Ok((after, Value::List(items)));
        }
        if rest.is_empty() {
            return Err(nom::Err::Failure(nom::error::Error::new(
                rest,
                ErrorKind::Eof,
            )));
        }
        // Inside a list a malformed element cannot backtrack into anything
        // else, so escalate recoverable errors to failures.
        let (after, item) = parse_form(rest, depth + 1).map_err(escalate)?;
        items.push(item);
        rest = after;
    }
}

fn escalate(err: nom::Err<nom::error::Error<&str>>) -> nom::Err<nom::error::Error<&str>> {
    match err {
        nom::Err::Error(inner) => nom::Err::Failure(inner),
        other => other,
    }
}

/// Parse a string literal. Literal newlines and tabs inside the quotes are
/// preserved verbatim; the escape set is closed, so an unknown escape is a
/// read error rather than a pass-through.
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut text = String::new();
    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            Some('"') => return Ok((chars.as_str(), Value::String(text))),
            Some('\\') => {
                match chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('0') => text.push('\0'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    Some(_) => {
                        return Err(nom::Err::Failure(nom::error::Error::new(
                            remaining,
                            ErrorKind::Escaped,
                        )));
                    }
                    None => {
                        return Err(nom::Err::Failure(nom::error::Error::new(
                            input,
                            ErrorKind::TakeUntil,
                        )));
                    }
                }
                remaining = chars.as_str();
            }
            Some(ch) => {
                text.push(ch);
                remaining = chars.as_str();
            }
            None => {
                // Point the error at the opening quote.
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    ErrorKind::TakeUntil,
                )));
            }
        }
    }
}

/// Parse a bare token and classify it.
fn parse_token(input: &str) -> IResult<&str, Value> {
    let (rest, token) = take_while1(is_token_char).parse(input)?;
    Ok((rest, classify_token(token)))
}

/// Whole-token classification, after tokenization: special literals first,
/// then the number shapes, then keywords, and everything else is a symbol.
fn classify_token(token: &str) -> Value {
    match token {
        "t" | "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "nil" | "null" => return Value::Null,
        "undefined" => return Value::Undefined,
        _ => {}
    }
    if let Some(n) = scan_number(token) {
        return Value::Number(n);
    }
    if let Some(name) = token.strip_prefix(':')
        && !name.is_empty()
    {
        return Value::Keyword(name.to_owned());
    }
    Value::Symbol(token.to_owned())
}

/// Recognize the number shapes: hex `0x…`, legacy octal `0…` (falling back
/// to decimal when a non-octal digit follows the leading zero), and decimal
/// with optional fraction and signed exponent. Anything else is not a
/// number and the token becomes a symbol.
fn scan_number(token: &str) -> Option<f64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Some(radix_fold(hex, 16.0));
        }
        return None;
    }
    if token.len() > 1 && token.starts_with('0') && token[1..].chars().all(|c| c.is_digit(8)) {
        return Some(radix_fold(&token[1..], 8.0));
    }
    if is_decimal_shape(token) {
        return token.parse::<f64>().ok();
    }
    None
}

/// Accumulate digits in the given radix without integer overflow.
fn radix_fold(digits: &str, radix: f64) -> f64 {
    digits.chars().fold(0.0, |acc, c| {
        acc * radix + f64::from(c.to_digit(radix as u32).unwrap_or(0))
    })
}

/// Validate the decimal grammar: optional sign, digits with an optional
/// fraction part (at least one digit somewhere), optional signed exponent.
fn is_decimal_shape(token: &str) -> bool {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (unsigned, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let has_digits = !int_part.is_empty() || frac_part.is_some_and(|f| !f.is_empty());
    let exponent_ok = exponent.is_none_or(|e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && all_digits(e)
    });

    has_digits && all_digits(int_part) && frac_part.is_none_or(all_digits) && exponent_ok
}

/// Convert a nom failure into a positioned read error.
fn read_error(source: &str, err: nom::Err<nom::error::Error<&str>>) -> Error {
    let inner = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => {
            return Error::ReadError(ParseError::new(
                ParseErrorKind::Incomplete,
                "incomplete input",
            ));
        }
    };
    let offset = source.len().saturating_sub(inner.input.len());
    let (kind, message) = match inner.code {
        ErrorKind::TakeUntil => (
            ParseErrorKind::Incomplete,
            format!("unterminated string literal (position {offset})"),
        ),
        ErrorKind::Eof => (
            ParseErrorKind::Incomplete,
            format!("unterminated list: expected ')' before end of input (position {offset})"),
        ),
        ErrorKind::Escaped => (
            ParseErrorKind::InvalidSyntax,
            format!("unknown escape sequence (position {offset})"),
        ),
        ErrorKind::TooLarge => (
            ParseErrorKind::TooDeeplyNested,
            format!("form nesting exceeds the limit of {MAX_PARSE_DEPTH} (position {offset})"),
        ),
        _ => (
            ParseErrorKind::InvalidSyntax,
            format!("invalid syntax (position {offset})"),
        ),
    };
    let mut parse_error = ParseError::with_context(kind, message, source, offset);
    if let Some(c) = inner.input.chars().next() {
        parse_error = parse_error.found(c.to_string());
    }
    Error::ReadError(parse_error)
}

/// Lazy iterator over the top-level forms of a source string.
///
/// A fatal read error is yielded once and ends iteration: input after the
/// error is not consumed.
pub struct Forms<'a> {
    source: &'a str,
    rest: &'a str,
    failed: bool,
}

impl Iterator for Forms<'_> {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.rest = skip_trivia(self.rest);
        if self.rest.is_empty() {
            return None;
        }
        match parse_form(self.rest, 0) {
            Ok((rest, form)) => {
                self.rest = rest;
                Some(Ok(form))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(read_error(self.source, err)))
            }
        }
    }
}

/// Read the top-level forms of `source`, lazily.
pub fn read(source: &str) -> Forms<'_> {
    Forms {
        source,
        rest: source,
        failed: false,
    }
}

/// Read every top-level form of `source`.
pub fn read_all(source: &str) -> Result<Vec<Value>, Error> {
    read(source).collect()
}

/// Read exactly one form; trailing input beyond whitespace and comments is
/// an error.
pub fn read_one(source: &str) -> Result<Value, Error> {
    let mut forms = read(source);
    match forms.next() {
        Some(Ok(form)) => {
            let rest = skip_trivia(forms.rest);
            if rest.is_empty() {
                Ok(form)
            } else {
                let offset = source.len() - rest.len();
                Err(Error::ReadError(ParseError::with_context(
                    ParseErrorKind::TrailingContent,
                    format!("unexpected input after a complete form (position {offset})"),
                    source,
                    offset,
                )))
            }
        }
        Some(Err(err)) => Err(err),
        None => Err(Error::ReadError(ParseError::new(
            ParseErrorKind::Incomplete,
            "empty input: expected a form",
        ))),
    }
}
