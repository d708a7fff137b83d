//! jslisp - a small Lisp embedded in a JavaScript-flavored host
//!
//! This crate implements the kernel of a Lisp dialect whose values and
//! coercion rules follow JavaScript conventions. Source text is read into a
//! tree of values, and the tree is walked against a chain of lexical
//! environment frames whose terminal parent is a mutable host namespace, so
//! host bindings are reachable from scripts without explicit imports.
//!
//! ```lisp
//! ; S-expression surface syntax
//! (let ((x 3) (f (lambda () (setq x (1+ x)))))
//!   (f)
//!   (f)
//!   x)                         ; => 5, closures share the let frame
//! (== 2 "2")                   ; => true, loose host equality
//! (format nil "%d bottles" 99) ; => "99 bottles"
//! ```
//!
//! ## Macro protocol
//!
//! List forms dispatch on their head: a **macro** combiner receives the tail
//! forms unevaluated together with the current environment, while a
//! **function** combiner receives its arguments resolved left to right.
//! Short-circuiting (`and`, `or`, the comparison chains, the `is-*`
//! predicates) is observable through side effects in argument positions.
//!
//! ## Modules
//!
//! - `reader`: source text to a lazy sequence of forms
//! - `ast`: the runtime value model and host coercion rules
//! - `evaluator`: environment chain, host namespace, tree-walking resolver
//! - `builtins`: the standard library of macros and functions
//! - `format`: printf-style directive engine behind `(format …)`
//! - `json`: host JSON data in and out of kernel values

use std::fmt;

use crate::ast::Value;

/// Maximum reader nesting depth. Bounds recursion on hostile input such as
/// a long run of opening parentheses.
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum evaluation depth. Set above the parse limit so that nested
/// function applications over a maximally nested tree still have headroom.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Categorizes the different kinds of read failures.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad token, stray delimiter)
    InvalidSyntax,
    /// Input ended before the form was complete (unterminated string or list)
    Incomplete,
    /// Nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
    /// Extra input found after a complete form where one form was expected
    TrailingContent,
}

/// A structured reader error with position context.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Snippet of the input around the failure offset (max 80 chars)
    pub context: Option<String>,
    /// The offending token or character, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context: None,
            found: None,
        }
    }

    /// Attach a context snippet extracted from `input` around `offset`.
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 80;

        let start = offset.saturating_sub(20);
        let snippet: String = input.chars().skip(start).take(MAX_CONTEXT).collect();

        let mut context = String::new();
        if start > 0 {
            context.push_str("[...]");
        }
        context.push_str(&snippet);
        if start + snippet.chars().count() < input.chars().count() {
            context.push_str("[...]");
        }
        let context = context.replace('\n', "\\n").replace('\r', "");

        ParseError {
            kind,
            message: message.into(),
            context: Some(context),
            found: None,
        }
    }

    pub fn found(mut self, token: impl Into<String>) -> Self {
        self.found = Some(token.into());
        self
    }
}

/// Error type shared by the reader, the evaluator, and the builtins.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ReadError(ParseError),
    EvalError(String),
    TypeError(String),
    ArityError {
        name: &'static str,
        expected: String,
        got: usize,
    },
    /// A value raised by `throw` (or a host native), caught by `try`.
    Thrown(Value),
}

impl Error {
    /// The value handed to a `catch` handler: thrown values pass through,
    /// kernel errors surface as their message string.
    pub fn into_value(self) -> Value {
        match self {
            Error::Thrown(v) => v,
            other => Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ReadError(e) => {
                write!(f, "ReadError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::EvalError(msg) => write!(f, "EvalError: {msg}"),
            Error::TypeError(msg) => write!(f, "TypeError: {msg}"),
            Error::ArityError {
                name,
                expected,
                got,
            } => write!(
                f,
                "ArityError: {name} expects {expected} arguments, got {got}"
            ),
            Error::Thrown(v) => write!(f, "Uncaught: {v}"),
        }
    }
}

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod format;
pub mod reader;

#[cfg(feature = "json")]
pub mod json;
