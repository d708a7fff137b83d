//! The built-in macro and function registry: the standard library.
//!
//! Operations are defined once in a static table and installed into the
//! host scope by name, so scripts can shadow or pass them around like any
//! other binding. Each entry carries the bit the evaluator consults before
//! argument evaluation: a [`OpKind::Macro`] receives its tail forms
//! unevaluated, a [`OpKind::Function`] receives resolved values.
//!
//! Every short-circuiting operation - `and`, `or`, `not`, the comparison
//! chains, the `is-*` predicates - routes through [`scan_resolved`], which
//! resolves argument forms lazily and stops the moment a verdict is
//! reached. Arguments past the decisive position are never evaluated,
//! which is observable through `setq` side effects.
//!
//! ## Adding an operation
//!
//! 1. Implement it with the canonical signature
//!    `fn(&[Value], &Env, usize) -> Result<Value, Error>`.
//! 2. Add a row to `BUILTIN_OPS` with its kind and arity.
//! 3. Cover it in the data-driven tests below.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::{LambdaFn, Value};
use crate::evaluator::{Env, HostScope, apply_at, property, resolve_args, resolve_at};

/// Whether a combiner receives unevaluated forms or resolved arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Function,
    Macro,
}

/// Argument count contract of a builtin, validated before invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
    Any,
}

impl Arity {
    pub fn validate(&self, name: &'static str, got: usize) -> Result<(), Error> {
        let ok = match self {
            Arity::Exact(n) => got == *n,
            Arity::AtLeast(n) => got >= *n,
            Arity::Range(lo, hi) => got >= *lo && got <= *hi,
            Arity::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::ArityError {
                name,
                expected: self.describe(),
                got,
            })
        }
    }

    fn describe(&self) -> String {
        match self {
            Arity::Exact(n) => format!("exactly {n}"),
            Arity::AtLeast(n) => format!("at least {n}"),
            Arity::Range(lo, hi) => format!("{lo} to {hi}"),
            Arity::Any => "any number of".to_owned(),
        }
    }
}

/// Canonical builtin signature. Macros receive unevaluated forms, functions
/// receive resolved values; both get the calling environment and the
/// current evaluation depth for recursion through the resolver.
pub type OpFn = fn(&[Value], &Env, usize) -> Result<Value, Error>;

/// One entry of the builtin registry.
#[derive(Debug)]
pub struct BuiltinOp {
    pub name: &'static str,
    pub kind: OpKind,
    pub arity: Arity,
    pub run: OpFn,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // the name uniquely identifies an operation
        self.name == other.name
    }
}

/// Install every builtin into a host scope under its name.
pub fn install(host: &HostScope) {
    for op in BUILTIN_OPS {
        host.define(
            op.name,
            Value::Builtin {
                op,
                as_function: false,
            },
        );
    }
}

/// Find a builtin by name.
pub fn find_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(name).copied()
}

/// All registered operations.
pub fn all_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

//
// Shared evaluation helpers
//

/// Resolve forms left to right, feeding each value to `step`. The first
/// `Some` verdict is returned and the remaining forms are never resolved.
fn scan_resolved(
    forms: &[Value],
    env: &Env,
    depth: usize,
    mut step: impl FnMut(Value) -> Option<Value>,
) -> Result<Option<Value>, Error> {
    for form in forms {
        let value = resolve_at(form, env, depth + 1)?;
        if let Some(verdict) = step(value) {
            return Ok(Some(verdict));
        }
    }
    Ok(None)
}

/// Evaluate a body in order, returning the last value (null when empty).
fn eval_body(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let mut result = Value::Null;
    for form in forms {
        result = resolve_at(form, env, depth + 1)?;
    }
    Ok(result)
}

fn build_lambda(
    name: Option<String>,
    params_form: &Value,
    body: &[Value],
    env: &Env,
) -> Result<Value, Error> {
    let Value::List(param_forms) = params_form else {
        return Err(Error::TypeError(
            "lambda parameters must be a list".to_owned(),
        ));
    };
    let mut params = Vec::with_capacity(param_forms.len());
    for param in param_forms {
        let Value::Symbol(s) = param else {
            return Err(Error::TypeError(
                "lambda parameters must be symbols".to_owned(),
            ));
        };
        params.push(s.clone());
    }
    Ok(Value::Lambda(Rc::new(LambdaFn {
        name,
        params,
        body: body.to_vec(),
        env: env.clone(),
    })))
}

//
// Binding and control macros
//

fn op_let(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let Value::List(bindings) = &forms[0] else {
        return Err(Error::TypeError(
            "let requires a list of bindings".to_owned(),
        ));
    };
    let frame = env.child();
    for binding in bindings {
        let pair = match binding {
            Value::List(pair) if matches!(pair.len(), 1 | 2) => pair,
            _ => {
                return Err(Error::TypeError(
                    "let bindings must be (name expr) lists".to_owned(),
                ));
            }
        };
        let Value::Symbol(name) = &pair[0] else {
            return Err(Error::TypeError(
                "let bindings must be (name expr) lists".to_owned(),
            ));
        };
        // the expression is evaluated before its name is bound, so a
        // self-reference resolves outward
        let value = match pair.get(1) {
            Some(expr) => resolve_at(expr, &frame, depth + 1)?,
            None => Value::Undefined,
        };
        frame.bind(name.clone(), value);
    }
    eval_body(&forms[1..], &frame, depth)
}

fn op_setq(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let Value::Symbol(name) = &forms[0] else {
        return Err(Error::TypeError("setq requires a symbol name".to_owned()));
    };
    let value = resolve_at(&forms[1], env, depth + 1)?;
    env.assign(name, value.clone())?;
    Ok(value)
}

fn op_lambda(forms: &[Value], env: &Env, _depth: usize) -> Result<Value, Error> {
    build_lambda(None, &forms[0], &forms[1..], env)
}

fn op_defun(forms: &[Value], env: &Env, _depth: usize) -> Result<Value, Error> {
    let Value::Symbol(name) = &forms[0] else {
        return Err(Error::TypeError("defun requires a name symbol".to_owned()));
    };
    let function = build_lambda(Some(name.clone()), &forms[1], &forms[2..], env)?;
    env.assign(name, function.clone())?;
    Ok(function)
}

fn op_progn(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    eval_body(forms, env, depth)
}

fn op_if(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let test = resolve_at(&forms[0], env, depth + 1)?;
    if test.is_truthy() {
        resolve_at(&forms[1], env, depth + 1)
    } else {
        // the else part is an implicit progn; absent, it yields null
        eval_body(&forms[2..], env, depth)
    }
}

fn op_when(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let test = resolve_at(&forms[0], env, depth + 1)?;
    if test.is_truthy() {
        eval_body(&forms[1..], env, depth)
    } else {
        Ok(Value::Null)
    }
}

/// Detect a trailing `(catch …)` clause.
fn split_catch(forms: &[Value]) -> (&[Value], Option<&[Value]>) {
    if let Some((Value::List(clause), body)) = forms.split_last()
        && matches!(clause.first(), Some(Value::Symbol(s)) if s == "catch")
    {
        return (body, Some(clause.as_slice()));
    }
    (forms, None)
}

fn op_try(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let (body, handler) = split_catch(forms);
    let mut result = Ok(Value::Null);
    for form in body {
        result = resolve_at(form, env, depth + 1);
        if result.is_err() {
            break;
        }
    }
    match (result, handler) {
        (Err(err), Some(clause)) => {
            // the clause is rewritten into a lambda over the current
            // environment and applied to the error value; a missing
            // parameter list is treated as empty
            let (params, handler_body) = match clause.get(1) {
                Some(Value::List(items))
                    if items.iter().all(|i| matches!(i, Value::Symbol(_))) =>
                {
                    (Value::List(items.clone()), &clause[2..])
                }
                _ => (Value::List(vec![]), &clause[1..]),
            };
            let handler_fn = build_lambda(None, &params, handler_body, env)?;
            apply_at(&handler_fn, &[err.into_value()], None, env, depth)
        }
        (result, _) => result,
    }
}

fn op_throw(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Err(Error::Thrown(args[0].clone()))
}

//
// Logical and comparison macros
//

fn op_and(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let verdict = scan_resolved(forms, env, depth, |v| {
        (!v.is_truthy()).then_some(Value::Bool(false))
    })?;
    Ok(verdict.unwrap_or(Value::Bool(true)))
}

fn op_or(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let verdict = scan_resolved(forms, env, depth, |v| {
        v.is_truthy().then_some(Value::Bool(true))
    })?;
    Ok(verdict.unwrap_or(Value::Bool(false)))
}

fn op_not(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let verdict = scan_resolved(forms, env, depth, |v| {
        v.is_truthy().then_some(Value::Bool(false))
    })?;
    Ok(verdict.unwrap_or(Value::Bool(true)))
}

// Pairwise comparison chains: resolve left to right, falsify on the first
// failing adjacent pair, never touching the forms past it.
macro_rules! comparison_op {
    ($name:ident, $test:expr) => {
        fn $name(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
            let test: fn(&Value, &Value) -> bool = $test;
            let mut prev: Option<Value> = None;
            let verdict = scan_resolved(forms, env, depth, |v| {
                let failed = prev.as_ref().is_some_and(|p| !test(p, &v));
                prev = Some(v);
                failed.then_some(Value::Bool(false))
            })?;
            Ok(verdict.unwrap_or(Value::Bool(true)))
        }
    };
}

comparison_op!(op_loose_eq, |a, b| a.loose_eq(b));
comparison_op!(op_loose_ne, |a, b| !a.loose_eq(b));
comparison_op!(op_strict_eq, |a, b| a.strict_eq(b));
comparison_op!(op_strict_ne, |a, b| !a.strict_eq(b));
comparison_op!(op_lt, |a, b| matches!(a.loose_cmp(b), Some(Ordering::Less)));
comparison_op!(op_gt, |a, b| matches!(
    a.loose_cmp(b),
    Some(Ordering::Greater)
));
comparison_op!(op_le, |a, b| matches!(
    a.loose_cmp(b),
    Some(Ordering::Less | Ordering::Equal)
));
comparison_op!(op_ge, |a, b| matches!(
    a.loose_cmp(b),
    Some(Ordering::Greater | Ordering::Equal)
));

// Type predicates: true iff every argument matches, stopping at the first
// mismatch.
macro_rules! predicate_op {
    ($name:ident, $pred:expr) => {
        fn $name(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
            let pred: fn(&Value) -> bool = $pred;
            let verdict = scan_resolved(forms, env, depth, |v| {
                (!pred(&v)).then_some(Value::Bool(false))
            })?;
            Ok(verdict.unwrap_or(Value::Bool(true)))
        }
    };
}

predicate_op!(op_is_true, |v| matches!(v, Value::Bool(true)));
predicate_op!(op_is_false, |v| matches!(v, Value::Bool(false)));
predicate_op!(op_is_null, |v| matches!(v, Value::Null));
predicate_op!(op_is_undefined, |v| matches!(v, Value::Undefined));
predicate_op!(op_is_string, |v| matches!(
    v,
    Value::String(_) | Value::Keyword(_)
));
predicate_op!(op_is_number, |v| matches!(v, Value::Number(_)));
predicate_op!(op_is_boolean, |v| matches!(v, Value::Bool(_)));
predicate_op!(op_is_function, |v| v.is_callable());
// objects, lists, and the host's null-object convention
predicate_op!(op_is_object, |v| matches!(
    v,
    Value::Object(_) | Value::List(_) | Value::Null
));

//
// Host interop
//

fn op_new(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let ctor = &args[0];
    if !ctor.is_callable() {
        return Err(Error::TypeError(format!(
            "new requires a constructor function, got {}",
            ctor.type_name()
        )));
    }
    let instance = Value::empty_object();
    let result = apply_at(ctor, &args[1..], Some(instance.clone()), env, depth)?;
    // host constructor protocol: an explicit object result wins over the
    // freshly allocated instance
    Ok(match result {
        Value::Object(_) => result,
        _ => instance,
    })
}

fn op_funcall(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let target = resolve_at(&forms[0], env, depth + 1)?;
    let path = match &forms[1] {
        Value::Symbol(s) => s.clone(),
        other => match resolve_at(other, env, depth + 1)? {
            Value::String(s) | Value::Keyword(s) => s,
            v => {
                return Err(Error::TypeError(format!(
                    "funcall path must name a function, got {}",
                    v.type_name()
                )));
            }
        },
    };
    let mut method = target.clone();
    for segment in path.split('.') {
        method = property(&method, segment)?;
    }
    if !method.is_callable() {
        return Err(Error::TypeError(format!("'{path}' is not a function")));
    }
    let args = resolve_args(&forms[2..], env, depth)?;
    apply_at(&method, &args, Some(target), env, depth)
}

fn op_getfunc(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let (label, value) = match &forms[0] {
        Value::Symbol(name) => (name.clone(), env.lookup(name)?),
        other => {
            let v = resolve_at(other, env, depth + 1)?;
            match v {
                Value::String(s) => (s.clone(), env.lookup(&s)?),
                v => (v.to_display(), v),
            }
        }
    };
    match value {
        Value::Builtin { op, .. } => Ok(Value::Builtin {
            op,
            as_function: true,
        }),
        Value::Native { f, .. } => Ok(Value::Native {
            f,
            as_function: true,
        }),
        callable @ Value::Lambda(_) => Ok(callable),
        _ => Err(Error::TypeError(format!("'{label}' is not a function"))),
    }
}

fn op_object(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    if forms.len() % 2 != 0 {
        return Err(Error::EvalError(
            "object requires an even number of key/value arguments".to_owned(),
        ));
    }
    let mut entries = Vec::with_capacity(forms.len() / 2);
    for pair in forms.chunks_exact(2) {
        // keys are taken verbatim from the form tree, values are resolved
        let value = resolve_at(&pair[1], env, depth + 1)?;
        set_entry(&mut entries, pair[0].clone(), value);
    }
    Ok(Value::object_from(entries))
}

/// Insert or replace a mapping entry under host-native key equality.
fn set_entry(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    for (existing, slot) in entries.iter_mut() {
        if existing.strict_eq(&key) {
            *slot = value;
            return;
        }
    }
    entries.push((key, value));
}

fn op_getkey(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    let Value::Object(entries) = &args[1] else {
        return Err(Error::TypeError(format!(
            "getkey requires an object, got {}",
            args[1].type_name()
        )));
    };
    for (key, value) in entries.borrow().iter() {
        if key.strict_eq(&args[0]) {
            return Ok(value.clone());
        }
    }
    Ok(Value::Undefined)
}

fn op_setkey(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    let Value::Object(entries) = &args[1] else {
        return Err(Error::TypeError(format!(
            "setkey requires an object, got {}",
            args[1].type_name()
        )));
    };
    set_entry(&mut entries.borrow_mut(), args[0].clone(), args[2].clone());
    Ok(args[2].clone())
}

//
// Conversions
//

fn op_to_string(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Ok(Value::String(args[0].to_display()))
}

fn op_to_number(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Ok(Value::Number(args[0].to_number()))
}

fn op_to_boolean(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].is_truthy()))
}

fn op_to_upper(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    match &args[0] {
        Value::String(s) => Ok(Value::String(s.to_uppercase())),
        other => Err(Error::TypeError(format!(
            "to-upper requires a string, got {}",
            other.type_name()
        ))),
    }
}

fn op_to_lower(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    match &args[0] {
        Value::String(s) => Ok(Value::String(s.to_lowercase())),
        other => Err(Error::TypeError(format!(
            "to-lower requires a string, got {}",
            other.type_name()
        ))),
    }
}

fn op_typeof(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Ok(Value::String(args[0].type_name().to_owned()))
}

//
// Text
//

fn op_format(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    let Value::String(fmt) = &args[1] else {
        return Err(Error::TypeError(format!(
            "format requires a format string, got {}",
            args[1].type_name()
        )));
    };
    let text = crate::format::render(fmt, &args[2..])?;
    match &args[0] {
        // a null stream returns the string, anything else writes to the
        // host's standard output
        Value::Null => Ok(Value::String(text)),
        _ => {
            println!("{text}");
            Ok(Value::Null)
        }
    }
}

fn op_join(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    let sep = args[0].to_display();
    let mut parts = Vec::new();
    for arg in &args[1..] {
        let Value::List(items) = arg else {
            return Err(Error::TypeError(format!(
                "join requires lists, got {}",
                arg.type_name()
            )));
        };
        parts.extend(items.iter().map(Value::to_display));
    }
    Ok(Value::String(parts.join(&sep)))
}

fn op_concat(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Ok(Value::String(args.iter().map(Value::to_display).collect()))
}

fn op_print(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    let parts: Vec<String> = args.iter().map(Value::to_display).collect();
    println!("{}", parts.join(" "));
    Ok(Value::Null)
}

//
// Arithmetic
//

/// Host `+`: a string-like operand anywhere switches the fold to
/// concatenation, otherwise numeric addition.
fn js_add(a: &Value, b: &Value) -> Value {
    let stringy = |v: &Value| {
        matches!(
            v,
            Value::String(_) | Value::Keyword(_) | Value::List(_) | Value::Object(_)
        )
    };
    if stringy(a) || stringy(b) {
        Value::String(format!("{}{}", a.to_display(), b.to_display()))
    } else {
        Value::Number(a.to_number() + b.to_number())
    }
}

fn op_add(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Value::Number(0.0));
    };
    let mut acc = first.clone();
    for v in rest {
        acc = js_add(&acc, v);
    }
    Ok(acc)
}

fn numeric_fold(args: &[Value], f: fn(f64, f64) -> f64) -> Result<Value, Error> {
    let mut acc = args[0].to_number();
    for v in &args[1..] {
        acc = f(acc, v.to_number());
    }
    Ok(Value::Number(acc))
}

fn op_sub(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    if args.len() == 1 {
        return Ok(Value::Number(-args[0].to_number()));
    }
    numeric_fold(args, |a, b| a - b)
}

fn op_mul(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    if args.is_empty() {
        return Ok(Value::Number(1.0));
    }
    numeric_fold(args, |a, b| a * b)
}

fn op_div(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    numeric_fold(args, |a, b| a / b)
}

fn op_mod(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    numeric_fold(args, |a, b| a % b)
}

fn op_incr(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Ok(Value::Number(args[0].to_number() + 1.0))
}

fn op_list(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    Ok(Value::List(args.to_vec()))
}

//
// The registry
//

use Arity::{Any, AtLeast, Exact};
use OpKind::{Function, Macro};

#[rustfmt::skip]
static BUILTIN_OPS: &[BuiltinOp] = &[
    // binding and control
    BuiltinOp { name: "let", kind: Macro, arity: AtLeast(1), run: op_let },
    BuiltinOp { name: "setq", kind: Macro, arity: Exact(2), run: op_setq },
    BuiltinOp { name: "lambda", kind: Macro, arity: AtLeast(1), run: op_lambda },
    BuiltinOp { name: "defun", kind: Macro, arity: AtLeast(2), run: op_defun },
    BuiltinOp { name: "progn", kind: Macro, arity: Any, run: op_progn },
    BuiltinOp { name: "if", kind: Macro, arity: AtLeast(2), run: op_if },
    BuiltinOp { name: "when", kind: Macro, arity: AtLeast(1), run: op_when },
    BuiltinOp { name: "try", kind: Macro, arity: Any, run: op_try },
    BuiltinOp { name: "throw", kind: Function, arity: Exact(1), run: op_throw },
    // logic
    BuiltinOp { name: "not", kind: Macro, arity: AtLeast(1), run: op_not },
    BuiltinOp { name: "and", kind: Macro, arity: Any, run: op_and },
    BuiltinOp { name: "or", kind: Macro, arity: Any, run: op_or },
    // comparison chains
    BuiltinOp { name: "==", kind: Macro, arity: AtLeast(2), run: op_loose_eq },
    BuiltinOp { name: "!=", kind: Macro, arity: AtLeast(2), run: op_loose_ne },
    BuiltinOp { name: "===", kind: Macro, arity: AtLeast(2), run: op_strict_eq },
    BuiltinOp { name: "!==", kind: Macro, arity: AtLeast(2), run: op_strict_ne },
    BuiltinOp { name: "<", kind: Macro, arity: AtLeast(2), run: op_lt },
    BuiltinOp { name: ">", kind: Macro, arity: AtLeast(2), run: op_gt },
    BuiltinOp { name: "<=", kind: Macro, arity: AtLeast(2), run: op_le },
    BuiltinOp { name: ">=", kind: Macro, arity: AtLeast(2), run: op_ge },
    // type predicates
    BuiltinOp { name: "is-true", kind: Macro, arity: AtLeast(1), run: op_is_true },
    BuiltinOp { name: "is-false", kind: Macro, arity: AtLeast(1), run: op_is_false },
    BuiltinOp { name: "is-null", kind: Macro, arity: AtLeast(1), run: op_is_null },
    BuiltinOp { name: "is-undefined", kind: Macro, arity: AtLeast(1), run: op_is_undefined },
    BuiltinOp { name: "is-string", kind: Macro, arity: AtLeast(1), run: op_is_string },
    BuiltinOp { name: "is-number", kind: Macro, arity: AtLeast(1), run: op_is_number },
    BuiltinOp { name: "is-boolean", kind: Macro, arity: AtLeast(1), run: op_is_boolean },
    BuiltinOp { name: "is-function", kind: Macro, arity: AtLeast(1), run: op_is_function },
    BuiltinOp { name: "is-object", kind: Macro, arity: AtLeast(1), run: op_is_object },
    // host interop
    BuiltinOp { name: "new", kind: Function, arity: AtLeast(1), run: op_new },
    BuiltinOp { name: "funcall", kind: Macro, arity: AtLeast(2), run: op_funcall },
    BuiltinOp { name: "getfunc", kind: Macro, arity: Exact(1), run: op_getfunc },
    BuiltinOp { name: "object", kind: Macro, arity: Any, run: op_object },
    BuiltinOp { name: "getkey", kind: Function, arity: Exact(2), run: op_getkey },
    BuiltinOp { name: "setkey", kind: Function, arity: Exact(3), run: op_setkey },
    // conversions
    BuiltinOp { name: "to-string", kind: Function, arity: Exact(1), run: op_to_string },
    BuiltinOp { name: "to-number", kind: Function, arity: Exact(1), run: op_to_number },
    BuiltinOp { name: "to-boolean", kind: Function, arity: Exact(1), run: op_to_boolean },
    BuiltinOp { name: "to-upper", kind: Function, arity: Exact(1), run: op_to_upper },
    BuiltinOp { name: "to-lower", kind: Function, arity: Exact(1), run: op_to_lower },
    BuiltinOp { name: "typeof", kind: Function, arity: Exact(1), run: op_typeof },
    // text
    BuiltinOp { name: "format", kind: Function, arity: AtLeast(2), run: op_format },
    BuiltinOp { name: "join", kind: Function, arity: AtLeast(2), run: op_join },
    BuiltinOp { name: "concat", kind: Function, arity: Any, run: op_concat },
    BuiltinOp { name: "print", kind: Function, arity: Any, run: op_print },
    // arithmetic
    BuiltinOp { name: "+", kind: Function, arity: Any, run: op_add },
    BuiltinOp { name: "-", kind: Function, arity: AtLeast(1), run: op_sub },
    BuiltinOp { name: "*", kind: Function, arity: Any, run: op_mul },
    BuiltinOp { name: "/", kind: Function, arity: AtLeast(2), run: op_div },
    BuiltinOp { name: "%", kind: Function, arity: AtLeast(2), run: op_mod },
    BuiltinOp { name: "1+", kind: Function, arity: Exact(1), run: op_incr },
    // sequences
    BuiltinOp { name: "list", kind: Function, arity: Any, run: op_list },
];

static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.name, op)).collect());
