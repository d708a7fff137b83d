//! The environment chain and the tree-walking resolver.
//!
//! Environments are chains of frames ending in a [`HostScope`], the
//! process-wide mutable namespace that is not itself a frame. Frames are
//! `Rc`-shared with interior mutability: a lambda holds its construction
//! environment by reference, so a `setq` through a closure is visible to
//! the enclosing `let` and vice versa. Dropping the last reference releases
//! the frame, which is how scopes restore on every exit path - normal
//! return and error unwind alike.
//!
//! Dotted names (`a.b.c`) are resolved by looking up the head through the
//! frame walk and chasing the remaining segments as property accesses;
//! this is what makes `this.assertEqual` and `d.getTime` work without any
//! special call syntax.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::MAX_EVAL_DEPTH;
use crate::ast::{NativeFn, Value};
use crate::builtins::{self, OpKind};
use crate::{Error, reader};

/// The terminal parent of every environment: a process-wide mutable
/// mapping of names to host values. Readable and writable by the embedder;
/// `setq` on a name that is bound nowhere creates it here.
#[derive(Debug, Clone, Default)]
pub struct HostScope {
    globals: Rc<RefCell<HashMap<String, Value>>>,
}

impl HostScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.globals.borrow_mut().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.globals.borrow().contains_key(name)
    }

    /// All bound names, sorted. Drives interactive environment listings.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a host function callable from scripts. The callable
    /// receives resolved arguments.
    pub fn register_function<F>(&self, name: &str, f: F)
    where
        F: Fn(&[Value], &Env) -> Result<Value, Error> + 'static,
    {
        self.register(name, OpKind::Function, f);
    }

    /// Register a host macro. The callable receives the unevaluated tail
    /// forms together with the calling environment.
    pub fn register_macro<F>(&self, name: &str, f: F)
    where
        F: Fn(&[Value], &Env) -> Result<Value, Error> + 'static,
    {
        self.register(name, OpKind::Macro, f);
    }

    fn register<F>(&self, name: &str, kind: OpKind, f: F)
    where
        F: Fn(&[Value], &Env) -> Result<Value, Error> + 'static,
    {
        self.define(
            name,
            Value::Native {
                f: Rc::new(NativeFn {
                    name: name.to_owned(),
                    kind,
                    run: Box::new(f),
                }),
                as_function: false,
            },
        );
    }
}

#[derive(Debug)]
enum Parent {
    Frame(Rc<Frame>),
    Host(HostScope),
}

#[derive(Debug)]
struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Parent,
}

/// One link in the environment chain. Cloning an `Env` clones a handle to
/// the same frame, which is exactly what closure capture needs.
#[derive(Debug, Clone)]
pub struct Env {
    frame: Rc<Frame>,
}

impl Env {
    /// The root environment: a single frame whose parent is the host scope.
    pub fn root(host: HostScope) -> Env {
        Env {
            frame: Rc::new(Frame {
                bindings: RefCell::new(HashMap::new()),
                parent: Parent::Host(host),
            }),
        }
    }

    /// A fresh child frame on this environment, used by `let` and by
    /// lambda activation.
    pub fn child(&self) -> Env {
        Env {
            frame: Rc::new(Frame {
                bindings: RefCell::new(HashMap::new()),
                parent: Parent::Frame(Rc::clone(&self.frame)),
            }),
        }
    }

    /// The terminal host scope of this chain.
    pub fn host(&self) -> HostScope {
        let mut cur = Rc::clone(&self.frame);
        loop {
            let next = match &cur.parent {
                Parent::Frame(p) => Rc::clone(p),
                Parent::Host(host) => return host.clone(),
            };
            cur = next;
        }
    }

    /// Raw insertion into the current frame, shadowing any outer binding
    /// of the same name for this frame's extent.
    pub fn bind(&self, name: impl Into<String>, value: Value) {
        self.frame.bindings.borrow_mut().insert(name.into(), value);
    }

    fn get_plain(&self, name: &str) -> Option<Value> {
        let mut cur = Rc::clone(&self.frame);
        loop {
            if let Some(value) = cur.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            let next = match &cur.parent {
                Parent::Frame(p) => Rc::clone(p),
                Parent::Host(host) => return host.get(name),
            };
            cur = next;
        }
    }

    fn has_plain(&self, name: &str) -> bool {
        let mut cur = Rc::clone(&self.frame);
        loop {
            // existence is judged by key ownership, not value truthiness
            if cur.bindings.borrow().contains_key(name) {
                return true;
            }
            let next = match &cur.parent {
                Parent::Frame(p) => Rc::clone(p),
                Parent::Host(host) => return host.has(name),
            };
            cur = next;
        }
    }

    /// Rewrite the nearest existing binding in place. Returns false when
    /// the name is bound nowhere, frames and host scope included.
    fn set_existing(&self, name: &str, value: &Value) -> bool {
        let mut cur = Rc::clone(&self.frame);
        loop {
            if cur.bindings.borrow().contains_key(name) {
                cur.bindings
                    .borrow_mut()
                    .insert(name.to_owned(), value.clone());
                return true;
            }
            let next = match &cur.parent {
                Parent::Frame(p) => Rc::clone(p),
                Parent::Host(host) => {
                    if host.has(name) {
                        host.define(name, value.clone());
                        return true;
                    }
                    return false;
                }
            };
            cur = next;
        }
    }

    /// Look a name up. Plain names walk the chain innermost-outward and
    /// yield the undefined value when bound nowhere. Dotted names resolve
    /// the head the same way, then chase property accesses; a missing head
    /// is a type error.
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        match name.split_once('.') {
            Some((head, tail)) => {
                if !self.has_plain(head) {
                    return Err(Error::TypeError(format!("'{head}' is not defined")));
                }
                let mut value = self.get_plain(head).unwrap_or(Value::Undefined);
                for segment in tail.split('.') {
                    value = property(&value, segment)?;
                }
                Ok(value)
            }
            None => Ok(self.get_plain(name).unwrap_or(Value::Undefined)),
        }
    }

    /// `setq` semantics. Dotted names assign a property on the object the
    /// prefix resolves to; plain names rewrite the nearest existing
    /// binding, falling back to a fresh binding in the host scope.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), Error> {
        match name.rsplit_once('.') {
            Some((prefix, last)) => {
                let target = self.lookup(prefix)?;
                match &target {
                    Value::Object(entries) => {
                        let mut entries = entries.borrow_mut();
                        for (key, slot) in entries.iter_mut() {
                            if key_names_segment(key, last) {
                                *slot = value;
                                return Ok(());
                            }
                        }
                        entries.push((Value::String(last.to_owned()), value));
                        Ok(())
                    }
                    other => Err(Error::TypeError(format!(
                        "cannot set property '{last}' on {}",
                        other.type_name()
                    ))),
                }
            }
            None => {
                if !self.set_existing(name, &value) {
                    self.host().define(name, value);
                }
                Ok(())
            }
        }
    }

    /// Whether a name resolves to anything.
    pub fn has(&self, name: &str) -> bool {
        if name.contains('.') {
            matches!(self.lookup(name), Ok(value) if !matches!(value, Value::Undefined))
        } else {
            self.has_plain(name)
        }
    }
}

/// One segment of a dotted path: object properties by string or keyword
/// key, `length` on strings and lists. Reading through null or undefined
/// is a type error; any other base yields the undefined value.
pub(crate) fn property(base: &Value, segment: &str) -> Result<Value, Error> {
    match base {
        Value::Object(entries) => {
            for (key, value) in entries.borrow().iter() {
                if key_names_segment(key, segment) {
                    return Ok(value.clone());
                }
            }
            Ok(Value::Undefined)
        }
        Value::String(s) if segment == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::List(items) if segment == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Null | Value::Undefined => Err(Error::TypeError(format!(
            "cannot read property '{segment}' of {}",
            base.to_display()
        ))),
        _ => Ok(Value::Undefined),
    }
}

fn key_names_segment(key: &Value, segment: &str) -> bool {
    matches!(key, Value::String(s) | Value::Keyword(s) if s == segment)
}

/// Resolve a form against an environment (public API).
pub fn resolve(form: &Value, env: &Env) -> Result<Value, Error> {
    resolve_at(form, env, 0)
}

/// Resolve with depth tracking, the internal entry point builtins recurse
/// through.
pub(crate) fn resolve_at(form: &Value, env: &Env, depth: usize) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    match form {
        Value::Symbol(name) => env.lookup(name),
        Value::List(forms) => {
            resolve_combination(forms, env, depth).map_err(|err| add_context(err, form))
        }
        other => Ok(other.clone()),
    }
}

/// Evaluate a combination. The head decides everything: a macro combiner
/// gets the tail unevaluated, a function combiner gets it resolved left to
/// right, and a non-symbol head is itself resolved first.
fn resolve_combination(forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let Some((head, tail)) = forms.split_first() else {
        return Ok(Value::Null);
    };

    let (combiner, receiver) = match head {
        Value::Symbol(name) => match name.rsplit_once('.') {
            // method call syntax: the prefix object is the receiver
            Some((prefix, last)) => {
                let base = env.lookup(prefix)?;
                (property(&base, last)?, Some(base))
            }
            None => (env.lookup(name)?, None),
        },
        other => (resolve_at(other, env, depth + 1)?, None),
    };

    if combiner.is_macro() {
        return invoke_macro(&combiner, tail, env, depth);
    }
    if !combiner.is_callable() {
        return Err(Error::TypeError(format!(
            "{head} is not a function (got {})",
            combiner.type_name()
        )));
    }
    let args = resolve_args(tail, env, depth)?;
    apply_at(&combiner, &args, receiver, env, depth)
}

/// Resolve argument forms left to right. Observable through side effects,
/// so the order is part of the language.
pub(crate) fn resolve_args(forms: &[Value], env: &Env, depth: usize) -> Result<Vec<Value>, Error> {
    forms
        .iter()
        .map(|form| resolve_at(form, env, depth + 1))
        .collect()
}

fn invoke_macro(combiner: &Value, forms: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    match combiner {
        Value::Builtin { op, .. } => {
            op.arity.validate(op.name, forms.len())?;
            (op.run)(forms, env, depth)
        }
        Value::Native { f, .. } => (f.run)(forms, env),
        other => Err(Error::TypeError(format!(
            "cannot expand non-macro: {other}"
        ))),
    }
}

/// Apply a callable to already-resolved arguments (public API).
pub fn apply(
    func: &Value,
    args: &[Value],
    receiver: Option<Value>,
    env: &Env,
) -> Result<Value, Error> {
    apply_at(func, args, receiver, env, 0)
}

pub(crate) fn apply_at(
    func: &Value,
    args: &[Value],
    receiver: Option<Value>,
    env: &Env,
    depth: usize,
) -> Result<Value, Error> {
    match func {
        Value::Builtin { op, .. } => {
            op.arity.validate(op.name, args.len())?;
            (op.run)(args, env, depth)
        }
        Value::Native { f, .. } => (f.run)(args, env),
        Value::Lambda(lambda) => {
            let frame = lambda.env.child();
            if let Some(this) = receiver {
                frame.bind("this", this);
            }
            // unbound extras become undefined, surplus arguments are ignored
            for (i, param) in lambda.params.iter().enumerate() {
                frame.bind(
                    param.clone(),
                    args.get(i).cloned().unwrap_or(Value::Undefined),
                );
            }
            let mut result = Value::Null;
            for form in &lambda.body {
                result = resolve_at(form, &frame, depth + 1)?;
            }
            Ok(result)
        }
        other => Err(Error::TypeError(format!(
            "cannot apply non-function: {other}"
        ))),
    }
}

/// Attach the failing form to evaluation and type errors. Thrown values
/// pass through untouched so `catch` handlers see exactly what was raised.
fn add_context(error: Error, form: &Value) -> Error {
    match error {
        Error::EvalError(msg) => Error::EvalError(format!("{msg}\n  while evaluating: {form}")),
        other => other,
    }
}

/// A root environment over a fresh host scope seeded with the builtin
/// registry.
pub fn create_root_env() -> Env {
    let host = HostScope::new();
    builtins::install(&host);
    Env::root(host)
}

/// The driver: read every top-level form of `source` and resolve each
/// against `env`, returning the last value (null for empty input).
pub fn run(source: &str, env: &Env) -> Result<Value, Error> {
    let mut last = Value::Null;
    for form in reader::read(source) {
        last = resolve(&form?, env)?;
    }
    Ok(last)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;

    fn eval_str(source: &str) -> Result<Value, Error> {
        run(source, &create_root_env())
    }

    #[test]
    fn test_self_evaluating_and_symbols() {
        assert_eq!(eval_str("42").unwrap(), val(42));
        assert_eq!(eval_str("\"s\"").unwrap(), val("s"));
        assert_eq!(eval_str(":tag").unwrap(), crate::ast::kw("tag"));
        assert_eq!(eval_str("t").unwrap(), val(true));
        assert_eq!(eval_str("nil").unwrap(), Value::Null);
        // unbound symbols resolve to the undefined value
        assert_eq!(eval_str("no-such-binding").unwrap(), Value::Undefined);
        // the empty combination is null
        assert_eq!(eval_str("()").unwrap(), Value::Null);
    }

    #[test]
    fn test_closure_shares_let_frame() {
        // a lambda with no parameter named x mutates the same x the
        // enclosing let sees
        let result = eval_str("(let ((x 3) (f (lambda () (setq x (1+ x))))) (f) (f) x)");
        assert_eq!(result.unwrap(), val(5));
    }

    #[test]
    fn test_parameter_shadows_closure() {
        // a lambda that declares x as a parameter does not touch the outer x
        let result = eval_str("(let ((x 3) (f (lambda (x) (setq x (1+ x))))) (f x) (f x) x)");
        assert_eq!(result.unwrap(), val(3));
    }

    #[test]
    fn test_or_short_circuit_suppresses_setq() {
        let result = eval_str("(let ((x 5)) (or nil false t (setq x 10)) x)");
        assert_eq!(result.unwrap(), val(5));
    }

    #[test]
    fn test_when_setq_writes_host_namespace() {
        let env = create_root_env();
        let result = run("(when t (setq a 10) (setq a 20))", &env).unwrap();
        assert_eq!(result, val(20));
        // the binding was created at the terminal host scope
        assert_eq!(env.host().get("a").unwrap(), val(20));
    }

    #[test]
    fn test_let_bindings_are_invisible_after_exit() {
        let env = create_root_env();
        run("(setq outer 1)", &env).unwrap();
        run("(let ((outer 99) (inner 2)) inner)", &env).unwrap();
        // outer keeps its value, inner never leaked
        assert_eq!(run("outer", &env).unwrap(), val(1));
        assert!(!env.has("inner"));
        assert_eq!(run("inner", &env).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_let_restores_frame_on_error() {
        let env = create_root_env();
        run("(setq x 1)", &env).unwrap();
        let err = run("(let ((x 2)) (throw \"boom\"))", &env).unwrap_err();
        assert!(matches!(err, Error::Thrown(_)));
        assert_eq!(run("x", &env).unwrap(), val(1));
    }

    #[test]
    fn test_setq_rewrites_nearest_binding() {
        let result = eval_str("(let ((x 1)) (let ((y 2)) (setq x 7)) x)");
        assert_eq!(result.unwrap(), val(7));
    }

    #[test]
    fn test_let_binding_expr_sees_outer_value() {
        // the expression is evaluated before its own name is bound
        let result = eval_str("(setq x 10) (let ((x (1+ x))) x)");
        assert_eq!(result.unwrap(), val(11));
    }

    #[test]
    fn test_dotted_lookup_and_assign() {
        let env = create_root_env();
        run("(setq box (object :inner (object :count 1)))", &env).unwrap();
        assert_eq!(run("box.inner.count", &env).unwrap(), val(1));
        run("(setq box.inner.count 5)", &env).unwrap();
        assert_eq!(run("box.inner.count", &env).unwrap(), val(5));
        // property created on assignment when absent
        run("(setq box.label \"crate\")", &env).unwrap();
        assert_eq!(run("box.label", &env).unwrap(), val("crate"));

        // a missing prefix is a type error, not undefined
        assert!(matches!(
            run("missing.path", &env),
            Err(Error::TypeError(_))
        ));
        assert!(matches!(
            run("(setq missing.path 1)", &env),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_length_properties() {
        assert_eq!(eval_str("(setq s \"hello\") s.length").unwrap(), val(5));
        assert_eq!(eval_str("(setq l (list 1 2 3)) l.length").unwrap(), val(3));
    }

    #[test]
    fn test_dotted_head_binds_receiver() {
        // a method reached through a dotted head sees its object as `this`
        let source = "
            (setq counter (object :count 10))
            (setq counter.bump (lambda (n) (setq this.count (+ this.count n))))
            (counter.bump 5)
            counter.count";
        assert_eq!(eval_str(source).unwrap(), val(15));
    }

    #[test]
    fn test_funcall_binds_receiver() {
        let source = "
            (setq counter (object :count 1))
            (setq counter.get (lambda () this.count))
            (funcall counter get)";
        assert_eq!(eval_str(source).unwrap(), val(1));
    }

    #[test]
    fn test_computed_head_applies_as_function() {
        // a non-symbol head resolves first, then applies
        assert_eq!(eval_str("((lambda (a b) (+ a b)) 1 2)").unwrap(), val(3));
        // a macro fetched by getfunc is invoked as a plain function
        assert_eq!(eval_str("((getfunc and) t t)").unwrap(), val(true));
        assert_eq!(eval_str("((getfunc or) false false)").unwrap(), val(false));
    }

    #[test]
    fn test_non_callable_head_is_type_error() {
        assert!(matches!(eval_str("(42 1 2)"), Err(Error::TypeError(_))));
        assert!(matches!(
            eval_str("(no-such-function 1)"),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_argument_order_is_left_to_right() {
        let source = "
            (setq trace \"\")
            (defun note (tag) (setq trace (concat trace tag)) tag)
            (concat (note \"a\") (note \"b\") (note \"c\"))
            trace";
        assert_eq!(eval_str(source).unwrap(), val("abc"));
    }

    #[test]
    fn test_surplus_and_missing_lambda_arguments() {
        assert_eq!(
            eval_str("((lambda (a b) b) 1)").unwrap(),
            Value::Undefined
        );
        assert_eq!(eval_str("((lambda (a) a) 1 2 3)").unwrap(), val(1));
        // an empty body yields null
        assert_eq!(eval_str("((lambda ()))").unwrap(), Value::Null);
    }

    #[test]
    fn test_defun_recursion_uses_fresh_frames() {
        let source = "
            (defun fact (n) (if (<= n 1) 1 (* n (fact (- n 1)))))
            (fact 6)";
        assert_eq!(eval_str(source).unwrap(), val(720));
    }

    #[test]
    fn test_depth_limit_stops_runaway_recursion() {
        let err = eval_str("(defun loop-forever () (loop-forever)) (loop-forever)").unwrap_err();
        match err {
            Error::EvalError(msg) => assert!(msg.contains("depth limit")),
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    #[test]
    fn test_host_registered_native() {
        let env = create_root_env();
        env.host().register_function("host-double", |args, _env| {
            Ok(Value::Number(args[0].to_number() * 2.0))
        });
        assert_eq!(run("(host-double 21)", &env).unwrap(), val(42));
    }

    #[test]
    fn test_host_registered_macro_gets_forms() {
        let env = create_root_env();
        // reports the head symbol of its unevaluated argument
        env.host().register_macro("head-name", |forms, _env| {
            match forms.first() {
                Some(Value::List(items)) => match items.first() {
                    Some(Value::Symbol(s)) => Ok(Value::String(s.clone())),
                    _ => Ok(Value::Null),
                },
                _ => Ok(Value::Null),
            }
        });
        assert_eq!(
            run("(head-name (never-called 1 2))", &env).unwrap(),
            val("never-called")
        );
    }

    #[test]
    fn test_run_returns_last_form() {
        assert_eq!(eval_str("1 2 3").unwrap(), val(3));
        assert_eq!(eval_str("").unwrap(), Value::Null);
    }
}
