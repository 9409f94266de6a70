//! Runtime values.
//!
//! `Value` is a closed tagged union. Primitives are inline; everything
//! that can be aliased (pairs, closures, builtins, continuations) is
//! reference-counted, because closures and continuations share
//! ownership of the environment chain and may outlive the call that
//! created them.
//!
//! Strict equality is by tag: primitives compare by value, composites
//! and callables by reference identity.

use std::fmt;
use std::rc::Rc;

use rill_ir::{ExprId, Name, ParamRange};

use crate::environment::Frame;
use crate::errors::EvalError;
use crate::machine::ControlItem;

/// Native builtin implementation: fixed calling convention.
///
/// Natives have no access to the machine; they see argument values and
/// produce a value or an error (the machine attaches the call-site
/// span afterwards).
pub type NativeFn = fn(&[Value]) -> Result<Value, EvalError>;

/// Runtime value.
#[derive(Clone)]
pub enum Value {
    /// Number (IEEE double, the only numeric kind).
    Number(f64),
    /// Text.
    Text(Rc<str>),
    /// Boolean.
    Bool(bool),
    /// The absence marker.
    Undefined,
    /// Empty-list marker terminating pair chains.
    Null,
    /// Pair with identity semantics.
    Pair(Rc<(Value, Value)>),
    /// User function: code plus captured defining environment.
    Closure(Rc<ClosureValue>),
    /// Host-provided function with declared arity.
    Builtin(Rc<BuiltinValue>),
    /// Captured machine snapshot ("the rest of the computation").
    Continuation(Rc<ContinuationValue>),
}

/// User function value.
///
/// The environment is captured by reference, not copied; this is what
/// makes lexical closures and mutual recursion work.
pub struct ClosureValue {
    /// Declared name, `Name::EMPTY` for anonymous lambdas.
    pub name: Name,
    pub params: ParamRange,
    pub body: ExprId,
    pub env: Frame,
}

/// Host builtin value.
pub struct BuiltinValue {
    /// Display label (builtins are installed from static tables).
    pub name: &'static str,
    /// Declared arity; `None` means variadic.
    pub arity: Option<usize>,
    pub kind: BuiltinKind,
}

/// What applying a builtin does.
pub enum BuiltinKind {
    /// Ordinary native function.
    Native(NativeFn),
    /// Continuation capture primitive; intercepted by the machine.
    CallCc,
    /// Non-deterministic choice primitive; intercepted by the machine.
    Amb,
    /// Backtracking filter primitive; intercepted by the machine.
    Require,
    /// Explicit debugger suspension; intercepted by the machine.
    Pause,
}

/// Captured machine snapshot backing a continuation value.
///
/// The agenda and stash are structural copies taken at capture time;
/// each invocation clones them again, so one captured continuation can
/// be invoked any number of times.
pub struct ContinuationValue {
    pub agenda: Vec<ControlItem>,
    pub stash: Vec<Value>,
    pub env: Frame,
}

impl Value {
    /// Number value.
    #[inline]
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// Text value.
    pub fn text(s: impl Into<Rc<str>>) -> Self {
        Value::Text(s.into())
    }

    /// Pair value.
    pub fn pair(head: Value, tail: Value) -> Self {
        Value::Pair(Rc::new((head, tail)))
    }

    /// Closure value.
    pub fn closure(name: Name, params: ParamRange, body: ExprId, env: Frame) -> Self {
        Value::Closure(Rc::new(ClosureValue {
            name,
            params,
            body,
            env,
        }))
    }

    /// Native builtin value.
    pub fn native(name: &'static str, arity: Option<usize>, f: NativeFn) -> Self {
        Value::Builtin(Rc::new(BuiltinValue {
            name,
            arity,
            kind: BuiltinKind::Native(f),
        }))
    }

    /// Machine-primitive builtin value.
    pub fn primitive(name: &'static str, arity: Option<usize>, kind: BuiltinKind) -> Self {
        Value::Builtin(Rc::new(BuiltinValue { name, arity, kind }))
    }

    /// Kind name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Bool(_) => "boolean",
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Pair(_) => "pair",
            Value::Closure(_) => "function",
            Value::Builtin(_) => "builtin function",
            Value::Continuation(_) => "continuation",
        }
    }

    /// Strict equality: by value for primitives, by identity for
    /// composites and callables, always `false` across tags.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Continuation(a), Value::Continuation(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Whole numbers print without a trailing ".0".
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e21 {
                    write!(f, "{n:.0}")
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Pair(p) => write!(f, "[{}, {}]", p.0, p.1),
            Value::Closure(_) => f.write_str("<function>"),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::Continuation(_) => f.write_str("<continuation>"),
        }
    }
}

// Shallow Debug: closure environments may reference the closure
// itself, so printing must never follow the environment chain.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Pair(p) => write!(f, "Pair({:?}, {:?})", p.0, p.1),
            Value::Closure(c) => write!(f, "Closure(name={:?})", c.name),
            Value::Builtin(b) => write!(f, "Builtin({})", b.name),
            Value::Continuation(k) => {
                write!(f, "Continuation(agenda={}, stash={})", k.agenda.len(), k.stash.len())
            }
        }
    }
}
