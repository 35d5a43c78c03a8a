use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::ast::{Ast, Pos};
use crate::env::Env;
use crate::hashtable::Table;
use crate::parser;

mod display;
mod error;

pub(crate) use display::lossy;
pub use error::{RuntimeError, Signal};

/// Tolerance used for every float comparison.
pub(crate) const FLOAT_EPSILON: f64 = 1e-5;

/// Backing store of the `map` value type.
pub type MapTable = Table<Value, ()>;

/// Signature of a native command: call position, environment of the calling
/// block, ambient `this` receiver, bound object (for `value:method` calls),
/// and the unevaluated argument nodes. The callee decides which arguments to
/// evaluate, and in what order.
pub type NativeFn =
    fn(&Pos, &mut Env, Option<&Value>, Option<&Value>, &[Ast]) -> Result<Value, Signal>;

/// A host-provided command, optionally bound to the value it was looked up
/// on (`$list:push` carries `$list` here).
#[derive(Debug)]
pub struct NativeCmd {
    pub(crate) func: NativeFn,
    pub(crate) obj: Option<Value>,
}

/// A user-defined command: positional parameter names, an owned copy of the
/// body, and an optional receiver captured *weakly* at creation time (the
/// receiver may own the command, so a strong reference would cycle).
#[derive(Debug)]
pub struct CmdData {
    pub(crate) params: Vec<Vec<u8>>,
    pub(crate) body: Ast,
    pub(crate) receiver: RefCell<Option<WeakValue>>,
}

/// Non-owning handle to a reference-counted value, used for captured
/// receivers. Upgrading fails once every owner is gone.
#[derive(Debug, Clone)]
pub(crate) enum WeakValue {
    Str(Weak<RefCell<Vec<u8>>>),
    List(Weak<RefCell<Vec<Value>>>),
    Map(Weak<RefCell<MapTable>>),
    Native(Weak<NativeCmd>),
    Cmd(Weak<CmdData>),
}

impl WeakValue {
    /// Returns `None` for scalar values, which have no count to not own.
    pub(crate) fn downgrade(value: &Value) -> Option<WeakValue> {
        match value {
            Value::Null | Value::Int(_) | Value::Float(_) => None,
            Value::Str(rc) => Some(WeakValue::Str(Rc::downgrade(rc))),
            Value::List(rc) => Some(WeakValue::List(Rc::downgrade(rc))),
            Value::Map(rc) => Some(WeakValue::Map(Rc::downgrade(rc))),
            Value::Native(rc) => Some(WeakValue::Native(Rc::downgrade(rc))),
            Value::Cmd(rc) => Some(WeakValue::Cmd(Rc::downgrade(rc))),
        }
    }

    pub(crate) fn upgrade(&self) -> Option<Value> {
        match self {
            WeakValue::Str(w) => w.upgrade().map(Value::Str),
            WeakValue::List(w) => w.upgrade().map(Value::List),
            WeakValue::Map(w) => w.upgrade().map(Value::Map),
            WeakValue::Native(w) => w.upgrade().map(Value::Native),
            WeakValue::Cmd(w) => w.upgrade().map(Value::Cmd),
        }
    }
}

/// A runtime value. Scalars copy by value; everything else is a counted
/// reference, so `clone` *is* the ref operation and drop is the release.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(Rc<RefCell<Vec<u8>>>),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<MapTable>>),
    Native(Rc<NativeCmd>),
    Cmd(Rc<CmdData>),
}

impl Value {
    pub(crate) fn new_str(bytes: Vec<u8>) -> Value {
        Value::Str(Rc::new(RefCell::new(bytes)))
    }

    pub(crate) fn new_list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub(crate) fn new_map(table: MapTable) -> Value {
        Value::Map(Rc::new(RefCell::new(table)))
    }

    pub(crate) fn native(func: NativeFn) -> Value {
        Value::Native(Rc::new(NativeCmd { func, obj: None }))
    }

    pub(crate) fn bound_native(func: NativeFn, obj: Value) -> Value {
        Value::Native(Rc::new(NativeCmd {
            func,
            obj: Some(obj),
        }))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Native(_) => "externcommand",
            Value::Cmd(_) => "command",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Native(_) | Value::Cmd(_))
    }

    /// Number of live owners, `None` for scalars.
    pub fn refcount(&self) -> Option<usize> {
        match self {
            Value::Null | Value::Int(_) | Value::Float(_) => None,
            Value::Str(rc) => Some(Rc::strong_count(rc)),
            Value::List(rc) => Some(Rc::strong_count(rc)),
            Value::Map(rc) => Some(Rc::strong_count(rc)),
            Value::Native(rc) => Some(Rc::strong_count(rc)),
            Value::Cmd(rc) => Some(Rc::strong_count(rc)),
        }
    }

    /// True when this handle is the only owner, which is what licenses the
    /// non-`!` mutating methods to skip the defensive copy.
    pub(crate) fn sole_owner(&self) -> bool {
        self.refcount() == Some(1)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Int(i) => *i != 0,
            Value::Float(f) => f.abs() >= FLOAT_EPSILON,
            Value::Str(_) | Value::List(_) | Value::Map(_) | Value::Native(_) | Value::Cmd(_) => {
                true
            }
        }
    }

    /// Shallow clone: new backing store, contents shared by reference.
    /// Strings copy their bytes; list/map elements get their counts bumped,
    /// not copied. Commands get a fresh handle with a copied body and the
    /// same weak receiver.
    pub fn shallow_clone(&self) -> Value {
        match self {
            Value::Null | Value::Int(_) | Value::Float(_) => self.clone(),
            Value::Str(s) => Value::new_str(s.borrow().clone()),
            Value::List(l) => Value::new_list(l.borrow().clone()),
            Value::Map(m) => Value::new_map(m.borrow().clone_with(())),
            Value::Native(_) => self.clone(),
            Value::Cmd(c) => Value::Cmd(Rc::new(CmdData {
                params: c.params.clone(),
                body: c.body.clone(),
                receiver: RefCell::new(c.receiver.borrow().clone()),
            })),
        }
    }

    /// Conversion to int; anything that has no int reading yields `Null`
    /// rather than an error. String conversion requires the whole text to be
    /// a valid integer literal.
    pub fn to_int(&self) -> Value {
        match self {
            Value::Null | Value::Int(_) => self.clone(),
            Value::Float(f) => Value::Int(*f as i64),
            Value::Str(s) => {
                let bytes = s.borrow();
                if parser::is_int_literal(&bytes) {
                    Value::Int(parser::parse_int(&bytes))
                } else {
                    Value::Null
                }
            }
            _ => Value::Null,
        }
    }

    /// Conversion to float, same contract as [`Value::to_int`]. Integer text
    /// is acceptable float text.
    pub fn to_float(&self) -> Value {
        match self {
            Value::Null | Value::Float(_) => self.clone(),
            Value::Int(i) => Value::Float(*i as f64),
            Value::Str(s) => {
                let bytes = s.borrow();
                if parser::is_float_literal(&bytes) {
                    Value::Float(parser::parse_float(&bytes))
                } else if parser::is_int_literal(&bytes) {
                    Value::Float(parser::parse_int(&bytes) as f64)
                } else {
                    Value::Null
                }
            }
            _ => Value::Null,
        }
    }
}

enum NumPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

/// Applies the numeric promotion rule: int∘int stays int, one float operand
/// promotes both. Anything else is a type error naming both operands.
fn numeric_pair(op: &str, a: &Value, b: &Value) -> Result<NumPair, RuntimeError> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        return Ok(NumPair::Ints(*x, *y));
    }
    let to_f = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    match (to_f(a), to_f(b)) {
        (Some(x), Some(y)) => Ok(NumPair::Floats(x, y)),
        _ => Err(RuntimeError::new(format!(
            "Cannot perform operation {} on types {} and {}.",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

pub(crate) fn add(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match numeric_pair("+", a, b)? {
        NumPair::Ints(x, y) => Ok(Value::Int(x.wrapping_add(y))),
        NumPair::Floats(x, y) => Ok(Value::Float(x + y)),
    }
}

pub(crate) fn sub(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match numeric_pair("-", a, b)? {
        NumPair::Ints(x, y) => Ok(Value::Int(x.wrapping_sub(y))),
        NumPair::Floats(x, y) => Ok(Value::Float(x - y)),
    }
}

pub(crate) fn mul(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match numeric_pair("*", a, b)? {
        NumPair::Ints(x, y) => Ok(Value::Int(x.wrapping_mul(y))),
        NumPair::Floats(x, y) => Ok(Value::Float(x * y)),
    }
}

pub(crate) fn div(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match numeric_pair("/", a, b)? {
        NumPair::Ints(_, 0) => Err(RuntimeError::new("Division by zero.")),
        NumPair::Ints(x, y) => Ok(Value::Int(x.wrapping_div(y))),
        NumPair::Floats(x, y) => Ok(Value::Float(x / y)),
    }
}

pub(crate) fn rem(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match numeric_pair("%", a, b)? {
        NumPair::Ints(_, 0) => Err(RuntimeError::new("Division by zero.")),
        NumPair::Ints(x, y) => Ok(Value::Int(x.wrapping_rem(y))),
        NumPair::Floats(x, y) => Ok(Value::Float(x % y)),
    }
}

macro_rules! comparison {
    ($name:ident, $op:tt) => {
        pub(crate) fn $name(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
            match numeric_pair(stringify!($op), a, b)? {
                NumPair::Ints(x, y) => Ok(x $op y),
                NumPair::Floats(x, y) => Ok(x $op y),
            }
        }
    };
}

comparison!(lt, <);
comparison!(lte, <=);
comparison!(gt, >);
comparison!(gte, >=);

fn float_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < FLOAT_EPSILON
}

/// Structural equality for scalars, strings and lists; identity for maps and
/// commands. Never errors: values of incomparable types are simply unequal.
pub(crate) fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(x), Value::Float(y)) => float_eq(*x as f64, *y),
        (Value::Float(x), Value::Int(y)) => float_eq(*x, *y as f64),
        (Value::Float(x), Value::Float(y)) => float_eq(*x, *y),
        (Value::Str(x), Value::Str(y)) => *x.borrow() == *y.borrow(),
        (Value::List(x), Value::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let xs = x.borrow();
            let ys = y.borrow();
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(u, v)| equal(u, v))
        }
        (Value::Map(x), Value::Map(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => Rc::ptr_eq(x, y),
        (Value::Cmd(x), Value::Cmd(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn list_get(list: &Rc<RefCell<Vec<Value>>>, idx: i64) -> Result<Value, RuntimeError> {
    let items = list.borrow();
    if idx < 0 || idx as usize >= items.len() {
        return Err(RuntimeError::new(format!(
            "Index {} out of bounds for list of length {}.",
            idx,
            items.len()
        )));
    }
    Ok(items[idx as usize].clone())
}

fn string_get(string: &Rc<RefCell<Vec<u8>>>, idx: i64) -> Result<Value, RuntimeError> {
    let bytes = string.borrow();
    if idx < 0 || idx as usize >= bytes.len() {
        return Err(RuntimeError::new(format!(
            "Index {} out of bounds for string of length {}.",
            idx,
            bytes.len()
        )));
    }
    Ok(Value::new_str(vec![bytes[idx as usize]]))
}

fn string_member(left: &Value, name: &[u8]) -> Result<Value, RuntimeError> {
    use crate::builtins::methods;
    if name == b"len" {
        if let Value::Str(s) = left {
            return Ok(Value::Int(s.borrow().len() as i64));
        }
    }
    let func: NativeFn = match name {
        b"set!" => methods::string_set_mut,
        b"set" => methods::string_set,
        b"slice!" => methods::string_slice_mut,
        b"slice" => methods::string_slice,
        b"dup!" => methods::string_dup_mut,
        b"dup" => methods::string_dup,
        b"split" => methods::string_split,
        b"reverse!" => methods::string_reverse_mut,
        b"reverse" => methods::string_reverse,
        b"cat!" => methods::string_cat_mut,
        b"cat" => methods::string_cat,
        _ => {
            return Err(RuntimeError::new(format!(
                "No member '{}' in string.",
                lossy(name)
            )))
        }
    };
    Ok(Value::bound_native(func, left.clone()))
}

fn list_member(left: &Value, name: &[u8]) -> Result<Value, RuntimeError> {
    use crate::builtins::methods;
    if name == b"len" {
        if let Value::List(l) = left {
            return Ok(Value::Int(l.borrow().len() as i64));
        }
    }
    let func: NativeFn = match name {
        b"set!" => methods::list_set_mut,
        b"set" => methods::list_set,
        b"clone" => methods::clone_obj,
        b"push!" => methods::list_push_mut,
        b"push" => methods::list_push,
        b"unshift!" => methods::list_unshift_mut,
        b"unshift" => methods::list_unshift,
        b"pop!" => methods::list_pop_mut,
        b"pop" => methods::list_pop,
        b"shift!" => methods::list_shift_mut,
        b"shift" => methods::list_shift,
        b"slice!" => methods::list_slice_mut,
        b"slice" => methods::list_slice,
        b"cat!" => methods::list_cat_mut,
        b"cat" => methods::list_cat,
        b"fill!" => methods::list_fill_mut,
        b"fill" => methods::list_fill,
        b"dup!" => methods::list_dup_mut,
        b"dup" => methods::list_dup,
        b"reverse!" => methods::list_reverse_mut,
        b"reverse" => methods::list_reverse,
        _ => {
            return Err(RuntimeError::new(format!(
                "No member '{}' in list.",
                lossy(name)
            )))
        }
    };
    Ok(Value::bound_native(func, left.clone()))
}

fn map_member(left: &Value, name: &[u8]) -> Result<Value, RuntimeError> {
    use crate::builtins::methods;
    let func: Option<NativeFn> = match name {
        b"set!" => Some(methods::map_set_mut),
        b"set" => Some(methods::map_set),
        b"clone" => Some(methods::clone_obj),
        b"del!" => Some(methods::map_del_mut),
        b"del" => Some(methods::map_del),
        _ => None,
    };
    if let Some(func) = func {
        return Ok(Value::bound_native(func, left.clone()));
    }
    if let Value::Map(m) = left {
        if let Some(v) = m.borrow().get(name) {
            return Ok(v.clone());
        }
    }
    Err(RuntimeError::new(format!(
        "No member '{}' in map.",
        lossy(name)
    )))
}

/// The binary `:` operation. Int (or truncated float) keys index strings and
/// lists positionally; string keys name methods, and on maps fall back to
/// entry lookup.
pub(crate) fn index(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Str(s), Value::Int(i)) => string_get(s, *i),
        (Value::Str(s), Value::Float(f)) => string_get(s, *f as i64),
        (Value::Str(_), Value::Str(name)) => string_member(left, &name.borrow()),
        (Value::List(l), Value::Int(i)) => list_get(l, *i),
        (Value::List(l), Value::Float(f)) => list_get(l, *f as i64),
        (Value::List(_), Value::Str(name)) => list_member(left, &name.borrow()),
        (Value::Map(_), Value::Str(name)) => map_member(left, &name.borrow()),
        _ => Err(RuntimeError::new(format!(
            "Can not index {} with {}.",
            left.type_name(),
            right.type_name()
        ))),
    }
}
