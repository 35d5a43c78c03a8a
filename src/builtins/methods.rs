//! Bound methods reached through the `:` operator. Every mutating method
//! comes in two flavors: `name!` mutates the bound object no matter how many
//! owners it has, `name` mutates in place only when the object has a single
//! owner and otherwise clones first and mutates the clone.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Ast, Pos};
use crate::env::Env;
use crate::interpreter::evaluate;
use crate::value::{NativeFn, RuntimeError, Signal, Value};

use super::{args_at_least, args_exact, args_none, eval_int, value_to_key};

fn obj_value<'a>(pos: &Pos, obj: Option<&'a Value>) -> Result<&'a Value, Signal> {
    obj.ok_or_else(|| Signal::Error(RuntimeError::at(pos, "Method called without a receiver.")))
}

fn obj_list<'a>(
    pos: &Pos,
    obj: Option<&'a Value>,
) -> Result<&'a Rc<RefCell<Vec<Value>>>, Signal> {
    match obj_value(pos, obj)? {
        Value::List(list) => Ok(list),
        other => Err(Signal::Error(RuntimeError::at(
            pos,
            format!("Method requires a list receiver, got {}.", other.type_name()),
        ))),
    }
}

fn obj_string<'a>(pos: &Pos, obj: Option<&'a Value>) -> Result<&'a Rc<RefCell<Vec<u8>>>, Signal> {
    match obj_value(pos, obj)? {
        Value::Str(bytes) => Ok(bytes),
        other => Err(Signal::Error(RuntimeError::at(
            pos,
            format!(
                "Method requires a string receiver, got {}.",
                other.type_name()
            ),
        ))),
    }
}

fn obj_map<'a>(
    pos: &Pos,
    obj: Option<&'a Value>,
) -> Result<&'a Rc<RefCell<crate::value::MapTable>>, Signal> {
    match obj_value(pos, obj)? {
        Value::Map(map) => Ok(map),
        other => Err(Signal::Error(RuntimeError::at(
            pos,
            format!("Method requires a map receiver, got {}.", other.type_name()),
        ))),
    }
}

/// The clone-before-mutate policy: run the `!` flavor directly when the
/// receiver has one owner, otherwise on a fresh clone, which becomes the
/// result.
fn unmut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
    mutating: NativeFn,
) -> Result<Value, Signal> {
    let target = obj_value(pos, obj)?;
    if target.sole_owner() {
        return mutating(pos, env, this, obj, args);
    }
    let copy = target.shallow_clone();
    mutating(pos, env, this, Some(&copy), args)?;
    Ok(copy)
}

macro_rules! unmut_cmd {
    ($cmd:ident, $mutating:path) => {
        pub(crate) fn $cmd(
            pos: &Pos,
            env: &mut Env,
            this: Option<&Value>,
            obj: Option<&Value>,
            args: &[Ast],
        ) -> Result<Value, Signal> {
            unmut(pos, env, this, obj, args, $mutating)
        }
    };
}

/// `clone` on a list or map: shallow copy, elements shared.
pub(crate) fn clone_obj(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_none(pos, "clone", args)?;
    Ok(obj_value(pos, obj)?.shallow_clone())
}

// list methods

pub(crate) fn list_set_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "list:set!", args, 2)?;
    let list = obj_list(pos, obj)?.clone();
    let idx = match evaluate(env, &args[0], this)? {
        Value::Int(i) => i,
        _ => {
            return Err(Signal::Error(RuntimeError::at(
                &args[0].pos,
                "Index must be an int.",
            )))
        }
    };
    let len = list.borrow().len();
    if idx < 0 || idx as usize >= len {
        return Err(Signal::Error(RuntimeError::at(
            &args[0].pos,
            format!("Index {} out of bounds for list of length {}.", idx, len),
        )));
    }
    let value = evaluate(env, &args[1], this)?;
    // Re-check: evaluating the value may have shrunk the list.
    let mut items = list.borrow_mut();
    if (idx as usize) < items.len() {
        items[idx as usize] = value;
        drop(items);
        Ok(obj_value(pos, obj)?.clone())
    } else {
        let len = items.len();
        drop(items);
        Err(Signal::Error(RuntimeError::at(
            &args[0].pos,
            format!("Index {} out of bounds for list of length {}.", idx, len),
        )))
    }
}

unmut_cmd!(list_set, list_set_mut);

pub(crate) fn list_push_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "list:push!", args, 1)?;
    let list = obj_list(pos, obj)?.clone();
    let prev_len = list.borrow().len();
    for arg in args {
        match evaluate(env, arg, this) {
            Ok(value) => list.borrow_mut().push(value),
            Err(signal) => {
                list.borrow_mut().truncate(prev_len);
                return Err(signal);
            }
        }
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(list_push, list_push_mut);

pub(crate) fn list_unshift_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "list:unshift!", args, 1)?;
    let list = obj_list(pos, obj)?.clone();
    let mut inserted = 0usize;
    for arg in args {
        match evaluate(env, arg, this) {
            Ok(value) => {
                let mut items = list.borrow_mut();
                let at = inserted.min(items.len());
                items.insert(at, value);
                inserted += 1;
            }
            Err(signal) => {
                let mut items = list.borrow_mut();
                while inserted > 0 && !items.is_empty() {
                    items.remove(0);
                    inserted -= 1;
                }
                return Err(signal);
            }
        }
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(list_unshift, list_unshift_mut);

pub(crate) fn list_pop_mut(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_none(pos, "list:pop!", args)?;
    let list = obj_list(pos, obj)?;
    match list.borrow_mut().pop() {
        Some(value) => Ok(value),
        None => Err(Signal::Error(RuntimeError::at(
            pos,
            "Can not pop from an empty list.",
        ))),
    }
}

unmut_cmd!(list_pop, list_pop_mut);

pub(crate) fn list_shift_mut(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_none(pos, "list:shift!", args)?;
    let list = obj_list(pos, obj)?;
    let mut items = list.borrow_mut();
    if items.is_empty() {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            "Can not shift from an empty list.",
        )));
    }
    Ok(items.remove(0))
}

unmut_cmd!(list_shift, list_shift_mut);

fn check_slice(pos: &Pos, what: &str, start: i64, end: i64, len: usize) -> Result<(), Signal> {
    if start < 0 || start as usize >= len {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            format!(
                "slice start {} is out of range for {} of length {}.",
                start, what, len
            ),
        )));
    }
    if end < start {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            format!("slice end {} is less than slice start {}.", end, start),
        )));
    }
    if end as usize >= len {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            format!(
                "slice end {} is out of range for {} of length {}.",
                end, what, len
            ),
        )));
    }
    Ok(())
}

pub(crate) fn list_slice_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "list:slice!", args, 2)?;
    let start = eval_int(env, this, &args[0])?;
    let end = eval_int(env, this, &args[1])?;
    let list = obj_list(pos, obj)?;
    {
        let mut items = list.borrow_mut();
        check_slice(pos, "list", start, end, items.len())?;
        let kept = items[start as usize..end as usize].to_vec();
        *items = kept;
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(list_slice, list_slice_mut);

pub(crate) fn list_cat_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "list:cat!", args, 1)?;
    let list = obj_list(pos, obj)?.clone();
    for arg in args {
        let value = evaluate(env, arg, this)?;
        let other = match &value {
            Value::List(other) => other,
            other => {
                return Err(Signal::Error(RuntimeError::at(
                    pos,
                    format!("list expected, got {}.", other.type_name()),
                )))
            }
        };
        // Snapshot first: `$l:cat! $l` appends the list to itself.
        let items: Vec<Value> = other.borrow().clone();
        list.borrow_mut().extend(items);
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(list_cat, list_cat_mut);

pub(crate) fn list_fill_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "list:fill!", args, 1)?;
    let value = evaluate(env, &args[0], this)?;
    let list = obj_list(pos, obj)?;
    // Clone outside the mutable borrow: the fill value may be this list.
    let len = list.borrow().len();
    let copies: Vec<Value> = (0..len).map(|_| value.shallow_clone()).collect();
    let mut items = list.borrow_mut();
    for (slot, copy) in items.iter_mut().zip(copies) {
        *slot = copy;
    }
    drop(items);
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(list_fill, list_fill_mut);

pub(crate) fn list_dup_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "list:dup!", args, 1)?;
    let amount = eval_int(env, this, &args[0])?;
    if amount < 0 {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            "Amount of duplications must be positive.",
        )));
    }
    let list = obj_list(pos, obj)?;
    if amount == 0 {
        list.borrow_mut().clear();
    } else if amount > 1 {
        let base: Vec<Value> = list.borrow().clone();
        let mut items = list.borrow_mut();
        for _ in 1..amount {
            items.extend(base.iter().cloned());
        }
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(list_dup, list_dup_mut);

pub(crate) fn list_reverse_mut(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_none(pos, "list:reverse!", args)?;
    let list = obj_list(pos, obj)?;
    list.borrow_mut().reverse();
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(list_reverse, list_reverse_mut);

// map methods

pub(crate) fn map_set_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "map:set!", args, 2)?;
    let map = obj_map(pos, obj)?.clone();
    let key = value_to_key(&evaluate(env, &args[0], this)?);
    let value = evaluate(env, &args[1], this)?;
    map.borrow_mut().set(&key, value);
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(map_set, map_set_mut);

pub(crate) fn map_del_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "map:del!", args, 1)?;
    let map = obj_map(pos, obj)?.clone();
    for arg in args {
        let key = value_to_key(&evaluate(env, arg, this)?);
        map.borrow_mut().del(&key);
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(map_del, map_del_mut);

// string methods

pub(crate) fn string_set_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "string:set!", args, 2)?;
    let idx = eval_int(env, this, &args[0])?;
    let string = obj_string(pos, obj)?.clone();
    let out_of_range = |len: usize| {
        Signal::Error(RuntimeError::at(
            pos,
            format!("Index {} is out of range for string of length {}.", idx, len),
        ))
    };
    let len = string.borrow().len();
    if idx < 0 || idx as usize >= len {
        return Err(out_of_range(len));
    }
    let byte = match evaluate(env, &args[1], this)? {
        Value::Int(i) => i as u8,
        Value::Float(f) => f as i64 as u8,
        Value::Str(s) => {
            let bytes = s.borrow();
            if bytes.len() != 1 {
                return Err(Signal::Error(RuntimeError::at(
                    pos,
                    "Value string must be of length 1.",
                )));
            }
            bytes[0]
        }
        other => {
            return Err(Signal::Error(RuntimeError::at(
                pos,
                format!(
                    "string:set! value must be an int, float, or string, got {}.",
                    other.type_name()
                ),
            )))
        }
    };
    // Re-check: evaluating the value may have shrunk the string.
    let mut bytes = string.borrow_mut();
    if (idx as usize) < bytes.len() {
        bytes[idx as usize] = byte;
        drop(bytes);
        Ok(obj_value(pos, obj)?.clone())
    } else {
        let len = bytes.len();
        drop(bytes);
        Err(out_of_range(len))
    }
}

unmut_cmd!(string_set, string_set_mut);

pub(crate) fn string_slice_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "string:slice!", args, 2)?;
    let start = eval_int(env, this, &args[0])?;
    let end = eval_int(env, this, &args[1])?;
    let string = obj_string(pos, obj)?;
    {
        let mut bytes = string.borrow_mut();
        check_slice(pos, "string", start, end, bytes.len())?;
        let kept = bytes[start as usize..end as usize].to_vec();
        *bytes = kept;
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(string_slice, string_slice_mut);

pub(crate) fn string_dup_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "string:dup!", args, 1)?;
    let amount = eval_int(env, this, &args[0])?;
    if amount < 0 {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            "Amount of duplications must be positive.",
        )));
    }
    let string = obj_string(pos, obj)?;
    if amount == 0 {
        string.borrow_mut().clear();
    } else if amount > 1 {
        let base: Vec<u8> = string.borrow().clone();
        let mut bytes = string.borrow_mut();
        for _ in 1..amount {
            bytes.extend_from_slice(&base);
        }
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(string_dup, string_dup_mut);

pub(crate) fn string_reverse_mut(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_none(pos, "string:reverse!", args)?;
    let string = obj_string(pos, obj)?;
    string.borrow_mut().reverse();
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(string_reverse, string_reverse_mut);

pub(crate) fn string_cat_mut(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "string:cat!", args, 1)?;
    let string = obj_string(pos, obj)?.clone();
    for arg in args {
        let value = evaluate(env, arg, this)?.to_value_string();
        let suffix: Vec<u8> = match &value {
            Value::Str(s) => s.borrow().clone(),
            _ => Vec::new(),
        };
        string.borrow_mut().extend_from_slice(&suffix);
    }
    Ok(obj_value(pos, obj)?.clone())
}

unmut_cmd!(string_cat, string_cat_mut);

pub(crate) fn string_split(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "string:split", args, 1)?;
    let sep_value = evaluate(env, &args[0], this)?;
    let sep: Vec<u8> = match &sep_value {
        Value::Str(s) => s.borrow().clone(),
        other => {
            return Err(Signal::Error(RuntimeError::at(
                pos,
                format!("Expected string, got {}.", other.type_name()),
            )))
        }
    };
    let target = obj_value(pos, obj)?;
    let bytes: Vec<u8> = obj_string(pos, obj)?.borrow().clone();
    if sep.len() > bytes.len() {
        return Ok(Value::new_list(vec![target.shallow_clone()]));
    }
    if sep.is_empty() {
        let parts = bytes
            .iter()
            .map(|&b| Value::new_str(vec![b]))
            .collect::<Vec<_>>();
        return Ok(Value::new_list(parts));
    }
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i + sep.len() <= bytes.len() {
        if bytes[i..i + sep.len()] == sep[..] {
            parts.push(Value::new_str(bytes[start..i].to_vec()));
            i += sep.len();
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(Value::new_str(bytes[start..].to_vec()));
    Ok(Value::new_list(parts))
}
