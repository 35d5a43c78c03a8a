//! Container constructors.

use crate::ast::{Ast, Pos};
use crate::env::Env;
use crate::interpreter::evaluate;
use crate::value::{MapTable, RuntimeError, Signal, Value, WeakValue};

use super::{args_between, args_exact, eval_int, value_to_key};

const MAP_CAPACITY: usize = 128;

pub(crate) fn cmd_list(
    _pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    let mut items = Vec::with_capacity(args.len());
    for arg in args {
        items.push(evaluate(env, arg, this)?);
    }
    Ok(Value::new_list(items))
}

pub(crate) fn cmd_new_list(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "new-list", args, 1)?;
    let len = eval_int(env, this, &args[0])?;
    if len < 0 {
        return Err(Signal::Error(RuntimeError::at(
            &args[0].pos,
            "List length must be positive.",
        )));
    }
    Ok(Value::new_list(vec![Value::Null; len as usize]))
}

/// `range max` or `range min max`: half-open, counting down when max < min.
pub(crate) fn cmd_range(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_between(pos, "range", args, 1, 2)?;
    let (min, max) = if args.len() == 1 {
        (0, eval_int(env, this, &args[0])?)
    } else {
        (
            eval_int(env, this, &args[0])?,
            eval_int(env, this, &args[1])?,
        )
    };
    let span = max.wrapping_sub(min).unsigned_abs() as usize;
    let mut items = Vec::with_capacity(span);
    if max > min {
        for i in 0..span as i64 {
            items.push(Value::Int(min.wrapping_add(i)));
        }
    } else {
        for i in 0..span as i64 {
            items.push(Value::Int(min.wrapping_sub(i).wrapping_sub(1)));
        }
    }
    Ok(Value::new_list(items))
}

pub(crate) fn cmd_map(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    if args.len() % 2 != 0 {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            "map must have an even amount of arguments.",
        )));
    }
    let vmap = Value::new_map(MapTable::new(MAP_CAPACITY, ()));
    for pair in args.chunks(2) {
        let key = value_to_key(&evaluate(env, &pair[0], this)?);
        let mut value = evaluate(env, &pair[1], this)?;
        // A command stored in a map captures the map as its receiver, so its
        // body can say `$this`. The capture is weak; and a shared command is
        // cloned first so other holders keep their own receiver.
        if matches!(value, Value::Cmd(_)) {
            if !value.sole_owner() {
                value = value.shallow_clone();
            }
            if let Value::Cmd(cmd) = &value {
                *cmd.receiver.borrow_mut() = WeakValue::downgrade(&vmap);
            }
        }
        if let Value::Map(table) = &vmap {
            table.borrow_mut().set(&key, value);
        }
    }
    Ok(vmap)
}
