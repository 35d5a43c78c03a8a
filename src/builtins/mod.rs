//! The standard command catalog. Everything here plugs into the dispatch
//! protocol as a plain function conforming to [`NativeFn`]; registration is
//! a pure builder with no global state.

use std::io::Read;

use crate::ast::{Ast, Pos};
use crate::env::{Env, Output};
use crate::interpreter::evaluate;
use crate::value::{RuntimeError, Signal, Value};

pub(crate) mod arith;
pub(crate) mod collections;
pub(crate) mod control;
pub(crate) mod methods;

/// A default environment writing to stdout, populated with the full catalog.
pub fn default_env() -> Env {
    default_env_with(Output::stdout())
}

pub(crate) fn default_env_with(out: Output) -> Env {
    let mut env = Env::new(out);
    let defs: &[(&str, crate::value::NativeFn)] = &[
        ("echo", cmd_echo),
        ("echoln", cmd_echoln),
        ("read", cmd_read),
        ("readln", cmd_readln),
        ("write", cmd_write),
        ("+", arith::cmd_add),
        ("-", arith::cmd_sub),
        ("*", arith::cmd_mul),
        ("/", arith::cmd_div),
        ("%", arith::cmd_rem),
        ("=", arith::cmd_equ),
        ("!=", arith::cmd_neq),
        ("<", arith::cmd_lt),
        ("<=", arith::cmd_lte),
        (">", arith::cmd_gt),
        (">=", arith::cmd_gte),
        ("&", arith::cmd_and),
        ("|", arith::cmd_or),
        ("int", cmd_int),
        ("float", cmd_float),
        ("string", cmd_string),
        ("set!", control::cmd_set),
        ("let!", control::cmd_let),
        ("swap!", control::cmd_swap),
        ("del!", control::cmd_del),
        ("if", control::cmd_if),
        ("break", control::cmd_break),
        ("continue", control::cmd_continue),
        ("return", control::cmd_return),
        ("while", control::cmd_while),
        ("do", control::cmd_do),
        ("for", control::cmd_for),
        ("list", collections::cmd_list),
        ("new-list", collections::cmd_new_list),
        ("range", collections::cmd_range),
        ("map", collections::cmd_map),
        ("refcount", cmd_refcount),
        ("cmd", control::cmd_cmd),
    ];
    for (name, func) in defs {
        env.bind(name.as_bytes(), Value::native(*func));
    }
    env
}

// arity checks

pub(super) fn args_none(pos: &Pos, name: &str, args: &[Ast]) -> Result<(), Signal> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(Signal::Error(RuntimeError::at(
            pos,
            format!("{} takes no arguments.", name),
        )))
    }
}

pub(super) fn args_exact(pos: &Pos, name: &str, args: &[Ast], n: usize) -> Result<(), Signal> {
    if args.len() == n {
        Ok(())
    } else {
        Err(Signal::Error(RuntimeError::at(
            pos,
            format!("{} takes exactly {} arguments.", name, n),
        )))
    }
}

pub(super) fn args_at_least(pos: &Pos, name: &str, args: &[Ast], n: usize) -> Result<(), Signal> {
    if args.len() >= n {
        Ok(())
    } else {
        Err(Signal::Error(RuntimeError::at(
            pos,
            format!("{} takes at least {} arguments.", name, n),
        )))
    }
}

pub(super) fn args_between(
    pos: &Pos,
    name: &str,
    args: &[Ast],
    min: usize,
    max: usize,
) -> Result<(), Signal> {
    if args.len() >= min && args.len() <= max {
        Ok(())
    } else {
        Err(Signal::Error(RuntimeError::at(
            pos,
            format!("{} takes between {} and {} arguments.", name, min, max),
        )))
    }
}

/// Evaluates an argument that must produce an int.
pub(super) fn eval_int(
    env: &mut Env,
    this: Option<&Value>,
    arg: &Ast,
) -> Result<i64, Signal> {
    let v = evaluate(env, arg, this)?;
    match v {
        Value::Int(i) => Ok(i),
        other => Err(Signal::Error(RuntimeError::at(
            &arg.pos,
            format!("Expected int, got {}.", other.type_name()),
        ))),
    }
}

/// Map keys are strings; any other value is keyed by its rendering.
pub(super) fn value_to_key(value: &Value) -> Vec<u8> {
    match value {
        Value::Str(s) => s.borrow().clone(),
        other => {
            let mut bytes = Vec::new();
            other.to_bytes(true, &mut bytes);
            bytes
        }
    }
}

// IO

pub(crate) fn cmd_echo(
    _pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    for arg in args {
        let value = evaluate(env, arg, this)?;
        let mut bytes = Vec::new();
        value.to_bytes(true, &mut bytes);
        env.out().write_bytes(&bytes);
    }
    Ok(Value::Null)
}

pub(crate) fn cmd_echoln(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    let value = cmd_echo(pos, env, this, obj, args)?;
    env.out().write_bytes(b"\n");
    Ok(value)
}

pub(crate) fn cmd_read(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_between(pos, "read", args, 0, 1)?;
    if args.is_empty() {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|_| Signal::Error(RuntimeError::at(pos, "Could not read stdin.")))?;
        return Ok(Value::new_str(bytes));
    }
    let path_value = evaluate(env, &args[0], this)?.to_value_string();
    let path = path_value.to_display_string();
    match std::fs::read(&path) {
        Ok(bytes) => Ok(Value::new_str(bytes)),
        Err(_) => Err(Signal::Error(RuntimeError::at(
            pos,
            format!("Could not open file '{}'.", path),
        ))),
    }
}

pub(crate) fn cmd_readln(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    cmd_echo(pos, env, this, obj, args)?;
    let mut line = String::new();
    let n = std::io::stdin()
        .read_line(&mut line)
        .map_err(|_| Signal::Error(RuntimeError::at(pos, "Could not read stdin.")))?;
    if n == 0 {
        return Err(Signal::Error(RuntimeError::at(pos, "EOF")));
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::new_str(line.into_bytes()))
}

pub(crate) fn cmd_write(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "write", args, 2)?;
    let path = evaluate(env, &args[0], this)?
        .to_value_string()
        .to_display_string();
    let value = evaluate(env, &args[1], this)?;
    let mut bytes = Vec::new();
    value.to_bytes(true, &mut bytes);
    std::fs::write(&path, bytes).map_err(|_| {
        Signal::Error(RuntimeError::at(
            pos,
            format!("Could not write file '{}'.", path),
        ))
    })?;
    Ok(Value::Null)
}

// conversions

pub(crate) fn cmd_int(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "int", args, 1)?;
    Ok(evaluate(env, &args[0], this)?.to_int())
}

pub(crate) fn cmd_float(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "float", args, 1)?;
    Ok(evaluate(env, &args[0], this)?.to_float())
}

pub(crate) fn cmd_string(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "string", args, 1)?;
    Ok(evaluate(env, &args[0], this)?.to_value_string())
}

// introspection

pub(crate) fn cmd_refcount(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "refcount", args, 1)?;
    let value = evaluate(env, &args[0], this)?;
    // Evaluating the argument created one reference of its own; report the
    // count without it. Scalars have no count at all.
    Ok(match value.refcount() {
        Some(count) => Value::Int(count as i64 - 1),
        None => Value::Int(-1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_env_has_the_catalog() {
        let env = default_env_with(Output::buffer());
        for name in [
            "echo", "echoln", "read", "readln", "write", "+", "-", "*", "/", "%", "=", "!=",
            "<", "<=", ">", ">=", "&", "|", "int", "float", "string", "set!", "let!", "swap!",
            "del!", "if", "break", "continue", "return", "while", "do", "for", "list",
            "new-list", "range", "map", "refcount", "cmd",
        ] {
            let value = env
                .get(name.as_bytes())
                .unwrap_or_else(|| panic!("{} missing from catalog", name));
            assert!(value.is_callable(), "{} is not callable", name);
        }
    }

    #[test]
    fn value_to_key_stringifies() {
        assert_eq!(value_to_key(&Value::Int(12)), b"12".to_vec());
        assert_eq!(value_to_key(&Value::new_str(b"k".to_vec())), b"k".to_vec());
    }
}
