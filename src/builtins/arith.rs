//! Arithmetic, comparison and boolean commands. The arithmetic commands are
//! variadic left folds; `&` and `|` evaluate lazily and stop at the first
//! decisive operand.

use crate::ast::{Ast, Pos};
use crate::env::Env;
use crate::interpreter::evaluate;
use crate::value::{self, RuntimeError, Signal, Value};

use super::{args_at_least, args_exact};

type BinOp = fn(&Value, &Value) -> Result<Value, RuntimeError>;

fn fold(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    args: &[Ast],
    name: &str,
    op: BinOp,
) -> Result<Value, Signal> {
    args_at_least(pos, name, args, 1)?;
    let mut acc = evaluate(env, &args[0], this)?;
    for arg in &args[1..] {
        let operand = evaluate(env, arg, this)?;
        acc = op(&acc, &operand).map_err(|err| err.or_pos(pos))?;
    }
    Ok(acc)
}

macro_rules! fold_cmd {
    ($cmd:ident, $name:literal, $op:path) => {
        pub(crate) fn $cmd(
            pos: &Pos,
            env: &mut Env,
            this: Option<&Value>,
            _obj: Option<&Value>,
            args: &[Ast],
        ) -> Result<Value, Signal> {
            fold(pos, env, this, args, $name, $op)
        }
    };
}

fold_cmd!(cmd_add, "+", value::add);
fold_cmd!(cmd_sub, "-", value::sub);
fold_cmd!(cmd_mul, "*", value::mul);
fold_cmd!(cmd_div, "/", value::div);
fold_cmd!(cmd_rem, "%", value::rem);

fn eval_pair(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    args: &[Ast],
    name: &str,
) -> Result<(Value, Value), Signal> {
    args_exact(pos, name, args, 2)?;
    let a = evaluate(env, &args[0], this)?;
    let b = evaluate(env, &args[1], this)?;
    Ok((a, b))
}

pub(crate) fn cmd_equ(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    let (a, b) = eval_pair(pos, env, this, args, "=")?;
    Ok(Value::Int(value::equal(&a, &b) as i64))
}

pub(crate) fn cmd_neq(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    let (a, b) = eval_pair(pos, env, this, args, "!=")?;
    Ok(Value::Int(!value::equal(&a, &b) as i64))
}

macro_rules! compare_cmd {
    ($cmd:ident, $name:literal, $op:path) => {
        pub(crate) fn $cmd(
            pos: &Pos,
            env: &mut Env,
            this: Option<&Value>,
            _obj: Option<&Value>,
            args: &[Ast],
        ) -> Result<Value, Signal> {
            let (a, b) = eval_pair(pos, env, this, args, $name)?;
            let result = $op(&a, &b).map_err(|err| err.or_pos(pos))?;
            Ok(Value::Int(result as i64))
        }
    };
}

compare_cmd!(cmd_lt, "<", value::lt);
compare_cmd!(cmd_lte, "<=", value::lte);
compare_cmd!(cmd_gt, ">", value::gt);
compare_cmd!(cmd_gte, ">=", value::gte);

/// Returns the first truthy operand without evaluating the rest, else 0.
pub(crate) fn cmd_or(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "|", args, 2)?;
    for arg in args {
        let value = evaluate(env, arg, this)?;
        if value.truthy() {
            return Ok(value);
        }
    }
    Ok(Value::Int(0))
}

/// Returns the first falsy operand without evaluating the rest, else 1.
pub(crate) fn cmd_and(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "&", args, 2)?;
    for arg in args {
        let value = evaluate(env, arg, this)?;
        if !value.truthy() {
            return Ok(value);
        }
    }
    Ok(Value::Int(1))
}
