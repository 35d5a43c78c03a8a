//! Control flow, binding manipulation and user command creation. The loop
//! commands are where `break`/`continue` signals stop; `return` travels
//! further, up to the enclosing user-command call.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Ast, AstKind, Pos};
use crate::env::Env;
use crate::interpreter::{eval_in, evaluate};
use crate::value::{CmdData, RuntimeError, Signal, Value};

use super::{args_at_least, args_between, args_exact, args_none};

pub(crate) fn cmd_if(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "if", args, 2)?;
    let conds = args.len() / 2;
    for i in 0..conds {
        let cond = evaluate(env, &args[i * 2], this)?;
        if cond.truthy() {
            return evaluate(env, &args[i * 2 + 1], this);
        }
    }
    // Odd trailing argument is the else branch.
    if conds * 2 != args.len() {
        return evaluate(env, &args[args.len() - 1], this);
    }
    Ok(Value::Null)
}

pub(crate) fn cmd_while(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "while", args, 2)?;
    let cond = &args[0];
    let body = &args[1];
    let mut result = Value::Null;
    loop {
        let test = evaluate(env, cond, this)?;
        if !test.truthy() {
            break;
        }
        match evaluate(env, body, this) {
            Ok(value) => result = value,
            Err(Signal::Break) => {
                result = Value::Null;
                break;
            }
            Err(Signal::Continue) => result = Value::Null,
            Err(other) => return Err(other),
        }
    }
    Ok(result)
}

pub(crate) fn cmd_do(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "do", args, 1)?;
    evaluate(env, &args[0], this)
}

fn var_name<'a>(arg: &'a Ast, n: usize) -> Result<&'a [u8], Signal> {
    match &arg.kind {
        AstKind::Var(name) => Ok(name),
        _ => Err(Signal::Error(RuntimeError::at(
            &arg.pos,
            format!("Argument {} must be a variable.", n),
        ))),
    }
}

pub(crate) fn cmd_for(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_between(pos, "for", args, 2, 4)?;
    let coll_ast = &args[args.len() - 2];
    let body = &args[args.len() - 1];
    let (idx_name, elem_name) = match args.len() {
        3 => (None, Some(var_name(&args[0], 1)?)),
        4 => (Some(var_name(&args[0], 1)?), Some(var_name(&args[1], 2)?)),
        _ => (None, None),
    };
    let coll = evaluate(env, coll_ast, this)?;
    match &coll {
        Value::List(list) => {
            // Snapshot so body mutations of the list cannot upset iteration.
            let items: Vec<Value> = list.borrow().clone();
            let mut result = Value::Null;
            for (i, item) in items.into_iter().enumerate() {
                let mut iter_env = env.nested();
                if let Some(elem) = elem_name {
                    iter_env
                        .declare(elem, item)
                        .map_err(|err| err.or_pos(pos))?;
                    if let Some(idx) = idx_name {
                        iter_env
                            .declare(idx, Value::Int(i as i64))
                            .map_err(|err| err.or_pos(pos))?;
                    }
                }
                match eval_in(env, Some(&mut iter_env), body, this) {
                    Ok(value) => result = value,
                    Err(Signal::Break) => return Ok(Value::Null),
                    Err(Signal::Continue) => result = Value::Null,
                    Err(other) => return Err(other),
                }
            }
            Ok(result)
        }
        Value::Map(map) => {
            let entries: Vec<(Vec<u8>, Value)> = map
                .borrow()
                .iter()
                .map(|(key, value)| (key.to_vec(), value.clone()))
                .collect();
            let mut result = Value::Null;
            for (key, item) in entries {
                let mut iter_env = env.nested();
                if let Some(elem) = elem_name {
                    iter_env
                        .declare(elem, item)
                        .map_err(|err| err.or_pos(pos))?;
                    if let Some(idx) = idx_name {
                        iter_env
                            .declare(idx, Value::new_str(key))
                            .map_err(|err| err.or_pos(pos))?;
                    }
                }
                match eval_in(env, Some(&mut iter_env), body, this) {
                    Ok(value) => result = value,
                    Err(Signal::Break) => return Ok(Value::Null),
                    Err(Signal::Continue) => result = Value::Null,
                    Err(other) => return Err(other),
                }
            }
            Ok(result)
        }
        other => Err(Signal::Error(RuntimeError::at(
            &coll_ast.pos,
            format!("{} is not iterable.", other.type_name()),
        ))),
    }
}

pub(crate) fn cmd_break(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_none(pos, "break", args)?;
    Err(Signal::Break)
}

pub(crate) fn cmd_continue(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_none(pos, "continue", args)?;
    Err(Signal::Continue)
}

pub(crate) fn cmd_return(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_between(pos, "return", args, 0, 1)?;
    let value = match args.first() {
        Some(arg) => evaluate(env, arg, this)?,
        None => Value::Null,
    };
    Err(Signal::Return(value))
}

type BindFn = fn(&mut Env, &[u8], Value) -> Result<(), RuntimeError>;

fn bind_pairs(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    args: &[Ast],
    name: &str,
    bind: BindFn,
) -> Result<Value, Signal> {
    args_at_least(pos, name, args, 2)?;
    if args.len() % 2 != 0 {
        return Err(Signal::Error(RuntimeError::at(
            pos,
            format!("{} argument count must be a multiple of 2.", name),
        )));
    }
    let mut last = Value::Null;
    for pair in args.chunks(2) {
        let var = match &pair[0].kind {
            AstKind::Var(n) => n,
            _ => {
                return Err(Signal::Error(RuntimeError::at(
                    pos,
                    format!("{} can only bind variables.", name),
                )))
            }
        };
        let value = evaluate(env, &pair[1], this)?;
        last = value.clone();
        bind(env, var, value).map_err(|err| err.or_pos(pos))?;
    }
    Ok(last)
}

pub(crate) fn cmd_let(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    bind_pairs(pos, env, this, args, "let!", Env::declare)
}

pub(crate) fn cmd_set(
    pos: &Pos,
    env: &mut Env,
    this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    bind_pairs(pos, env, this, args, "set!", Env::assign)
}

pub(crate) fn cmd_del(
    pos: &Pos,
    env: &mut Env,
    _this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "del!", args, 1)?;
    for arg in args {
        match &arg.kind {
            AstKind::Var(name) => env.delete(name),
            _ => {
                return Err(Signal::Error(RuntimeError::at(
                    pos,
                    "del! can only delete variables.",
                )))
            }
        }
    }
    Ok(Value::Null)
}

pub(crate) fn cmd_swap(
    pos: &Pos,
    env: &mut Env,
    _this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_exact(pos, "swap!", args, 2)?;
    let (a, b) = match (&args[0].kind, &args[1].kind) {
        (AstKind::Var(a), AstKind::Var(b)) => (a, b),
        _ => {
            return Err(Signal::Error(RuntimeError::at(
                pos,
                "swap! can only operate on variables.",
            )))
        }
    };
    let cell_a = env.cell(a).ok_or_else(|| {
        Signal::Error(RuntimeError::at(
            pos,
            format!("Unbound variable {}.", crate::value::lossy(a)),
        ))
    })?;
    let cell_b = env.cell(b).ok_or_else(|| {
        Signal::Error(RuntimeError::at(
            pos,
            format!("Unbound variable {}.", crate::value::lossy(b)),
        ))
    })?;
    if !Rc::ptr_eq(&cell_a, &cell_b) {
        std::mem::swap(&mut *cell_a.borrow_mut(), &mut *cell_b.borrow_mut());
    }
    Ok(Value::Null)
}

pub(crate) fn cmd_cmd(
    pos: &Pos,
    _env: &mut Env,
    _this: Option<&Value>,
    _obj: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    args_at_least(pos, "cmd", args, 1)?;
    let mut params = Vec::with_capacity(args.len() - 1);
    for arg in &args[..args.len() - 1] {
        match &arg.kind {
            AstKind::Var(name) => params.push(name.clone()),
            _ => {
                return Err(Signal::Error(RuntimeError::at(
                    &arg.pos,
                    "cmd takes a list of vars, and then an expression.",
                )))
            }
        }
    }
    // The body is an owned deep copy, detached from the enclosing parse tree.
    let body = args[args.len() - 1].clone();
    Ok(Value::Cmd(Rc::new(CmdData {
        params,
        body,
        receiver: RefCell::new(None),
    })))
}
