//! The recursive evaluator and the command dispatch protocol, plus the
//! `Interpreter` facade the CLI, REPL and tests drive.

use crate::ast::{Ast, AstKind, Pos};
use crate::builtins;
use crate::env::{Env, Output};
use crate::parser;
use crate::trace::trace_log;
use crate::value::{self, lossy, RuntimeError, Signal, Value, WeakValue};

/// Evaluates a node against an environment. Blocks get their own nested
/// scope; `receiver` is what `$this` resolves to.
pub fn evaluate(env: &mut Env, ast: &Ast, receiver: Option<&Value>) -> Result<Value, Signal> {
    eval_in(env, None, ast, receiver)
}

/// Like [`evaluate`], but a `Commands` node runs in the caller-supplied
/// environment instead of cloning one. The REPL uses this to keep top-level
/// bindings alive across inputs; `for` uses it for per-iteration scopes.
pub(crate) fn eval_in(
    env: &mut Env,
    sub: Option<&mut Env>,
    ast: &Ast,
    this: Option<&Value>,
) -> Result<Value, Signal> {
    match &ast.kind {
        AstKind::Int(i) => Ok(Value::Int(*i)),
        AstKind::Float(f) => Ok(Value::Float(*f)),
        AstKind::Null => Ok(Value::Null),
        AstKind::Str(bytes) => Ok(Value::new_str(bytes.clone())),
        AstKind::Var(name) => {
            if name.as_slice() == b"this" {
                return Ok(this.cloned().unwrap_or(Value::Null));
            }
            match env.get(name) {
                Some(v) => Ok(v),
                None => Err(Signal::Error(RuntimeError::at(
                    &ast.pos,
                    format!("Unbound variable {}.", lossy(name)),
                ))),
            }
        }
        AstKind::Commands(lines) => {
            let mut local;
            let block_env = match sub {
                Some(existing) => existing,
                None => {
                    local = env.nested();
                    &mut local
                }
            };
            eval_commands(block_env, lines, this)
        }
        AstKind::Index(left_ast, right_ast) => {
            let left = evaluate(env, left_ast, this)?;
            let right = evaluate(env, right_ast, this)?;
            value::index(&left, &right)
                .map_err(|err| Signal::Error(err.or_pos(&left_ast.pos)))
        }
        // The parser rewrites every placeholder; reaching one is a bug, but
        // it degrades to an error rather than a crash.
        AstKind::IndexOp => Err(Signal::Error(RuntimeError::at(&ast.pos, "Unexpected ':'."))),
    }
}

fn eval_commands(
    env: &mut Env,
    lines: &[Vec<Ast>],
    this: Option<&Value>,
) -> Result<Value, Signal> {
    let mut result = Value::Null;
    for line in lines {
        // The previous line's value is released before this line runs; only
        // the last line's result leaves the block.
        result = Value::Null;
        let Some(head) = line.first() else { continue };
        // A lone expression (index, block, variable, literal) is its own
        // result; bare words and anything with arguments must dispatch.
        if line.len() == 1 && !matches!(head.kind, AstKind::Str(_)) {
            let value = eval_in(env, None, head, this)?;
            result = if value.is_callable() {
                invoke(env, &head.pos, &value, this, &[])?
            } else {
                value
            };
            continue;
        }
        let callee = resolve_command(env, head, this)?;
        result = invoke(env, &head.pos, &callee, this, &line[1..])?;
    }
    Ok(result)
}

/// Resolves the first element of a command line to a callable. A bare word
/// is looked up directly so that command names need no `$`; anything else is
/// evaluated and must produce a callable.
fn resolve_command(env: &mut Env, head: &Ast, this: Option<&Value>) -> Result<Value, Signal> {
    let value = match &head.kind {
        AstKind::Str(name) => match env.get(name) {
            Some(v) => v,
            None => {
                return Err(Signal::Error(RuntimeError::at(
                    &head.pos,
                    format!("Unbound variable {}.", lossy(name)),
                )))
            }
        },
        _ => eval_in(env, None, head, this)?,
    };
    if value.is_callable() {
        Ok(value)
    } else {
        Err(Signal::Error(RuntimeError::at(
            &head.pos,
            format!("Expected command, got {}.", value.type_name()),
        )))
    }
}

/// The dispatch protocol shared by native and user-defined commands.
/// Arguments arrive unevaluated; a native decides evaluation itself, a
/// user-defined command evaluates one argument per declared parameter and
/// ignores the rest without evaluating them.
pub(crate) fn invoke(
    env: &mut Env,
    pos: &Pos,
    callee: &Value,
    this: Option<&Value>,
    args: &[Ast],
) -> Result<Value, Signal> {
    match callee {
        Value::Native(native) => {
            trace_log!("dispatch", "native command at {} ({} args)", pos, args.len());
            (native.func)(pos, env, this, native.obj.as_ref(), args)
        }
        Value::Cmd(cmd) => {
            trace_log!(
                "call",
                "user command at {} ({} params, {} args)",
                pos,
                cmd.params.len(),
                args.len()
            );
            let mut cmd_env = env.nested();
            for (i, param) in cmd.params.iter().enumerate() {
                let bound = match args.get(i) {
                    Some(arg) => evaluate(env, arg, this)?,
                    None => Value::Null,
                };
                cmd_env
                    .declare(param, bound)
                    .map_err(|err| Signal::Error(err.or_pos(pos)))?;
            }
            let captured: Option<WeakValue> = cmd.receiver.borrow().clone();
            let body_this = match captured {
                Some(weak) => match weak.upgrade() {
                    Some(v) => Some(v),
                    None => {
                        return Err(Signal::Error(RuntimeError::at(
                            pos,
                            "Receiver of command is no longer alive.",
                        )))
                    }
                },
                None => this.cloned(),
            };
            match evaluate(&mut cmd_env, &cmd.body, body_this.as_ref()) {
                Err(Signal::Return(v)) => Ok(v),
                other => other,
            }
        }
        other => Err(Signal::Error(RuntimeError::at(
            pos,
            format!("Expected command, got {}.", other.type_name()),
        ))),
    }
}

/// Owns a default environment and a persistent nested scope, so successive
/// [`Interpreter::run`] calls behave like REPL inputs: bindings survive,
/// each input still gets its own scope for shadowing purposes.
pub struct Interpreter {
    env: Env,
    sub: Env,
    output: Output,
    program_path: Option<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let output = Output::buffer();
        let env = builtins::default_env_with(output.clone());
        let sub = env.nested();
        Interpreter {
            env,
            sub,
            output,
            program_path: None,
        }
    }

    pub fn set_program_path(&mut self, path: &str) {
        self.program_path = Some(path.to_string());
    }

    /// Pass output straight to stdout instead of capturing it (script mode).
    pub fn set_immediate_stdout(&mut self, immediate: bool) {
        self.output.set_immediate(immediate);
    }

    /// Parses and evaluates a program, returning its result value and
    /// whatever it printed. Stray `break`/`continue`/`return` signals
    /// surface as errors here, at the program root.
    pub fn eval_source(&mut self, source: &str) -> Result<(Value, String), RuntimeError> {
        let filename = self.program_path.clone().unwrap_or_else(|| "<input>".to_string());
        let ast = parser::parse(source, &filename)?;
        match eval_in(&mut self.env, Some(&mut self.sub), &ast, None) {
            Ok(value) => Ok((value, self.output.take())),
            Err(signal) => {
                self.output.take();
                Err(match signal {
                    Signal::Error(err) => err,
                    Signal::Break => RuntimeError::new("Unhandled break signal."),
                    Signal::Continue => RuntimeError::new("Unhandled continue signal."),
                    Signal::Return(_) => RuntimeError::new("Unhandled return signal."),
                })
            }
        }
    }

    /// Parses and evaluates a program, returning the captured output.
    pub fn run(&mut self, source: &str) -> Result<String, RuntimeError> {
        self.eval_source(source).map(|(_, output)| output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> String {
        Interpreter::new().run(src).unwrap()
    }

    fn eval_value(src: &str) -> Value {
        Interpreter::new().eval_source(src).unwrap().0
    }

    fn run_err(src: &str) -> RuntimeError {
        Interpreter::new().run(src).unwrap_err()
    }

    #[test]
    fn literal_addition() {
        assert!(matches!(eval_value("[+ 1 2]"), Value::Int(3)));
    }

    #[test]
    fn block_result_is_last_line() {
        assert!(matches!(eval_value("[+ 1 2; + 10 20]"), Value::Int(30)));
    }

    #[test]
    fn shadowing_scenario_prints_21() {
        let out = run("[let! $x 1; [let! $x 2; echo $x]; echo $x]");
        assert_eq!(out, "21");
    }

    #[test]
    fn unbound_variable_errors_with_position() {
        let err = run_err("echo $nope");
        assert!(err.message.contains("Unbound variable nope"));
        assert!(err.pos.is_some());
    }

    #[test]
    fn non_command_head_errors() {
        let err = run_err("[let! $x 5; $x 1 2]");
        assert_eq!(err.message, "Expected command, got int.");
    }

    #[test]
    fn unknown_command_name_errors() {
        let err = run_err("frobnicate 1");
        assert!(err.message.contains("Unbound variable frobnicate"));
    }

    #[test]
    fn user_command_binds_params_in_order() {
        let out = run("[let! $f [cmd $a $b [echo $a $b]]; f 1 2]");
        assert_eq!(out, "12");
    }

    #[test]
    fn missing_args_bind_null() {
        assert!(matches!(
            eval_value("[let! $f [cmd $a [= $a null]]; f]"),
            Value::Int(1)
        ));
    }

    #[test]
    fn extra_args_are_never_evaluated() {
        // The third argument would blow up if evaluated; arity is two.
        let out = run("[let! $f [cmd $a [echo $a]]; f ok [echo $undefined]]");
        assert_eq!(out, "ok");
    }

    #[test]
    fn return_unwinds_to_the_call() {
        assert!(matches!(
            eval_value("[let! $f [cmd [do [return 7; echo never]]]; f]"),
            Value::Int(7)
        ));
    }

    #[test]
    fn return_outside_command_is_unhandled() {
        let err = run_err("return 1");
        assert_eq!(err.message, "Unhandled return signal.");
        let err = run_err("break");
        assert_eq!(err.message, "Unhandled break signal.");
    }

    #[test]
    fn index_error_carries_left_position() {
        let err = run_err("echo [list 1]:9");
        assert!(err.message.contains("out of bounds"));
        assert!(err.pos.is_some());
    }

    #[test]
    fn this_is_null_without_receiver() {
        assert!(matches!(eval_value("[= $this null]"), Value::Int(1)));
    }

    #[test]
    fn bindings_survive_between_runs() {
        let mut interp = Interpreter::new();
        interp.run("let! $x 5").unwrap();
        let (v, _) = interp.eval_source("[+ $x 1]").unwrap();
        assert!(matches!(v, Value::Int(6)));
    }

    #[test]
    fn errors_do_not_poison_later_runs() {
        let mut interp = Interpreter::new();
        assert!(interp.run("echo $missing").is_err());
        assert_eq!(interp.run("echo ok").unwrap(), "ok");
    }

    #[test]
    fn method_call_through_index() {
        assert!(matches!(eval_value("[\"hello\":len]"), Value::Int(5)));
        assert!(matches!(eval_value("[list 1 2 3]:0"), Value::Int(1)));
    }
}
