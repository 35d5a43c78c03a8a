//! Whole-program tests for the core language: literals, bindings, scoping,
//! control flow and user-defined commands. Each test drives a program
//! through the interpreter and compares the captured output.

use pretty_assertions::assert_eq;

use bracken::Interpreter;

fn run(src: &str) -> String {
    Interpreter::new()
        .run(src)
        .unwrap_or_else(|err| panic!("program failed: {}", err))
}

fn run_err(src: &str) -> String {
    match Interpreter::new().run(src) {
        Ok(out) => panic!("expected error, got output {:?}", out),
        Err(err) => err.message,
    }
}

#[test]
fn addition_program() {
    assert_eq!(run("echo [+ 1 2]"), "3");
}

#[test]
fn arithmetic_folds_left() {
    assert_eq!(run("echo [- 10 1 2]"), "7");
    assert_eq!(run("echo [* 2 3 4]"), "24");
    assert_eq!(run("echo [/ 100 5 2]"), "10");
    assert_eq!(run("echo [% 17 5]"), "2");
}

#[test]
fn float_promotion_prints_six_decimals() {
    assert_eq!(run("echo [+ 1 0.5]"), "1.500000");
    assert_eq!(run("echo [/ 7 2.0]"), "3.500000");
}

#[test]
fn echoln_appends_newline() {
    assert_eq!(run("echoln a b"), "ab\n");
}

#[test]
fn shadowing_prints_21() {
    assert_eq!(run("[let! $x 1; [let! $x 2; echo $x]; echo $x]"), "21");
}

#[test]
fn set_through_nested_block_persists() {
    assert_eq!(run("[let! $x 1; [set! $x 2]; echo $x]"), "2");
}

#[test]
fn let_in_nested_block_does_not_leak() {
    assert_eq!(run_err("[[let! $y 9]; echo $y]"), "Unbound variable y.");
}

#[test]
fn while_counts_to_three() {
    assert_eq!(
        run("[let! $i 0; while [< $i 3] [echo $i; set! $i [+ $i 1]]]"),
        "012"
    );
}

#[test]
fn while_result_is_last_body_value() {
    assert_eq!(
        run("[let! $i 0; echo [while [< $i 3] [set! $i [+ $i 1]; * $i 10]]]"),
        "30"
    );
}

#[test]
fn break_exits_loop() {
    assert_eq!(
        run("[let! $i 0; while 1 [set! $i [+ $i 1]; if [= $i 3] [break]]; echo $i]"),
        "3"
    );
}

#[test]
fn continue_skips_rest_of_body() {
    assert_eq!(
        run(
            "[let! $i 0; let! $s 0; \
             while [< $i 5] [set! $i [+ $i 1]; if [= $i 2] [continue]; set! $s [+ $s $i]]; \
             echo $s]"
        ),
        "13"
    );
}

#[test]
fn break_crosses_a_command_call_into_the_loop() {
    assert_eq!(
        run(
            "[let! $stop [cmd [do [break]]]; let! $i 0; \
             while [< $i 5] [set! $i [+ $i 1]; stop]; echo $i]"
        ),
        "1"
    );
}

#[test]
fn if_picks_first_truthy_branch() {
    assert_eq!(run("echo [if 0 a 1 b c]"), "b");
    assert_eq!(run("echo [if 0 a 0 b c]"), "c");
    assert_eq!(run("[if 0 [echo a]]"), "");
}

#[test]
fn and_or_are_lazy() {
    // The unbound variable in the unevaluated operand must never be touched.
    assert_eq!(run("echo [| 7 $undefined]"), "7");
    assert_eq!(run("echo [& 0 $undefined]"), "0");
    assert_eq!(run("echo [& 1 2]"), "1");
    assert_eq!(run("echo [| 0 0]"), "0");
}

#[test]
fn user_commands_bind_and_return() {
    assert_eq!(
        run("[let! $add2 [cmd $a $b [return [+ $a $b]]]; echo [add2 20 22]]"),
        "42"
    );
}

#[test]
fn recursive_command() {
    assert_eq!(
        run(
            "[let! $fact [cmd $n [if [< $n 2] [return 1] \
             [return [* $n [fact [- $n 1]]]]]]; echo [fact 5]]"
        ),
        "120"
    );
}

#[test]
fn missing_arguments_are_null_extra_are_ignored() {
    assert_eq!(
        run("[let! $f [cmd $a $b [echo [= $b null]]]; f 1]"),
        "1"
    );
    // The extra argument would error if it were evaluated.
    assert_eq!(run("[let! $f [cmd $a [echo $a]]; f ok $undefined]"), "ok");
}

#[test]
fn let_returns_the_bound_value() {
    assert_eq!(run("echo [let! $x 5]"), "5");
}

#[test]
fn del_removes_binding() {
    assert_eq!(
        run_err("[let! $x 1; del! $x; echo $x]"),
        "Unbound variable x."
    );
}

#[test]
fn swap_exchanges_values() {
    assert_eq!(run("[let! $a 1 $b 2; swap! $a $b; echo $a $b]"), "21");
}

#[test]
fn conversions() {
    assert_eq!(run("echo [int \"42\"]"), "42");
    assert_eq!(run("echo [int \"4x\"]"), "null");
    assert_eq!(run("echo [int 3.9]"), "3");
    assert_eq!(run("echo [float 1]"), "1.000000");
    assert_eq!(run("echo [float \"2.5\"]"), "2.500000");
    assert_eq!(run("echo [string 42]"), "42");
}

#[test]
fn comparison_commands() {
    assert_eq!(run("echo [< 1 2] [<= 2 2] [> 1 2] [>= 1 2]"), "1100");
    assert_eq!(run("echo [= 1 1.0] [!= 1 2]"), "11");
    assert_eq!(run("echo [= [list 1 2] [list 1 2]]"), "1");
    assert_eq!(run("echo [= [map] [map]]"), "0");
}

#[test]
fn redeclaration_is_an_error() {
    let msg = run_err("[let! $x 1; let! $x 2]");
    assert_eq!(
        msg,
        "Cannot redeclare variable x. (perhaps you meant to use set!)"
    );
}

#[test]
fn assignment_to_undeclared_is_an_error() {
    let msg = run_err("set! $nope 1");
    assert_eq!(
        msg,
        "Variable nope does not exist. (perhaps you meant to use let!)"
    );
}

#[test]
fn arity_errors() {
    assert_eq!(run_err("+"), "+ takes at least 1 arguments.");
    assert_eq!(run_err("break 1"), "break takes no arguments.");
    assert_eq!(run_err("do 1 2"), "do takes exactly 1 arguments.");
    assert_eq!(run_err("for 1"), "for takes between 2 and 4 arguments.");
}

#[test]
fn non_iterable_for_errors() {
    assert_eq!(run_err("for $x 5 [echo $x]"), "int is not iterable.");
}

#[test]
fn signals_at_the_root_are_reported() {
    assert_eq!(run_err("break"), "Unhandled break signal.");
    assert_eq!(run_err("continue"), "Unhandled continue signal.");
    assert_eq!(run_err("return 1"), "Unhandled return signal.");
}

#[test]
fn comments_are_ignored() {
    assert_eq!(run("echo 1 # this is not code\necho 2"), "12");
}

#[test]
fn this_outside_any_receiver_is_null() {
    assert_eq!(run("echo [= $this null]"), "1");
}
