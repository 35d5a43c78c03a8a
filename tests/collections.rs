//! Whole-program tests for containers: construction, indexing, the bound
//! method set, reference-count observability and the clone-before-mutate
//! policy.

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
fn list_construction_and_display() {
    assert_eq!(run("echo [list 1 2 3]"), "[list 1 2 3]");
    assert_eq!(run("echo [list \"a b\" 1.5]"), "[list \"a b\" 1.500000]");
    assert_eq!(run("echo [new-list 3]"), "[list null null null]");
}

#[test]
fn range_is_half_open_and_can_descend() {
    assert_eq!(run("echo [range 3]"), "[list 0 1 2]");
    assert_eq!(run("echo [range 2 5]"), "[list 2 3 4]");
    assert_eq!(run("echo [range 3 0]"), "[list 2 1 0]");
    assert_eq!(run("echo [range 0 0]"), "[list]");
}

#[test]
fn positional_indexing() {
    assert_eq!(run("echo [list 1 2 3]:0"), "1");
    assert_eq!(run("echo [list 1 2 3]:2"), "3");
    // Float keys truncate toward zero.
    assert_eq!(run("echo [list 1 2 3]:1.9"), "2");
    assert_eq!(run("echo \"hello\":1"), "e");
}

#[test]
fn len_members() {
    assert_eq!(run("echo \"hello\":len"), "5");
    assert_eq!(run("echo [list 1 2 3]:len"), "3");
}

#[test]
fn out_of_bounds_errors_name_index_and_length() {
    assert_eq!(
        run_err("echo [list 1 2]:5"),
        "Index 5 out of bounds for list of length 2."
    );
    assert_eq!(
        run_err("echo \"ab\":-1"),
        "Index -1 out of bounds for string of length 2."
    );
}

#[test]
fn unknown_members_error() {
    assert_eq!(run_err("echo \"x\":frob"), "No member 'frob' in string.");
    assert_eq!(run_err("echo [list]:frob"), "No member 'frob' in list.");
    assert_eq!(run_err("echo [map]:frob"), "No member 'frob' in map.");
}

#[test]
fn unsupported_index_types_error() {
    assert_eq!(run_err("echo 5:0"), "Can not index int with int.");
    assert_eq!(run_err("echo [map]:0"), "Can not index map with int.");
}

#[test]
fn list_push_pop_shift_unshift() {
    assert_eq!(run("[let! $l [list 1]; $l:push! 2 3; echo $l]"), "[list 1 2 3]");
    assert_eq!(run("[let! $l [list 1 2]; echo [$l:pop!] $l:len]"), "21");
    assert_eq!(run("[let! $l [list 1 2]; echo [$l:shift!] $l:len]"), "11");
    assert_eq!(
        run("[let! $l [list 3]; $l:unshift! 1 2; echo $l]"),
        "[list 1 2 3]"
    );
    assert_eq!(run_err("[list]:pop!"), "Can not pop from an empty list.");
    assert_eq!(run_err("[list]:shift!"), "Can not shift from an empty list.");
}

#[test]
fn list_set_slice_fill_dup_reverse_cat() {
    assert_eq!(run("[let! $l [list 1 2 3]; $l:set! 1 9; echo $l]"), "[list 1 9 3]");
    assert_eq!(
        run("[let! $l [list 0 1 2 3 4]; $l:slice! 1 3; echo $l]"),
        "[list 1 2]"
    );
    assert_eq!(run("[let! $l [list 1 2]; $l:fill! 7; echo $l]"), "[list 7 7]");
    assert_eq!(run("[let! $l [list 1 2]; $l:dup! 2; echo $l]"), "[list 1 2 1 2]");
    assert_eq!(run("[let! $l [list 1 2]; $l:dup! 0; echo $l:len]"), "0");
    assert_eq!(run("[let! $l [list 1 2 3]; $l:reverse!; echo $l]"), "[list 3 2 1]");
    assert_eq!(
        run("[let! $l [list 1]; $l:cat! [list 2 3]; echo $l]"),
        "[list 1 2 3]"
    );
    // Self-concatenation reads a snapshot of the receiver.
    assert_eq!(run("[let! $l [list 1 2]; $l:cat! $l; echo $l]"), "[list 1 2 1 2]");
    assert_eq!(run_err("[list 1]:cat! 5"), "list expected, got int.");
}

#[test]
fn slice_bounds_errors() {
    assert_eq!(
        run_err("[list 1 2]:slice! 5 6"),
        "slice start 5 is out of range for list of length 2."
    );
    assert_eq!(
        run_err("[list 1 2 3]:slice! 2 1"),
        "slice end 1 is less than slice start 2."
    );
    assert_eq!(
        run_err("[list 1 2 3]:slice! 0 3"),
        "slice end 3 is out of range for list of length 3."
    );
}

#[test]
fn string_methods() {
    assert_eq!(run("[let! $s \"abc\"; $s:reverse!; echo $s]"), "cba");
    assert_eq!(run("[let! $s \"abcde\"; $s:slice! 1 4; echo $s]"), "bcd");
    assert_eq!(run("[let! $s \"ab\"; $s:dup! 3; echo $s]"), "ababab");
    assert_eq!(run("[let! $s \"ab\"; $s:cat! \"cd\" 12; echo $s]"), "abcd12");
    assert_eq!(run("[let! $s \"abc\"; $s:set! 1 \"X\"; echo $s]"), "aXc");
    // Int values are written as raw bytes: 66 is 'B'.
    assert_eq!(run("[let! $s \"abc\"; $s:set! 0 66; echo $s]"), "Bbc");
    assert_eq!(
        run_err("[let! $s \"abc\"; $s:set! 1 \"XY\"]"),
        "Value string must be of length 1."
    );
}

#[test]
fn string_split() {
    assert_eq!(
        run("echo \"a,b,c\":split \",\""),
        "[list \"a\" \"b\" \"c\"]"
    );
    assert_eq!(
        run("echo \"a,,b\":split \",\""),
        "[list \"a\" \"\" \"b\"]"
    );
    // Separator longer than the string: one copy of the whole string.
    assert_eq!(run("echo \"ab\":split \"abc\""), "[list \"ab\"]");
    assert_eq!(run("echo \"ab\":split \"\""), "[list \"a\" \"b\"]");
    assert_eq!(run_err("\"ab\":split 5"), "Expected string, got int.");
}

#[test]
fn map_construction_lookup_and_methods() {
    assert_eq!(run("echo [map \"a\" 1]:a"), "1");
    // Non-string keys are stringified at construction.
    assert_eq!(run("echo [map 12 \"x\"]:\"12\""), "x");
    assert_eq!(run("[let! $m [map \"a\" 1]; $m:set! \"b\" 2; echo $m:b]"), "2");
    assert_eq!(
        run_err("[let! $m [map \"a\" 1]; $m:del! \"a\"; echo $m:a]"),
        "No member 'a' in map."
    );
    assert_eq!(run_err("map \"odd\""), "map must have an even amount of arguments.");
}

#[test]
fn for_over_list_binds_index_and_element() {
    assert_eq!(
        run("[for $i $x [list 10 20 30] [echo $i $x]]"),
        "010120230"
    );
    assert_eq!(run("[for $x [list 1 2 3] [echo $x]]"), "123");
    // No loop variables at all still runs the body.
    assert_eq!(run("[let! $n 0; for [list 7 8] [set! $n [+ $n 1]]; echo $n]"), "2");
}

#[test]
fn for_over_map_visits_each_pair_adjacently() {
    let out = run("[for $k $v [map \"a\" 1 \"b\" 2] [echo $k; echo $v]]");
    assert!(
        out == "a1b2" || out == "b2a1",
        "unexpected iteration output {:?}",
        out
    );
}

#[test]
fn for_loop_break_and_continue() {
    assert_eq!(
        run("[for $x [list 1 2 3 4] [if [= $x 3] [break]; echo $x]]"),
        "12"
    );
    assert_eq!(
        run("[for $x [list 1 2 3] [if [= $x 2] [continue]; echo $x]]"),
        "13"
    );
}

#[test]
fn refcount_counts_bindings() {
    assert_eq!(run("[let! $a [list 1]; echo [refcount $a]]"), "1");
    assert_eq!(run("[let! $a [list 1]; let! $b $a; echo [refcount $a]]"), "2");
    assert_eq!(run("echo [refcount [list 1]]"), "0");
    assert_eq!(run("echo [refcount 5]"), "-1");
    // Nested scopes share the binding cell and add no references.
    assert_eq!(run("[let! $a [list 1]; [echo [refcount $a]]]"), "1");
    // Releasing a binding brings the count back down.
    assert_eq!(
        run("[let! $a [list 1]; let! $b $a; del! $b; echo [refcount $a]]"),
        "1"
    );
}

#[test]
fn shared_lists_clone_before_mutate() {
    // `push` on a shared list leaves both existing references untouched.
    assert_eq!(
        run("[let! $a [list 1]; let! $b $a; let! $c [$a:push 2]; echo $a:len $b:len $c:len]"),
        "112"
    );
    // `push` on a sole-owner list mutates in place.
    assert_eq!(run("echo [[list 1]:push 2]:len"), "2");
    // `push!` always mutates, visible through every reference.
    assert_eq!(
        run("[let! $a [list 1]; let! $b $a; $a:push! 2; echo $b:len]"),
        "2"
    );
}

#[test]
fn shared_strings_clone_before_mutate() {
    assert_eq!(
        run("[let! $a \"abc\"; let! $b $a; let! $c [$a:reverse]; echo $a $b $c]"),
        "abcabccba"
    );
    assert_eq!(
        run("[let! $a \"abc\"; let! $b $a; $a:reverse!; echo $b]"),
        "cba"
    );
}

#[test]
fn clone_is_shallow() {
    // The clone is a new container, so pushing to it leaves the original
    // alone, but elements are shared, not copied.
    assert_eq!(
        run("[let! $a [list [list 1]]; let! $b [$a:clone]; $b:push! 2; \
             echo $a:len $b:len [refcount $a:0]]"),
        "122"
    );
}

#[test]
fn map_commands_capture_the_map_as_receiver() {
    assert_eq!(
        run("[let! $m [map \"v\" 10 \"get\" [cmd [do [return $this:v]]]]; echo [$m:get]]"),
        "10"
    );
}

#[test]
fn expired_receiver_is_an_error_not_a_crash() {
    let msg = run_err(
        "[let! $m [map \"f\" [cmd [do [return $this]]]]; \
         let! $f $m:f; del! $m; f]",
    );
    assert_eq!(msg, "Receiver of command is no longer alive.");
}

#[test]
fn commands_are_first_class_values() {
    assert_eq!(
        run("[let! $ops [list [cmd $x [return [+ $x 1]]]]; echo [[do $ops:0] 41]]"),
        "42"
    );
}
