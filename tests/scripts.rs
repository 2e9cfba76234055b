mod common;

use common::{run_ok, Session};

#[test]
fn arithmetic_precedence() {
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
    assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
    assert_eq!(run_ok("print 10 - 2 - 3;"), "5\n");
    assert_eq!(run_ok("print 1 + 6 / 2;"), "4\n");
}

#[test]
fn unary_operators() {
    assert_eq!(run_ok("print -3 + 5;"), "2\n");
    assert_eq!(run_ok("print !false;"), "true\n");
    assert_eq!(run_ok("print !0;"), "false\n");
}

#[test]
fn string_concatenation_through_assignment() {
    assert_eq!(run_ok("var x = \"a\"; x = x + \"b\"; print x;"), "ab\n");
}

#[test]
fn strings_may_span_lines() {
    assert_eq!(run_ok("print \"a\nb\";"), "a\nb\n");
}

#[test]
fn number_display_drops_trailing_zeros() {
    assert_eq!(run_ok("print 2.50 + 0.5;"), "3\n");
    assert_eq!(run_ok("print 3.14;"), "3.14\n");
}

#[test]
fn if_else_branches() {
    assert_eq!(
        run_ok("if 1 == 1 { print \"t\"; } else { print \"f\"; }"),
        "t\n"
    );
    assert_eq!(
        run_ok("if 1 == 2 { print \"t\"; } else { print \"f\"; }"),
        "f\n"
    );
}

#[test]
fn nil_is_truthy() {
    assert_eq!(
        run_ok("if nil { print \"y\"; } else { print \"n\"; }"),
        "y\n"
    );
}

#[test]
fn nil_equality() {
    assert_eq!(run_ok("print nil == nil;"), "true\n");
    assert_eq!(run_ok("print nil == 0;"), "false\n");
    assert_eq!(run_ok("print nil != 0;"), "true\n");
}

#[test]
fn comparisons() {
    assert_eq!(run_ok("print 2 >= 2;"), "true\n");
    assert_eq!(run_ok("print 1 < 2;"), "true\n");
    assert_eq!(run_ok("print \"ab\" == \"a\" + \"b\";"), "true\n");
}

#[test]
fn short_circuit_keeps_the_deciding_value() {
    assert_eq!(run_ok("print false and 1;"), "false\n");
    assert_eq!(run_ok("print true and 7;"), "7\n");
    assert_eq!(run_ok("print false or 7;"), "7\n");
    assert_eq!(run_ok("print 5 or 7;"), "5\n");
}

#[test]
fn newline_terminates_statements() {
    assert_eq!(run_ok("print 1\nprint 2\n"), "1\n2\n");
}

#[test]
fn assert_passes_on_truthy_values() {
    assert_eq!(run_ok("assert 1 == 1;"), "");
    // Everything but false itself is truthy, nil included.
    assert_eq!(run_ok("assert nil;"), "");
}

#[test]
fn println_native_writes_arguments_then_newline() {
    assert_eq!(run_ok("println(\"a\", 1, true);"), "a1true\n");
}

#[test]
fn clock_native_returns_a_number() {
    assert_eq!(run_ok("print clock() > 0;"), "true\n");
}

#[test]
fn globals_persist_across_session_rounds() {
    let mut session = Session::new();
    session.interpret("var x = 41;").unwrap();
    session.interpret("print x + 1;").unwrap();
    assert_eq!(session.output(), "42\n");
}

#[test]
fn session_rejects_redeclaring_a_global_from_an_earlier_round() {
    let mut session = Session::new();
    session.interpret("var x = 1;").unwrap();
    let err = session.interpret("var x = 2;").unwrap_err();
    assert!(err.to_string().contains("already defined"));
}

#[test]
fn session_keeps_running_after_a_runtime_error() {
    let mut session = Session::new();
    session.interpret("var x = 1;").unwrap();
    assert!(session.interpret("print missing;").is_err());
    session.interpret("print x;").unwrap();
    assert_eq!(session.output(), "1\n");
}
