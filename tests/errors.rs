mod common;

use common::run_err;
use maki_vm::error::ErrorKind;

#[test]
fn unknown_character() {
    let err = run_err("print 1 @ 2;");
    assert_eq!(err.kind, ErrorKind::Scan);
    assert_eq!(err.to_string(), "scanner error, unknown character '@' [line 1]");
}

#[test]
fn unterminated_string() {
    let err = run_err("print \"abc");
    assert_eq!(err.kind, ErrorKind::Scan);
    assert!(err.to_string().contains("unterminated string"));
}

#[test]
fn unterminated_block_comment() {
    let err = run_err("/* no end");
    assert_eq!(err.kind, ErrorKind::Scan);
    assert!(err.to_string().contains("comment not terminated"));
}

#[test]
fn missing_expression() {
    let err = run_err("print +;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert!(err.to_string().contains("expected expression"));
}

#[test]
fn invalid_assignment_target() {
    let err = run_err("1 = 2;");
    assert_eq!(
        err.to_string(),
        "compile error, invalid assignment target [line 1]"
    );

    let err = run_err("(a) = 1;");
    assert!(err.to_string().contains("invalid assignment target"));
}

#[test]
fn unclosed_paren() {
    let err = run_err("print (1 + 2;");
    assert!(err.to_string().contains("expected ')' after expression"));
}

#[test]
fn keywords_without_rules_are_rejected() {
    let err = run_err("class Foo {}");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert!(err.to_string().contains("expected expression"));
}

#[test]
fn arithmetic_type_errors() {
    let err = run_err("print 1 + \"a\";");
    assert_eq!(
        err.to_string(),
        "runtime error, operands must be two numbers or two strings [line 1]"
    );

    let err = run_err("print true < false;");
    assert_eq!(err.to_string(), "runtime error, operands must be numbers [line 1]");

    let err = run_err("print -\"a\";");
    assert_eq!(err.to_string(), "runtime error, operand must be a number [line 1]");
}

#[test]
fn runtime_errors_carry_the_failing_line() {
    let err = run_err("print 1;\nprint 1 + nil;");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.line, 2);
}

#[test]
fn compile_errors_carry_the_failing_line() {
    let err = run_err("print 1;\nprint ;\nprint 3;");
    assert_eq!(err.kind, ErrorKind::Compile);
    assert_eq!(err.line, 2);
}

#[test]
fn undefined_global_read() {
    let err = run_err("print missing;");
    assert_eq!(
        err.to_string(),
        "runtime error, variable 'missing' not defined [line 1]"
    );
}

#[test]
fn failed_assertion() {
    let err = run_err("assert 1 == 2;");
    assert_eq!(err.to_string(), "runtime error, assertion failed [line 1]");
}

#[test]
fn no_output_runs_before_a_compile_error() {
    // The whole chunk is discarded; nothing executes.
    let source = "print \"before\";\nprint ;";
    let err = run_err(source);
    assert_eq!(err.kind, ErrorKind::Compile);
}
