// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// tests/throws.rs

// How throws, errors, quits and halts reach the host.

// <>

use std::sync::atomic::Ordering;

use renc::ren::error::ErrId;
use renc::{Config, RenError, Task};

fn task() -> Task {
    Task::new(Config::default()).unwrap()
}

fn interpret(code: &str) -> Result<String, RenError> {
    task().do_string(code).map(|v| v.to_string())
}

#[test]
fn return_from_inside_loops() {
    assert_eq!(
        "5",
        interpret("f: func [] [loop 3 [return 5] 0] f").unwrap()
    );
    assert_eq!(
        "1",
        interpret("x: 0 p: proc [] [x: 1 leave x: 2] p x").unwrap()
    );
}

#[test]
fn quit_codes() {
    let code = |src: &str| interpret(src).unwrap_err().exit_code();
    assert_eq!(0, code("quit"));
    assert_eq!(3, code("quit/with 3"));
    assert_eq!(0, code("quit/with \"bye\""));
    assert_eq!(7, code("f: func [] [loop 10 [quit/with 7]] f"));
    assert_eq!("5", interpret("catch/quit [quit/with 5]").unwrap());
}

#[test]
fn halt_flag_stops_evaluation() {
    let mut task = task();
    task.halt_flag().store(true, Ordering::Relaxed);
    match task.do_string("loop 10 [1 + 1]") {
        Err(err @ RenError::Halt) => assert_eq!(130, err.exit_code()),
        other => panic!("expected halt, got {:?}", other.map(|_| ())),
    }
    // The flag is consumed by the halt
    assert_eq!(Some(2), task.do_string("1 + 1").unwrap().as_integer());
}

#[test]
fn halt_passes_every_catch() {
    assert!(matches!(interpret("catch/any [halt]"), Err(RenError::Halt)));
    assert!(matches!(interpret("trap [halt]"), Err(RenError::Halt)));
}

#[test]
fn eval_limit_halts_runaway_loops() {
    let mut task = Task::new(Config {
        eval_limit: 200,
        ..Config::default()
    })
    .unwrap();
    assert!(matches!(
        task.do_string("x: 0 while [true] [x: x + 1]"),
        Err(RenError::Halt)
    ));
}

#[test]
fn trap_yields_errors_as_values() {
    assert_eq!("error!", interpret("type-of trap [1 / 0]").unwrap());
    assert_eq!("99", interpret("trap/with [1 / 0] [99]").unwrap());
    assert_eq!("3", interpret("trap [1 + 2]").unwrap());
}

#[test]
fn uncaught_throw_is_no_catch() {
    match interpret("throw 1") {
        Err(RenError::Error(err)) => assert!(err.is(ErrId::NoCatch)),
        other => panic!("expected no-catch, got {:?}", other.map(|_| ())),
    }
    match interpret("trap [throw/name 1 'here]") {
        Err(RenError::Error(err)) => assert!(err.is(ErrId::NoCatch)),
        other => panic!("expected no-catch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn user_failures_render() {
    let err = match interpret("fail \"boom\"") {
        Err(RenError::Error(err)) => err,
        other => panic!("expected an error, got {:?}", other.map(|_| ())),
    };
    assert!(err.is(ErrId::User));
    assert!(err.to_string().starts_with("** User error: boom"));
}

#[test]
fn math_errors_have_their_own_type() {
    let err = match interpret("1 / 0") {
        Err(RenError::Error(err)) => err,
        other => panic!("expected an error, got {:?}", other.map(|_| ())),
    };
    assert!(err.is(ErrId::ZeroDivide));
    assert!(err.to_string().starts_with("** Math error:"));
    assert_eq!(1, RenError::Error(err).exit_code());
}

#[test]
fn task_recovers_after_failure() {
    let mut task = task();
    assert!(task.do_string("f: func [x] [x / 0] f 1").is_err());
    assert!(task.do_string("trap [f 2]").is_ok());
    assert_eq!(Some(10), task.do_string("f: func [x] [x * 5] f 2").unwrap().as_integer());
}
