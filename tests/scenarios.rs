// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// tests/scenarios.rs

// End-to-end runs of whole programs through a booted task.

// <>

use renc::ren::error::ErrId;
use renc::{Config, RenError, Task};

fn interpret(code: &str) -> Result<String, RenError> {
    let mut task = Task::new(Config::default())?;
    task.do_string(code).map(|v| v.to_string())
}

/// Run several snippets in one task, molding each result
fn session(steps: &[&str]) -> Vec<String> {
    let mut task = Task::new(Config::default()).unwrap();
    steps
        .iter()
        .map(|code| match task.do_string(code) {
            Ok(value) => value.to_string(),
            Err(err) => format!("error: {}", err),
        })
        .collect()
}

fn fails_with(code: &str, id: ErrId) -> bool {
    matches!(interpret(code), Err(RenError::Error(err)) if err.is(id))
}

#[test]
fn branch_selection() {
    assert_eq!("10", interpret("do [either true [10] [20]]").unwrap());
}

#[test]
fn typed_function_call() {
    assert_eq!(vec!["42"], session(&["f: func [x [integer!]] [x + 1] f 41"]));
    assert!(fails_with("f: func [x [integer!]] [x + 1] f \"no\"", ErrId::ExpectArg));
}

#[test]
fn return_skips_rest_of_body() {
    assert_eq!(
        "6",
        interpret("f: func [x [integer!]] [return x * 2 100] f 3").unwrap()
    );
}

#[test]
fn specialized_append() {
    assert_eq!(
        "[1 2 99]",
        interpret("g: specialize 'append [value: 99] g copy [1 2]").unwrap()
    );
}

#[test]
fn chained_negations() {
    assert_eq!("5", interpret("p: chain [:negate :negate] p 5").unwrap());
}

#[test]
fn named_throws() {
    assert_eq!("7", interpret("catch/name [throw/name 7 'foo] 'foo").unwrap());
    assert!(fails_with("catch/name [throw/name 7 'foo] 'bar", ErrId::NoCatch));
}

#[test]
fn hijack_then_restore() {
    let results = session(&[
        "original-add: hijack 'add func [a b] [a - b]",
        "1 + 2",
        "hijack 'add :original-add",
        "1 + 2",
    ]);
    assert_eq!("-1", results[1]);
    assert_eq!("3", results[3]);
}

#[test]
fn varargs_from_block() {
    let results = session(&[
        "v: make varargs! [1 2 3]",
        "take v",
        "take v",
        "tail? v",
        "take v",
        "tail? v",
    ]);
    assert_eq!(&["1", "2", "false", "3", "true"], &results[1..]);
}

#[test]
fn varargs_copies_share_a_feed() {
    assert_eq!(
        "[1 2]",
        interpret("v1: make varargs! [1 2 3] v2: v1 reduce [take v1 take v2]").unwrap()
    );
}

#[test]
fn equality_tiers() {
    assert_eq!("true", interpret("equal? 1 1.0").unwrap());
    assert_eq!("false", interpret("strict-equal? 1 1.0").unwrap());
    assert_eq!("false", interpret("same? 1 1.0").unwrap());
}

#[test]
fn empty_things() {
    assert_eq!("\"#[void]\"", interpret("mold do []").unwrap());
    assert_eq!("\"#[void]\"", interpret("mold do [()]").unwrap());
    assert_eq!("1", interpret("do [1 ()]").unwrap());
    assert_eq!("1", interpret("do [() 1]").unwrap());
    assert_eq!("\"#[void]\"", interpret("f: func [] [] mold f").unwrap());
}

#[test]
fn enfix_is_left_to_right() {
    assert_eq!("9", interpret("1 + 2 * 3").unwrap());
    assert_eq!("7", interpret("1 + (2 * 3)").unwrap());
}

#[test]
fn frozen_series_refuse_edits() {
    for edit in ["append x 3", "change x 3", "remove x"] {
        let code = format!("x: freeze/deep [1 2] {}", edit);
        assert!(fails_with(&code, ErrId::Protected), "{} was allowed", edit);
    }
    assert_eq!("2", interpret("x: freeze/deep [1 2] second x").unwrap());
}

#[test]
fn runaway_recursion_overflows() {
    let mut task = Task::new(Config {
        stack_limit: 40,
        ..Config::default()
    })
    .unwrap();
    match task.do_string("f: func [] [f] f") {
        Err(RenError::Error(err)) => assert!(err.is(ErrId::StackOverflow)),
        other => panic!("expected stack overflow, got {:?}", other.map(|_| ())),
    }
    assert_eq!(Some(2), task.do_string("1 + 1").unwrap().as_integer());
}

#[test]
fn default_limits_overflow_before_the_thread_stack() {
    let mut task = Task::new(Config::default()).unwrap();
    let err = match task.do_string("f: func [] [f] f") {
        Err(RenError::Error(err)) => err,
        other => panic!("expected stack overflow, got {:?}", other.map(|_| ())),
    };
    assert!(err.is(ErrId::StackOverflow));
    assert!(
        err.to_string().contains("** Where: f f f f f f f f ..."),
        "{}",
        err
    );
}

#[test]
fn errors_render_with_type_and_near() {
    let err = match interpret("x: 1 + \"a\"") {
        Err(RenError::Error(err)) => err,
        other => panic!("expected an error, got {:?}", other.map(|_| ())),
    };
    let text = err.to_string();
    assert!(text.starts_with("** Script error:"), "{}", text);
    assert!(text.contains("** Near:"), "{}", text);
}

#[test]
fn undefined_word_has_no_value() {
    assert!(fails_with("no-such-word-here", ErrId::NoValue));
}

#[test]
fn set_word_needs_value() {
    assert!(fails_with("x: ()", ErrId::NeedValue));
}
