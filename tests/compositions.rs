// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// tests/compositions.rs

// Laws relating derived functions to the functions they derive from.

// <>

use renc::{Config, Task};

fn interpret(code: &str) -> String {
    let mut task = Task::new(Config::default()).unwrap();
    match task.do_string(code) {
        Ok(value) => value.to_string(),
        Err(err) => format!("error: {}", err),
    }
}

#[test]
fn words_follow_the_spec() {
    assert_eq!(
        "[a 'b :c /d e]",
        interpret("f: func [a 'b :c /d e <local> g] [] words-of :f")
    );
    assert_eq!(
        "[x]",
        interpret("f: function [x] [y: x * 2 z: y] words-of :f")
    );
    assert_eq!("[]", interpret("words-of func [] []"));
}

#[test]
fn adaptations_share_an_underlying_function() {
    let code = "f: func [x] [x] a: adapt :f [] \
                reduce [same? :f :f same? :f :a same? underlying :f underlying :a]";
    assert_eq!("[true false true]", interpret(code));
}

#[test]
fn specialization_matches_full_call() {
    let code = "f: func [a b c] [(a * 100) + (b * 10) + c] \
                g: specialize 'f [a: 1] \
                equal? g 2 3 f 1 2 3";
    assert_eq!("true", interpret(code));
}

#[test]
fn chain_composes_in_order() {
    let code = "f: func [x] [x * 3] g: func [x] [x + 1] h: chain [:f :g] \
                reduce [h 5 g f 5]";
    assert_eq!("[16 16]", interpret(code));
}

#[test]
fn hijack_with_same_facade() {
    let code = "f: func [x] [x + 1] g: func [x] [x * 10] \
                old: hijack 'f :g a: f 2 \
                hijack 'f :old reduce [a f 2]";
    assert_eq!("[20 3]", interpret(code));
}

#[test]
fn hijack_reaches_existing_references() {
    // `h` captured the function value before the hijack
    let code = "f: func [x] [x + 1] h: :f \
                hijack 'f func [x] [x - 1] h 10";
    assert_eq!("9", interpret(code));
}

#[test]
fn hijack_with_different_facade_forwards_by_position() {
    let code = "f: func [x] [x + 1] \
                hijack 'f func [n /twice] [either twice [n * 2] [n]] f 7";
    assert_eq!("7", interpret(code));
}

#[test]
fn enclose_controls_inner_call() {
    let code = "f: func [x] [x + 1] \
                e: enclose :f func [fr] [fr/x: fr/x * 10 do fr] e 4";
    assert_eq!("41", interpret(code));
}

#[test]
fn tighten_is_stable() {
    let code = "f: func [a b] [a + b] t: tighten :f \
                reduce [equal? spec-of :t spec-of tighten :t t 1 2]";
    assert_eq!("[true 3]", interpret(code));
}

#[test]
fn derived_functions_keep_enfix_operators_working() {
    let code = "plus: enfix tighten func [a b] [a + b] 1 plus 2 plus 3";
    assert_eq!("6", interpret(code));
}
