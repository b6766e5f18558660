// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// tests/properties.rs

// Generated checks of equality, hashing and the mold/load cycle.

// <>

use std::cell::RefCell;

use proptest::prelude::*;

use renc::ren::compare::{equal_values, hash_value};
use renc::ren::kinds::Kind;
use renc::ren::mold::mold_value;
use renc::ren::series::Array;
use renc::{Cell, Config, Task};

thread_local! {
    static TASK: RefCell<Task> = RefCell::new(Task::new(Config::default()).unwrap());
}

/// Mold `cell`, load the text back and take the first value
fn reload(cell: &Cell) -> Cell {
    let text = mold_value(cell);
    TASK.with(|task| {
        let array = task.borrow_mut().load(&text, None).unwrap();
        array.get(0).unwrap()
    })
}

fn evaluates_true(code: &str) -> bool {
    TASK.with(|task| {
        let value = task.borrow_mut().do_string(code).unwrap();
        value.to_string() == "true"
    })
}

fn int_block(items: &[i64]) -> Cell {
    Cell::block(Array::from_cells(items.iter().copied().map(Cell::integer).collect()))
}

proptest! {
    #[test]
    fn equal_numbers_hash_alike(i in -1_000_000i64..1_000_000) {
        let int = Cell::integer(i);
        let dec = Cell::decimal(i as f64);
        prop_assert!(equal_values(&int, &dec, false));
        prop_assert_eq!(hash_value(&int), hash_value(&dec));
    }

    #[test]
    fn equal_strings_hash_alike(s in "[a-zA-Z ]{0,16}") {
        let lower = Cell::string(&s.to_ascii_lowercase());
        let upper = Cell::string(&s.to_ascii_uppercase());
        prop_assert!(equal_values(&lower, &upper, false));
        prop_assert_eq!(hash_value(&lower), hash_value(&upper));
    }

    #[test]
    fn string_kinds_hash_alike(s in "[a-zA-Z ]{0,16}") {
        let text = Cell::string(&s);
        for kind in [Kind::File, Kind::Tag, Kind::Url, Kind::Email] {
            let other = Cell::string_of(kind, &s.to_ascii_uppercase());
            prop_assert!(equal_values(&text, &other, false));
            prop_assert_eq!(hash_value(&text), hash_value(&other));
        }
    }

    #[test]
    fn objects_hash_by_content(a in any::<i64>(), b in "[a-z]{0,8}") {
        let code = format!(
            "o: make object! [x: {} y: {:?}] p: make object! [x: {} y: {:?}] \
             all [equal? o p equal? hash o hash p]",
            a, b, a, b
        );
        prop_assert!(evaluates_true(&code));
    }

    #[test]
    fn values_equal_themselves(items in prop::collection::vec(any::<i64>(), 0..8)) {
        let block = int_block(&items);
        prop_assert!(equal_values(&block, &block, false));
        prop_assert!(equal_values(&block, &block, true));
        prop_assert_eq!(hash_value(&block), hash_value(&block.clone()));
    }

    #[test]
    fn integers_reload(i in any::<i64>()) {
        let cell = Cell::integer(i);
        prop_assert!(equal_values(&cell, &reload(&cell), true));
    }

    #[test]
    fn strings_reload(s in "[ -~]{0,24}") {
        let cell = Cell::string(&s);
        let back = reload(&cell);
        prop_assert!(equal_values(&cell, &back, true), "{} came back as {}", cell, back);
    }

    #[test]
    fn files_reload(s in "[ -~]{0,24}") {
        let cell = Cell::string_of(Kind::File, &s);
        let back = reload(&cell);
        prop_assert!(equal_values(&cell, &back, true), "{} came back as {}", cell, back);
    }

    #[test]
    fn tags_reload(s in "[a-z][a-z0-9 =\"\\[\\](){};]{0,12}") {
        let cell = Cell::string_of(Kind::Tag, &s);
        let back = reload(&cell);
        prop_assert!(equal_values(&cell, &back, true), "{} came back as {}", cell, back);
    }

    #[test]
    fn urls_reload(s in "[a-z0-9 /\"\\[\\](){};%]{0,16}") {
        let cell = Cell::string_of(Kind::Url, &format!("http://x.org/{}", s));
        let back = reload(&cell);
        prop_assert!(equal_values(&cell, &back, true), "{} came back as {}", cell, back);
    }

    #[test]
    fn blocks_reload(items in prop::collection::vec(any::<i64>(), 0..12)) {
        let cell = int_block(&items);
        prop_assert!(equal_values(&cell, &reload(&cell), true));
    }

    #[test]
    fn double_reverse_is_identity(items in prop::collection::vec(-1000i64..1000, 0..12)) {
        let code = format!(
            "b: {} c: copy b reverse c reverse c strict-equal? b c",
            mold_value(&int_block(&items))
        );
        prop_assert!(evaluates_true(&code));
    }
}

#[test]
fn deep_copy_is_idempotent() {
    assert!(evaluates_true(
        "b: [1 [2 [3 \"x\"]] (4)] equal? copy/deep copy/deep b copy/deep b"
    ));
}

#[test]
fn string_kinds_compare_as_text() {
    assert!(evaluates_true("all [equal? %a \"a\" equal? <a> \"A\" not strict-equal? %a \"a\"]"));
    assert!(evaluates_true("equal? hash %Readme.txt hash \"readme.TXT\""));
    assert!(evaluates_true("equal? %\"a b\" load mold %\"a b\""));
}

#[test]
fn equal_objects_hash_alike() {
    assert!(evaluates_true(
        "o: make object! [a: 1 b: [x]] p: make object! [a: 1.0 b: [X]] \
         all [equal? o p equal? hash o hash p]"
    ));
}

#[test]
fn form_may_lose_what_mold_keeps() {
    let cell = Cell::string("two words");
    assert!(equal_values(&cell, &reload(&cell), true));
    assert!(evaluates_true("not equal? load form \"two words\" \"two words\""));
}
