// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/compare.rs

// Value comparison: loose and strict equality, sameness, ordering for
// the comparison operators, and the hash used by MAP! keys.

// <>

use std::cmp::Ordering;

use super::cell::{Cell, Payload};
use super::error::{fail, ErrId};
use super::kinds::Kind;
use super::throws::Flow;

/// Nesting past this depth compares as unequal instead of recursing
const MAX_DEPTH: usize = 256;

fn number_kind(kind: Kind) -> bool {
    kind.any_number()
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn chars_eq(a: &str, b: &str, strict: bool) -> bool {
    if strict {
        a == b
    } else {
        a.chars().map(lower).eq(b.chars().map(lower))
    }
}

/// EQUAL? (`strict` false) and STRICT-EQUAL? (`strict` true)
///
/// Loose equality compares numbers across numeric kinds, words of any
/// word kind by spelling, and text of any string kind without regard
/// to case.
pub fn equal_values(a: &Cell, b: &Cell, strict: bool) -> bool {
    equal_at(a, b, strict, 0)
}

fn equal_at(a: &Cell, b: &Cell, strict: bool, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    let (ka, kb) = (a.kind(), b.kind());
    if ka != kb {
        if strict {
            return false;
        }
        if number_kind(ka) && number_kind(kb) {
            return a.as_number() == b.as_number();
        }
        if !(ka.any_word() && kb.any_word() || ka.any_string() && kb.any_string()) {
            return false;
        }
    }

    match (a.payload(), b.payload()) {
        (Payload::Empty, Payload::Empty) => true,
        (Payload::Logic(x), Payload::Logic(y)) => x == y,
        (Payload::Integer(x), Payload::Integer(y)) => x == y,
        (Payload::Decimal(x), Payload::Decimal(y)) => x == y,
        (Payload::Char(x), Payload::Char(y)) => {
            if strict {
                x == y
            } else {
                lower(*x) == lower(*y)
            }
        }
        (Payload::Pair(x1, y1), Payload::Pair(x2, y2)) => x1 == x2 && y1 == y2,
        (Payload::Tuple(x), Payload::Tuple(y)) => x == y,
        (Payload::Word { sym: x, .. }, Payload::Word { sym: y, .. }) => {
            if strict {
                x == y
            } else {
                x.same_canon(*y)
            }
        }
        (Payload::Text { .. }, Payload::Text { .. }) => match (a.as_text(), b.as_text()) {
            (Some(x), Some(y)) => chars_eq(&x, &y, strict),
            _ => false,
        },
        (Payload::Bytes { bin: x, index: i }, Payload::Bytes { bin: y, index: j }) => {
            x.slice(*i) == y.slice(*j)
        }
        (Payload::Array { array: x, index: i }, Payload::Array { array: y, index: j }) => {
            if x.same(y) && i == j {
                return true;
            }
            let (xs, ys) = (x.slice(*i), y.slice(*j));
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(p, q)| equal_at(p, q, strict, depth + 1))
        }
        (Payload::Function(x), Payload::Function(y)) => x.same(y),
        (Payload::Context { varlist: x, .. }, Payload::Context { varlist: y, .. }) => {
            if x.same(y) {
                return true;
            }
            match (x.pairs(), y.pairs()) {
                (Ok(xs), Ok(ys)) => {
                    xs.len() == ys.len()
                        && xs.iter().zip(ys.iter()).all(|((kx, vx), (ky, vy))| {
                            kx.same_canon(*ky) && equal_at(vx, vy, strict, depth + 1)
                        })
                }
                _ => false,
            }
        }
        (Payload::Typeset { bits: x, .. }, Payload::Typeset { bits: y, .. }) => x == y,
        (Payload::Datatype(x), Payload::Datatype(y)) => x == y,
        (Payload::Map(x), Payload::Map(y)) => x.same(y),
        (Payload::Handle(x), Payload::Handle(y)) => x == y,
        (Payload::Varargs { feed: x, .. }, Payload::Varargs { feed: y, .. }) => x.same(y),
        _ => false,
    }
}

/// SAME?: identity for series, contexts, functions and maps; words
/// must share spelling and binding; other values compare strictly
pub fn same_values(a: &Cell, b: &Cell) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    match (a.payload(), b.payload()) {
        (Payload::Word { sym: x, .. }, Payload::Word { sym: y, .. }) => {
            x.same_canon(*y) && a.binding().same(b.binding())
        }
        (Payload::Array { array: x, index: i }, Payload::Array { array: y, index: j }) => {
            x.same(y) && i == j
        }
        (Payload::Text { text: x, index: i }, Payload::Text { text: y, index: j }) => {
            x.same(y) && i == j
        }
        (Payload::Bytes { bin: x, index: i }, Payload::Bytes { bin: y, index: j }) => {
            x.same(y) && i == j
        }
        (Payload::Context { varlist: x, .. }, Payload::Context { varlist: y, .. }) => x.same(y),
        _ => equal_values(a, b, true),
    }
}

/// Ordering for `<` and friends
pub fn compare_values(a: &Cell, b: &Cell) -> Result<Ordering, Flow> {
    let incomparable = || fail(ErrId::InvalidArg, &[b.clone()]);
    let (ka, kb) = (a.kind(), b.kind());
    if number_kind(ka) && number_kind(kb) {
        if let (Payload::Integer(x), Payload::Integer(y)) = (a.payload(), b.payload()) {
            return Ok(x.cmp(y));
        }
        let (x, y) = (a.as_number(), b.as_number());
        return x
            .zip(y)
            .and_then(|(x, y)| x.partial_cmp(&y))
            .ok_or_else(incomparable);
    }
    if ka != kb && !(ka.any_string() && kb.any_string()) && !(ka.any_word() && kb.any_word()) {
        return Err(incomparable());
    }
    match (a.payload(), b.payload()) {
        (Payload::Char(x), Payload::Char(y)) => Ok(x.cmp(y)),
        (Payload::Text { .. }, Payload::Text { .. }) => {
            let (x, y) = (a.as_text().unwrap_or_default(), b.as_text().unwrap_or_default());
            Ok(x.chars().map(lower).cmp(y.chars().map(lower)))
        }
        (Payload::Word { sym: x, .. }, Payload::Word { sym: y, .. }) => {
            Ok(x.canon().name().cmp(&y.canon().name()))
        }
        (Payload::Tuple(x), Payload::Tuple(y)) => Ok(x.cmp(y)),
        (Payload::Pair(x1, y1), Payload::Pair(x2, y2)) => {
            let by_y = y1.partial_cmp(y2).ok_or_else(incomparable)?;
            Ok(by_y.then(x1.partial_cmp(x2).unwrap_or(Ordering::Equal)))
        }
        (Payload::Bytes { bin: x, index: i }, Payload::Bytes { bin: y, index: j }) => {
            Ok(x.slice(*i).cmp(&y.slice(*j)))
        }
        (Payload::Logic(x), Payload::Logic(y)) => Ok(x.cmp(y)),
        (Payload::Datatype(x), Payload::Datatype(y)) => Ok(x.cmp(y)),
        _ => Err(incomparable()),
    }
}

const CRC_TABLE: [u32; 256] = crc_table();

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 {
                0xEDB8_8320 ^ (c >> 1)
            } else {
                c >> 1
            };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

fn crc32(seed: u32, bytes: &[u8]) -> u32 {
    let mut crc = !seed;
    for b in bytes {
        crc = CRC_TABLE[((crc ^ *b as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    !crc
}

/// Hash consistent with loose equality
pub fn hash_value(cell: &Cell) -> u32 {
    let mut budget = HASH_BUDGET;
    hash_at(cell, &mut budget)
}

/// Nested values hashed in full before arrays and contexts fall back to
/// their length and keys; equal values spend the budget identically
const HASH_BUDGET: usize = 1024;

fn hash_at(cell: &Cell, budget: &mut usize) -> u32 {
    let kind = cell.kind();
    if kind.any_number() {
        let n = cell.as_number().unwrap_or(0.0);
        let n = if n == 0.0 { 0.0 } else { n };
        return crc32(0x6e75_6d00, &n.to_bits().to_le_bytes());
    }
    let seed = kind as u32;
    match cell.payload() {
        Payload::Logic(b) => crc32(seed, &[*b as u8]),
        Payload::Char(c) => crc32(seed, lower(*c).to_string().as_bytes()),
        Payload::Word { sym, .. } => crc32(0x776f_7264, sym.canon().name().as_bytes()),
        Payload::Text { .. } => {
            let text: String = cell.as_text().unwrap_or_default().chars().map(lower).collect();
            crc32(0x7465_7874, text.as_bytes())
        }
        Payload::Bytes { bin, index } => crc32(seed, &bin.slice(*index)),
        Payload::Pair(x, y) => {
            let mut bytes = x.to_bits().to_le_bytes().to_vec();
            bytes.extend_from_slice(&y.to_bits().to_le_bytes());
            crc32(seed, &bytes)
        }
        Payload::Tuple(bytes) => crc32(seed, bytes),
        Payload::Datatype(k) => crc32(seed, &[*k as u8]),
        Payload::Array { array, index } => {
            let items = array.slice(*index);
            let start = crc32(seed, &items.len().to_le_bytes());
            items.iter().fold(start, |acc, item| {
                if *budget == 0 {
                    return acc;
                }
                *budget -= 1;
                crc32(acc, &hash_at(item, budget).to_le_bytes())
            })
        }
        Payload::Function(func) => crc32(seed, &func.paramlist().addr().to_le_bytes()),
        Payload::Context { varlist, .. } => match varlist.pairs() {
            Ok(pairs) => pairs.iter().fold(crc32(seed, &[]), |acc, (sym, value)| {
                let acc = crc32(acc, sym.canon().name().as_bytes());
                if *budget == 0 {
                    return acc;
                }
                *budget -= 1;
                crc32(acc, &hash_at(value, budget).to_le_bytes())
            }),
            Err(_) => crc32(seed, &[]),
        },
        Payload::Map(map) => crc32(seed, &map.addr().to_le_bytes()),
        _ => crc32(seed, &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::context::Context;
    use crate::ren::series::Array;
    use crate::ren::symtab::Sym;

    #[test]
    fn loose_and_strict() {
        let a = Cell::string("Hello");
        let b = Cell::string("hello");
        assert!(equal_values(&a, &b, false));
        assert!(!equal_values(&a, &b, true));
        assert!(equal_values(&Cell::integer(1), &Cell::decimal(1.0), false));
        assert!(!equal_values(&Cell::integer(1), &Cell::decimal(1.0), true));
        let w = Cell::word(Kind::Word, Sym::intern("Foo"));
        let s = Cell::word(Kind::SetWord, Sym::intern("foo"));
        assert!(equal_values(&w, &s, false));
        assert!(!equal_values(&w, &s, true));
    }

    #[test]
    fn blocks_compare_deeply() {
        let x = Cell::block(Array::from_cells(vec![Cell::integer(1), Cell::string("a")]));
        let y = Cell::block(Array::from_cells(vec![Cell::integer(1), Cell::string("A")]));
        assert!(equal_values(&x, &y, false));
        assert!(!same_values(&x, &y));
        assert!(same_values(&x, &x.clone()));
    }

    #[test]
    fn ordering() {
        assert_eq!(
            Ordering::Less,
            compare_values(&Cell::integer(1), &Cell::decimal(1.5)).unwrap()
        );
        assert_eq!(
            Ordering::Equal,
            compare_values(&Cell::string("abc"), &Cell::string("ABC")).unwrap()
        );
        assert!(compare_values(&Cell::integer(1), &Cell::string("a")).is_err());
    }

    #[test]
    fn hash_follows_loose_equality() {
        assert_eq!(hash_value(&Cell::integer(2)), hash_value(&Cell::decimal(2.0)));
        assert_eq!(hash_value(&Cell::string("ABC")), hash_value(&Cell::string("abc")));
        assert_eq!(0xCBF4_3926, crc32(0, b"123456789"));
    }

    #[test]
    fn string_kinds_compare_loosely() {
        let file = Cell::string_of(Kind::File, "a");
        let tag = Cell::string_of(Kind::Tag, "A");
        let text = Cell::string("a");
        assert!(equal_values(&file, &text, false));
        assert!(equal_values(&tag, &text, false));
        assert!(!equal_values(&file, &text, true));
        assert_eq!(hash_value(&file), hash_value(&text));
        assert_eq!(hash_value(&tag), hash_value(&text));
        assert!(!equal_values(&file, &Cell::word(Kind::Word, Sym::intern("a")), false));
    }

    #[test]
    fn cyclic_blocks_hash() {
        let array = Array::from_cells(vec![Cell::integer(1)]);
        array.push_unchecked(Cell::block(array.clone()));
        array.push_unchecked(Cell::block(array.clone()));
        let block = Cell::block(array);
        assert_eq!(hash_value(&block), hash_value(&block.clone()));
    }

    #[test]
    fn equal_objects_hash_alike() {
        let object = |n: i64| {
            let ctx = Context::new(Kind::Object);
            let index = ctx.append_key(Sym::intern("a"));
            ctx.init_var(index, Cell::integer(n));
            ctx.to_cell()
        };
        let (o, p) = (object(1), object(1));
        assert!(equal_values(&o, &p, false));
        assert_eq!(hash_value(&o), hash_value(&p));
        assert!(!equal_values(&o, &object(2), false));
    }
}
