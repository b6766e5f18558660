// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/actions.rs

// Generic verbs and the per-kind actors that carry them out, along
// with MAKE and its per-kind constructors.

// <>

use super::binding::{bind_deep, collect_set_words, copy_deep_specific, derelativize, derive_specifier, BindMode};
use super::cell::{Binding, Cell, Payload};
use super::compare::equal_values;
use super::context::Context;
use super::error::{fail, ErrId, Error};
use super::frame::{Frame, FrameMeta, R};
use super::func::{copy_paramlist, make_function, make_interpreted};
use super::kinds::{Kind, TypeBits};
use super::map::MapRef;
use super::mold::form_value;
use super::paramlist::MakeFlags;
use super::path::{pick, poke};
use super::series::{Array, Binary, SeriesFlags, Text};
use super::stdenv::{array_of, function_of, logic, out, reduce_block};
use super::task::Task;
use super::throws::Flow;
use super::varargs::{make_varargs, varargs_first, varargs_tail};

/// Verbs and their specs; every one runs `action_dispatcher`
pub const ACTIONS: &[(&str, &str)] = &[
    ("append", "[series [any-series! map! any-context!] value [<opt> any-value!] /only]"),
    ("insert", "[series [any-series!] value [<opt> any-value!] /only]"),
    ("change", "[series [any-series!] value [<opt> any-value!] /only]"),
    ("remove", "[series [any-series! map!] /part limit [integer! any-series!]]"),
    ("clear", "[series [any-series! map!]]"),
    ("copy", "[value [any-series! any-context! map! function!] /part limit [integer! any-series!] /deep]"),
    ("reverse", "[series [any-series!]]"),
    ("pick", "[location [any-value!] index [any-value!]]"),
    ("poke", "[location [any-value!] index [any-value!] value [<opt> any-value!]]"),
    ("select", "[series [any-series! any-context! map!] value [any-value!]]"),
    ("find", "[series [any-series! any-context! map!] value [<opt> any-value!]]"),
    ("put", "[map [map! any-context!] key [any-value!] value [<opt> any-value!]]"),
    ("length-of", "[series [any-series! any-context! map!]]"),
    ("head", "[series [any-series!]]"),
    ("tail", "[series [any-series!]]"),
    ("next", "[series [any-series!]]"),
    ("back", "[series [any-series!]]"),
    ("skip", "[series [any-series!] offset [integer!]]"),
    ("at", "[series [any-series!] index [integer!]]"),
    ("index-of", "[series [any-series!]]"),
    ("head?", "[series [any-series!]]"),
    ("tail?", "[series [any-series! varargs!]]"),
    ("empty?", "[series [any-series! any-context! map! varargs! blank!]]"),
    ("take", "[series [any-series! varargs!] /last]"),
    ("add", "[value1 [any-scalar!] value2 [any-scalar!]]"),
    ("subtract", "[value1 [any-scalar!] value2 [any-scalar!]]"),
    ("multiply", "[value1 [any-scalar!] value2 [any-scalar!]]"),
    ("divide", "[value1 [any-scalar!] value2 [any-scalar!]]"),
    ("negate", "[number [any-scalar!]]"),
    ("absolute", "[number [any-scalar!]]"),
];

type Actor = fn(&mut Task, &mut Frame, &str) -> Result<R, Flow>;

fn actor(kind: Kind) -> Option<Actor> {
    Some(match kind {
        k if k.any_array() || k.any_string() || k == Kind::Binary => series_actor,
        k if k.any_scalar() => math_actor,
        k if k.any_context() => context_actor,
        Kind::Map => map_actor,
        Kind::Function => function_actor,
        Kind::Varargs => varargs_actor,
        _ => return None,
    })
}

/// Dispatcher shared by all verbs: the body holds the verb word, and
/// the kind of the first argument picks the actor
pub fn action_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let phase = f.phase()?;
    let verb = phase
        .body()
        .word_sym()
        .or_else(|| phase.underlying().body().word_sym())
        .ok_or_else(|| fail(ErrId::Misc, &[Cell::string("action without a verb")]))?;
    let name = verb.name();

    match &*name {
        "pick" if f.arg(1).kind() == Kind::Varargs => {
            if f.arg(2).as_integer() != Some(1) {
                return Err(fail(ErrId::BadVarargs, &[Cell::string("pick")]));
            }
            return match varargs_first(&f.arg(1))? {
                Some(value) => out(f, value),
                None => Ok(R::Blank),
            };
        }
        "pick" => return out(f, pick(&f.arg(1), &f.arg(2))?),
        "poke" => {
            let value = f.arg(3);
            poke(&f.arg(1), &f.arg(2), value.clone())?;
            return out(f, value);
        }
        _ => (),
    }

    match actor(f.arg(1).kind()) {
        Some(actor) => actor(task, f, &name),
        None => Ok(R::Unhandled),
    }
}

/// A series of any element type, viewed uniformly as cells
#[derive(Clone)]
enum Seq {
    Cells(Array),
    Chars(Text),
    Bytes(Binary),
}

/// Elements about to go into a series, already converted
enum Items {
    Cells(Vec<Cell>),
    Chars(Vec<char>),
    Bytes(Vec<u8>),
}

impl Items {
    fn len(&self) -> usize {
        match self {
            Items::Cells(v) => v.len(),
            Items::Chars(v) => v.len(),
            Items::Bytes(v) => v.len(),
        }
    }
}

fn open_series(value: &Cell) -> Option<(Seq, usize)> {
    if let Some((array, index)) = value.array_parts() {
        Some((Seq::Cells(array), index))
    } else if let Some((text, index)) = value.text_parts() {
        Some((Seq::Chars(text), index))
    } else {
        value.bytes_parts().map(|(bin, index)| (Seq::Bytes(bin), index))
    }
}

fn bytes_of(value: &Cell) -> Result<Vec<u8>, Flow> {
    match value.kind() {
        Kind::Binary => Ok(value.bytes_parts().map(|(b, i)| b.slice(i)).unwrap_or_default()),
        Kind::Integer => value
            .as_integer()
            .filter(|b| (0..=255).contains(b))
            .map(|b| vec![b as u8])
            .ok_or_else(|| fail(ErrId::OutOfRange, &[value.clone()])),
        Kind::Char => {
            let mut buf = [0; 4];
            let c = value.as_char().unwrap_or_default();
            Ok(c.encode_utf8(&mut buf).as_bytes().to_vec())
        }
        Kind::Block => {
            let mut bytes = Vec::new();
            for item in value.array_parts().map(|(a, i)| a.slice(i)).unwrap_or_default() {
                bytes.extend(bytes_of(&item)?);
            }
            Ok(bytes)
        }
        k if k.any_string() => Ok(value.as_text().unwrap_or_default().into_bytes()),
        _ => Err(fail(ErrId::InvalidArg, &[value.clone()])),
    }
}

impl Seq {
    fn len(&self) -> usize {
        match self {
            Seq::Cells(a) => a.len(),
            Seq::Chars(t) => t.len(),
            Seq::Bytes(b) => b.len(),
        }
    }

    fn ensure_mutable(&self) -> Result<(), Flow> {
        match self {
            Seq::Cells(a) => a.ensure_mutable(),
            Seq::Chars(t) => t.ensure_mutable(),
            Seq::Bytes(b) => b.ensure_mutable(),
        }
    }

    fn cells(&self, from: usize, to: usize) -> Vec<Cell> {
        match self {
            Seq::Cells(a) => a.slice_range(from, to),
            Seq::Chars(t) => t.slice_range(from, to).into_iter().map(Cell::char).collect(),
            Seq::Bytes(b) => b
                .slice_range(from, to)
                .into_iter()
                .map(|b| Cell::integer(i64::from(b)))
                .collect(),
        }
    }

    /// Convert a value to elements of this series
    fn items(&self, value: &Cell, only: bool) -> Result<Items, Flow> {
        Ok(match self {
            Seq::Cells(_) => match value.array_parts() {
                Some((array, index)) if value.kind() == Kind::Block && !only => {
                    let inner = derive_specifier(None, value);
                    Items::Cells(
                        array
                            .slice(index)
                            .iter()
                            .map(|c| derelativize(c, inner.as_ref()))
                            .collect(),
                    )
                }
                _ => Items::Cells(vec![value.clone().stored()]),
            },
            Seq::Chars(_) => match value.as_char() {
                Some(c) => Items::Chars(vec![c]),
                None => Items::Chars(form_value(value).chars().collect()),
            },
            Seq::Bytes(_) => Items::Bytes(bytes_of(value)?),
        })
    }

    fn insert(&self, at: usize, items: Items) -> Result<usize, Flow> {
        let n = items.len();
        match (self, items) {
            (Seq::Cells(a), Items::Cells(v)) => a.insert_all(at, v)?,
            (Seq::Chars(t), Items::Chars(v)) => t.insert_all(at, v)?,
            (Seq::Bytes(b), Items::Bytes(v)) => b.insert_all(at, v)?,
            _ => return Err(fail(ErrId::Misc, &[Cell::string("mismatched series items")])),
        }
        Ok(n)
    }

    fn overwrite(&self, at: usize, items: Items) -> Result<usize, Flow> {
        let n = items.len();
        match (self, items) {
            (Seq::Cells(a), Items::Cells(v)) => a.overwrite(at, v)?,
            (Seq::Chars(t), Items::Chars(v)) => t.overwrite(at, v)?,
            (Seq::Bytes(b), Items::Bytes(v)) => b.overwrite(at, v)?,
            _ => return Err(fail(ErrId::Misc, &[Cell::string("mismatched series items")])),
        }
        Ok(n)
    }

    /// Remove up to `count` elements at `at`, returning them as cells
    fn remove(&self, at: usize, count: usize) -> Result<Vec<Cell>, Flow> {
        Ok(match self {
            Seq::Cells(a) => a.remove_range(at, count)?,
            Seq::Chars(t) => t.remove_range(at, count)?.into_iter().map(Cell::char).collect(),
            Seq::Bytes(b) => b
                .remove_range(at, count)?
                .into_iter()
                .map(|b| Cell::integer(i64::from(b)))
                .collect(),
        })
    }

    fn reverse(&self, at: usize, count: usize) -> Result<(), Flow> {
        match self {
            Seq::Cells(a) => a.reverse_range(at, count),
            Seq::Chars(t) => t.reverse_range(at, count),
            Seq::Bytes(b) => b.reverse_range(at, count),
        }
    }

    /// New series of the same element type holding `from..to`
    fn copy(&self, from: usize, to: usize, deep: bool) -> Seq {
        match self {
            Seq::Cells(a) => {
                let shallow = Array::from_cells(a.slice_range(from, to));
                Seq::Cells(if deep { shallow.copy_deep(0) } else { shallow })
            }
            Seq::Chars(t) => Seq::Chars(Text::from_vec(t.slice_range(from, to), SeriesFlags::empty())),
            Seq::Bytes(b) => Seq::Bytes(Binary::from_bytes(&b.slice_range(from, to))),
        }
    }

    fn to_cell(&self, kind: Kind, index: usize) -> Cell {
        match self {
            Seq::Cells(a) => Cell::array(kind, a.clone(), index),
            Seq::Chars(t) => Cell::text(kind, t.clone(), index),
            Seq::Bytes(b) => Cell::binary(b.clone(), index),
        }
    }

    /// Position of `value` at or after `from`
    fn find(&self, from: usize, value: &Cell) -> Result<Option<usize>, Flow> {
        Ok(match self {
            Seq::Cells(a) => a
                .slice(from)
                .iter()
                .position(|c| equal_values(c, value, false))
                .map(|at| from + at),
            Seq::Chars(t) => {
                let needle: Vec<char> = match value.as_char() {
                    Some(c) => vec![c],
                    None => form_value(value).chars().collect(),
                };
                let hay = t.slice(from);
                find_run(&hay, &needle, |a, b| a.to_lowercase().eq(b.to_lowercase()))
                    .map(|at| from + at)
            }
            Seq::Bytes(b) => {
                let needle = bytes_of(value)?;
                find_run(&b.slice(from), &needle, |x, y| x == y).map(|at| from + at)
            }
        })
    }
}

fn find_run<T>(hay: &[T], needle: &[T], eq: impl Fn(&T, &T) -> bool) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    hay.windows(needle.len())
        .position(|w| w.iter().zip(needle).all(|(a, b)| eq(a, b)))
}

/// Element count a /PART limit stands for: a count, or a position in
/// the same series
fn part_len(limit: &Cell, index: usize) -> Result<usize, Flow> {
    if let Some(n) = limit.as_integer() {
        return Ok(n.max(0) as usize);
    }
    limit
        .series_index()
        .map(|end| end.saturating_sub(index))
        .ok_or_else(|| fail(ErrId::InvalidArg, &[limit.clone()]))
}

fn series_actor(_task: &mut Task, f: &mut Frame, verb: &str) -> Result<R, Flow> {
    let value = f.arg(1);
    let Some((seq, index)) = open_series(&value) else {
        return Ok(R::Unhandled);
    };
    let len = seq.len();
    let index = index.min(len);
    let specifier = derive_specifier(None, &value);

    match verb {
        "append" | "insert" | "change" => {
            seq.ensure_mutable()?;
            let arg = f.arg(2);
            if arg.is_void() {
                return out(f, value);
            }
            let items = seq.items(&arg, f.arg(3).is_truthy())?;
            match verb {
                "append" => {
                    seq.insert(len, items)?;
                    out(f, value)
                }
                "insert" => {
                    let n = seq.insert(index, items)?;
                    out(f, value.with_index(index + n))
                }
                _ => {
                    let n = seq.overwrite(index, items)?;
                    out(f, value.with_index(index + n))
                }
            }
        }
        "remove" => {
            let count = if f.arg(2).is_truthy() { part_len(&f.arg(3), index)? } else { 1 };
            seq.remove(index, count)?;
            out(f, value)
        }
        "clear" => {
            seq.remove(index, len - index)?;
            out(f, value)
        }
        "copy" => {
            let end = if f.arg(2).is_truthy() {
                (index + part_len(&f.arg(3), index)?).min(len)
            } else {
                len
            };
            let copied = match &seq {
                Seq::Cells(array) if f.arg(4).is_truthy() && !f.arg(2).is_truthy() => {
                    Seq::Cells(copy_deep_specific(array, index, specifier.as_ref()))
                }
                Seq::Cells(array) => {
                    let cells = array
                        .slice_range(index, end)
                        .iter()
                        .map(|c| derelativize(c, specifier.as_ref()))
                        .collect();
                    let copied = Array::from_cells(cells);
                    Seq::Cells(if f.arg(4).is_truthy() { copied.copy_deep(0) } else { copied })
                }
                other => other.copy(index, end, false),
            };
            out(f, copied.to_cell(value.kind(), 0))
        }
        "reverse" => {
            seq.reverse(index, len - index)?;
            out(f, value)
        }
        "select" => {
            let key = f.arg(2);
            let found = seq.find(index, &key)?;
            let picked = found.and_then(|at| seq.cells(at + 1, (at + 2).min(len)).pop());
            out(f, picked.unwrap_or_else(Cell::blank))
        }
        "find" => {
            let key = f.arg(2);
            match seq.find(index, &key)? {
                Some(at) => out(f, value.with_index(at)),
                None => Ok(R::Blank),
            }
        }
        "length-of" => out(f, Cell::integer((len - index) as i64)),
        "head" => out(f, value.with_index(0)),
        "tail" => out(f, value.with_index(len)),
        "next" => out(f, value.with_index((index + 1).min(len))),
        "back" => out(f, value.with_index(index.saturating_sub(1))),
        "skip" | "at" => {
            let mut offset = f.arg(2).as_integer().unwrap_or(0);
            if verb == "at" && offset > 0 {
                offset -= 1;
            }
            let at = (index as i64).saturating_add(offset).clamp(0, len as i64);
            out(f, value.with_index(at as usize))
        }
        "index-of" => out(f, Cell::integer(index as i64 + 1)),
        "head?" => logic(index == 0),
        "tail?" | "empty?" => logic(index >= len),
        "take" => {
            if index >= len {
                return Ok(R::Blank);
            }
            let at = if f.arg(2).is_truthy() { len - 1 } else { index };
            let taken = seq.remove(at, 1)?;
            out(f, taken.into_iter().next().unwrap_or_else(Cell::blank))
        }
        _ => Ok(R::Unhandled),
    }
}

/// Numeric kinds order by how much they can hold
fn widest(a: Kind, b: Kind) -> Kind {
    let rank = |k| match k {
        Kind::Money => 3,
        Kind::Decimal => 2,
        Kind::Percent => 1,
        _ => 0,
    };
    match (a, b) {
        (Kind::Percent, Kind::Percent) => Kind::Percent,
        (Kind::Integer, Kind::Percent) | (Kind::Percent, Kind::Integer) => Kind::Decimal,
        _ if rank(a) >= rank(b) => a,
        _ => b,
    }
}

fn float_of(kind: Kind, d: f64) -> Result<Cell, Flow> {
    if !d.is_finite() {
        return Err(fail(ErrId::Overflow, &[]));
    }
    Ok(match kind {
        Kind::Percent => Cell::percent(d),
        Kind::Money => Cell::money(d),
        _ => Cell::decimal(d),
    })
}

fn integer_math(verb: &str, a: i64, b: i64) -> Result<Cell, Flow> {
    let overflow = || fail(ErrId::Overflow, &[]);
    Ok(match verb {
        "add" => Cell::integer(a.checked_add(b).ok_or_else(overflow)?),
        "subtract" => Cell::integer(a.checked_sub(b).ok_or_else(overflow)?),
        "multiply" => Cell::integer(a.checked_mul(b).ok_or_else(overflow)?),
        _ => {
            if b == 0 {
                return Err(fail(ErrId::ZeroDivide, &[]));
            }
            match a.checked_rem(b) {
                Some(0) => Cell::integer(a.checked_div(b).ok_or_else(overflow)?),
                Some(_) => Cell::decimal(a as f64 / b as f64),
                None => return Err(overflow()),
            }
        }
    })
}

fn float_math(verb: &str, a: f64, b: f64) -> Result<f64, Flow> {
    Ok(match verb {
        "add" => a + b,
        "subtract" => a - b,
        "multiply" => a * b,
        _ => {
            if b == 0.0 {
                return Err(fail(ErrId::ZeroDivide, &[]));
            }
            a / b
        }
    })
}

fn pair_parts(value: &Cell) -> Option<(f64, f64)> {
    match value.payload() {
        Payload::Pair(x, y) => Some((*x, *y)),
        _ => value.as_number().map(|n| (n, n)),
    }
}

fn binary_math(verb: &str, a: &Cell, b: &Cell) -> Result<Option<Cell>, Flow> {
    let (ka, kb) = (a.kind(), b.kind());
    if ka == Kind::Pair || kb == Kind::Pair {
        let ((ax, ay), (bx, by)) = match (pair_parts(a), pair_parts(b)) {
            (Some(pa), Some(pb)) => (pa, pb),
            _ => return Ok(None),
        };
        return Ok(Some(Cell::pair(float_math(verb, ax, bx)?, float_math(verb, ay, by)?)));
    }
    if ka == Kind::Char {
        let (Some(c), Some(n)) = (a.as_char(), b.as_integer().or_else(|| b.as_char().map(|c| c as i64)))
        else {
            return Ok(None);
        };
        let code = integer_math(verb, c as i64, n)?
            .as_integer()
            .ok_or_else(|| fail(ErrId::OutOfRange, &[a.clone()]))?;
        let result = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| fail(ErrId::OutOfRange, &[Cell::integer(code)]))?;
        return Ok(Some(Cell::char(result)));
    }
    if let (Some(x), Some(y)) = (a.as_integer(), b.as_integer()) {
        return integer_math(verb, x, y).map(Some);
    }
    if !ka.any_number() || !kb.any_number() {
        return Ok(None);
    }
    let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
        return Ok(None);
    };
    float_of(widest(ka, kb), float_math(verb, x, y)?).map(Some)
}

fn math_actor(_task: &mut Task, f: &mut Frame, verb: &str) -> Result<R, Flow> {
    let value = f.arg(1);
    match verb {
        "add" | "subtract" | "multiply" | "divide" => match binary_math(verb, &value, &f.arg(2))? {
            Some(result) => out(f, result),
            None => Ok(R::Unhandled),
        },
        "negate" | "absolute" => {
            let absolute = verb == "absolute";
            let result = match value.kind() {
                Kind::Integer => {
                    let i = value.as_integer().unwrap_or(0);
                    let r = if absolute { i.checked_abs() } else { i.checked_neg() };
                    Cell::integer(r.ok_or_else(|| fail(ErrId::Overflow, &[]))?)
                }
                Kind::Pair => {
                    let (x, y) = pair_parts(&value).unwrap_or_default();
                    if absolute {
                        Cell::pair(x.abs(), y.abs())
                    } else {
                        Cell::pair(-x, -y)
                    }
                }
                k if k.any_number() => {
                    let d = value.as_number().unwrap_or(0.0);
                    float_of(k, if absolute { d.abs() } else { -d })?
                }
                _ => return Ok(R::Unhandled),
            };
            out(f, result)
        }
        _ => Ok(R::Unhandled),
    }
}

fn context_actor(_task: &mut Task, f: &mut Frame, verb: &str) -> Result<R, Flow> {
    let value = f.arg(1);
    let ctx = value
        .as_context()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[value.clone()]))?;
    match verb {
        "length-of" => out(f, Cell::integer(ctx.pairs()?.len() as i64)),
        "empty?" => logic(ctx.pairs()?.is_empty()),
        "copy" => {
            let copied = ctx.copy_shallow()?;
            out(f, Cell::context(value.kind(), copied))
        }
        "select" => {
            let key = f.arg(2);
            let found = key
                .word_sym()
                .and_then(|sym| ctx.find(sym))
                .map(|i| ctx.var(i))
                .transpose()?;
            out(f, found.unwrap_or_else(Cell::blank))
        }
        "find" => {
            let found = f.arg(2).word_sym().and_then(|sym| ctx.find(sym)).is_some();
            logic(found)
        }
        "append" | "put" => {
            let (key, new) = if verb == "put" {
                (f.arg(2), f.arg(3))
            } else {
                (f.arg(2), Cell::void())
            };
            if verb == "append" {
                append_to_context(&ctx, &key)?;
                return out(f, value);
            }
            let sym = key
                .word_sym()
                .ok_or_else(|| fail(ErrId::InvalidArg, &[key.clone()]))?;
            let i = ctx.find_or_append(sym);
            ctx.set_var(i, new.clone())?;
            out(f, new)
        }
        _ => Ok(R::Unhandled),
    }
}

/// APPEND to a context takes a block of words, or set-words and values
fn append_to_context(ctx: &Context, def: &Cell) -> Result<(), Flow> {
    let (array, index) = array_of(def)?;
    let specifier = derive_specifier(None, def);
    let cells = array.slice(index);
    let mut iter = cells.iter().peekable();
    while let Some(cell) = iter.next() {
        let sym = cell
            .word_sym()
            .filter(|_| cell.any_word())
            .ok_or_else(|| fail(ErrId::InvalidArg, &[cell.clone()]))?;
        let i = ctx.find_or_append(sym);
        if cell.kind() == Kind::SetWord {
            let value = iter
                .next()
                .map(|v| derelativize(v, specifier.as_ref()))
                .unwrap_or_else(Cell::blank);
            ctx.set_var(i, value)?;
        }
    }
    Ok(())
}

fn map_actor(_task: &mut Task, f: &mut Frame, verb: &str) -> Result<R, Flow> {
    let value = f.arg(1);
    let map = value
        .as_map()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[value.clone()]))?;
    match verb {
        "length-of" => out(f, Cell::integer(map.len() as i64)),
        "empty?" => logic(map.is_empty()),
        "copy" => out(f, Cell::map(map.copy())),
        "select" => out(f, map.get(&f.arg(2)).unwrap_or_else(Cell::blank)),
        "find" => logic(map.get(&f.arg(2)).is_some()),
        "put" => {
            let new = f.arg(3);
            map.put(f.arg(2), new.clone())?;
            out(f, new)
        }
        "append" => {
            fill_map(&map, &f.arg(2))?;
            out(f, value)
        }
        "remove" => {
            // the key comes through /PART
            if f.arg(2).is_truthy() {
                map.put(f.arg(3), Cell::void())?;
            }
            out(f, value)
        }
        "clear" => {
            for (key, _) in map.pairs() {
                map.put(key, Cell::void())?;
            }
            out(f, value)
        }
        _ => Ok(R::Unhandled),
    }
}

fn fill_map(map: &MapRef, def: &Cell) -> Result<(), Flow> {
    let (array, index) = array_of(def)?;
    let specifier = derive_specifier(None, def);
    let cells: Vec<Cell> = array
        .slice(index)
        .iter()
        .map(|c| derelativize(c, specifier.as_ref()))
        .collect();
    for pair in cells.chunks(2) {
        let key = pair[0].clone();
        let value = pair.get(1).cloned().unwrap_or_else(Cell::blank);
        map.put(key, value)?;
    }
    Ok(())
}

fn function_actor(_task: &mut Task, f: &mut Frame, verb: &str) -> Result<R, Flow> {
    let value = f.arg(1);
    let Some(func) = value.as_func() else {
        return Ok(R::Unhandled);
    };
    match verb {
        "copy" => {
            let copy = make_function(copy_paramlist(&func), func.dispatcher(), Some(&func), func.exemplar())?;
            copy.set_body(func.body());
            copy.set_meta(func.meta());
            out(f, Cell::bound_function(copy, value.binding().clone()))
        }
        _ => Ok(R::Unhandled),
    }
}

fn varargs_actor(task: &mut Task, f: &mut Frame, verb: &str) -> Result<R, Flow> {
    let value = f.arg(1);
    match verb {
        "take" => match task.varargs_take(&value)? {
            Some(taken) => out(f, taken),
            None => Ok(R::Blank),
        },
        "tail?" | "empty?" => logic(varargs_tail(&value)?),
        _ => Ok(R::Unhandled),
    }
}

type MakeHook = fn(&mut Task, Kind, Option<&Cell>, &Cell) -> Result<Cell, Flow>;

fn make_hook(kind: Kind) -> Option<MakeHook> {
    Some(match kind {
        Kind::Object | Kind::Module => make_object,
        Kind::Frame => make_frame,
        Kind::Error => make_error,
        Kind::Map => make_map,
        Kind::Varargs => make_varargs_from,
        Kind::Typeset => make_typeset,
        Kind::Function => make_function_from,
        k if k.any_array() => make_array,
        k if k.any_string() => make_string,
        Kind::Binary => make_binary,
        _ => return None,
    })
}

fn bad_make(kind: Kind, def: &Cell) -> Flow {
    fail(ErrId::BadMake, &[Cell::datatype(kind), def.clone()])
}

/// Run a definition block in `ctx`, after adding its top-level
/// set-words as fields
fn run_in_context(task: &mut Task, ctx: &Context, def: &Cell) -> Result<(), Flow> {
    let (array, index) = array_of(def)?;
    for sym in collect_set_words(&array, index, false) {
        ctx.find_or_append(sym);
    }
    let specifier = derive_specifier(None, def);
    let code = copy_deep_specific(&array, index, specifier.as_ref());
    bind_deep(&code, 0, ctx, BindMode::Existing);
    task.heap.push_guard_array(&code);
    let result = task.do_array(&code, 0, None);
    task.heap.drop_guard_array(&code);
    result.map(|_| ())
}

fn make_object(task: &mut Task, _kind: Kind, parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    let ctx = match parent.and_then(|p| p.as_context()) {
        Some(parent) => parent.copy_shallow()?,
        None => Context::new(Kind::Object),
    };
    if def.kind() == Kind::Block {
        run_in_context(task, &ctx, def)?;
    } else if !def.is_blank() {
        return Err(bad_make(Kind::Object, def));
    }
    Ok(Cell::object(ctx))
}

fn make_frame(task: &mut Task, _kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    let (func, value, label) = function_of(task, def).map_err(|_| bad_make(Kind::Frame, def))?;
    let frame = Context::from_keylist(Kind::Frame, &func.facade());
    if let Some(exemplar) = func.exemplar() {
        for i in 1..=frame.len() {
            frame.init_var(i, exemplar.var(i)?);
        }
    }
    frame.set_frame_meta(FrameMeta {
        phase: func.clone(),
        original: func.clone(),
        binding: value.binding().clone(),
        label,
        feed: None,
    });
    Ok(Cell::frame(frame, Some(func)))
}

fn make_error(task: &mut Task, _kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    match def.kind() {
        k if k.any_string() => Ok(Error::user(&def.as_text().unwrap_or_default()).to_cell()),
        Kind::Block => {
            let err = Error::user("");
            run_in_context(task, err.context(), def)?;
            Ok(Error::from_context(err.context().clone()).to_cell())
        }
        _ => Err(bad_make(Kind::Error, def)),
    }
}

fn make_varargs_from(_task: &mut Task, _kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    make_varargs(def)
}

fn make_map(_task: &mut Task, _kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    let map = MapRef::new();
    match def.kind() {
        Kind::Block => fill_map(&map, def)?,
        Kind::Integer | Kind::Blank => (),
        _ => return Err(bad_make(Kind::Map, def)),
    }
    Ok(Cell::map(map))
}

fn make_typeset(task: &mut Task, _kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    if def.kind() != Kind::Block {
        return Err(bad_make(Kind::Typeset, def));
    }
    let mut bits = TypeBits::default();
    for item in reduce_block(task, def)? {
        if let Some(kind) = item.datatype_kind() {
            bits = bits.with(kind);
        } else if let Some(more) = item.typeset_bits() {
            bits = bits.union(more);
        } else {
            return Err(bad_make(Kind::Typeset, &item));
        }
    }
    Ok(Cell::typeset(bits))
}

fn make_function_from(task: &mut Task, _kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    let parts = def
        .array_parts()
        .filter(|_| def.kind() == Kind::Block)
        .map(|(a, i)| a.slice(i))
        .unwrap_or_default();
    let [spec, body] = parts.as_slice() else {
        return Err(bad_make(Kind::Function, def));
    };
    let specifier = derive_specifier(None, def);
    let func = make_interpreted(task, spec, body, specifier.as_ref(), MakeFlags::RETURN)?;
    Ok(func.to_cell())
}

fn make_array(_task: &mut Task, kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    let array = match def.array_parts() {
        Some((array, index)) => {
            let specifier = derive_specifier(None, def);
            Array::from_cells(
                array
                    .slice(index)
                    .iter()
                    .map(|c| derelativize(c, specifier.as_ref()))
                    .collect(),
            )
        }
        None if def.kind() == Kind::Integer || def.is_blank() => Array::empty(),
        None => Array::from_cells(vec![def.clone()]),
    };
    Ok(Cell::array(kind, array, 0).with_binding(Binding::Unbound))
}

fn make_string(_task: &mut Task, kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    if def.kind() == Kind::Integer || def.is_blank() {
        return Ok(Cell::string_of(kind, ""));
    }
    if def.kind() == Kind::Binary {
        let bytes = bytes_of(def)?;
        let text = String::from_utf8(bytes).map_err(|_| bad_make(kind, def))?;
        return Ok(Cell::string_of(kind, &text));
    }
    Ok(Cell::string_of(kind, &form_value(def)))
}

fn make_binary(_task: &mut Task, _kind: Kind, _parent: Option<&Cell>, def: &Cell) -> Result<Cell, Flow> {
    if def.kind() == Kind::Integer || def.is_blank() {
        return Ok(Cell::bytes(&[]));
    }
    Ok(Cell::bytes(&bytes_of(def)?))
}

ren_fn! {
    const MAKE_NATIVES;
    task f;

    "make" "[type [any-value!] def [<opt> any-value!]]" [example, def] {
        let (target, parent) = match example.datatype_kind() {
            Some(target) => (target, None),
            None => (example.kind(), Some(example)),
        };
        let hook = make_hook(target).ok_or_else(|| bad_make(target, &def))?;
        let made = hook(task, target, parent.as_ref(), &def)?;
        out(f, made)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::ren::error::ErrId;
    use crate::ren::task::Task;
    use crate::ren::throws::RenError;

    fn interpret(code: &str) -> Result<String, RenError> {
        let mut task = Task::new(Config::default())?;
        task.do_string(code).map(|v| v.to_string())
    }

    fn fails_with(code: &str, id: ErrId) -> bool {
        match interpret(code) {
            Err(RenError::Error(err)) => err.is(id),
            _ => false,
        }
    }

    #[test]
    fn series_editing() {
        assert_eq!("[1 2 3 4]", interpret("append [1 2] [3 4]").unwrap());
        assert_eq!("[1 2 [3 4]]", interpret("append/only [1 2] [3 4]").unwrap());
        assert_eq!("[0 1 2]", interpret("head insert [1 2] 0").unwrap());
        assert_eq!("[1 2]", interpret("insert [1 2] 0").unwrap());
        assert_eq!("[9 2]", interpret("head change [1 2] 9").unwrap());
        assert_eq!("[2 3]", interpret("remove [1 2 3]").unwrap());
        assert_eq!("[3]", interpret("remove/part [1 2 3] 2").unwrap());
        assert_eq!("[1]", interpret("head clear next [1 2 3]").unwrap());
        assert_eq!("[3 2 1]", interpret("reverse [1 2 3]").unwrap());
        assert_eq!("\"abcd\"", interpret("append \"ab\" \"cd\"").unwrap());
        assert_eq!("#{0102}", interpret("append #{01} 2").unwrap());
    }

    #[test]
    fn series_navigation() {
        assert_eq!("[2 3]", interpret("next [1 2 3]").unwrap());
        assert_eq!("[]", interpret("tail [1 2 3]").unwrap());
        assert_eq!("[3]", interpret("skip [1 2 3] 2").unwrap());
        assert_eq!("[2 3]", interpret("at [1 2 3] 2").unwrap());
        assert_eq!("2", interpret("index-of next [1 2 3]").unwrap());
        assert_eq!("true", interpret("tail? tail [1]").unwrap());
        assert_eq!("true", interpret("head? back next [1]").unwrap());
        assert_eq!("2", interpret("length-of next [1 2 3]").unwrap());
        assert_eq!("true", interpret("empty? \"\"").unwrap());
    }

    #[test]
    fn searching() {
        assert_eq!("[2 3]", interpret("find [1 2 3] 2").unwrap());
        assert_eq!("_", interpret("find [1 2 3] 4").unwrap());
        assert_eq!("\"lo world\"", interpret("find \"hello world\" \"LO\"").unwrap());
        assert_eq!("20", interpret("select [a 10 b 20] 'b").unwrap());
        assert_eq!("_", interpret("select [a 10] 'z").unwrap());
    }

    #[test]
    fn copying() {
        assert_eq!(
            "[[1] [1 2]]",
            interpret("a: [1] b: copy a append a 2 reduce [b a]").unwrap()
        );
        assert_eq!("[1 2]", interpret("copy/part [1 2 3] 2").unwrap());
        assert_eq!(
            "[[1] [1 2]]",
            interpret("a: [[1]] b: copy/deep a append first a 2 reduce [first b first a]").unwrap()
        );
    }

    #[test]
    fn take_from_series_and_varargs() {
        assert_eq!("1", interpret("b: [1 2] take b").unwrap());
        assert_eq!("2", interpret("take/last [1 2]").unwrap());
        assert_eq!("_", interpret("take []").unwrap());
        assert_eq!(
            "6",
            interpret("sum: func [args [integer! <...>]] [n: 0 while [not tail? args] [n: n + take args] n] sum 1 2 3")
                .unwrap()
        );
    }

    #[test]
    fn first_peeks_at_varargs() {
        assert_eq!(
            "[1 1 2]",
            interpret("v: make varargs! [1 2] reduce [first v take v take v]").unwrap()
        );
        assert_eq!("_", interpret("v: make varargs! [] first v").unwrap());
        assert!(fails_with("pick make varargs! [1 2] 2", ErrId::BadVarargs));
    }

    #[test]
    fn arithmetic() {
        assert_eq!("7", interpret("add 3 4").unwrap());
        assert_eq!("2.5", interpret("divide 5 2").unwrap());
        assert_eq!("2", interpret("divide 4 2").unwrap());
        assert_eq!("4x6", interpret("add 1x2 3x4").unwrap());
        assert_eq!("#\"b\"", interpret("add #\"a\" 1").unwrap());
        assert_eq!("-3", interpret("negate 3").unwrap());
        assert_eq!("3", interpret("absolute -3").unwrap());
        assert!(fails_with("divide 1 0", ErrId::ZeroDivide));
        assert!(fails_with("add 9223372036854775807 1", ErrId::Overflow));
    }

    #[test]
    fn unhandled_kind_is_cannot_use() {
        assert!(fails_with("add 1 \"a\"", ErrId::ExpectArg));
        assert!(fails_with("add 1.2.3 1", ErrId::CannotUse));
    }

    #[test]
    fn maps() {
        assert_eq!("2", interpret("m: make map! [a 1 b 2] select m 'b").unwrap());
        assert_eq!("2", interpret("m: make map! [a 1 b 2] length-of m").unwrap());
        assert_eq!("3", interpret("m: make map! [] put m \"K\" 3 select m \"k\"").unwrap());
    }

    #[test]
    fn make_by_kind() {
        assert_eq!("3", interpret("o: make object! [a: 1 b: a + 2] o/b").unwrap());
        assert_eq!(
            "[1 5]",
            interpret("p: make object! [a: 1 b: 2] c: make p [b: 5] reduce [p/a c/b]").unwrap()
        );
        assert_eq!("true", interpret("error? make error! \"bad\"").unwrap());
        assert_eq!("5", interpret("f: make function! [[x] [x + 1]] f 4").unwrap());
        assert_eq!("[]", interpret("make block! 10").unwrap());
        assert_eq!("\"\"", interpret("make string! 12").unwrap());
        assert_eq!("\"abc\"", interpret("make string! 'abc").unwrap());
    }

    #[test]
    fn frames_from_functions() {
        assert_eq!(
            "[1 2 3]",
            interpret("fr: make frame! :append fr/series: copy [1 2] fr/value: 3 do fr").unwrap()
        );
        assert_eq!(
            "30",
            interpret("f: func [a b] [a * b] fr: make frame! :f fr/a: 5 fr/b: 6 do fr").unwrap()
        );
    }
}
