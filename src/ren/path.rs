// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/path.rs

// Path evaluation. A path picks its way through values one selector
// at a time using per-kind pick and poke hooks; a path that reaches a
// function invokes it, with the remaining selectors as refinements.

// <>

use super::binding::{derive_specifier, get_var, set_var};
use super::cell::{Cell, Payload};
use super::compare::equal_values;
use super::context::Context;
use super::error::{fail, ErrId};
use super::frame::Frame;
use super::kinds::Kind;
use super::symtab::*;
use super::task::Task;
use super::throws::Flow;

/// Reads the value a selector names inside a container
type PickHook = fn(&Cell, &Cell) -> Result<Option<Cell>, Flow>;

/// Writes through a selector; an updated immediate container comes
/// back so it can be stored where the container came from
type PokeHook = fn(&Cell, &Cell, Cell) -> Result<Option<Cell>, Flow>;

fn pick_hook(kind: Kind) -> Option<PickHook> {
    Some(match kind {
        k if k.any_array() => pick_array,
        k if k.any_context() => pick_context,
        k if k.any_string() => pick_string,
        Kind::Binary => pick_binary,
        Kind::Map => pick_map,
        Kind::Pair => pick_pair,
        Kind::Tuple => pick_tuple,
        Kind::Function => pick_function,
        _ => return None,
    })
}

fn poke_hook(kind: Kind) -> Option<PokeHook> {
    Some(match kind {
        k if k.any_array() => poke_array,
        k if k.any_context() => poke_context,
        k if k.any_string() => poke_string,
        Kind::Binary => poke_binary,
        Kind::Map => poke_map,
        Kind::Pair => poke_pair,
        Kind::Tuple => poke_tuple,
        _ => return None,
    })
}

/// 0-based offset from a 1-based integer selector
fn offset(picker: &Cell) -> Option<i64> {
    picker.as_integer().map(|n| n - 1).or_else(|| {
        picker
            .as_number()
            .filter(|_| picker.kind() == Kind::Decimal)
            .map(|d| d as i64 - 1)
    })
}

fn position(index: usize, picker: &Cell, len: usize) -> Option<usize> {
    let at = index as i64 + offset(picker)?;
    (at >= 0 && (at as usize) < len).then_some(at as usize)
}

fn pick_array(value: &Cell, picker: &Cell) -> Result<Option<Cell>, Flow> {
    let Some((array, index)) = value.array_parts() else {
        return Ok(None);
    };
    if picker.kind() == Kind::Integer || picker.kind() == Kind::Decimal {
        return Ok(Some(
            position(index, picker, array.len())
                .and_then(|at| array.get(at))
                .unwrap_or_else(Cell::blank),
        ));
    }
    // select: the value after a matching key
    let cells = array.slice(index);
    let found = cells
        .iter()
        .position(|c| equal_values(c, picker, false))
        .and_then(|at| cells.get(at + 1).cloned());
    Ok(Some(found.unwrap_or_else(Cell::blank)))
}

fn poke_array(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    let Some((array, index)) = value.array_parts() else {
        return Err(bad_set(value, picker));
    };
    let at = if picker.kind() == Kind::Integer {
        position(index, picker, array.len())
    } else {
        let cells = array.slice(index);
        cells
            .iter()
            .position(|c| equal_values(c, picker, false))
            .map(|at| index + at + 1)
            .filter(|at| *at < array.len())
    };
    let at = at.ok_or_else(|| fail(ErrId::OutOfRange, &[picker.clone()]))?;
    array.set(at, new.stored())?;
    Ok(None)
}

fn pick_context(value: &Cell, picker: &Cell) -> Result<Option<Cell>, Flow> {
    let (Some(ctx), Some(sym)) = (value.as_context(), picker.word_sym()) else {
        return Ok(None);
    };
    match ctx.find(sym) {
        Some(i) => ctx.var(i).map(Some),
        None => Ok(None),
    }
}

fn poke_context(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    let (Some(ctx), Some(sym)) = (value.as_context(), picker.word_sym()) else {
        return Err(bad_set(value, picker));
    };
    let i = ctx.find(sym).ok_or_else(|| bad_set(value, picker))?;
    ctx.set_var(i, new)?;
    Ok(None)
}

fn pick_string(value: &Cell, picker: &Cell) -> Result<Option<Cell>, Flow> {
    let Some((text, index)) = value.text_parts() else {
        return Ok(None);
    };
    Ok(Some(
        position(index, picker, text.len())
            .and_then(|at| text.get(at))
            .map_or_else(Cell::blank, Cell::char),
    ))
}

fn poke_string(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    let Some((text, index)) = value.text_parts() else {
        return Err(bad_set(value, picker));
    };
    let at = position(index, picker, text.len())
        .ok_or_else(|| fail(ErrId::OutOfRange, &[picker.clone()]))?;
    let c = new
        .as_char()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[new.clone()]))?;
    text.set(at, c)?;
    Ok(None)
}

fn pick_binary(value: &Cell, picker: &Cell) -> Result<Option<Cell>, Flow> {
    let Some((bin, index)) = value.bytes_parts() else {
        return Ok(None);
    };
    Ok(Some(
        position(index, picker, bin.len())
            .and_then(|at| bin.get(at))
            .map_or_else(Cell::blank, |b| Cell::integer(b as i64)),
    ))
}

fn poke_binary(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    let Some((bin, index)) = value.bytes_parts() else {
        return Err(bad_set(value, picker));
    };
    let at = position(index, picker, bin.len())
        .ok_or_else(|| fail(ErrId::OutOfRange, &[picker.clone()]))?;
    let byte = new
        .as_integer()
        .filter(|b| (0..=255).contains(b))
        .ok_or_else(|| fail(ErrId::OutOfRange, &[new.clone()]))?;
    bin.set(at, byte as u8)?;
    Ok(None)
}

fn pick_map(value: &Cell, picker: &Cell) -> Result<Option<Cell>, Flow> {
    let Some(map) = value.as_map() else {
        return Ok(None);
    };
    Ok(Some(map.get(picker).unwrap_or_else(Cell::blank)))
}

fn poke_map(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    let Some(map) = value.as_map() else {
        return Err(bad_set(value, picker));
    };
    map.put(picker.clone(), new)?;
    Ok(None)
}

/// 0 for x, 1 for y
fn axis(picker: &Cell) -> Option<usize> {
    match (picker.word_sym(), picker.as_integer()) {
        (Some(s), _) if s.same_canon(S_X) => Some(0),
        (Some(s), _) if s.same_canon(S_Y) => Some(1),
        (_, Some(1)) => Some(0),
        (_, Some(2)) => Some(1),
        _ => None,
    }
}

fn pick_pair(value: &Cell, picker: &Cell) -> Result<Option<Cell>, Flow> {
    let Payload::Pair(x, y) = value.payload() else {
        return Ok(None);
    };
    let number = |d: f64| {
        if d.fract() == 0.0 {
            Cell::integer(d as i64)
        } else {
            Cell::decimal(d)
        }
    };
    Ok(axis(picker).map(|a| number(if a == 0 { *x } else { *y })))
}

fn poke_pair(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    let (Payload::Pair(x, y), Some(a)) = (value.payload(), axis(picker)) else {
        return Err(bad_set(value, picker));
    };
    let n = new
        .as_number()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[new.clone()]))?;
    Ok(Some(if a == 0 {
        Cell::pair(n, *y)
    } else {
        Cell::pair(*x, n)
    }))
}

fn pick_tuple(value: &Cell, picker: &Cell) -> Result<Option<Cell>, Flow> {
    let Payload::Tuple(bytes) = value.payload() else {
        return Ok(None);
    };
    Ok(Some(
        position(0, picker, bytes.len())
            .map_or_else(Cell::blank, |at| Cell::integer(bytes[at] as i64)),
    ))
}

fn poke_tuple(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    let Payload::Tuple(bytes) = value.payload() else {
        return Err(bad_set(value, picker));
    };
    let at = position(0, picker, bytes.len())
        .ok_or_else(|| fail(ErrId::OutOfRange, &[picker.clone()]))?;
    let byte = new
        .as_integer()
        .filter(|b| (0..=255).contains(b))
        .ok_or_else(|| fail(ErrId::OutOfRange, &[new.clone()]))?;
    let mut copy = bytes.to_vec();
    copy[at] = byte as u8;
    Ok(Some(Cell::tuple(&copy)))
}

/// Selecting from a function yields the function; the rest of the
/// path becomes its refinements
fn pick_function(value: &Cell, _picker: &Cell) -> Result<Option<Cell>, Flow> {
    Ok(Some(value.clone()))
}

fn bad_set(value: &Cell, picker: &Cell) -> Flow {
    fail(ErrId::BadPathSet, &[value.clone(), picker.clone()])
}

/// Value found by one selector
pub fn pick(value: &Cell, picker: &Cell) -> Result<Cell, Flow> {
    let picked = match pick_hook(value.kind()) {
        Some(hook) => hook(value, picker)?,
        None => None,
    };
    picked.ok_or_else(|| fail(ErrId::BadPathSelect, &[value.clone(), picker.clone()]))
}

/// Store through one selector; `Some` carries an updated immediate
pub fn poke(value: &Cell, picker: &Cell, new: Cell) -> Result<Option<Cell>, Flow> {
    match poke_hook(value.kind()) {
        Some(hook) => hook(value, picker, new),
        None => Err(bad_set(value, picker)),
    }
}

impl Task {
    /// Evaluate a selector: words are literal keys, get-words and
    /// groups are evaluated, everything else is itself
    fn selector(&mut self, item: &Cell, spec: Option<&Context>) -> Result<Cell, Flow> {
        match item.kind() {
            Kind::GetWord => get_var(item, spec),
            Kind::Group => {
                let (array, index) = item
                    .array_parts()
                    .ok_or_else(|| fail(ErrId::InvalidArg, &[item.clone()]))?;
                let inner = derive_specifier(spec, item);
                self.do_array(&array, index, inner.as_ref())
            }
            _ => Ok(item.clone()),
        }
    }

    /// Head value of a path and its remaining items
    fn path_head(
        &mut self,
        path: &Cell,
        spec: Option<&Context>,
    ) -> Result<(Cell, Vec<Cell>, Option<Context>), Flow> {
        let (array, index) = path
            .array_parts()
            .ok_or_else(|| fail(ErrId::InvalidArg, &[path.clone()]))?;
        let inner = derive_specifier(spec, path);
        let mut items = array.slice(index).into_iter();
        let head = items
            .next()
            .ok_or_else(|| fail(ErrId::InvalidArg, &[path.clone()]))?;
        let value = match head.kind() {
            Kind::Word | Kind::GetWord => get_var(&head, inner.as_ref())?,
            Kind::Group => self.selector(&head, inner.as_ref())?,
            _ => head.clone(),
        };
        Ok((value, items.collect(), inner))
    }

    /// Refinement names for the rest of a path after a function
    fn refinements(&mut self, items: &[Cell], spec: Option<&Context>) -> Result<Vec<Sym>, Flow> {
        let mut syms = Vec::with_capacity(items.len());
        for item in items {
            let picked = self.selector(item, spec)?;
            if picked.is_blank() || picked.is_void() {
                continue;
            }
            match picked.word_sym() {
                Some(sym) => syms.push(sym),
                None => return Err(fail(ErrId::BadRefine, &[picked])),
            }
        }
        Ok(syms)
    }

    /// PATH! in evaluative position
    pub(crate) fn eval_path(
        &mut self,
        f: &mut Frame,
        path: &Cell,
        spec: Option<&Context>,
    ) -> Result<(), Flow> {
        let (mut value, items, inner) = self.path_head(path, spec)?;
        let mut label = path
            .array_parts()
            .and_then(|(a, i)| a.get(i))
            .and_then(|h| h.word_sym());

        let mut rest = items.as_slice();
        while !rest.is_empty() && !value.is_function() {
            let picker = self.selector(&rest[0], inner.as_ref())?;
            if rest[0].kind() == Kind::Word {
                label = rest[0].word_sym();
            }
            value = pick(&value, &picker)?;
            rest = &rest[1..];
        }

        if value.is_function() {
            let func = value
                .as_func()
                .ok_or_else(|| fail(ErrId::InvalidArg, &[value.clone()]))?;
            let refinements = self.refinements(rest, inner.as_ref())?;
            let out = self.call(&f.feed, &func, value.binding(), label, &refinements, None)?;
            if let Some(out) = out {
                f.out = out;
            }
            return Ok(());
        }
        if value.is_void() {
            return Err(fail(ErrId::NoValue, &[path.clone()]));
        }
        f.out = value;
        Ok(())
    }

    /// GET-PATH!: the value, without invoking functions
    pub(crate) fn get_path(&mut self, path: &Cell, spec: Option<&Context>) -> Result<Cell, Flow> {
        let (mut value, items, inner) = self.path_head(path, spec)?;
        for item in &items {
            let picker = self.selector(item, inner.as_ref())?;
            value = pick(&value, &picker)?;
        }
        Ok(value)
    }

    /// SET-PATH!: store `new` at the end of the path, writing updated
    /// immediates back toward the head variable
    pub(crate) fn set_path(
        &mut self,
        path: &Cell,
        spec: Option<&Context>,
        new: Cell,
    ) -> Result<(), Flow> {
        let (array, index) = path
            .array_parts()
            .ok_or_else(|| fail(ErrId::InvalidArg, &[path.clone()]))?;
        let inner = derive_specifier(spec, path);
        let items = array.slice(index);
        if items.len() < 2 {
            return Err(fail(ErrId::BadPathSet, &[path.clone(), Cell::blank()]));
        }
        let head = &items[0];
        let (head_value, _, _) = self.path_head(path, spec)?;

        let mut pickers = Vec::with_capacity(items.len() - 1);
        for item in &items[1..] {
            pickers.push(self.selector(item, inner.as_ref())?);
        }
        let mut chain = vec![head_value];
        for picker in &pickers[..pickers.len() - 1] {
            let next = pick(chain.last().unwrap_or(&Cell::blank()), picker)?;
            chain.push(next);
        }

        let mut new = new;
        for (container, picker) in chain.iter().zip(pickers.iter()).rev() {
            match poke(container, picker, new)? {
                None => return Ok(()),
                Some(updated) => new = updated,
            }
        }
        match head.kind() {
            Kind::Word | Kind::GetWord => set_var(head, inner.as_ref(), new),
            _ => Err(fail(ErrId::BadPathSet, &[path.clone(), head.clone()])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_axes() {
        let pair = Cell::pair(1.0, 2.5);
        let x = Cell::word(Kind::Word, S_X);
        assert_eq!(Some(1), pick(&pair, &x).unwrap().as_integer());
        assert_eq!(Some(2.5), pick(&pair, &Cell::integer(2)).unwrap().as_number());
        let moved = poke(&pair, &x, Cell::integer(7)).unwrap().unwrap();
        assert_eq!(Some(7), pick(&moved, &x).unwrap().as_integer());
    }

    #[test]
    fn array_pick_and_select() {
        let a = super::super::series::Array::from_cells(vec![
            Cell::word(Kind::Word, Sym::intern("k")),
            Cell::integer(10),
            Cell::integer(20),
        ]);
        let block = Cell::block(a.clone());
        assert_eq!(Some(20), pick(&block, &Cell::integer(3)).unwrap().as_integer());
        assert!(pick(&block, &Cell::integer(9)).unwrap().is_blank());
        let key = Cell::word(Kind::Word, Sym::intern("k"));
        assert_eq!(Some(10), pick(&block, &key).unwrap().as_integer());
        assert!(poke(&block, &Cell::integer(2), Cell::integer(5)).unwrap().is_none());
        assert_eq!(Some(5), a.get(1).unwrap().as_integer());
    }

    #[test]
    fn integers_have_no_selectors() {
        assert!(pick(&Cell::integer(1), &Cell::integer(1)).is_err());
    }
}
