// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/varargs.rs

// VARARGS! values and DELECT.
//
// A varargs reads either from a block (its feed is a one-cell array
// holding the block at its current position) or from the feed of the
// call that created it (its feed is that call's varlist). Copies share
// the feed, so taking through one advances them all.

// <>

use super::binding::{derelativize, derive_specifier, get_var};
use super::call::check_arg;
use super::cell::{Cell, CellFlags, Payload};
use super::context::Context;
use super::error::{fail, ErrId};
use super::eval::is_enfix_word;
use super::frame::{Feed, FrameFlags};
use super::kinds::{Kind, TypeBits};
use super::paramlist::ParamClass;
use super::series::{Array, SeriesFlags};
use super::symtab::Sym;
use super::task::Task;
use super::throws::Flow;

/// Resolved view of a varargs cell
struct Varargs {
    feed: Feed,
    /// block-style varargs write their position back here
    holder: Option<(Array, Cell)>,
    param: Option<Cell>,
    label: Cell,
}

impl Varargs {
    fn class(&self) -> ParamClass {
        self.param
            .as_ref()
            .and_then(|p| p.param_class())
            .unwrap_or(ParamClass::HardQuote)
    }

    fn sync(&self) {
        if let Some((holder, block)) = &self.holder {
            holder.set_unchecked(0, block.with_index(self.feed.index()));
        }
    }

    /// Is the feed at an end for this parameter class
    fn at_end(&self) -> bool {
        let Some(next) = self.feed.peek() else {
            return true;
        };
        if self.class() == ParamClass::HardQuote {
            return false;
        }
        if next.is_bar() {
            return true;
        }
        let spec = self.feed.specifier();
        self.holder.is_none() && is_enfix_word(&next, spec.as_ref())
    }
}

fn bad(what: &str) -> Flow {
    fail(ErrId::BadVarargs, &[Cell::string(what)])
}

fn open(v: &Cell) -> Result<Varargs, Flow> {
    let Payload::Varargs {
        facade,
        param_offset,
        feed,
    } = v.payload()
    else {
        return Err(fail(ErrId::InvalidArg, &[v.clone()]));
    };
    let param = facade.as_ref().and_then(|f| f.get(*param_offset));

    if feed.has_flag(SeriesFlags::VARLIST) || feed.has_flag(SeriesFlags::INACCESSIBLE) {
        let ctx = Context::from_varlist(feed.clone());
        if !ctx.is_accessible() {
            return Err(fail(ErrId::ExpiredFrame, &[]));
        }
        let meta = ctx.frame_meta().ok_or_else(|| fail(ErrId::ExpiredFrame, &[]))?;
        let label = meta
            .label
            .map_or_else(Cell::blank, |s| Cell::word(Kind::Word, s));
        return Ok(Varargs {
            feed: meta.feed.unwrap_or_else(Feed::empty),
            holder: None,
            param,
            label,
        });
    }

    let block = feed.get(0).unwrap_or_else(|| Cell::block(Array::empty()));
    let (array, index) = block
        .array_parts()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[v.clone()]))?;
    let specifier = derive_specifier(None, &block);
    Ok(Varargs {
        feed: Feed::new(array, index, specifier),
        holder: Some((feed.clone(), block)),
        param,
        label: Cell::word(Kind::Word, Sym::intern("varargs")),
    })
}

/// MAKE VARARGS! from a block
pub fn make_varargs(block: &Cell) -> Result<Cell, Flow> {
    if !block.any_array() {
        return Err(fail(ErrId::BadMake, &[Cell::datatype(Kind::Varargs), block.clone()]));
    }
    let holder = Array::singular(block.with_kind(Kind::Block), SeriesFlags::empty());
    Ok(Cell::varargs(None, 0, holder))
}

/// Does the varargs have nothing more to give
pub fn varargs_tail(v: &Cell) -> Result<bool, Flow> {
    Ok(open(v)?.at_end())
}

/// Next value without consuming it; only for quoting parameters
pub fn varargs_first(v: &Cell) -> Result<Option<Cell>, Flow> {
    let va = open(v)?;
    if !matches!(va.class(), ParamClass::HardQuote | ParamClass::SoftQuote) {
        return Err(bad("first on an evaluating parameter"));
    }
    if va.at_end() {
        return Ok(None);
    }
    let spec = va.feed.specifier();
    Ok(va.feed.peek().map(|c| derelativize(&c, spec.as_ref())))
}

impl Task {
    /// Take the next argument, evaluating or quoting as the
    /// parameter class says; `None` at the end
    pub fn varargs_take(&mut self, v: &Cell) -> Result<Option<Cell>, Flow> {
        let va = open(v)?;
        if va.at_end() {
            return Ok(None);
        }
        let spec = va.feed.specifier();
        let value = match va.class() {
            ParamClass::HardQuote => va
                .feed
                .fetch()
                .map(|c| derelativize(&c, spec.as_ref()).with_flag(CellFlags::UNEVALUATED)),
            ParamClass::SoftQuote => match va.feed.peek() {
                Some(next) if matches!(next.kind(), Kind::Group | Kind::GetWord | Kind::GetPath) => {
                    self.eval_next(&va.feed, FrameFlags::FULFILLING_ARG | FrameFlags::NO_LOOKAHEAD)?
                }
                _ => va
                    .feed
                    .fetch()
                    .map(|c| derelativize(&c, spec.as_ref()).with_flag(CellFlags::UNEVALUATED)),
            },
            class => {
                let mut flags = FrameFlags::FULFILLING_ARG;
                if class == ParamClass::Tight {
                    flags |= FrameFlags::NO_LOOKAHEAD;
                }
                self.eval_next(&va.feed, flags)?
            }
        };
        va.sync();
        if let (Some(value), Some(param)) = (&value, &va.param) {
            check_arg(&va.label, param, value)?;
        }
        Ok(value)
    }
}

/// Fill `output` from a dialect command at `input`
///
/// The word at `input` names a block of types in `dialect`. The
/// values after it are matched, in any order, to the first unfilled
/// slot whose types accept them; words are looked up when their own
/// kind does not fit. Output gets the command word and one value
/// per slot, blank where nothing matched. The result is `input`
/// advanced past what was used, or blank at its tail.
pub fn delect(dialect: &Context, input: &Cell, output: &Array) -> Result<Cell, Flow> {
    let (array, index) = input
        .array_parts()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[input.clone()]))?;
    let spec = derive_specifier(None, input);
    let Some(command) = array.get(index) else {
        return Ok(Cell::blank());
    };
    let command = derelativize(&command, spec.as_ref());
    let sym = command
        .word_sym()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[command.clone()]))?;
    let slot = dialect
        .find(sym)
        .ok_or_else(|| fail(ErrId::NotInContext, &[command.clone()]))?;
    let types = dialect.var(slot)?;
    let (types, types_index) = types
        .array_parts()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[types.clone()]))?;

    let mut slots = Vec::new();
    for item in types.slice(types_index) {
        let bits = match item.payload() {
            Payload::Datatype(k) => TypeBits::of(&[*k]),
            Payload::Typeset { bits, .. } => *bits,
            _ if item.kind() == Kind::Word => {
                let value = get_var(&item, None)?;
                match value.payload() {
                    Payload::Datatype(k) => TypeBits::of(&[*k]),
                    Payload::Typeset { bits, .. } => *bits,
                    _ => return Err(fail(ErrId::InvalidArg, &[item.clone()])),
                }
            }
            _ => return Err(fail(ErrId::InvalidArg, &[item.clone()])),
        };
        slots.push((bits, None::<Cell>));
    }

    let mut at = index + 1;
    while let Some(cell) = array.get(at) {
        let mut value = derelativize(&cell, spec.as_ref());
        let fits = |slots: &[(TypeBits, Option<Cell>)], v: &Cell| {
            slots.iter().position(|(bits, filled)| filled.is_none() && bits.contains(v.kind()))
        };
        let mut found = fits(&slots, &value);
        if found.is_none() && value.kind() == Kind::Word {
            if let Ok(looked) = get_var(&value, None) {
                if let Some(k) = fits(&slots, &looked) {
                    value = looked;
                    found = Some(k);
                }
            }
        }
        let Some(k) = found else { break };
        slots[k].1 = Some(value);
        at += 1;
    }

    let mut cells = vec![command.with_kind(Kind::Word)];
    cells.extend(slots.into_iter().map(|(_, v)| v.unwrap_or_else(Cell::blank)));
    let len = output.len();
    output.remove_range(0, len)?;
    output.insert_all(0, cells)?;
    Ok(if at >= array.len() {
        Cell::blank()
    } else {
        input.with_index(at)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::scan::scan_source;

    fn block(code: &str) -> Cell {
        Cell::block(scan_source(code, None).unwrap())
    }

    #[test]
    fn block_varargs_share_their_feed() {
        let mut task = Task::bare();
        let v1 = make_varargs(&block("1 2 3")).unwrap();
        let v2 = v1.clone();
        assert_eq!(Some(1), task.varargs_take(&v1).unwrap().and_then(|c| c.as_integer()));
        assert_eq!(Some(2), task.varargs_take(&v2).unwrap().and_then(|c| c.as_integer()));
        assert!(!varargs_tail(&v1).unwrap());
        assert_eq!(Some(3), varargs_first(&v1).unwrap().and_then(|c| c.as_integer()));
        assert_eq!(Some(3), task.varargs_take(&v1).unwrap().and_then(|c| c.as_integer()));
        assert!(varargs_tail(&v2).unwrap());
        assert!(task.varargs_take(&v2).unwrap().is_none());
    }

    #[test]
    fn expired_frame_varargs_fail() {
        let ctx = Context::new(Kind::Frame);
        ctx.varlist().set_flags(SeriesFlags::STACK);
        ctx.expire();
        let v = Cell::varargs(None, 1, ctx.varlist().clone());
        assert!(matches!(varargs_tail(&v), Err(Flow::Error(_))));
    }
}
