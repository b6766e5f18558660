// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/eval.rs

// The evaluator loop. One step consumes one expression from a feed:
// words are looked up and functions invoked, set-words assign, groups
// evaluate in place, and everything else is its own value. After each
// step, enfix functions to the right may take the result as their
// left argument.

// <>

use super::binding::{derelativize, derive_specifier, get_var, set_var};
use super::cell::{Binding, Cell, CellFlags};
use super::context::Context;
use super::error::{fail, ErrId};
use super::frame::{Feed, Frame, FrameFlags};
use super::func::Func;
use super::kinds::Kind;
use super::series::Array;
use super::symtab::Sym;
use super::task::Task;
use super::throws::Flow;

/// Enfix function found at a word, with its label and binding
struct Enfix {
    func: Func,
    label: Option<Sym>,
    binding: Binding,
}

impl Task {
    /// Evaluate `array` from `index` to its end; the result of the
    /// last expression, or void if there was none
    pub fn do_array(
        &mut self,
        array: &Array,
        index: usize,
        specifier: Option<&Context>,
    ) -> Result<Cell, Flow> {
        let feed = Feed::new(array.clone(), index, specifier.cloned());
        let mut f = Frame::new(feed, FrameFlags::TO_END);
        f.out = Cell::void();
        self.enter_level()?;
        let result = self.run_to_end(&mut f);
        self.leave_level();
        result?;
        Ok(f.out.stored())
    }

    /// DO of a block or group value, honoring its binding
    pub fn do_value(&mut self, value: &Cell) -> Result<Cell, Flow> {
        match value.array_parts() {
            Some((array, index)) => {
                let specifier = derive_specifier(None, value);
                self.do_array(&array, index, specifier.as_ref())
            }
            None => Ok(value.clone()),
        }
    }

    fn run_to_end(&mut self, f: &mut Frame) -> Result<(), Flow> {
        while !f.feed.at_end() {
            self.eval_step(f)?;
        }
        Ok(())
    }

    /// Evaluate one expression from `feed`; `None` if the expression
    /// was invisible and the feed ended before anything was produced
    pub fn eval_next(&mut self, feed: &Feed, flags: FrameFlags) -> Result<Option<Cell>, Flow> {
        let mut sub = Frame::new(feed.clone(), flags);
        loop {
            if feed.at_end() {
                return Ok(None);
            }
            self.eval_step(&mut sub)?;
            if !sub.out.is_trash() {
                return Ok(Some(sub.out.stored()));
            }
        }
    }

    /// One evaluation step on `f`; leaves `f.out` alone when the step
    /// was invisible
    pub(crate) fn eval_step(&mut self, f: &mut Frame) -> Result<(), Flow> {
        let Some(current) = f.feed.fetch() else {
            return Ok(());
        };
        let specifier = f.feed.specifier();
        let spec = specifier.as_ref();

        if let Some(enfix) = self.quoting_enfix_next(&f.feed, spec) {
            f.feed.fetch();
            let left = derelativize(&current, spec).with_flag(CellFlags::UNEVALUATED);
            let out = self.call(&f.feed, &enfix.func, &enfix.binding, enfix.label, &[], Some(left))?;
            f.out = out.unwrap_or_else(Cell::void);
            return self.lookahead(f);
        }

        self.eval_current(f, current, spec)?;
        self.lookahead(f)
    }

    /// Evaluate a value that has already been taken from the feed
    fn eval_current(
        &mut self,
        f: &mut Frame,
        current: Cell,
        spec: Option<&Context>,
    ) -> Result<(), Flow> {
        match current.kind() {
            Kind::Word => {
                let value = get_var(&current, spec)?;
                if value.is_function() {
                    if value.is_enfixed() {
                        return Err(fail(ErrId::NoLeftArg, &[current.with_kind(Kind::Word)]));
                    }
                    let func = value.as_func().ok_or_else(|| not_function(&value))?;
                    let out = self.call(
                        &f.feed,
                        &func,
                        value.binding(),
                        current.word_sym(),
                        &[],
                        None,
                    )?;
                    if let Some(out) = out {
                        f.out = out;
                    }
                } else if value.is_void() {
                    return Err(fail(ErrId::NoValue, &[derelativize(&current, spec)]));
                } else {
                    f.out = value;
                }
            }

            Kind::SetWord => {
                let value = self.eval_rhs(f, &current)?;
                set_var(&current, spec, value.clone())?;
                f.out = value;
            }

            Kind::GetWord => f.out = get_var(&current, spec)?,

            Kind::LitWord => {
                f.out = derelativize(&current, spec);
                f.out.reset_header(Kind::Word);
            }

            Kind::Group => {
                let inner = derive_specifier(spec, &current);
                let (array, index) = current.array_parts().ok_or_else(|| not_array(&current))?;
                let feed = Feed::new(array, index, inner);
                let mut sub = Frame::new(feed, FrameFlags::TO_END);
                self.enter_level()?;
                let result = self.run_to_end(&mut sub);
                self.leave_level();
                result?;
                if !sub.out.is_trash() {
                    f.out = sub.out.stored();
                } else if f.flags.contains(FrameFlags::FULFILLING_ARG) {
                    f.out = Cell::void();
                }
            }

            Kind::Path => self.eval_path(f, &current, spec)?,

            Kind::GetPath => f.out = self.get_path(&current, spec)?,

            Kind::SetPath => {
                let value = self.eval_rhs(f, &current)?;
                self.set_path(&current, spec, value.clone())?;
                f.out = value;
            }

            Kind::LitPath => {
                f.out = derelativize(&current, spec);
                f.out.reset_header(Kind::Path);
            }

            Kind::Bar => f.out = Cell::void(),

            Kind::LitBar => f.out = Cell::bar(),

            Kind::Function => {
                let func = current.as_func().ok_or_else(|| not_function(&current))?;
                let out = self.call(&f.feed, &func, current.binding(), None, &[], None)?;
                if let Some(out) = out {
                    f.out = out;
                }
            }

            _ => {
                f.out = derelativize(&current, spec).with_flag(CellFlags::UNEVALUATED);
            }
        }
        Ok(())
    }

    /// Right-hand side of a set-word or set-path
    fn eval_rhs(&mut self, f: &Frame, setter: &Cell) -> Result<Cell, Flow> {
        let need = || fail(ErrId::NeedValue, &[setter.clone()]);
        match f.feed.peek() {
            None => return Err(need()),
            Some(next) if next.is_bar() => return Err(need()),
            _ => (),
        }
        match self.eval_next(&f.feed, FrameFlags::empty())? {
            Some(value) if !value.is_void() => Ok(value),
            _ => Err(need()),
        }
    }

    /// Enfix function after the current value that quotes its left
    fn quoting_enfix_next(&self, feed: &Feed, spec: Option<&Context>) -> Option<Enfix> {
        let next = feed.peek()?;
        let enfix = enfix_at(&next, spec)?;
        enfix.func.quotes_first().then_some(enfix)
    }

    /// Offer `f.out` to enfix functions to the right
    fn lookahead(&mut self, f: &mut Frame) -> Result<(), Flow> {
        loop {
            if f.flags.contains(FrameFlags::NO_LOOKAHEAD) || f.out.is_trash() {
                return Ok(());
            }
            let Some(next) = f.feed.peek() else {
                return Ok(());
            };
            let spec = f.feed.specifier();
            let Some(enfix) = enfix_at(&next, spec.as_ref()) else {
                return Ok(());
            };

            let index = f.feed.index();
            if enfix.func.defers_lookback()
                && f.flags.contains(FrameFlags::FULFILLING_ARG)
                && f.feed.deferred() != Some(index)
            {
                f.feed.set_deferred(Some(index));
                return Ok(());
            }
            f.feed.set_deferred(None);
            f.feed.fetch();

            let left = std::mem::take(&mut f.out).stored();
            let out = self.call(&f.feed, &enfix.func, &enfix.binding, enfix.label, &[], Some(left))?;
            f.out = out.unwrap_or_else(Cell::void);
        }
    }

    /// Evaluate `cell` as if it were found in `feed`, for dispatchers
    /// that ask for reevaluation
    pub(crate) fn reevaluate(
        &mut self,
        feed: &Feed,
        cell: Cell,
        only: bool,
    ) -> Result<Option<Cell>, Flow> {
        let flags = if only {
            FrameFlags::NO_LOOKAHEAD
        } else {
            FrameFlags::empty()
        };
        let mut sub = Frame::new(feed.clone(), flags);
        let spec = feed.specifier();
        self.eval_current(&mut sub, cell, spec.as_ref())?;
        self.lookahead(&mut sub)?;
        Ok((!sub.out.is_trash()).then(|| sub.out.stored()))
    }
}

/// Enfixed function a word looks up to, if any
fn enfix_at(cell: &Cell, spec: Option<&Context>) -> Option<Enfix> {
    if cell.kind() != Kind::Word {
        return None;
    }
    let value = get_var(cell, spec).ok()?;
    if !value.is_enfixed() {
        return None;
    }
    Some(Enfix {
        func: value.as_func()?,
        label: cell.word_sym(),
        binding: value.binding().clone(),
    })
}

/// Is the next cell a word bound to an enfix function
pub(crate) fn is_enfix_word(cell: &Cell, spec: Option<&Context>) -> bool {
    enfix_at(cell, spec).is_some()
}

fn not_function(cell: &Cell) -> Flow {
    fail(ErrId::Misc, &[Cell::string("function cell without a function"), cell.clone()])
}

fn not_array(cell: &Cell) -> Flow {
    fail(ErrId::Misc, &[Cell::string("array cell without an array"), cell.clone()])
}
