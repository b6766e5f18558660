// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/func.rs

// FUNCTION! values. A function is identified by its paramlist; its
// behavior lives in a singular body holder whose misc slot is the
// dispatcher and whose link is the optional exemplar of specialized
// arguments. The facade, reachable from the paramlist, is the
// parameter layout a call's frame is built from.

// <>

use bitflags::bitflags;

use super::binding::{copy_and_bind_relative_deep, derive_specifier};
use super::cell::{Binding, Cell, Payload};
use super::context::Context;
use super::error::{fail, ErrId};
use super::frame::{Frame, R};
use super::kinds::{Kind, TypeBits};
use super::memmgt;
use super::paramlist::{make_paramlist, MakeFlags, ParamClass};
use super::series::{Array, Link, Misc, SeriesFlags};
use super::task::Task;
use super::throws::Flow;

/// Native code behind a function
pub type Dispatcher = fn(&mut Task, &mut Frame) -> Result<R, Flow>;

bitflags! {
    /// Flags cached in a paramlist's archetype
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FuncFlags: u16 {
        /// has a definitional RETURN slot
        const RETURN = 1 << 0;
        /// has a definitional LEAVE slot
        const LEAVE = 1 << 1;
        /// as enfix, a normal first argument defers to a level above
        /// that is fulfilling an argument
        const DEFERS_LOOKBACK = 1 << 2;
        /// as enfix, the first argument quotes the value on its left
        const QUOTES_FIRST = 1 << 3;
        const NATIVE = 1 << 4;
        const ACTION = 1 << 5;
        const INTERPRETED = 1 << 6;
    }
}

/// Payload of a paramlist's head cell
#[derive(Clone, Default)]
pub struct Archetype {
    pub flags: FuncFlags,
    /// innermost function whose frame layout this one shares
    pub underlying: Option<Func>,
}

#[derive(Clone)]
pub struct Func {
    paramlist: Array,
    body_holder: Array,
}

fn unset_dispatcher(_task: &mut Task, _f: &mut Frame) -> Result<R, Flow> {
    Ok(R::Unhandled)
}

impl Func {
    pub fn paramlist(&self) -> &Array {
        &self.paramlist
    }

    pub fn body_holder(&self) -> &Array {
        &self.body_holder
    }

    fn archetype(&self) -> Archetype {
        match self.paramlist.get(0).map(|c| c.payload) {
            Some(Payload::Archetype(arch)) => arch,
            _ => Archetype::default(),
        }
    }

    fn set_archetype(&self, arch: Archetype) {
        self.paramlist.set_unchecked(0, Cell::archetype(arch));
    }

    pub fn flags(&self) -> FuncFlags {
        self.archetype().flags
    }

    pub fn set_flags(&self, flags: FuncFlags) {
        let mut arch = self.archetype();
        arch.flags |= flags;
        self.set_archetype(arch);
    }

    pub fn defers_lookback(&self) -> bool {
        self.flags().contains(FuncFlags::DEFERS_LOOKBACK)
    }

    pub fn quotes_first(&self) -> bool {
        self.flags().contains(FuncFlags::QUOTES_FIRST)
    }

    /// Parameter layout of this function's frames
    pub fn facade(&self) -> Array {
        match self.paramlist.misc() {
            Misc::Facade(facade) => facade,
            _ => self.paramlist.clone(),
        }
    }

    pub fn set_facade(&self, facade: Array) {
        self.paramlist.set_misc(Misc::Facade(facade))
    }

    pub fn underlying(&self) -> Func {
        self.archetype().underlying.unwrap_or_else(|| self.clone())
    }

    pub fn exemplar(&self) -> Option<Context> {
        match self.body_holder.link() {
            Link::Exemplar(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn set_exemplar(&self, exemplar: Option<Context>) {
        self.body_holder.set_link(match exemplar {
            Some(ctx) => Link::Exemplar(ctx),
            None => Link::None,
        })
    }

    pub fn dispatcher(&self) -> Dispatcher {
        match self.body_holder.misc() {
            Misc::Dispatcher(d) => d,
            _ => unset_dispatcher,
        }
    }

    pub fn set_dispatcher(&self, dispatcher: Dispatcher) {
        self.body_holder.set_misc(Misc::Dispatcher(dispatcher))
    }

    pub fn body(&self) -> Cell {
        self.body_holder.get(0).unwrap_or_else(Cell::blank)
    }

    pub fn set_body(&self, body: Cell) {
        self.body_holder.set_unchecked(0, body)
    }

    pub fn meta(&self) -> Option<Context> {
        match self.paramlist.link() {
            Link::Meta(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn set_meta(&self, meta: Option<Context>) {
        self.paramlist.set_link(match meta {
            Some(ctx) => Link::Meta(ctx),
            None => Link::None,
        })
    }

    /// Identity comparison
    pub fn same(&self, other: &Func) -> bool {
        self.paramlist.same(&other.paramlist)
    }

    pub fn to_cell(&self) -> Cell {
        Cell::function(self.clone())
    }

    /// Public parameters, without the archetype
    pub fn params(&self) -> Vec<Cell> {
        self.paramlist.slice(1)
    }

    /// Typeset a RETURN from this function is checked against
    pub fn return_types(&self) -> Option<TypeBits> {
        self.facade()
            .slice(1)
            .iter()
            .find(|p| p.param_class() == Some(ParamClass::Return))
            .and_then(|p| p.typeset_bits())
    }
}

/// Create a function from a finished paramlist
///
/// When `built_on` is given, the new function shares its facade and
/// underlying function, and inherits its exemplar unless one is
/// supplied.
pub fn make_function(
    paramlist: Array,
    dispatcher: Dispatcher,
    built_on: Option<&Func>,
    exemplar: Option<Context>,
) -> Result<Func, Flow> {
    let mut arch = match paramlist.get(0).map(|c| c.payload) {
        Some(Payload::Archetype(arch)) => arch,
        _ => {
            return Err(fail(
                ErrId::Misc,
                &[Cell::string("paramlist without archetype")],
            ))
        }
    };

    let exemplar = match built_on {
        Some(base) => {
            let facade = base.facade();
            if !facade.same(&paramlist) {
                paramlist.set_misc(Misc::Facade(facade));
            }
            arch.underlying = Some(base.underlying());
            exemplar.or_else(|| base.exemplar())
        }
        None => exemplar,
    };

    arch.flags -= FuncFlags::DEFERS_LOOKBACK | FuncFlags::QUOTES_FIRST;
    for param in paramlist.slice(1) {
        match param.param_class() {
            Some(ParamClass::Normal) => {
                arch.flags |= FuncFlags::DEFERS_LOOKBACK;
                break;
            }
            Some(ParamClass::HardQuote) | Some(ParamClass::SoftQuote) => {
                arch.flags |= FuncFlags::QUOTES_FIRST;
                break;
            }
            Some(ParamClass::Tight) => break,
            _ => continue,
        }
    }
    paramlist.set_unchecked(0, Cell::archetype(arch));
    paramlist.set_flags(SeriesFlags::PARAMLIST | SeriesFlags::FIXED_SIZE);

    let body_holder = Array::singular(Cell::blank(), SeriesFlags::empty());
    body_holder.set_misc(Misc::Dispatcher(dispatcher));
    if let Some(ctx) = exemplar {
        body_holder.set_link(Link::Exemplar(ctx));
    }

    memmgt::manage(&paramlist);
    memmgt::manage(&body_holder);
    Ok(Func {
        paramlist,
        body_holder,
    })
}

/// Fresh paramlist with the same parameters as `func`, for
/// compositions that present the same interface
pub fn copy_paramlist(func: &Func) -> Array {
    let params = func.paramlist().to_vec();
    let mut cells = Vec::with_capacity(params.len());
    cells.push(Cell::archetype(Archetype {
        flags: func.flags() & (FuncFlags::RETURN | FuncFlags::LEAVE),
        underlying: None,
    }));
    cells.extend(params.into_iter().skip(1));
    let copy = Array::from_vec(cells, SeriesFlags::ARRAY | SeriesFlags::PARAMLIST);
    if let Some(meta) = func.meta() {
        copy.set_link(Link::Meta(meta));
    }
    copy
}

/// Runs the body of the phase in the frame's varlist
fn run_body(task: &mut Task, f: &mut Frame) -> Result<Cell, Flow> {
    let body = f.phase()?.body();
    let Some((array, index)) = body.array_parts() else {
        return Err(fail(ErrId::Misc, &[Cell::string("function body is not a block")]));
    };
    let ctx = f.ctx()?.clone();
    task.do_array(&array, index, Some(&ctx))
}

/// Body is empty
pub fn noop_dispatcher(_task: &mut Task, _f: &mut Frame) -> Result<R, Flow> {
    Ok(R::Void)
}

/// Result unchecked
pub fn unchecked_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    f.out = run_body(task, f)?;
    Ok(R::Out)
}

/// Procedure: result discarded
pub fn voider_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    run_body(task, f)?;
    Ok(R::Void)
}

/// Result checked against the return typeset
pub fn returner_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let out = run_body(task, f)?;
    let phase = f.phase()?;
    if let Some(bits) = phase.return_types() {
        if !bits.contains(out.kind()) {
            return Err(fail(
                ErrId::BadReturnType,
                &[f.label_cell(), Cell::datatype(out.kind())],
            ));
        }
    }
    f.out = out;
    Ok(R::Out)
}

/// FUNC and PROC: build an interpreted function from spec and body
///
/// Parameter words in the body are made relative to the new function;
/// the body is copied, and frozen when the task is configured to.
pub fn make_interpreted(
    task: &mut Task,
    spec: &Cell,
    body: &Cell,
    specifier: Option<&Context>,
    flags: MakeFlags,
) -> Result<Func, Flow> {
    let (Some((spec_array, spec_index)), Some((body_array, body_index))) =
        (spec.array_parts(), body.array_parts())
    else {
        return Err(fail(ErrId::BadFuncDef, &[spec.clone()]));
    };
    let spec_specifier = derive_specifier(specifier, spec);
    let paramlist = make_paramlist(
        task,
        &spec_array,
        spec_index,
        spec_specifier.as_ref(),
        flags,
    )?;

    let has_leave = paramlist
        .slice(1)
        .iter()
        .any(|p| p.param_class() == Some(ParamClass::Leave));
    let restricted = paramlist
        .slice(1)
        .iter()
        .find(|p| p.param_class() == Some(ParamClass::Return))
        .and_then(|p| p.typeset_bits())
        .map_or(false, |bits| bits != TypeBits::any_value().with(Kind::Void));

    let dispatcher: Dispatcher = if body_index >= body_array.len() {
        noop_dispatcher
    } else if has_leave {
        voider_dispatcher
    } else if restricted {
        returner_dispatcher
    } else {
        unchecked_dispatcher
    };

    let func = make_function(paramlist, dispatcher, None, None)?;
    func.set_flags(FuncFlags::INTERPRETED);

    let body_specifier = derive_specifier(specifier, body);
    let copy = copy_and_bind_relative_deep(
        &body_array,
        body_index,
        func.paramlist(),
        body_specifier.as_ref(),
    );
    if task.config.freeze_bodies {
        copy.freeze_deep();
    }
    func.set_body(Cell::block(copy).with_binding(Binding::Relative(func.paramlist().clone())));

    if cfg!(feature = "stkdbg") {
        log::trace!("made function with {} params", func.params().len());
    }
    Ok(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::scan::scan_source;

    fn block(text: &str) -> Cell {
        Cell::block(scan_source(text, None).unwrap())
    }

    #[test]
    fn lookback_flags_from_first_arg() {
        let mut task = Task::bare();
        let normal = make_interpreted(&mut task, &block("/r a"), &block(""), None, MakeFlags::empty())
            .unwrap();
        assert!(normal.defers_lookback());
        let tight = make_interpreted(&mut task, &block("#a b"), &block(""), None, MakeFlags::empty())
            .unwrap();
        assert!(!tight.defers_lookback());
        assert!(!tight.quotes_first());
        let quoting = make_interpreted(&mut task, &block(":a"), &block(""), None, MakeFlags::empty())
            .unwrap();
        assert!(quoting.quotes_first());
    }

    #[test]
    fn dispatcher_choice() {
        let mut task = Task::bare();
        let empty = make_interpreted(&mut task, &block(""), &block(""), None, MakeFlags::RETURN)
            .unwrap();
        assert!(empty.dispatcher() as usize == noop_dispatcher as usize);
        let proc = make_interpreted(&mut task, &block(""), &block("1"), None, MakeFlags::LEAVE)
            .unwrap();
        assert!(proc.dispatcher() as usize == voider_dispatcher as usize);
        let typed = make_interpreted(
            &mut task,
            &block("return: [integer!]"),
            &block("1"),
            None,
            MakeFlags::RETURN,
        )
        .unwrap();
        assert!(typed.dispatcher() as usize == returner_dispatcher as usize);
    }

    #[test]
    fn built_on_shares_facade_and_underlying() {
        let mut task = Task::bare();
        let base = make_interpreted(&mut task, &block("a b"), &block("a"), None, MakeFlags::RETURN)
            .unwrap();
        let derived =
            make_function(copy_paramlist(&base), unchecked_dispatcher, Some(&base), None).unwrap();
        assert!(!derived.same(&base));
        assert!(derived.facade().same(base.paramlist()));
        assert!(derived.underlying().same(&base));
        assert!(derived.body_holder().is_singular());
    }
}
