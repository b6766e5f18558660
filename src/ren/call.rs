// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/call.rs

// Function invocation: building the frame, fulfilling arguments from
// the feed (or from prebuilt values), running the dispatch loop, and
// catching the definitional throws aimed at the frame.

// <>

use super::binding::derelativize;
use super::cell::{Binding, Cell, CellFlags};
use super::context::Context;
use super::error::{fail, ErrId};
use super::eval::is_enfix_word;
use super::frame::{Feed, Frame, FrameFlags, FrameMeta, R};
use super::func::Func;
use super::kinds::Kind;
use super::paramlist::ParamClass;
use super::series::{Array, SeriesFlags};
use super::symtab::*;
use super::task::{CallRecord, Special, Task};
use super::throws::{Flow, Resume, ResumeMode, Thrown};

/// Calls named in an error's `where` field
const WHERE_LIMIT: usize = 8;

/// Where a call's arguments come from
enum Source<'a> {
    /// gathered from the caller's feed, with path refinements and an
    /// optional enfix left value
    Feed {
        refinements: &'a [Sym],
        left: Option<Cell>,
    },
    /// the function's arguments in order, already evaluated
    Values(Vec<Cell>),
    /// a prebuilt frame whose slots are copied
    Frame(Context),
}

/// Refinement whose arguments are gathered after the ordinary ones
struct Pending {
    sym: Option<Sym>,
    specialized: bool,
    args: Vec<usize>,
}

#[derive(Clone, Copy)]
enum Gate {
    /// before any refinement
    Open,
    /// args belong to the pending refinement at this position
    Active(usize),
    /// args belong to an unused refinement
    Inactive,
}

/// Outcome of a throw reaching a frame's dispatch loop
enum Caught {
    Value(Cell),
    Redo,
}

fn no_arg(label: &Cell, param: &Cell) -> Flow {
    let name = param
        .param_sym()
        .map_or_else(Cell::blank, |s| Cell::word(Kind::Word, s));
    fail(ErrId::NoArg, &[label.clone(), name])
}

fn param_word(param: &Cell) -> Cell {
    param
        .param_sym()
        .map_or_else(Cell::blank, |s| Cell::word(Kind::Word, s))
}

impl Task {
    /// Invoke `func` with arguments taken from `feed`
    pub(crate) fn call(
        &mut self,
        feed: &Feed,
        func: &Func,
        binding: &Binding,
        label: Option<Sym>,
        refinements: &[Sym],
        left: Option<Cell>,
    ) -> Result<Option<Cell>, Flow> {
        self.invoke(feed, func, binding, label, Source::Feed { refinements, left })
    }

    /// Invoke `func` with already-evaluated arguments, in order
    pub fn apply_values(
        &mut self,
        func: &Func,
        binding: &Binding,
        label: Option<Sym>,
        values: Vec<Cell>,
    ) -> Result<Option<Cell>, Flow> {
        self.invoke(&Feed::empty(), func, binding, label, Source::Values(values))
    }

    /// Run a FRAME! value: a fresh call is made from a copy of its
    /// slots, so the same frame can be run more than once
    pub fn run_frame(&mut self, frame: &Cell) -> Result<Option<Cell>, Flow> {
        let ctx = frame
            .as_context()
            .ok_or_else(|| fail(ErrId::InvalidArg, &[frame.clone()]))?;
        let meta = ctx.frame_meta();
        let phase = frame
            .frame_phase()
            .or_else(|| meta.as_ref().map(|m| m.phase.clone()))
            .ok_or_else(|| fail(ErrId::InvalidArg, &[frame.clone()]))?;
        let label = meta.as_ref().and_then(|m| m.label);
        let binding = meta.map(|m| m.binding).unwrap_or_default();
        self.invoke(&Feed::empty(), &phase, &binding, label, Source::Frame(ctx))
    }

    fn invoke(
        &mut self,
        feed: &Feed,
        func: &Func,
        binding: &Binding,
        label: Option<Sym>,
        source: Source<'_>,
    ) -> Result<Option<Cell>, Flow> {
        self.check_signals()?;

        let varlist = Context::from_keylist(Kind::Frame, &func.facade());
        varlist.varlist().set_flags(SeriesFlags::STACK);
        varlist.set_frame_meta(FrameMeta {
            phase: func.clone(),
            original: func.clone(),
            binding: binding.clone(),
            label,
            feed: Some(feed.clone()),
        });

        let flags = match source {
            Source::Feed { .. } => FrameFlags::empty(),
            _ => FrameFlags::APPLYING,
        };
        let mut f = Frame::new(feed.clone(), flags);
        f.varlist = Some(varlist.clone());
        f.label = label;
        f.ds_base = self.ds.len();

        self.push_call(CallRecord {
            varlist: varlist.clone(),
            original: func.clone(),
            label,
            feed: feed.clone(),
        })?;

        let result = match source {
            Source::Feed { refinements, left } => self.fulfill(&mut f, func, refinements, left),
            Source::Values(values) => self.fill_from_values(&f, func, values),
            Source::Frame(ctx) => self.fill_from_frame(&f, func, &ctx),
        };
        let result = result.and_then(|()| self.dispatch(&mut f));

        let result = match result {
            Err(Flow::Error(err)) if !err.has_location() => {
                self.locate_error(&err, feed);
                Err(Flow::Error(err))
            }
            other => other,
        };

        self.ds.truncate(f.ds_base);
        self.pop_call();
        varlist.expire();
        result
    }

    /// Record where an error happened, from the innermost call
    fn locate_error(&self, err: &super::error::Error, feed: &Feed) {
        let near = feed.near();
        if !near.is_empty() {
            err.set_field(S_NEAR, Cell::block(near));
        }
        err.set_field(S_WHERE, Cell::block(Array::from_cells(self.backtrace(WHERE_LIMIT))));
        if let Some((file, line)) = feed.array().file_line() {
            err.set_field(S_FILE, Cell::string_of(Kind::File, &file.name()));
            err.set_field(S_LINE, Cell::integer(line as i64));
        }
    }

    /// Value for a slot that is not a caller-supplied argument
    fn special_slot(&self, class: ParamClass, varlist: &Context) -> Result<Option<Cell>, Flow> {
        let which = match class {
            ParamClass::Return => Special::Return,
            ParamClass::Leave => Special::Leave,
            ParamClass::Local => return Ok(Some(Cell::void())),
            _ => return Ok(None),
        };
        let native = self.specials.cell(which)?;
        Ok(Some(native.with_binding(Binding::Specific(varlist.clone()))))
    }

    fn fulfill(
        &mut self,
        f: &mut Frame,
        func: &Func,
        refinements: &[Sym],
        left: Option<Cell>,
    ) -> Result<(), Flow> {
        let varlist = f.ctx()?.clone();
        let facade = func.facade();
        let exemplar = func.exemplar();
        let label = f.label_cell();
        let mut left = left;
        let mut gate = Gate::Open;
        let mut pending: Vec<Pending> = Vec::new();
        let mut found = vec![false; refinements.len()];

        for (offset, param) in facade.slice(1).into_iter().enumerate() {
            let i = offset + 1;
            let class = param.param_class().unwrap_or(ParamClass::Local);
            if let Some(value) = self.special_slot(class, &varlist)? {
                varlist.init_var(i, value);
                continue;
            }
            let specialized = exemplar
                .as_ref()
                .and_then(|e| e.var(i).ok())
                .filter(|v| !v.is_void());

            if class == ParamClass::Refinement {
                let sym = param.param_sym();
                if let Some(value) = specialized {
                    let on = value.is_truthy();
                    varlist.init_var(i, Cell::logic(on));
                    gate = if on {
                        pending.push(Pending {
                            sym,
                            specialized: true,
                            args: Vec::new(),
                        });
                        Gate::Active(pending.len() - 1)
                    } else {
                        Gate::Inactive
                    };
                    continue;
                }
                let position = sym.and_then(|s| refinements.iter().position(|r| r.same_canon(s)));
                match position {
                    Some(pos) => {
                        found[pos] = true;
                        varlist.init_var(i, Cell::logic(true));
                        pending.push(Pending {
                            sym,
                            specialized: false,
                            args: Vec::new(),
                        });
                        gate = Gate::Active(pending.len() - 1);
                    }
                    None => {
                        varlist.init_var(i, Cell::logic(false));
                        gate = Gate::Inactive;
                    }
                }
                continue;
            }

            if let Some(value) = specialized {
                varlist.init_var(i, value);
                continue;
            }
            match gate {
                Gate::Open => {
                    let value = match left.take() {
                        Some(value) => value,
                        None => self.fulfill_arg(f, &varlist, &facade, i, &param)?,
                    };
                    check_arg(&label, &param, &value)?;
                    varlist.init_var(i, value);
                }
                Gate::Active(k) => pending[k].args.push(i),
                Gate::Inactive => (),
            }
        }

        if left.is_some() {
            return Err(fail(ErrId::NoLeftArg, &[label]));
        }
        if let Some(pos) = found.iter().position(|hit| !hit) {
            return Err(fail(
                ErrId::BadRefine,
                &[Cell::word(Kind::Refinement, refinements[pos])],
            ));
        }

        // Partially specialized refinements take their arguments
        // first, then path refinements in the order the path gave them
        let mut order: Vec<usize> = (0..pending.len()).filter(|&k| pending[k].specialized).collect();
        for sym in refinements {
            if let Some(k) = pending
                .iter()
                .position(|p| !p.specialized && p.sym.map_or(false, |s| s.same_canon(*sym)))
            {
                order.push(k);
            }
        }
        for k in order {
            for &i in &pending[k].args {
                let Some(param) = facade.get(i) else { continue };
                let value = self.fulfill_arg(f, &varlist, &facade, i, &param)?;
                check_arg(&label, &param, &value)?;
                varlist.init_var(i, value);
            }
        }
        Ok(())
    }

    /// Gather one argument for `param` from the frame's feed
    fn fulfill_arg(
        &mut self,
        f: &Frame,
        varlist: &Context,
        facade: &Array,
        index: usize,
        param: &Cell,
    ) -> Result<Cell, Flow> {
        if param.get_flag(CellFlags::VARIADIC) {
            return Ok(Cell::varargs(
                Some(facade.clone()),
                index,
                varlist.varlist().clone(),
            ));
        }

        let label = f.label_cell();
        let endable = param.get_flag(CellFlags::ENDABLE);
        let feed = &f.feed;
        let spec = feed.specifier();
        let ended = || {
            if endable {
                Ok(Cell::void())
            } else {
                Err(no_arg(&label, param))
            }
        };

        let Some(next) = feed.peek() else {
            return ended();
        };

        match param.param_class() {
            Some(ParamClass::HardQuote) => {
                feed.fetch();
                Ok(derelativize(&next, spec.as_ref()).with_flag(CellFlags::UNEVALUATED))
            }

            Some(ParamClass::SoftQuote) => {
                if next.is_bar() {
                    return ended();
                }
                match next.kind() {
                    Kind::Group | Kind::GetWord | Kind::GetPath => {
                        let flags = FrameFlags::FULFILLING_ARG | FrameFlags::NO_LOOKAHEAD;
                        match self.eval_next(feed, flags)? {
                            Some(value) => Ok(value),
                            None => ended(),
                        }
                    }
                    _ => {
                        feed.fetch();
                        Ok(derelativize(&next, spec.as_ref()).with_flag(CellFlags::UNEVALUATED))
                    }
                }
            }

            Some(class) => {
                if next.is_bar() {
                    return if endable {
                        Ok(Cell::void())
                    } else {
                        Err(fail(ErrId::ExpressionBarrier, &[label.clone()]))
                    };
                }
                if is_enfix_word(&next, spec.as_ref()) {
                    return ended();
                }
                let mut flags = FrameFlags::FULFILLING_ARG;
                if class == ParamClass::Tight {
                    flags |= FrameFlags::NO_LOOKAHEAD;
                }
                match self.eval_next(feed, flags)? {
                    Some(value) => Ok(value),
                    None => ended(),
                }
            }

            None => Ok(Cell::void()),
        }
    }

    /// Fill a frame from values given in parameter order
    fn fill_from_values(&mut self, f: &Frame, func: &Func, values: Vec<Cell>) -> Result<(), Flow> {
        let varlist = f.ctx()?.clone();
        let facade = func.facade();
        let exemplar = func.exemplar();
        let label = f.label_cell();
        let mut values = values.into_iter();
        let mut inactive = false;

        for (offset, param) in facade.slice(1).into_iter().enumerate() {
            let i = offset + 1;
            let class = param.param_class().unwrap_or(ParamClass::Local);
            if let Some(value) = self.special_slot(class, &varlist)? {
                varlist.init_var(i, value);
                continue;
            }
            let specialized = exemplar
                .as_ref()
                .and_then(|e| e.var(i).ok())
                .filter(|v| !v.is_void());
            if class == ParamClass::Refinement {
                let on = specialized.map_or(false, |v| v.is_truthy());
                varlist.init_var(i, Cell::logic(on));
                inactive = !on;
                continue;
            }
            if let Some(value) = specialized {
                varlist.init_var(i, value);
                continue;
            }
            if inactive {
                continue;
            }
            let value = match values.next() {
                Some(value) => value,
                None if param.get_flag(CellFlags::VARIADIC) => Cell::varargs(
                    Some(facade.clone()),
                    i,
                    Array::singular(Cell::block(Array::empty()), SeriesFlags::empty()),
                ),
                None if param.get_flag(CellFlags::ENDABLE) => Cell::void(),
                None => return Err(no_arg(&label, &param)),
            };
            check_arg(&label, &param, &value)?;
            varlist.init_var(i, value);
        }
        Ok(())
    }

    /// Fill a frame by copying the slots of a prebuilt one
    fn fill_from_frame(&mut self, f: &Frame, func: &Func, source: &Context) -> Result<(), Flow> {
        let varlist = f.ctx()?.clone();
        let facade = func.facade();
        for (offset, param) in facade.slice(1).into_iter().enumerate() {
            let i = offset + 1;
            let class = param.param_class().unwrap_or(ParamClass::Local);
            if let Some(value) = self.special_slot(class, &varlist)? {
                varlist.init_var(i, value);
                continue;
            }
            let value = source.var(i).unwrap_or_else(|_| Cell::void());
            varlist.init_var(i, value);
        }
        self.typecheck_frame(f)
    }

    /// Check every argument of a frame against its parameter,
    /// normalizing refinements to logic and clearing the arguments of
    /// unused refinements
    pub(crate) fn typecheck_frame(&mut self, f: &Frame) -> Result<(), Flow> {
        let varlist = f.ctx()?.clone();
        let facade = f.phase()?.facade();
        let label = f.label_cell();
        let mut inactive = false;
        for (offset, param) in facade.slice(1).into_iter().enumerate() {
            let i = offset + 1;
            let class = param.param_class().unwrap_or(ParamClass::Local);
            if class.is_hidden() {
                continue;
            }
            let value = varlist.var(i)?;
            if class == ParamClass::Refinement {
                let on = !value.is_void() && value.is_truthy();
                varlist.init_var(i, Cell::logic(on));
                inactive = !on;
                continue;
            }
            if inactive {
                varlist.init_var(i, Cell::void());
                continue;
            }
            check_arg(&label, &param, &value)?;
        }
        Ok(())
    }

    /// The dispatch loop: run the phase's dispatcher until it produces
    /// a result, following redos and catching throws aimed here
    fn dispatch(&mut self, f: &mut Frame) -> Result<Option<Cell>, Flow> {
        let mut checked_redo = false;
        loop {
            if checked_redo {
                self.typecheck_frame(f)?;
                checked_redo = false;
            }
            let phase = f.phase()?;
            let dispatcher = phase.dispatcher();
            let r = match dispatcher(self, f) {
                Ok(r) => r,
                Err(Flow::Throw(thrown)) => match self.catch_at_frame(f, thrown)? {
                    Caught::Value(value) => {
                        f.out = value;
                        R::Out
                    }
                    Caught::Redo => {
                        checked_redo = true;
                        continue;
                    }
                },
                Err(err) => return Err(err),
            };

            let out = match r {
                R::Out => Some(std::mem::take(&mut f.out).stored()),
                R::Void => Some(Cell::void()),
                R::True => Some(Cell::logic(true)),
                R::False => Some(Cell::logic(false)),
                R::Blank => Some(Cell::blank()),
                R::Bar => Some(Cell::bar()),
                R::RedoChecked => {
                    checked_redo = true;
                    continue;
                }
                R::RedoUnchecked => continue,
                R::Reevaluate | R::ReevaluateOnly => {
                    let cell = std::mem::take(&mut f.cell);
                    self.reevaluate(&f.feed, cell, r == R::ReevaluateOnly)?
                }
                R::Invisible => None,
                R::Unhandled => {
                    return Err(fail(
                        ErrId::CannotUse,
                        &[f.label_cell(), Cell::datatype(f.arg(1).kind())],
                    ))
                }
            };
            return self.run_chain(f, out);
        }
    }

    /// Apply functions a chain left on the data stack, last pushed
    /// first, each to the previous result
    fn run_chain(&mut self, f: &Frame, out: Option<Cell>) -> Result<Option<Cell>, Flow> {
        let mut out = out;
        while self.ds.len() > f.ds_base {
            let Some(next) = self.ds.pop() else { break };
            let Some(func) = next.as_func() else {
                return Err(fail(ErrId::InvalidArg, &[next]));
            };
            let arg = out.take().unwrap_or_else(Cell::void);
            out = self.apply_values(&func, next.binding(), f.label, vec![arg])?;
        }
        Ok(out)
    }

    /// Take a throw that names this frame through one of the
    /// definitional natives
    fn catch_at_frame(&mut self, f: &Frame, thrown: Thrown) -> Result<Caught, Flow> {
        let here = f.ctx()?.clone();
        let aimed_here = thrown.target().map_or(false, |t| t.same(&here));
        if !aimed_here {
            return Err(Flow::Throw(thrown));
        }
        let name = thrown.name().clone();

        if self.specials.is(Special::Return, &name) || self.specials.is(Special::Exit, &name) {
            return Ok(Caught::Value(thrown.into_payload()));
        }
        if self.specials.is(Special::Leave, &name) {
            return Ok(Caught::Value(Cell::void()));
        }
        if self.specials.is(Special::Redo, &name) {
            let payload = thrown.into_payload();
            if let Some(sibling) = payload.as_func() {
                let phase = f.phase()?;
                if !sibling.underlying().same(&phase.underlying())
                    && !sibling.facade().same(&phase.facade())
                {
                    return Err(fail(ErrId::BadSibling, &[payload]));
                }
                f.set_phase(sibling);
            }
            return Ok(Caught::Redo);
        }
        if self.specials.is(Special::Resume, &name) {
            let resume = Resume::from_cell(thrown.payload());
            let value = match resume.mode {
                ResumeMode::Default => Cell::void(),
                ResumeMode::With => resume.payload,
                ResumeMode::Do => self.do_value(&resume.payload)?,
            };
            return Ok(Caught::Value(value));
        }
        Err(Flow::Throw(thrown))
    }
}

/// Typecheck one argument against its parameter
pub(crate) fn check_arg(label: &Cell, param: &Cell, value: &Cell) -> Result<(), Flow> {
    let bits = param.typeset_bits().unwrap_or_default();
    let ok = if value.is_void() {
        bits.contains(Kind::Void) || param.get_flag(CellFlags::ENDABLE)
    } else if param.get_flag(CellFlags::VARIADIC) {
        value.kind() == Kind::Varargs || bits.contains(value.kind())
    } else {
        bits.contains(value.kind())
    };
    if ok {
        Ok(())
    } else {
        Err(fail(
            ErrId::ExpectArg,
            &[label.clone(), Cell::datatype(value.kind()), param_word(param)],
        ))
    }
}
