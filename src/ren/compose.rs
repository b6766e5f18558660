// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/compose.rs

// Functions made from other functions. Each composition shares the
// frame layout of what it was built on, so its dispatcher can do its
// part and then hand the same frame to the next phase.

// <>

use super::binding::{
    bind_deep, copy_and_bind_relative_deep, copy_deep_specific, derive_specifier, BindMode,
};
use super::call::check_arg;
use super::cell::{Binding, Cell, Payload};
use super::context::Context;
use super::error::{fail, ErrId};
use super::frame::{Frame, FrameMeta, R};
use super::func::{copy_paramlist, make_function, Archetype, Dispatcher, Func, FuncFlags};
use super::kinds::{Kind, TypeBits};
use super::paramlist::ParamClass;
use super::memmgt::manage;
use super::series::{Array, Link, SeriesFlags};
use super::symtab::*;
use super::task::Task;
use super::throws::Flow;

fn not_function(cell: &Cell) -> Flow {
    fail(ErrId::InvalidArg, &[cell.clone()])
}

fn body_func(f: &Frame) -> Result<(Func, Cell), Flow> {
    let body = f.phase()?.body();
    let func = body.as_func().ok_or_else(|| not_function(&body))?;
    Ok((func, body))
}

/// Paramlist with a fresh archetype carrying `func`'s return flags
fn paramlist_from(func: &Func, params: Vec<Cell>, underlying: Option<Func>) -> Array {
    let mut cells = Vec::with_capacity(params.len() + 1);
    cells.push(Cell::archetype(Archetype {
        flags: func.flags() & (FuncFlags::RETURN | FuncFlags::LEAVE),
        underlying,
    }));
    cells.extend(params);
    Array::from_vec(cells, SeriesFlags::ARRAY | SeriesFlags::PARAMLIST)
}

// SPECIALIZE

fn specializer_dispatcher(_task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let body = f.phase()?.body();
    let target = body.frame_phase().ok_or_else(|| not_function(&body))?;
    f.set_phase(target);
    Ok(R::RedoUnchecked)
}

/// New function with some of `specializee`'s arguments fixed by
/// running `def` against an exemplar frame
pub fn specialize(task: &mut Task, specializee: &Func, label: &Cell, def: &Cell) -> Result<Func, Flow> {
    let (array, index) = def
        .array_parts()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[def.clone()]))?;
    let facade = specializee.facade();
    let exemplar = Context::from_keylist(Kind::Frame, &facade);
    if let Some(prior) = specializee.exemplar() {
        for i in 1..=exemplar.len() {
            exemplar.init_var(i, prior.var(i)?);
        }
    }

    let specifier = derive_specifier(None, def);
    let code = copy_deep_specific(&array, index, specifier.as_ref());
    bind_deep(&code, 0, &exemplar, BindMode::Existing);
    task.heap.push_guard_array(&code);
    let ran = task.do_array(&code, 0, None);
    task.heap.drop_guard_array(&code);
    ran?;

    let mut kept = Vec::new();
    let mut refinement: Option<usize> = None;
    let mut fixed = 0;
    for (offset, param) in facade.slice(1).into_iter().enumerate() {
        let i = offset + 1;
        let class = param.param_class().unwrap_or(ParamClass::Local);
        if class.is_hidden() {
            kept.push(param);
            continue;
        }
        let value = exemplar.var(i)?;
        if class == ParamClass::Refinement {
            refinement = Some(i);
            if value.is_void() {
                kept.push(param);
            } else {
                exemplar.init_var(i, Cell::logic(value.is_truthy()));
                fixed += 1;
            }
            continue;
        }
        if value.is_void() {
            kept.push(param);
            continue;
        }
        check_arg(label, &param, &value)?;
        fixed += 1;
        // an argument fixed under an unmentioned refinement turns it on
        if let Some(r) = refinement {
            if exemplar.var(r)?.is_void() {
                exemplar.init_var(r, Cell::logic(true));
                kept.retain(|p| p.param_sym() != facade.get(r).and_then(|k| k.param_sym()));
                fixed += 1;
            }
        }
    }

    let paramlist = paramlist_from(specializee, kept, None);
    let func = make_function(paramlist, specializer_dispatcher, Some(specializee), Some(exemplar.clone()))?;
    func.set_body(Cell::frame(exemplar, Some(specializee.clone())));
    log::debug!("specialized {} with {} fixed parameters", label, fixed);
    Ok(func)
}

// ADAPT

fn adapter_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let body = f.phase()?.body();
    let (Some(prelude), Some(adaptee)) = (
        body.array_parts().and_then(|(a, i)| a.get(i)),
        body.array_parts().and_then(|(a, i)| a.get(i + 1)),
    ) else {
        return Err(fail(ErrId::Misc, &[Cell::string("malformed adapter body")]));
    };
    let (array, index) = prelude
        .array_parts()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[prelude.clone()]))?;
    let ctx = f.ctx()?.clone();
    task.do_array(&array, index, Some(&ctx))?;
    let adaptee = adaptee.as_func().ok_or_else(|| not_function(&adaptee))?;
    f.set_phase(adaptee);
    Ok(R::RedoChecked)
}

/// Run `prelude` in the frame before handing it to `adaptee`
pub fn adapt(adaptee: &Func, prelude: &Cell) -> Result<Func, Flow> {
    let (array, index) = prelude
        .array_parts()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[prelude.clone()]))?;
    let func = make_function(copy_paramlist(adaptee), adapter_dispatcher, Some(adaptee), None)?;
    let underlying = adaptee.underlying();
    let specifier = derive_specifier(None, prelude);
    let code = copy_and_bind_relative_deep(&array, index, underlying.paramlist(), specifier.as_ref());
    let prelude = Cell::block(code).with_binding(Binding::Relative(underlying.paramlist().clone()));
    func.set_body(Cell::block(Array::from_cells(vec![prelude, adaptee.to_cell()])));
    Ok(func)
}

// CHAIN

fn chainer_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let body = f.phase()?.body();
    let (array, index) = body
        .array_parts()
        .ok_or_else(|| fail(ErrId::Misc, &[Cell::string("malformed chain body")]))?;
    let pipeline = array.slice(index);
    let Some(head) = pipeline.first() else {
        return Ok(R::Void);
    };
    for next in pipeline.iter().skip(1).rev() {
        task.ds.push(next.clone());
    }
    let head = head.as_func().ok_or_else(|| not_function(head))?;
    f.set_phase(head);
    Ok(R::RedoUnchecked)
}

/// Function whose result is the pipeline's functions applied in turn
pub fn chain(pipeline: &[Cell]) -> Result<Func, Flow> {
    let first = pipeline
        .first()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[Cell::block(Array::empty())]))?;
    let first_func = first.as_func().ok_or_else(|| not_function(first))?;
    for cell in pipeline {
        if cell.as_func().is_none() {
            return Err(not_function(cell));
        }
    }
    let func = make_function(copy_paramlist(&first_func), chainer_dispatcher, Some(&first_func), None)?;
    func.set_body(Cell::block(Array::from_cells(pipeline.to_vec())));
    Ok(func)
}

// ENCLOSE

fn encloser_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let body = f.phase()?.body();
    let (Some(inner), Some(outer)) = (
        body.array_parts().and_then(|(a, i)| a.get(i)),
        body.array_parts().and_then(|(a, i)| a.get(i + 1)),
    ) else {
        return Err(fail(ErrId::Misc, &[Cell::string("malformed encloser body")]));
    };
    let inner_func = inner.as_func().ok_or_else(|| not_function(&inner))?;
    let outer_func = outer.as_func().ok_or_else(|| not_function(&outer))?;

    let copy = f.ctx()?.copy_shallow()?;
    copy.set_frame_meta(FrameMeta {
        phase: inner_func.clone(),
        original: inner_func.clone(),
        binding: inner.binding().clone(),
        label: f.label,
        feed: None,
    });
    let frame = Cell::frame(copy, Some(inner_func));
    match task.apply_values(&outer_func, outer.binding(), None, vec![frame])? {
        Some(out) => {
            f.out = out;
            Ok(R::Out)
        }
        None => Ok(R::Void),
    }
}

/// Function that passes its own built frame to `outer`, which may run
/// it any number of times
pub fn enclose(inner: &Cell, outer: &Cell) -> Result<Func, Flow> {
    let inner_func = inner.as_func().ok_or_else(|| not_function(inner))?;
    if outer.as_func().is_none() {
        return Err(not_function(outer));
    }
    let func = make_function(copy_paramlist(&inner_func), encloser_dispatcher, Some(&inner_func), None)?;
    func.set_body(Cell::block(Array::from_cells(vec![inner.clone(), outer.clone()])));
    Ok(func)
}

// HIJACK

/// Runs a hijacker whose frame layout differs from the victim's:
/// arguments before the first refinement map by position, the rest by
/// name
fn hijacker_dispatcher(task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let (hijacker, body) = body_func(f)?;
    let ctx = f.ctx()?.clone();

    let mut positional = Vec::new();
    let mut named = Vec::new();
    let mut refining = false;
    for (offset, param) in ctx.keylist().slice(1).into_iter().enumerate() {
        let class = param.param_class().unwrap_or(ParamClass::Local);
        if class.is_hidden() {
            continue;
        }
        let value = ctx.var(offset + 1)?;
        refining |= class == ParamClass::Refinement;
        if !refining {
            positional.push(value.clone());
        }
        if let Some(sym) = param.param_sym() {
            named.push((sym, value));
        }
    }

    let target = Context::from_keylist(Kind::Frame, &hijacker.facade());
    let exemplar = hijacker.exemplar();
    let mut positional = positional.into_iter();
    let mut refining = false;
    for (offset, param) in target.keylist().slice(1).into_iter().enumerate() {
        let i = offset + 1;
        let class = param.param_class().unwrap_or(ParamClass::Local);
        if class.is_hidden() {
            continue;
        }
        let fixed = exemplar
            .as_ref()
            .and_then(|e| e.var(i).ok())
            .filter(|v| !v.is_void());
        refining |= class == ParamClass::Refinement;
        let value = match fixed {
            Some(value) => Some(value),
            None if !refining => positional.next(),
            None => param.param_sym().and_then(|sym| {
                named
                    .iter()
                    .find(|(s, _)| s.same_canon(sym))
                    .map(|(_, v)| v.clone())
            }),
        };
        target.init_var(i, value.unwrap_or_else(Cell::void));
    }
    target.set_frame_meta(FrameMeta {
        phase: hijacker.clone(),
        original: hijacker.clone(),
        binding: body.binding().clone(),
        label: f.label,
        feed: None,
    });

    match task.run_frame(&Cell::frame(target, Some(hijacker)))? {
        Some(out) => {
            f.out = out;
            Ok(R::Out)
        }
        None => Ok(R::Invisible),
    }
}

/// Make every use of `victim` run `hijacker` instead; returns a new
/// function that behaves as the victim did before
pub fn hijack(victim: &Func, hijacker: &Cell) -> Result<Func, Flow> {
    let hijacker_func = hijacker.as_func().ok_or_else(|| not_function(hijacker))?;

    let proxy = make_function(copy_paramlist(victim), victim.dispatcher(), Some(victim), victim.exemplar())?;
    proxy.set_body(victim.body());
    proxy.set_flags(victim.flags() & (FuncFlags::NATIVE | FuncFlags::ACTION | FuncFlags::INTERPRETED));

    if hijacker_func.same(victim) {
        return Ok(proxy);
    }
    if hijacker_func.underlying().same(&victim.underlying()) {
        victim.set_dispatcher(hijacker_func.dispatcher());
        victim.set_body(hijacker_func.body());
        victim.set_exemplar(hijacker_func.exemplar());
        log::debug!("hijack shares the victim's frame layout; body adopted");
    } else {
        victim.set_dispatcher(hijacker_dispatcher);
        victim.set_body(hijacker.clone());
        victim.set_exemplar(None);
        log::debug!("hijack installed a forwarding dispatcher");
    }
    Ok(proxy)
}

// TIGHTEN

fn tightener_dispatcher(_task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let (target, _) = body_func(f)?;
    f.set_phase(target);
    Ok(R::RedoUnchecked)
}

fn tight_params(params: Vec<Cell>) -> Vec<Cell> {
    params
        .into_iter()
        .map(|p| match p.param_class() {
            Some(ParamClass::Normal) => p.with_param_class(ParamClass::Tight),
            _ => p,
        })
        .collect()
}

/// Same function with its normal parameters made tight
pub fn tighten(func: &Func) -> Result<Func, Flow> {
    let facade = func.facade();
    let underlying = Some(func.underlying());
    let tight_facade = paramlist_from(func, tight_params(facade.slice(1)), underlying.clone());
    let shares_facade = facade.same(func.paramlist());
    let public = if shares_facade {
        tight_facade.clone()
    } else {
        paramlist_from(func, tight_params(func.params()), underlying)
    };
    if let Some(meta) = func.meta() {
        public.set_link(Link::Meta(meta));
    }
    let tightened = make_function(public, tightener_dispatcher, None, func.exemplar())?;
    if !shares_facade {
        manage(&tight_facade);
        tight_facade.set_flags(SeriesFlags::PARAMLIST | SeriesFlags::FIXED_SIZE);
        tightened.set_facade(tight_facade);
    }
    tightened.set_body(func.to_cell());
    Ok(tightened)
}

// TYPECHECKER

fn datatype_checker(_task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let kind = f.phase()?.body().datatype_kind();
    Ok(if kind == Some(f.arg(1).kind()) {
        R::True
    } else {
        R::False
    })
}

fn typeset_checker(_task: &mut Task, f: &mut Frame) -> Result<R, Flow> {
    let bits = f.phase()?.body().typeset_bits().unwrap_or_default();
    Ok(if bits.contains(f.arg(1).kind()) {
        R::True
    } else {
        R::False
    })
}

/// Single-argument function testing membership in a datatype or
/// typeset
pub fn typechecker(test: &Cell) -> Result<Func, Flow> {
    let dispatcher: Dispatcher = match test.payload() {
        Payload::Datatype(_) => datatype_checker,
        Payload::Typeset { .. } => typeset_checker,
        _ => return Err(fail(ErrId::InvalidArg, &[test.clone()])),
    };
    let paramlist = Array::from_vec(
        vec![
            Cell::archetype(Archetype::default()),
            Cell::param(S_VALUE, ParamClass::Normal, TypeBits::any_value().with(Kind::Void)),
        ],
        SeriesFlags::ARRAY | SeriesFlags::PARAMLIST,
    );
    let func = make_function(paramlist, dispatcher, None, None)?;
    func.set_flags(FuncFlags::NATIVE);
    func.set_body(test.clone());
    Ok(func)
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::ren::task::Task;

    fn interpret(code: &str) -> String {
        let mut task = Task::new(Config::default()).unwrap();
        task.do_string(code).unwrap().to_string()
    }

    #[test]
    fn specialization_fixes_arguments() {
        assert_eq!("[1 2 99]", interpret("g: specialize 'append [value: 99] g copy [1 2]"));
        assert_eq!(
            "[x]",
            interpret("f: func [x y] [reduce [x y]] g: specialize :f [y: 'a] words-of :g")
        );
    }

    #[test]
    fn adaptation_runs_prelude_first() {
        assert_eq!("20", interpret("f: func [x] [x * 2] g: adapt :f [x: x + 9] g 1"));
        assert_eq!(
            "100",
            interpret("f: func [x] [x * 2] g: adapt :f [if x > 10 [return 100]] g 11")
        );
    }

    #[test]
    fn chain_and_enclose() {
        assert_eq!("5", interpret("p: chain [:negate :negate] p 5"));
        assert_eq!(
            "16",
            interpret("f: func [x] [x + 1] e: enclose :f func [fr] [(do fr) + (do fr) + 4] e 5")
        );
    }

    #[test]
    fn hijack_and_restore() {
        assert_eq!(
            "[-1 3]",
            interpret(
                "old: hijack 'add func [a b] [a - b] r: 1 + 2 \
                 hijack 'add :old reduce [r 1 + 2]"
            )
        );
    }

    #[test]
    fn tighten_is_idempotent_in_classes() {
        assert_eq!(
            "true",
            interpret("f: func [a b] [a] equal? spec-of tighten :f spec-of tighten tighten :f")
        );
    }

    #[test]
    fn typecheckers() {
        assert_eq!("[true false]", interpret("t: typechecker integer! reduce [t 1 t 1.0]"));
        assert_eq!("true", interpret("t: typechecker any-number! t 1.0"));
    }
}
