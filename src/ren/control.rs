// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/control.rs

// Control natives: evaluation, conditionals and loops, the
// definitional and name-based throws, trapping, and the breakpoint
// machinery with its host hooks.

// <>

use std::io::{self, Write};

use super::binding::{bind_deep, binding_of, copy_deep_specific, derelativize, derive_specifier, BindMode};
use super::cell::{Binding, Cell};
use super::compare::equal_values;
use super::context::Context;
use super::error::{fail, ErrId, Error};
use super::frame::{Feed, Frame, FrameFlags, FrameMeta, R};
use super::func::{Func, FuncFlags};
use super::kinds::Kind;
use super::mold::{form_value, mold_with, MoldOpts};
use super::scan::scan_utf8;
use super::series::Array;
use super::stdenv::{array_of, function_of, logic, out, reduce_block};
use super::symtab::Sym;
use super::task::{is_halt, BreakpointHook, Special, Task};
use super::throws::{Flow, Resume, ResumeMode};

/// Run a branch: blocks are evaluated, functions are called with the
/// condition when they take an argument
fn do_branch(task: &mut Task, branch: &Cell, condition: &Cell) -> Result<Cell, Flow> {
    match branch.as_func() {
        Some(func) => {
            let takes = func
                .params()
                .iter()
                .any(|p| p.param_class().map_or(false, |c| c.takes_arg()));
            let args = if takes { vec![condition.clone()] } else { Vec::new() };
            let result = task.apply_values(&func, branch.binding(), None, args)?;
            Ok(result.unwrap_or_else(Cell::void))
        }
        None => task.do_value(branch),
    }
}

/// Copy of a loop body bound to the loop's variables
fn loop_body(body: &Cell, vars: &Context) -> Result<Array, Flow> {
    let (array, index) = array_of(body)?;
    let specifier = derive_specifier(None, body);
    let code = copy_deep_specific(&array, index, specifier.as_ref());
    bind_deep(&code, 0, vars, BindMode::Existing);
    Ok(code)
}

/// Values a FOR-EACH walks over, in order
fn iteration_items(data: &Cell) -> Result<Vec<Cell>, Flow> {
    let kind = data.kind();
    if let Some((array, index)) = data.array_parts() {
        let specifier = derive_specifier(None, data);
        return Ok(array
            .slice(index)
            .iter()
            .map(|c| derelativize(c, specifier.as_ref()))
            .collect());
    }
    if let Some((text, index)) = data.text_parts() {
        return Ok(text.slice(index).into_iter().map(Cell::char).collect());
    }
    if let Some((bin, index)) = data.bytes_parts() {
        return Ok(bin
            .slice(index)
            .into_iter()
            .map(|b| Cell::integer(i64::from(b)))
            .collect());
    }
    if let Some(map) = data.as_map() {
        return Ok(map.pairs().into_iter().flat_map(|(k, v)| [k, v]).collect());
    }
    if kind.any_context() {
        let ctx = data
            .as_context()
            .ok_or_else(|| fail(ErrId::InvalidArg, &[data.clone()]))?;
        return Ok(ctx
            .pairs()?
            .into_iter()
            .flat_map(|(sym, v)| [Cell::word(Kind::Word, sym), v])
            .collect());
    }
    Err(fail(ErrId::InvalidArg, &[data.clone()]))
}

fn loop_vars(vars: &Cell) -> Result<Vec<Sym>, Flow> {
    if vars.any_word() {
        return Ok(vars.word_sym().into_iter().collect());
    }
    let (array, index) = array_of(vars)?;
    let syms: Vec<Sym> = array
        .slice(index)
        .iter()
        .filter(|c| c.any_word())
        .filter_map(|c| c.word_sym())
        .collect();
    if syms.is_empty() {
        return Err(fail(ErrId::InvalidArg, &[vars.clone()]));
    }
    Ok(syms)
}

fn run_guarded(
    task: &mut Task,
    code: &Array,
    mut step: impl FnMut(&mut Task, &Array) -> Result<bool, Flow>,
) -> Result<(), Flow> {
    task.heap.push_guard_array(code);
    let result = loop {
        match step(task, code) {
            Ok(true) => continue,
            Ok(false) => break Ok(()),
            Err(flow) => break Err(flow),
        }
    };
    task.heap.drop_guard_array(code);
    result
}

/// COMPOSE: groups are evaluated; blocks they produce are spliced
/// unless `only`
fn compose_array(
    task: &mut Task,
    array: &Array,
    index: usize,
    specifier: Option<&Context>,
    deep: bool,
    only: bool,
) -> Result<Array, Flow> {
    let mut cells = Vec::with_capacity(array.len().saturating_sub(index));
    for cell in array.slice(index) {
        if cell.kind() == Kind::Group {
            let (inner, at) = array_of(&cell)?;
            let inner_spec = derive_specifier(specifier, &cell);
            let value = task.do_array(&inner, at, inner_spec.as_ref())?;
            if value.is_void() {
                continue;
            }
            match value.array_parts() {
                Some((spliced, from)) if value.kind() == Kind::Block && !only => {
                    cells.extend(spliced.slice(from))
                }
                _ => cells.push(value),
            }
        } else if deep && cell.any_array() {
            let (inner, at) = array_of(&cell)?;
            let inner_spec = derive_specifier(specifier, &cell);
            let composed = compose_array(task, &inner, at, inner_spec.as_ref(), deep, only)?;
            cells.push(cell.with_array(composed, 0).with_binding(Binding::Unbound));
        } else {
            cells.push(derelativize(&cell, specifier));
        }
    }
    Ok(Array::from_cells(cells))
}

/// Varlist a RETURN or LEAVE is aimed at: the frame its binding names
fn definitional_target(task: &Task, f: &Frame) -> Result<Context, Flow> {
    match f.binding() {
        Binding::Specific(ctx) if task.is_running(&ctx) => Ok(ctx),
        _ => Err(fail(ErrId::InvalidExit, &[f.label_cell()])),
    }
}

/// Running call an EXIT/FROM or RESUME/AT level names
fn frame_from_level(task: &Task, level: &Cell, interpreted_only: bool) -> Result<Context, Flow> {
    let not_found = || fail(ErrId::InvalidExit, &[level.clone()]);
    // the innermost call is the native doing the looking
    let mut calls = task.calls.iter().rev().skip(1);
    match level.kind() {
        Kind::Integer => {
            let n = level.as_integer().filter(|n| *n > 0).ok_or_else(not_found)?;
            calls
                .filter(|c| {
                    !interpreted_only || c.original.underlying().flags().contains(FuncFlags::INTERPRETED)
                })
                .nth(n as usize - 1)
                .map(|c| c.varlist.clone())
                .ok_or_else(not_found)
        }
        Kind::Function => {
            let func = level.as_func().ok_or_else(not_found)?;
            calls
                .find(|c| c.original.same(&func))
                .map(|c| c.varlist.clone())
                .ok_or_else(not_found)
        }
        Kind::Frame => {
            let ctx = level.as_context().ok_or_else(not_found)?;
            if task.is_running(&ctx) {
                Ok(ctx)
            } else {
                Err(fail(ErrId::FrameNotOnStack, &[]))
            }
        }
        _ => Err(not_found()),
    }
}

/// Does a CATCH/NAME name list accept `name`
fn names_match(names: &Cell, name: &Cell) -> bool {
    if names.kind() == Kind::Block {
        if let Some((array, index)) = names.array_parts() {
            return array.slice(index).iter().any(|n| equal_values(n, name, false));
        }
    }
    equal_values(names, name, false)
}

/// Run a CATCH or TRAP handler with the caught values
fn run_handler(task: &mut Task, handler: &Cell, args: Vec<Cell>) -> Result<Cell, Flow> {
    match handler.as_func() {
        Some(func) => {
            let wanted = func
                .params()
                .iter()
                .filter(|p| p.param_class().map_or(false, |c| c.takes_arg()))
                .count();
            let args = args.into_iter().take(wanted).collect();
            let result = task.apply_values(&func, handler.binding(), None, args)?;
            Ok(result.unwrap_or_else(Cell::void))
        }
        None => task.do_value(handler),
    }
}

/// Give control to the host at a BREAKPOINT or PAUSE
///
/// `None` means the default result was asked for. A resume aimed at
/// another breakpoint is thrown on toward it.
pub(crate) fn do_breakpoint(
    task: &mut Task,
    f: &Frame,
    interrupted: bool,
) -> Result<Option<Cell>, Flow> {
    let Some(mut hook) = task.hook.take() else {
        log::warn!("{} reached with no debugger hook", f.label_cell());
        return Ok(None);
    };
    log::debug!("breakpoint hook entered at depth {}", task.calls.len());
    let mut instruction = Cell::void();
    let quitting = hook(task, &mut instruction, interrupted);
    if task.hook.is_none() {
        task.hook = Some(hook);
    }
    if quitting {
        let quit = task.specials.cell(Special::Quit)?;
        return Err(Flow::throw(quit, instruction));
    }

    let resume = Resume::from_cell(&instruction);
    let here = f.ctx()?;
    if let Some(target) = &resume.target {
        if !target.same(here) {
            let name = task.specials.cell(Special::Resume)?;
            return Err(Flow::throw_to(name, target, instruction));
        }
    }
    match resume.mode {
        ResumeMode::Default => Ok(None),
        ResumeMode::With => Ok(Some(resume.payload)),
        ResumeMode::Do => task.do_value(&resume.payload).map(Some),
    }
}

/// Outcome of one line typed at a nested debug prompt
enum Step {
    Value(Cell),
    Resume(Cell),
    Quit(Cell),
    Failed(String),
}

fn debug_step(task: &mut Task, line: &str) -> Step {
    let snapshot = task.snapshot();
    let result = task
        .load(line, None)
        .and_then(|code| task.do_array(&code, 0, None));
    match result {
        Ok(value) => Step::Value(value),
        Err(Flow::Throw(thrown)) if task.specials.is(Special::Resume, thrown.name()) => {
            task.restore(&snapshot);
            Step::Resume(thrown.into_payload())
        }
        Err(Flow::Throw(thrown)) if task.specials.is(Special::Quit, thrown.name()) => {
            task.restore(&snapshot);
            Step::Quit(thrown.into_payload())
        }
        Err(flow) => {
            task.restore(&snapshot);
            Step::Failed(task.host_error(flow).to_string())
        }
    }
}

/// Breakpoint hook running a nested `debug>` prompt: lines from
/// `read_line` are evaluated until one of them resumes or quits
///
/// The reader gives `None` at the end of input, which quits.
pub fn console_hook<I, O>(mut read_line: I, mut output: O) -> BreakpointHook
where
    I: FnMut() -> io::Result<Option<String>> + 'static,
    O: Write + 'static,
{
    Box::new(move |task, instruction, interrupted| {
        let why = if interrupted { "interrupted" } else { "paused" };
        let _ = writeln!(output, "** {} (RESUME to continue, QUIT to stop)", why);
        loop {
            let _ = write!(output, "debug> ");
            let _ = output.flush();
            let Ok(Some(line)) = read_line() else {
                *instruction = Cell::blank();
                return true;
            };
            match debug_step(task, &line) {
                Step::Value(value) if value.is_void() => (),
                Step::Value(value) => {
                    let opts = MoldOpts {
                        limit: task.config.mold_limit,
                        ..MoldOpts::default()
                    };
                    let text = mold_with(&mut task.mold, &value, opts);
                    let _ = writeln!(output, "== {}", text);
                }
                Step::Resume(resume) => {
                    *instruction = resume;
                    return false;
                }
                Step::Quit(payload) => {
                    *instruction = payload;
                    return true;
                }
                Step::Failed(message) => {
                    let _ = writeln!(output, "{}", message);
                }
            }
        }
    })
}

ren_fn! {
    const CONTROL_NATIVES;
    task f;

    "do" "[source [<opt> blank! block! group! string! binary! file! url! tag! error! function! frame! varargs!]]" [source] {
        let value = match source.kind() {
            Kind::Block | Kind::Group => task.do_value(&source)?,
            Kind::String => {
                let code = task.load(&source.as_text().unwrap_or_default(), None)?;
                task.do_array(&code, 0, None)?
            }
            Kind::Binary => {
                let (bin, index) = source
                    .bytes_parts()
                    .ok_or_else(|| fail(ErrId::InvalidArg, &[source.clone()]))?;
                let code = scan_utf8(&bin.slice(index), None)?;
                bind_deep(&code, 0, &task.lib, BindMode::AddAll);
                task.do_array(&code, 0, None)?
            }
            Kind::File => {
                let path = source.as_text().unwrap_or_default();
                let text = std::fs::read_to_string(&path).map_err(|err| {
                    fail(ErrId::CannotUse, &[Cell::string(&err.to_string()), source.clone()])
                })?;
                let code = task.load(&text, Some(&path))?;
                task.do_array(&code, 0, None)?
            }
            Kind::Error => {
                let ctx = source
                    .as_context()
                    .ok_or_else(|| fail(ErrId::InvalidArg, &[source.clone()]))?;
                return Err(Flow::Error(Error::from_context(ctx)));
            }
            Kind::Function => {
                let func = source
                    .as_func()
                    .ok_or_else(|| fail(ErrId::InvalidArg, &[source.clone()]))?;
                task.apply_values(&func, source.binding(), None, Vec::new())?
                    .unwrap_or_else(Cell::void)
            }
            Kind::Frame => task.run_frame(&source)?.unwrap_or_else(Cell::void),
            Kind::Varargs => {
                let mut last = Cell::void();
                while let Some(value) = task.varargs_take(&source)? {
                    last = value;
                }
                last
            }
            Kind::Blank | Kind::Void => Cell::void(),
            _ => return Err(fail(ErrId::CannotUse, &[f.label_cell(), Cell::datatype(source.kind())])),
        };
        out(f, value)
    }

    "either" "[condition [any-value!] true-branch [block! function!] false-branch [block! function!]]" [condition, yes, no] {
        let branch = if condition.is_truthy() { yes } else { no };
        let value = do_branch(task, &branch, &condition)?;
        out(f, value)
    }

    "if" "[condition [any-value!] branch [block! function!]]" [condition, branch] {
        if !condition.is_truthy() {
            return Ok(R::Void);
        }
        let value = do_branch(task, &branch, &condition)?;
        out(f, value)
    }

    "unless" "[condition [any-value!] branch [block! function!]]" [condition, branch] {
        if condition.is_truthy() {
            return Ok(R::Void);
        }
        let value = do_branch(task, &branch, &condition)?;
        out(f, value)
    }

    "all" "[block [block!]]" [block] {
        let (array, index) = array_of(&block)?;
        let feed = Feed::new(array, index, derive_specifier(None, &block));
        let mut last = Cell::logic(true);
        while let Some(value) = task.eval_next(&feed, FrameFlags::empty())? {
            if value.is_void() {
                continue;
            }
            if !value.is_truthy() {
                return Ok(R::Blank);
            }
            last = value;
        }
        out(f, last)
    }

    "any" "[block [block!]]" [block] {
        let (array, index) = array_of(&block)?;
        let feed = Feed::new(array, index, derive_specifier(None, &block));
        while let Some(value) = task.eval_next(&feed, FrameFlags::empty())? {
            if !value.is_void() && value.is_truthy() {
                return out(f, value);
            }
        }
        Ok(R::Blank)
    }

    "not" "[value [<opt> any-value!]]" [value] {
        logic(!value.is_truthy())
    }

    "while" "[condition [block!] body [block!]]" [condition, body] {
        let mut last = Cell::void();
        while task.do_value(&condition)?.is_truthy() {
            last = task.do_value(&body)?;
        }
        out(f, last)
    }

    "loop" "[count [integer!] body [block!]]" [count, body] {
        let mut last = Cell::void();
        for _ in 0..count.as_integer().unwrap_or(0).max(0) {
            last = task.do_value(&body)?;
        }
        out(f, last)
    }

    "repeat" "['word [word!] value [integer! any-series! blank!] body [block!]]" [word, value, body] {
        let syms = loop_vars(&word)?;
        let vars = Context::from_names(Kind::Object, &syms);
        let code = loop_body(&body, &vars)?;
        let mut last = Cell::void();
        let mut i = 0;
        run_guarded(task, &code, |task, code| {
            i += 1;
            let current = match value.as_integer() {
                Some(n) if i <= n => Cell::integer(i),
                Some(_) => return Ok(false),
                None => match value.series_index() {
                    Some(start) if !value.is_blank() => {
                        let at = start + i as usize - 1;
                        if at >= series_len(&value) {
                            return Ok(false);
                        }
                        value.with_index(at)
                    }
                    _ => return Ok(false),
                },
            };
            vars.init_var(1, current);
            last = task.do_array(code, 0, None)?;
            Ok(true)
        })?;
        out(f, last)
    }

    "for-each" "['vars [word! block!] data [any-series! any-context! map! blank!] body [block!]]" [vars, data, body] {
        if data.is_blank() {
            return Ok(R::Void);
        }
        let syms = loop_vars(&vars)?;
        let ctx = Context::from_names(Kind::Object, &syms);
        let code = loop_body(&body, &ctx)?;
        let items = iteration_items(&data)?;
        let mut chunks = items.chunks(syms.len());
        let mut last = Cell::void();
        run_guarded(task, &code, |task, code| {
            let Some(chunk) = chunks.next() else {
                return Ok(false);
            };
            for i in 0..syms.len() {
                ctx.init_var(i + 1, chunk.get(i).cloned().unwrap_or_else(Cell::blank));
            }
            last = task.do_array(code, 0, None)?;
            Ok(true)
        })?;
        out(f, last)
    }

    "reduce" "[value [<opt> any-value!]]" [value] {
        if value.kind() != Kind::Block {
            return out(f, value);
        }
        let values = reduce_block(task, &value)?;
        out(f, Cell::block(Array::from_cells(values)))
    }

    "compose" "[value [<opt> any-value!] /deep /only]" [value, deep, only] {
        let Some((array, index)) = value.array_parts().filter(|_| value.kind() == Kind::Block) else {
            return out(f, value);
        };
        let specifier = derive_specifier(None, &value);
        let composed = compose_array(
            task,
            &array,
            index,
            specifier.as_ref(),
            deep.is_truthy(),
            only.is_truthy(),
        )?;
        out(f, Cell::block(composed))
    }

    "eval" "[value [<opt> any-value!]]" [value] {
        if value.is_void() {
            return Ok(R::Void);
        }
        f.cell = value;
        Ok(R::Reevaluate)
    }

    "quote" "[:value [any-value!]]" [value] {
        out(f, value)
    }

    "comment" "[:discarded [any-value!]]" [discarded] {
        Ok(R::Invisible)
    }

    "return" "[value [<opt> any-value!]]" [value] {
        let target = definitional_target(task, f)?;
        if let Some(meta) = target.frame_meta() {
            if let Some(bits) = meta.original.return_types() {
                if !bits.contains(value.kind()) {
                    let label = meta.label.map_or_else(Cell::blank, |s| Cell::word(Kind::Word, s));
                    return Err(fail(ErrId::BadReturnType, &[label, Cell::datatype(value.kind())]));
                }
            }
        }
        let name = task.specials.cell(Special::Return)?;
        Err(Flow::throw_to(name, &target, value))
    }

    "leave" "[]" [] {
        let target = definitional_target(task, f)?;
        let name = task.specials.cell(Special::Leave)?;
        Err(Flow::throw_to(name, &target, Cell::void()))
    }

    "exit" "[/with value [any-value!] /from level [integer! function! frame!]]" [with, value, from, level] {
        let level = if from.is_truthy() { level } else { Cell::integer(1) };
        let target = frame_from_level(task, &level, true)?;
        let payload = if with.is_truthy() { value } else { Cell::void() };
        let name = task.specials.cell(Special::Exit)?;
        Err(Flow::throw_to(name, &target, payload))
    }

    "redo" "[restartee [frame! any-word!] /other sibling [function!]]" [restartee, other, sibling] {
        let target = match restartee.as_context() {
            Some(ctx) => ctx,
            None => binding_of(&restartee, None)
                .filter(|ctx| ctx.is_frame())
                .ok_or_else(|| fail(ErrId::InvalidArg, &[restartee.clone()]))?,
        };
        if !task.is_running(&target) {
            return Err(fail(ErrId::FrameNotOnStack, &[]));
        }
        let payload = if other.is_truthy() { sibling } else { Cell::blank() };
        let name = task.specials.cell(Special::Redo)?;
        Err(Flow::throw_to(name, &target, payload))
    }

    "quit" "[/with value [any-value!]]" [with, value] {
        let payload = if with.is_truthy() { value } else { Cell::blank() };
        let name = task.specials.cell(Special::Quit)?;
        Err(Flow::throw(name, payload))
    }

    "halt" "[]" [] {
        Err(super::task::halt_throw())
    }

    "catch" "[block [block!] /name names [block! word! function! object!] /quit /any /with handler [block! function!]]" [block, name, names, quit, any, with, handler] {
        let thrown = match task.do_value(&block) {
            Ok(value) => return out(f, value),
            Err(Flow::Throw(thrown)) => thrown,
            Err(err) => return Err(err),
        };
        let thrown_name = thrown.name().clone();
        let caught = if task.specials.is(Special::Quit, &thrown_name) {
            quit.is_truthy()
        } else if thrown.target().is_some() || is_halt(&thrown_name) {
            false
        } else if any.is_truthy() {
            true
        } else if name.is_truthy() {
            names_match(&names, &thrown_name)
        } else {
            thrown_name.is_blank()
        };
        if !caught {
            return Err(Flow::Throw(thrown));
        }
        let (thrown_name, payload) = thrown.catch();
        if with.is_truthy() {
            let value = run_handler(task, &handler, vec![payload, thrown_name])?;
            return out(f, value);
        }
        out(f, payload)
    }

    "throw" "[value [<opt> any-value!] /name name-value [word! function! object!]]" [value, name, name_value] {
        if value.kind() == Kind::Error && !name.is_truthy() {
            return Err(fail(ErrId::UseFailForError, &[value]));
        }
        let name = if name.is_truthy() { name_value } else { Cell::blank() };
        Err(Flow::throw(name, value))
    }

    "trap" "[block [block!] /with handler [block! function!]]" [block, with, handler] {
        let snapshot = task.snapshot();
        match task.do_value(&block) {
            Ok(value) => out(f, value),
            Err(Flow::Error(err)) => {
                task.restore(&snapshot);
                let error = err.to_cell();
                if with.is_truthy() {
                    let value = run_handler(task, &handler, vec![error])?;
                    return out(f, value);
                }
                out(f, error)
            }
            Err(thrown) => Err(thrown),
        }
    }

    "fail" "[reason [error! string! block!]]" [reason] {
        if let Some(ctx) = reason.as_context() {
            return Err(Flow::Error(Error::from_context(ctx)));
        }
        let message = if reason.kind() == Kind::Block {
            form_value(&Cell::block(Array::from_cells(reduce_block(task, &reason)?)))
        } else {
            reason.as_text().unwrap_or_default()
        };
        Err(Flow::Error(Error::user(&message)))
    }

    "breakpoint" "[]" [] {
        match do_breakpoint(task, f, false)? {
            Some(value) => out(f, value),
            None => Ok(R::Invisible),
        }
    }

    "pause" "[value [<opt> any-value!]]" [value] {
        match do_breakpoint(task, f, false)? {
            Some(resumed) => out(f, resumed),
            None => out(f, value),
        }
    }

    "resume" "[/with value [any-value!] /do code [block!] /at level [frame! integer!]]" [with, value, doing, code, at, level] {
        if with.is_truthy() && doing.is_truthy() {
            return Err(fail(ErrId::BadRefine, &[Cell::word(Kind::Refinement, Sym::intern("do"))]));
        }
        let (mode, payload) = if with.is_truthy() {
            (ResumeMode::With, value)
        } else if doing.is_truthy() {
            (ResumeMode::Do, code)
        } else {
            (ResumeMode::Default, Cell::void())
        };
        let target = if !at.is_truthy() {
            None
        } else if level.kind() == Kind::Frame {
            Some(frame_from_level(task, &level, false)?)
        } else {
            Some(pause_at_level(task, &level)?)
        };
        let instruction = Resume { mode, payload, target }.to_cell();
        let name = task.specials.cell(Special::Resume)?;
        Err(Flow::throw(name, instruction))
    }

    "apply" "[applicand [function! any-word! any-path!] def [block!]]" [applicand, def] {
        let (func, value, label) = function_of(task, &applicand)?;
        let frame = Context::from_keylist(Kind::Frame, &func.facade());
        if let Some(exemplar) = func.exemplar() {
            for i in 1..=frame.len() {
                frame.init_var(i, exemplar.var(i)?);
            }
        }
        let (array, index) = array_of(&def)?;
        let specifier = derive_specifier(None, &def);
        let code = copy_deep_specific(&array, index, specifier.as_ref());
        bind_deep(&code, 0, &frame, BindMode::Existing);
        task.heap.push_guard_array(&code);
        let ran = task.do_array(&code, 0, None);
        task.heap.drop_guard_array(&code);
        ran?;

        frame.set_frame_meta(FrameMeta {
            phase: func.clone(),
            original: func.clone(),
            binding: value.binding().clone(),
            label,
            feed: None,
        });
        match task.run_frame(&Cell::frame(frame, Some(func)))? {
            Some(result) => out(f, result),
            None => Ok(R::Invisible),
        }
    }
}

fn series_len(value: &Cell) -> usize {
    if let Some((array, _)) = value.array_parts() {
        array.len()
    } else if let Some((text, _)) = value.text_parts() {
        text.len()
    } else if let Some((bin, _)) = value.bytes_parts() {
        bin.len()
    } else {
        0
    }
}

/// Frame of the `n`th BREAKPOINT or PAUSE up the stack, innermost
/// being 1
fn pause_at_level(task: &Task, level: &Cell) -> Result<Context, Flow> {
    let not_found = || fail(ErrId::InvalidExit, &[level.clone()]);
    let n = level.as_integer().filter(|n| *n > 0).ok_or_else(not_found)?;
    let pauses: Vec<Func> = ["breakpoint", "pause"]
        .iter()
        .filter_map(|name| task.lib_get(name).and_then(|c| c.as_func()))
        .collect();
    task.calls
        .iter()
        .rev()
        .filter(|c| pauses.iter().any(|p| p.same(&c.original)))
        .nth(n as usize - 1)
        .map(|c| c.varlist.clone())
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use std::io::sink;

    use super::*;
    use crate::config::Config;
    use crate::ren::throws::RenError;

    fn interpret(code: &str) -> Result<String, RenError> {
        let mut task = Task::new(Config::default())?;
        task.do_string(code).map(|v| v.to_string())
    }

    fn error_id(result: Result<String, RenError>) -> String {
        match result {
            Err(RenError::Error(err)) => err.id().map_or_else(String::new, |s| s.name().to_string()),
            other => panic!("expected an error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn conditionals() {
        assert_eq!("10", interpret("do [either true [10] [20]]").unwrap());
        assert_eq!("20", interpret("either 1 > 2 [10] [20]").unwrap());
        assert_eq!("#[void]", interpret("mold if false [1]").unwrap().trim_matches('"'));
        assert_eq!("3", interpret("all [1 2 3]").unwrap());
        assert_eq!("_", interpret("all [1 false 3]").unwrap());
        assert_eq!("2", interpret("any [false _ 2]").unwrap());
        assert_eq!("true", interpret("not _").unwrap());
    }

    #[test]
    fn loops() {
        assert_eq!("6", interpret("n: 0 for-each x [1 2 3] [n: n + x] n").unwrap());
        assert_eq!(
            "[b a d c]",
            interpret("out: copy [] for-each [k v] [a b c d] [append out reduce [v k]] out").unwrap()
        );
        assert_eq!("10", interpret("n: 0 repeat i 4 [n: n + i] n").unwrap());
        assert_eq!("5", interpret("n: 0 loop 5 [n: n + 1]").unwrap());
        assert_eq!("3", interpret("n: 0 while [n < 3] [n: n + 1] n").unwrap());
    }

    #[test]
    fn compose_and_reduce() {
        assert_eq!("[1 2 3]", interpret("compose [1 (1 + 1) (reduce [3])]").unwrap());
        assert_eq!("[1 [2]]", interpret("compose/only [1 ([2])]").unwrap());
        assert_eq!("[[2]]", interpret("compose/deep [[(1 + 1)]]").unwrap());
        assert_eq!("[3 x]", interpret("reduce [1 + 2 'x]").unwrap());
    }

    #[test]
    fn empty_groups_vanish() {
        assert_eq!("#[void]", interpret("mold do []").unwrap().trim_matches('"'));
        assert_eq!("1", interpret("do [1 ()]").unwrap());
        assert_eq!("1", interpret("do [() 1]").unwrap());
        assert_eq!("[1 2]", interpret("reduce [1 comment [x] 2]").unwrap());
    }

    #[test]
    fn definitional_return() {
        assert_eq!("6", interpret("f: func [x [integer!]] [return x * 2 100] f 3").unwrap());
        assert_eq!(
            "bad-return-type",
            error_id(interpret("f: func [return: [integer!]] [return \"no\"] f"))
        );
        assert_eq!("invalid-exit", error_id(interpret("r: _ f: func [] [set 'r :return] f r 1")));
    }

    #[test]
    fn leave_and_exit() {
        assert_eq!("#[void]", interpret("p: proc [] [leave 1] mold p").unwrap().trim_matches('"'));
        assert_eq!(
            "5",
            interpret("g: func [] [exit/with 5 1] h: func [] [g] h").unwrap()
        );
        assert_eq!(
            "7",
            interpret("g: func [] [exit/with/from 7 2 1] h: func [] [g 2] h").unwrap()
        );
    }

    #[test]
    fn redo_restarts_frame() {
        assert_eq!(
            "3",
            interpret("n: 0 f: func [x] [n: n + 1 if n < 3 [redo 'x] n] f 0").unwrap()
        );
    }

    #[test]
    fn named_catch() {
        assert_eq!("7", interpret("catch/name [throw/name 7 'foo] 'foo").unwrap());
        assert_eq!("no-catch", error_id(interpret("catch/name [throw/name 7 'foo] 'bar")));
        assert_eq!("8", interpret("catch [throw 8]").unwrap());
        assert_eq!("9", interpret("catch/any [throw/name 9 'x]").unwrap());
        assert_eq!(
            "[1 x]",
            interpret("catch/name/with [throw/name 1 'x] 'x func [v n] [reduce [v n]]").unwrap()
        );
        assert_eq!("use-fail-for-error", error_id(interpret("throw trap [fail \"x\"]")));
    }

    #[test]
    fn quit_passes_plain_catch() {
        match interpret("catch/any [quit/with 4]") {
            Err(RenError::Quit(4)) => (),
            other => panic!("expected quit, got {:?}", other.map(|_| ())),
        }
        assert_eq!("4", interpret("catch/quit [quit/with 4]").unwrap());
    }

    #[test]
    fn trap_restores_state() {
        assert_eq!("true", interpret("error? trap [1 + \"a\"]").unwrap());
        assert_eq!(
            "\"boom\"",
            interpret("trap/with [fail \"boom\"] func [e] [e/message]").unwrap()
        );
        assert_eq!("2", interpret("trap [1 + 1]").unwrap());
        match interpret("trap [halt]") {
            Err(RenError::Halt) => (),
            other => panic!("expected halt, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn apply_fills_by_name() {
        assert_eq!("[1 2]", interpret("f: func [a b] [reduce [a b]] apply :f [b: 2 a: 1]").unwrap());
        assert_eq!(
            "[1 2 3]",
            interpret("apply 'append [series: copy [1 2] value: 3]").unwrap()
        );
    }

    #[test]
    fn pause_without_hook_is_default() {
        assert_eq!("1", interpret("pause 1").unwrap());
        assert_eq!("[1 2]", interpret("reduce [1 breakpoint 2]").unwrap());
    }

    #[test]
    fn hook_resumes_with_value() {
        let mut task = Task::new(Config::default()).unwrap();
        task.set_breakpoint_hook(Box::new(|_task, instruction, _| {
            *instruction = Resume {
                mode: ResumeMode::With,
                payload: Cell::integer(5),
                target: None,
            }
            .to_cell();
            false
        }));
        assert_eq!(Some(5), task.do_string("pause 1").unwrap().as_integer());
        assert_eq!(Some(6), task.do_string("1 + breakpoint").unwrap().as_integer());
    }

    fn lines(input: &[&str]) -> impl FnMut() -> io::Result<Option<String>> + 'static {
        let mut lines: Vec<String> = input.iter().map(|l| l.to_string()).collect();
        lines.reverse();
        move || Ok(lines.pop())
    }

    #[test]
    fn console_hook_runs_lines() {
        let mut task = Task::new(Config::default()).unwrap();
        task.set_breakpoint_hook(console_hook(lines(&["x: 20", "resume/do [x + 1]"]), sink()));
        assert_eq!(Some(21), task.do_string("pause 1").unwrap().as_integer());

        task.set_breakpoint_hook(console_hook(lines(&["quit/with 3"]), sink()));
        assert!(matches!(task.do_string("pause 1"), Err(RenError::Quit(3))));

        task.set_breakpoint_hook(console_hook(lines(&[]), sink()));
        assert!(matches!(task.do_string("breakpoint"), Err(RenError::Quit(0))));
    }
}
