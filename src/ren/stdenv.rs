// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/stdenv.rs

// The native library: the table macro natives are declared with, the
// function-making and data natives, and boot, which turns every table
// into library functions and runs the boot script.

// <>

use super::actions;
use super::binding::{
    bind_deep, binding_of, collect_set_words, derive_specifier, get_var, set_var, BindMode,
};
use super::cell::{Cell, CellFlags};
use super::compare::{compare_values, equal_values, hash_value, same_values};
use super::compose;
use super::context::Context;
use super::control;
use super::error::{fail, ErrId};
use super::frame::{Feed, Frame, FrameFlags, R};
use super::func::{make_function, make_interpreted, Dispatcher, Func, FuncFlags};
use super::kinds::{typeset_by_name, Kind, TYPESET_NAMES};
use super::mold::{form_value, mold_with, MoldOpts};
use super::paramlist::{make_paramlist, MakeFlags, ParamClass};
use super::scan::{scan_source, scan_utf8};
use super::series::Array;
use super::symtab::Sym;
use super::task::{Special, Task};
use super::throws::Flow;
use super::varargs::delect;

/// Generates a slice of natives with their names and spec blocks
///
/// The syntax reads like a function definition: a name, a spec in
/// the language's own notation, the names the arguments are bound to
/// (one per frame slot, refinements included), and a body that
/// returns a dispatcher result code.
macro_rules! ren_fn {
    ( const $array:ident; $task:ident $f:ident;
      $( $name:literal $spec:literal [ $($args:ident),* ] $body:block )+
    ) => {
        pub const $array: &[(&str, &str, $crate::ren::func::Dispatcher)] =
            &[$(($name, $spec, |
                _task: &mut $crate::ren::task::Task,
                _f: &mut $crate::ren::frame::Frame,
              | -> Result<$crate::ren::frame::R, $crate::ren::throws::Flow> {
                    #[allow(unused_variables)]
                    let $task = _task;
                    #[allow(unused_variables)]
                    let $f = _f;

                    #[allow(unused_mut)]
                    let mut _ind = 0;
                    $(
                        _ind += 1;
                        let $args = $f.arg(_ind);
                    )*

                        $body
                })),+];
    };
}

/// Hand a native's result to the dispatch loop
pub(crate) fn out(f: &mut Frame, value: Cell) -> Result<R, Flow> {
    if value.is_void() {
        return Ok(R::Void);
    }
    f.out = value;
    Ok(R::Out)
}

pub(crate) fn logic(b: bool) -> Result<R, Flow> {
    Ok(if b { R::True } else { R::False })
}

pub(crate) fn array_of(cell: &Cell) -> Result<(Array, usize), Flow> {
    cell.array_parts()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[cell.clone()]))
}

pub(crate) fn word_of(sym: Sym) -> Cell {
    Cell::word(Kind::Word, sym)
}

/// Label cell for error reports; blank when anonymous
pub(crate) fn label_of(label: Option<Sym>) -> Cell {
    label.map_or_else(Cell::blank, word_of)
}

/// The function a FUNCTION!, word or path argument refers to, its
/// value as found, and the name it was reached by
pub(crate) fn function_of(task: &mut Task, cell: &Cell) -> Result<(Func, Cell, Option<Sym>), Flow> {
    let (value, label) = match cell.kind() {
        Kind::Function => (cell.clone(), None),
        kind if kind.any_word() => (get_var(cell, None)?, cell.word_sym()),
        kind if kind.any_path() => {
            let last = cell
                .array_parts()
                .and_then(|(a, _)| a.get(a.len().checked_sub(1)?))
                .and_then(|c| c.word_sym());
            (task.get_path(&cell.with_kind(Kind::GetPath), None)?, last)
        }
        _ => return Err(fail(ErrId::InvalidArg, &[cell.clone()])),
    };
    let func = value
        .as_func()
        .ok_or_else(|| fail(ErrId::InvalidArg, &[cell.clone()]))?;
    Ok((func, value, label))
}

/// Every value a block evaluates to, in order; voids are skipped
pub(crate) fn reduce_block(task: &mut Task, block: &Cell) -> Result<Vec<Cell>, Flow> {
    let (array, index) = array_of(block)?;
    let feed = Feed::new(array, index, derive_specifier(None, block));
    let mut values = Vec::new();
    while let Some(value) = task.eval_next(&feed, FrameFlags::empty())? {
        if !value.is_void() {
            values.push(value);
        }
    }
    Ok(values)
}

/// Parameter as it is written in a spec: the class picks the word kind
fn decorated(param: &Cell, tight_as_issue: bool) -> Option<Cell> {
    let sym = param.param_sym()?;
    let kind = match param.param_class()? {
        ParamClass::Normal => Kind::Word,
        ParamClass::Tight if tight_as_issue => Kind::Issue,
        ParamClass::Tight => Kind::Word,
        ParamClass::HardQuote => Kind::GetWord,
        ParamClass::SoftQuote => Kind::LitWord,
        ParamClass::Refinement => Kind::Refinement,
        ParamClass::Local | ParamClass::Return | ParamClass::Leave => return None,
    };
    Some(Cell::word(kind, sym))
}

/// Spec of FUNCTION: set-words of the body not named in the spec
/// become locals
fn gather_locals(spec: &Cell, body: &Cell) -> Result<Cell, Flow> {
    let (spec_array, spec_index) = array_of(spec)?;
    let (body_array, body_index) = array_of(body)?;
    let mut cells = spec_array.slice(spec_index);
    let named: Vec<Sym> = cells
        .iter()
        .filter(|c| c.any_word())
        .filter_map(|c| c.word_sym())
        .collect();
    let locals: Vec<Sym> = collect_set_words(&body_array, body_index, true)
        .into_iter()
        .filter(|s| !named.iter().any(|n| n.same_canon(*s)))
        .collect();
    if !locals.is_empty() {
        cells.push(Cell::string_of(Kind::Tag, "local"));
        cells.extend(locals.into_iter().map(word_of));
    }
    Ok(Cell::block(Array::from_cells(cells)).with_binding(spec.binding().clone()))
}

fn context_arg(cell: &Cell) -> Result<Context, Flow> {
    match cell.as_context() {
        Some(ctx) => Ok(ctx),
        None if cell.any_word() => binding_of(cell, None)
            .ok_or_else(|| fail(ErrId::NotBound, &[cell.with_kind(Kind::Word)])),
        None => Err(fail(ErrId::InvalidArg, &[cell.clone()])),
    }
}

fn freeze_value(value: &Cell, deep: bool) {
    if let Some((array, _)) = value.array_parts() {
        if deep {
            array.freeze_deep()
        } else {
            array.freeze()
        }
    } else if let Some((text, _)) = value.text_parts() {
        text.freeze()
    } else if let Some((bin, _)) = value.bytes_parts() {
        bin.freeze()
    } else if let Some(ctx) = value.as_context() {
        ctx.varlist().freeze();
        if deep {
            for cell in ctx.varlist().slice(1) {
                freeze_value(&cell, true);
            }
        }
    }
}

fn is_frozen(value: &Cell) -> bool {
    if let Some((array, _)) = value.array_parts() {
        array.is_frozen()
    } else if let Some((text, _)) = value.text_parts() {
        text.is_frozen()
    } else if let Some((bin, _)) = value.bytes_parts() {
        bin.is_frozen()
    } else if let Some(ctx) = value.as_context() {
        ctx.varlist().is_frozen()
    } else {
        !matches!(value.kind(), Kind::Map | Kind::Varargs | Kind::Function)
    }
}

ren_fn! {
    const FUNCTION_NATIVES;
    task f;

    "func" "[spec [block!] body [block!]]" [spec, body] {
        let func = make_interpreted(task, &spec, &body, None, MakeFlags::RETURN)?;
        out(f, func.to_cell())
    }

    "proc" "[spec [block!] body [block!]]" [spec, body] {
        let func = make_interpreted(task, &spec, &body, None, MakeFlags::LEAVE)?;
        out(f, func.to_cell())
    }

    "function" "[spec [block!] body [block!]]" [spec, body] {
        let spec = gather_locals(&spec, &body)?;
        let func = make_interpreted(task, &spec, &body, None, MakeFlags::RETURN)?;
        out(f, func.to_cell())
    }

    "does" "[body [block!]]" [body] {
        let spec = Cell::block(Array::empty());
        let func = make_interpreted(task, &spec, &body, None, MakeFlags::empty())?;
        out(f, func.to_cell())
    }

    "specialize" "[specializee [function! any-word! any-path!] def [block!]]" [specializee, def] {
        let (func, _, label) = function_of(task, &specializee)?;
        let special = compose::specialize(task, &func, &label_of(label), &def)?;
        out(f, special.to_cell())
    }

    "adapt" "[adaptee [function! any-word! any-path!] prelude [block!]]" [adaptee, prelude] {
        let (func, _, _) = function_of(task, &adaptee)?;
        out(f, compose::adapt(&func, &prelude)?.to_cell())
    }

    "chain" "[pipeline [block!]]" [pipeline] {
        let funcs = reduce_block(task, &pipeline)?;
        out(f, compose::chain(&funcs)?.to_cell())
    }

    "enclose" "[inner [function! any-word! any-path!] outer [function! any-word! any-path!]]" [inner, outer] {
        let (_, inner, _) = function_of(task, &inner)?;
        let (_, outer, _) = function_of(task, &outer)?;
        out(f, compose::enclose(&inner, &outer)?.to_cell())
    }

    "hijack" "[victim [any-word! any-path!] hijacker [function! any-word! any-path!]]" [victim, hijacker] {
        let (victim, _, _) = function_of(task, &victim)?;
        let (_, hijacker, _) = function_of(task, &hijacker)?;
        out(f, compose::hijack(&victim, &hijacker)?.to_cell())
    }

    "tighten" "[action [function! any-word! any-path!]]" [action] {
        let (func, _, _) = function_of(task, &action)?;
        out(f, compose::tighten(&func)?.to_cell())
    }

    "typechecker" "[type [datatype! typeset!]]" [kind] {
        out(f, compose::typechecker(&kind)?.to_cell())
    }

    "enfix" "[action [function!]]" [action] {
        out(f, action.with_flag(CellFlags::ENFIXED))
    }

    "enfixed?" "[action [function! any-word!]]" [action] {
        let value = if action.any_word() { get_var(&action, None)? } else { action };
        logic(value.is_enfixed())
    }

    "underlying" "[action [function! any-word! any-path!]]" [action] {
        let (func, _, _) = function_of(task, &action)?;
        out(f, func.underlying().to_cell())
    }

    "words-of" "[value [function! any-context! map!]]" [value] {
        let words: Vec<Cell> = if let Some(func) = value.as_func() {
            func.params().iter().filter_map(|p| decorated(p, false)).collect()
        } else if let Some(map) = value.as_map() {
            map.pairs().into_iter().map(|(k, _)| k).collect()
        } else {
            let ctx = context_arg(&value)?;
            ctx.pairs()?.into_iter().map(|(sym, _)| word_of(sym)).collect()
        };
        out(f, Cell::block(Array::from_cells(words)))
    }

    "spec-of" "[action [function!]]" [action] {
        let func = action
            .as_func()
            .ok_or_else(|| fail(ErrId::InvalidArg, &[action.clone()]))?;
        let spec = func.params().iter().filter_map(|p| decorated(p, true)).collect();
        out(f, Cell::block(Array::from_cells(spec)))
    }

    "body-of" "[action [function!]]" [action] {
        let func = action
            .as_func()
            .ok_or_else(|| fail(ErrId::InvalidArg, &[action.clone()]))?;
        let body = func.body();
        match body.array_parts() {
            Some((array, index)) if func.flags().contains(FuncFlags::INTERPRETED) => {
                out(f, Cell::block(array.copy_deep(index)))
            }
            _ if func.flags().intersects(FuncFlags::NATIVE | FuncFlags::ACTION) => Ok(R::Blank),
            _ => out(f, body),
        }
    }
}

ren_fn! {
    const DATA_NATIVES;
    task f;

    "set" "[target [any-word! any-path! block!] value [<opt> any-value!] /opt]" [target, value, opt] {
        if value.is_void() && !opt.is_truthy() {
            return Err(fail(ErrId::NeedValue, &[target]));
        }
        if target.any_word() {
            set_var(&target, None, value.clone())?;
        } else if target.any_path() {
            task.set_path(&target, None, value.clone())?;
        } else {
            let (array, index) = array_of(&target)?;
            let spread = value.array_parts().filter(|_| value.kind() == Kind::Block);
            for (i, word) in array.slice(index).iter().enumerate() {
                let item = match &spread {
                    Some((values, at)) => values.get(at + i).unwrap_or_else(Cell::blank),
                    None => value.clone(),
                };
                set_var(word, None, item)?;
            }
        }
        out(f, value)
    }

    "get" "[source [any-word! any-path! any-context!] /opt]" [source, opt] {
        let value = if source.any_word() {
            get_var(&source, None)?
        } else if source.any_path() {
            task.get_path(&source.with_kind(Kind::GetPath), None)?
        } else {
            let ctx = context_arg(&source)?;
            let values = ctx.pairs()?.into_iter().map(|(_, v)| v).collect();
            Cell::block(Array::from_cells(values))
        };
        if value.is_void() && !opt.is_truthy() {
            return Err(fail(ErrId::NoValue, &[source]));
        }
        out(f, value)
    }

    "value?" "[value [<opt> any-value!]]" [value] {
        if value.any_word() {
            return logic(get_var(&value, None).map_or(false, |v| !v.is_void()));
        }
        logic(!value.is_void())
    }

    "type-of" "[value [<opt> any-value!]]" [value] {
        out(f, Cell::datatype(value.kind()))
    }

    "mold" "[value [<opt> any-value!] /all /only]" [value, all, only] {
        let opts = MoldOpts {
            all: all.is_truthy(),
            only: only.is_truthy(),
            ..MoldOpts::default()
        };
        let text = mold_with(&mut task.mold, &value, opts);
        out(f, Cell::string(&text))
    }

    "form" "[value [<opt> any-value!]]" [value] {
        let opts = MoldOpts { form: true, ..MoldOpts::default() };
        let text = mold_with(&mut task.mold, &value, opts);
        out(f, Cell::string(&text))
    }

    "print" "[line [<opt> any-value!]]" [line] {
        let line = if line.kind() == Kind::Block {
            Cell::block(Array::from_cells(reduce_block(task, &line)?))
        } else {
            line
        };
        println!("{}", form_value(&line));
        Ok(R::Void)
    }

    "equal?" "[value1 [<opt> any-value!] value2 [<opt> any-value!]]" [a, b] {
        logic(equal_values(&a, &b, false))
    }

    "strict-equal?" "[value1 [<opt> any-value!] value2 [<opt> any-value!]]" [a, b] {
        logic(equal_values(&a, &b, true))
    }

    "same?" "[value1 [<opt> any-value!] value2 [<opt> any-value!]]" [a, b] {
        logic(same_values(&a, &b))
    }

    "not-equal?" "[value1 [<opt> any-value!] value2 [<opt> any-value!]]" [a, b] {
        logic(!equal_values(&a, &b, false))
    }

    "lesser?" "[value1 [any-value!] value2 [any-value!]]" [a, b] {
        logic(compare_values(&a, &b)?.is_lt())
    }

    "greater?" "[value1 [any-value!] value2 [any-value!]]" [a, b] {
        logic(compare_values(&a, &b)?.is_gt())
    }

    "lesser-or-equal?" "[value1 [any-value!] value2 [any-value!]]" [a, b] {
        logic(compare_values(&a, &b)?.is_le())
    }

    "greater-or-equal?" "[value1 [any-value!] value2 [any-value!]]" [a, b] {
        logic(compare_values(&a, &b)?.is_ge())
    }

    "hash" "[value [any-value!]]" [value] {
        out(f, Cell::integer(i64::from(hash_value(&value))))
    }

    "freeze" "[value [any-series! any-context!] /deep]" [value, deep] {
        freeze_value(&value, deep.is_truthy());
        out(f, value)
    }

    "frozen?" "[value [any-value!]]" [value] {
        logic(is_frozen(&value))
    }

    "bind" "[target [block! any-word!] context [any-context! any-word!] /copy]" [target, context, copy] {
        let ctx = context_arg(&context)?;
        if let Some(sym) = target.word_sym().filter(|_| target.any_word()) {
            let index = ctx
                .find(sym)
                .ok_or_else(|| fail(ErrId::NotInContext, &[target.with_kind(Kind::Word)]))?;
            return out(f, Cell::bound_word(target.kind(), sym, &ctx, index));
        }
        let (array, index) = array_of(&target)?;
        if copy.is_truthy() {
            let copied = array.copy_deep(index);
            bind_deep(&copied, 0, &ctx, BindMode::Existing);
            return out(f, target.with_array(copied, 0));
        }
        bind_deep(&array, index, &ctx, BindMode::Existing);
        out(f, target)
    }

    "in" "[context [any-context!] word [any-word!]]" [context, word] {
        let ctx = context_arg(&context)?;
        match word.word_sym().and_then(|sym| Some((sym, ctx.find(sym)?))) {
            Some((sym, index)) => out(f, Cell::bound_word(word.kind(), sym, &ctx, index)),
            None => Ok(R::Blank),
        }
    }

    "load" "[source [string! binary!] /all]" [source, all] {
        let array = match source.bytes_parts() {
            Some((bin, index)) => scan_utf8(&bin.slice(index), None)?,
            None => scan_source(&source.as_text().unwrap_or_default(), None)?,
        };
        bind_deep(&array, 0, &task.lib, BindMode::AddAll);
        if !all.is_truthy() && array.len() == 1 {
            if let Some(single) = array.get(0) {
                return out(f, single);
            }
        }
        out(f, Cell::block(array))
    }

    "recycle" "[]" [] {
        let stats = task.heap.recycle(task.calls.len() <= 1);
        out(f, Cell::integer(stats.series_managed as i64))
    }

    "delect" "[dialect [object!] input [block!] output [block!]]" [dialect, input, output] {
        let ctx = context_arg(&dialect)?;
        let (array, _) = array_of(&output)?;
        out(f, delect(&ctx, &input, &array)?)
    }
}

/// Definitions written in the language itself, run once the natives
/// and actions are in place
const BOOT: &str = r#"
+: enfix tighten :add
-: enfix tighten :subtract
*: enfix tighten :multiply
/: enfix tighten :divide
=: enfix tighten :equal?
==: enfix tighten :strict-equal?
<>: enfix tighten :not-equal?
<: enfix tighten :lesser?
>: enfix tighten :greater?
<=: enfix tighten :lesser-or-equal?
>=: enfix tighten :greater-or-equal?

first: specialize 'pick [index: 1]
second: specialize 'pick [index: 2]
third: specialize 'pick [index: 3]

probe: func [value [<opt> any-value!]] [
    print mold :value
    :value
]

join: func [base [any-series!] value [<opt> any-value!]] [
    append copy base :value
]
"#;

/// Make one library function from a spec string
fn register(
    task: &mut Task,
    name: &str,
    spec: &str,
    dispatcher: Dispatcher,
    flags: FuncFlags,
    body: Cell,
) -> Result<(), Flow> {
    let spec = scan_source(spec, None)?;
    let (spec_array, spec_index) = match spec.get(0).and_then(|c| c.array_parts()) {
        Some(parts) => parts,
        None => (spec, 0),
    };
    let paramlist = make_paramlist(task, &spec_array, spec_index, None, MakeFlags::empty())?;
    let func = make_function(paramlist, dispatcher, None, None)?;
    func.set_flags(flags);
    func.set_body(body);
    task.lib_set(name, func.to_cell());
    Ok(())
}

fn special(task: &Task, name: &str) -> Result<Func, Flow> {
    task.lib_get(name)
        .and_then(|c| c.as_func())
        .ok_or_else(|| fail(ErrId::Misc, &[Cell::string(name)]))
}

/// Populate a bare task's library
pub fn boot(task: &mut Task) -> Result<(), Flow> {
    let mut natives = 0;
    for table in [
        FUNCTION_NATIVES,
        DATA_NATIVES,
        control::CONTROL_NATIVES,
        actions::MAKE_NATIVES,
    ] {
        for (name, spec, dispatcher) in table {
            register(task, name, spec, *dispatcher, FuncFlags::NATIVE, Cell::blank())?;
            natives += 1;
        }
    }

    for (verb, spec) in actions::ACTIONS {
        let body = word_of(Sym::intern(verb));
        register(task, verb, spec, actions::action_dispatcher, FuncFlags::ACTION, body)?;
    }

    for (which, name) in [
        (Special::Return, "return"),
        (Special::Leave, "leave"),
        (Special::Exit, "exit"),
        (Special::Redo, "redo"),
        (Special::Quit, "quit"),
        (Special::Resume, "resume"),
    ] {
        let func = special(task, name)?;
        task.specials.set(which, func);
    }

    task.lib_set("true", Cell::logic(true));
    task.lib_set("false", Cell::logic(false));
    task.lib_set("blank", Cell::blank());
    for kind in Kind::all() {
        task.lib_set(&format!("{}!", kind.name()), Cell::datatype(kind));
    }
    for name in TYPESET_NAMES {
        if let Some(bits) = typeset_by_name(name) {
            task.lib_set(name, Cell::typeset(bits));
        }
    }

    let mut script = String::from(BOOT);
    let mut checkers = 0;
    for kind in Kind::all() {
        script.push_str(&format!("{}?: typechecker {}!\n", kind.name(), kind.name()));
        checkers += 1;
    }
    let code = task.load(&script, Some("boot"))?;
    task.do_array(&code, 0, None)?;

    log::info!(
        "boot loaded {} natives, {} actions and {} typecheckers",
        natives,
        actions::ACTIONS.len(),
        checkers
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::ren::task::Task;
    use crate::ren::throws::RenError;

    fn interpret(code: &str) -> Result<String, RenError> {
        let mut task = Task::new(Config::default())?;
        task.do_string(code).map(|v| v.to_string())
    }

    #[test]
    fn boot_defines_operators() {
        assert_eq!("9", interpret("1 + 2 * 3").unwrap());
        assert_eq!("true", interpret("3 >= 3").unwrap());
        assert_eq!("false", interpret("1 = 2").unwrap());
        assert_eq!("true", interpret("integer? 7").unwrap());
        assert_eq!("2", interpret("second [1 2 3]").unwrap());
    }

    #[test]
    fn function_gathers_locals() {
        assert_eq!(
            "[a]",
            interpret("f: function [a] [b: a + 1 c: b] words-of :f").unwrap()
        );
        assert_eq!(
            "5",
            interpret("b: 5 f: function [a] [b: a] f 1 b").unwrap()
        );
        assert_eq!(
            "1",
            interpret("b: 5 f: function [a <with> b] [b: a] f 1 b").unwrap()
        );
    }

    #[test]
    fn spec_and_words() {
        assert_eq!(
            "[a :b 'c /d e]",
            interpret("f: func [a :b 'c /d e] [] words-of :f").unwrap()
        );
        assert_eq!(
            "[#a #b]",
            interpret("spec-of tighten func [a b] [a]").unwrap()
        );
        assert_eq!("[x: 1]", interpret("body-of func [] [x: 1]").unwrap());
    }

    #[test]
    fn set_and_get() {
        assert_eq!("[1 2]", interpret("set [a b] [1 2] reduce [a b]").unwrap());
        assert_eq!("3", interpret("set 'a 3 get 'a").unwrap());
        assert!(interpret("set 'a ()").is_err());
        assert_eq!("false", interpret("value? 'never-set-anywhere").unwrap());
    }

    #[test]
    fn comparisons() {
        assert_eq!("true", interpret("equal? 1 1.0").unwrap());
        assert_eq!("false", interpret("strict-equal? 1 1.0").unwrap());
        assert_eq!("false", interpret("same? 1 1.0").unwrap());
        assert_eq!("true", interpret("equal? hash \"ABC\" hash \"abc\"").unwrap());
        assert_eq!("true", interpret("lesser? 1 2.5").unwrap());
    }

    #[test]
    fn freezing() {
        assert!(interpret("b: freeze/deep [1 [2]] append b 3").is_err());
        assert!(interpret("b: freeze/deep [1 [2]] append second b 3").is_err());
        assert_eq!("1", interpret("b: freeze [1 2] first b").unwrap());
        assert_eq!("true", interpret("frozen? freeze copy \"x\"").unwrap());
    }

    #[test]
    fn binding_natives() {
        assert_eq!(
            "10",
            interpret("o: make object! [x: 10] get in o 'x").unwrap()
        );
        assert_eq!(
            "10",
            interpret("o: make object! [x: 10] do bind [x] o").unwrap()
        );
        assert_eq!("_", interpret("o: make object! [x: 10] in o 'y").unwrap());
    }

    #[test]
    fn load_single_and_all() {
        assert_eq!("1", interpret("load \"1\"").unwrap());
        assert_eq!("[1]", interpret("load/all \"1\"").unwrap());
        assert_eq!("3", interpret("do load \"1 + 2\"").unwrap());
    }

    #[test]
    fn enfix_queries() {
        assert_eq!("true", interpret("enfixed? '+").unwrap());
        assert_eq!("false", interpret("enfixed? 'add").unwrap());
        assert_eq!("true", interpret("same? underlying :+ :add").unwrap());
    }
}
