// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/paramlist.rs

// Turns a function spec block into a paramlist: the archetype cell
// followed by one typeset per parameter, plus the meta object that
// carries descriptions, type blocks and notes for help.

// <>

use bitflags::bitflags;

use super::binding::get_var;
use super::cell::{Cell, CellFlags};
use super::context::Context;
use super::error::{fail, ErrId};
use super::func::{Archetype, FuncFlags};
use super::kinds::{typeset_by_name, Kind, TypeBits};
use super::series::{Array, Link, SeriesFlags};
use super::symtab::*;
use super::task::Task;
use super::throws::Flow;

/// How a parameter gets its argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamClass {
    /// evaluated, with enfix lookahead
    Normal,
    /// evaluated without enfix lookahead
    Tight,
    /// taken literally
    HardQuote,
    /// taken literally unless a group, get-word or get-path
    SoftQuote,
    Refinement,
    /// not filled by the caller
    Local,
    /// definitional return slot
    Return,
    /// definitional leave slot
    Leave,
}

impl ParamClass {
    /// Classes that consume an argument from the caller
    pub fn takes_arg(self) -> bool {
        matches!(
            self,
            ParamClass::Normal | ParamClass::Tight | ParamClass::HardQuote | ParamClass::SoftQuote
        )
    }

    /// Classes that never appear in the public interface
    pub fn is_hidden(self) -> bool {
        matches!(self, ParamClass::Local | ParamClass::Return | ParamClass::Leave)
    }
}

bitflags! {
    /// Options for generating a function from a spec
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MakeFlags: u8 {
        /// add a definitional RETURN unless the spec declares one
        const RETURN = 1 << 0;
        /// add a definitional LEAVE unless the spec declares one
        const LEAVE = 1 << 1;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Local,
    With,
}

/// One collected parameter: its key, its type block, and its note
struct Entry {
    key: Cell,
    types: Cell,
    note: Cell,
}

impl Entry {
    fn push(self, task: &mut Task) {
        task.ds.push(self.key);
        task.ds.push(self.types);
        task.ds.push(self.note);
    }
}

fn bad_spec(cell: &Cell) -> Flow {
    fail(ErrId::BadFuncDef, &[cell.clone()])
}

fn default_bits(class: ParamClass) -> TypeBits {
    match class {
        ParamClass::Refinement => TypeBits::of(&[Kind::Logic]),
        ParamClass::Local | ParamClass::Return | ParamClass::Leave => {
            TypeBits::any_value().with(Kind::Void)
        }
        _ => TypeBits::any_value(),
    }
}

/// Fold a type block into the typeset and flags of `key`
fn apply_types(
    key: &mut Cell,
    types: &Cell,
    specifier: Option<&Context>,
    after_refinement: bool,
) -> Result<(), Flow> {
    let Some((array, index)) = types.array_parts() else {
        return Err(bad_spec(types));
    };
    let mut bits = TypeBits::NONE;
    for item in array.slice(index) {
        match item.kind() {
            Kind::Word => {
                let name = item.word_sym().map(|s| s.name()).unwrap_or_default();
                if let Some(kind) = Kind::from_name(&name).filter(|_| name.ends_with('!')) {
                    bits = bits.with(kind);
                } else if let Some(set) = typeset_by_name(&name) {
                    bits = bits.union(set);
                } else {
                    let value = get_var(&item, specifier).map_err(|_| bad_spec(&item))?;
                    if let Some(kind) = value.datatype_kind() {
                        bits = bits.with(kind);
                    } else if let Some(set) = value.typeset_bits() {
                        bits = bits.union(set);
                    } else {
                        return Err(bad_spec(&item));
                    }
                }
            }
            Kind::Tag => match item.as_text().as_deref() {
                Some("opt") => {
                    if after_refinement {
                        let name = key.param_sym().map_or_else(|| key.clone(), |sym| Cell::word(Kind::Word, sym));
                        return Err(fail(ErrId::RefinementArgOpt, &[name]));
                    }
                    bits = bits.with(Kind::Void)
                }
                Some("end") => key.flags |= CellFlags::ENDABLE,
                Some("...") => key.flags |= CellFlags::VARIADIC,
                _ => return Err(bad_spec(&item)),
            },
            Kind::Datatype => {
                if let Some(kind) = item.datatype_kind() {
                    bits = bits.with(kind);
                }
            }
            Kind::Typeset => {
                if let Some(set) = item.typeset_bits() {
                    bits = bits.union(set);
                }
            }
            _ => return Err(bad_spec(&item)),
        }
    }
    if let super::cell::Payload::Typeset { bits: b, .. } = &mut key.payload {
        *b = bits;
    }
    Ok(())
}

/// Walk the spec, pushing one entry per parameter onto the data
/// stack above `base`; the first entry describes the function itself
fn collect(
    task: &mut Task,
    base: usize,
    spec: &Array,
    index: usize,
    specifier: Option<&Context>,
) -> Result<(), Flow> {
    Entry {
        key: Cell::blank(),
        types: Cell::blank(),
        note: Cell::blank(),
    }
    .push(task);

    let mut mode = Mode::Normal;
    let mut durable = false;
    let mut after_refinement = false;

    for item in spec.slice(index) {
        let top = task.ds.len() - 3;
        match item.kind() {
            Kind::String => {
                if !task.ds[top + 2].is_blank() {
                    return Err(bad_spec(&item));
                }
                task.ds[top + 2] = item.clone();
            }
            Kind::Tag => match item.as_text().as_deref() {
                Some("local") => mode = Mode::Local,
                Some("with") => mode = Mode::With,
                Some("durable") => durable = true,
                _ => return Err(bad_spec(&item)),
            },
            Kind::Block => {
                let mut key = task.ds[top].clone();
                if key.is_blank()
                    || !task.ds[top + 1].is_blank()
                    || key.param_class() == Some(ParamClass::Refinement)
                {
                    return Err(bad_spec(&item));
                }
                let refinement_arg =
                    after_refinement && key.param_class().map_or(false, |c| c.takes_arg());
                apply_types(&mut key, &item, specifier, refinement_arg)?;
                task.ds[top] = key;
                task.ds[top + 1] = item.clone();
            }
            kind if kind.any_word() || kind == Kind::Issue => {
                let sym = match item.word_sym() {
                    Some(sym) => sym,
                    None => match item.as_text() {
                        Some(text) => Sym::intern(&text),
                        None => return Err(bad_spec(&item)),
                    },
                };
                if mode == Mode::With {
                    continue;
                }
                let class = match (mode, kind) {
                    (Mode::Local, Kind::Word) => ParamClass::Local,
                    (Mode::Local, _) => return Err(bad_spec(&item)),
                    (_, Kind::Word) => ParamClass::Normal,
                    (_, Kind::Issue) => ParamClass::Tight,
                    (_, Kind::GetWord) => ParamClass::HardQuote,
                    (_, Kind::LitWord) => ParamClass::SoftQuote,
                    (_, Kind::Refinement) => ParamClass::Refinement,
                    (_, Kind::SetWord) if sym.same_canon(S_RETURN) => ParamClass::Return,
                    (_, Kind::SetWord) if sym.same_canon(S_LEAVE) => ParamClass::Leave,
                    _ => return Err(bad_spec(&item)),
                };

                let duplicate = task.ds[base + 3..]
                    .iter()
                    .step_by(3)
                    .filter_map(|k| k.param_sym())
                    .any(|s| s.same_canon(sym));
                if duplicate {
                    return Err(fail(ErrId::DupVars, &[Cell::word(Kind::Word, sym)]));
                }

                if class == ParamClass::Refinement {
                    after_refinement = true;
                }
                let mut key = Cell::param(sym, class, default_bits(class));
                if durable {
                    key.flags |= CellFlags::DURABLE;
                }
                Entry {
                    key,
                    types: Cell::blank(),
                    note: Cell::blank(),
                }
                .push(task);
            }
            _ => return Err(bad_spec(&item)),
        }
    }
    Ok(())
}

/// Object of per-parameter values, or blank when none were given
fn meta_field(keys: &[Cell], values: &[Cell]) -> Cell {
    if values.iter().all(|v| v.is_blank()) {
        return Cell::blank();
    }
    let ctx = Context::new(Kind::Object);
    for (key, value) in keys.iter().zip(values) {
        if let Some(sym) = key.param_sym() {
            let i = ctx.append_key(sym);
            ctx.init_var(i, value.clone());
        }
    }
    Cell::object(ctx)
}

/// Build a paramlist from the spec block `spec` at `index`
///
/// Definitional RETURN and LEAVE slots are appended when `flags` asks
/// for them and the spec neither declares nor shadows them.
pub fn make_paramlist(
    task: &mut Task,
    spec: &Array,
    index: usize,
    specifier: Option<&Context>,
    flags: MakeFlags,
) -> Result<Array, Flow> {
    let base = task.ds.len();
    task.heap.push_guard_array(spec);
    let collected = collect(task, base, spec, index, specifier);
    task.heap.drop_guard_array(spec);
    let triples = task.ds.split_off(base);
    collected?;

    let mut keys: Vec<Cell> = triples.iter().step_by(3).skip(1).cloned().collect();
    let mut types: Vec<Cell> = triples.iter().skip(1).step_by(3).skip(1).cloned().collect();
    let mut notes: Vec<Cell> = triples.iter().skip(2).step_by(3).skip(1).cloned().collect();
    let description = triples.get(2).cloned().unwrap_or_else(Cell::blank);

    let declared = |keys: &[Cell], sym: Sym| {
        keys.iter()
            .any(|k| k.param_sym().map_or(false, |s| s.same_canon(sym)))
    };
    let mut fflags = FuncFlags::empty();
    for (want, sym, class) in [
        (MakeFlags::RETURN, S_RETURN, ParamClass::Return),
        (MakeFlags::LEAVE, S_LEAVE, ParamClass::Leave),
    ] {
        if flags.contains(want) && !declared(&keys, sym) {
            keys.push(Cell::param(sym, class, default_bits(class)));
            types.push(Cell::blank());
            notes.push(Cell::blank());
        }
    }
    for key in &keys {
        match key.param_class() {
            Some(ParamClass::Return) => fflags |= FuncFlags::RETURN,
            Some(ParamClass::Leave) => fflags |= FuncFlags::LEAVE,
            _ => (),
        }
    }

    let mut cells = Vec::with_capacity(keys.len() + 1);
    cells.push(Cell::archetype(Archetype {
        flags: fflags,
        underlying: None,
    }));
    cells.extend(keys.iter().cloned());
    let paramlist = Array::from_vec(cells, SeriesFlags::ARRAY | SeriesFlags::PARAMLIST);

    let parameter_types = meta_field(&keys, &types);
    let parameter_notes = meta_field(&keys, &notes);
    if !description.is_blank() || !parameter_types.is_blank() || !parameter_notes.is_blank() {
        let meta = Context::from_names(
            Kind::Object,
            &[S_DESCRIPTION, S_PARAMETER_TYPES, S_PARAMETER_NOTES],
        );
        meta.init_var(1, description);
        meta.init_var(2, parameter_types);
        meta.init_var(3, parameter_notes);
        paramlist.set_link(Link::Meta(meta));
    }
    Ok(paramlist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::scan::scan_source;

    fn params(task: &mut Task, spec: &str, flags: MakeFlags) -> Result<Array, Flow> {
        let spec = scan_source(spec, None).unwrap();
        make_paramlist(task, &spec, 0, None, flags)
    }

    fn classes(paramlist: &Array) -> Vec<ParamClass> {
        paramlist
            .slice(1)
            .iter()
            .filter_map(|p| p.param_class())
            .collect()
    }

    #[test]
    fn classes_from_word_kinds() {
        let mut task = Task::bare();
        let pl = params(&mut task, "a #b :c 'd /e f <local> g", MakeFlags::empty()).unwrap();
        assert_eq!(
            vec![
                ParamClass::Normal,
                ParamClass::Tight,
                ParamClass::HardQuote,
                ParamClass::SoftQuote,
                ParamClass::Refinement,
                ParamClass::Normal,
                ParamClass::Local,
            ],
            classes(&pl)
        );
        assert!(task.ds.is_empty());
    }

    #[test]
    fn return_added_once() {
        let mut task = Task::bare();
        let pl = params(&mut task, "x", MakeFlags::RETURN).unwrap();
        assert_eq!(Some(ParamClass::Return), pl.get(2).and_then(|p| p.param_class()));

        let pl = params(&mut task, "return: [integer!] x", MakeFlags::RETURN).unwrap();
        assert_eq!(3, pl.len());
        let ret = pl.get(1).unwrap();
        assert_eq!(Some(ParamClass::Return), ret.param_class());
        assert!(ret.typeset_bits().unwrap().contains(Kind::Integer));
        assert!(!ret.typeset_bits().unwrap().contains(Kind::Block));
    }

    #[test]
    fn type_blocks_and_tags() {
        let mut task = Task::bare();
        let pl = params(&mut task, "v [<opt> <end> <...> integer! any-string!]", MakeFlags::empty())
            .unwrap();
        let v = pl.get(1).unwrap();
        let bits = v.typeset_bits().unwrap();
        assert!(bits.contains(Kind::Void));
        assert!(bits.contains(Kind::Tag));
        assert!(!bits.contains(Kind::Block));
        assert!(v.get_flag(CellFlags::ENDABLE));
        assert!(v.get_flag(CellFlags::VARIADIC));
    }

    #[test]
    fn bad_specs_fail_and_leave_stack_clean() {
        let mut task = Task::bare();
        for bad in ["a a", "[integer!]", "/r [integer!]", "<bogus>", "x: 10", "a \"one\" \"two\""] {
            assert!(params(&mut task, bad, MakeFlags::empty()).is_err(), "{}", bad);
            assert!(task.ds.is_empty());
            assert_eq!(0, task.heap.guard_depth());
        }
    }

    #[test]
    fn optional_refinement_argument_names_the_parameter() {
        let mut task = Task::bare();
        let Err(Flow::Error(err)) = params(&mut task, "/r x [<opt> integer!]", MakeFlags::empty())
        else {
            panic!("expected an error");
        };
        assert!(err.is(ErrId::RefinementArgOpt));
        assert!(err.to_string().contains("may not be optional: x"), "{}", err);
        assert!(task.ds.is_empty());
    }

    #[test]
    fn meta_only_when_documented() {
        let mut task = Task::bare();
        let pl = params(&mut task, "a b", MakeFlags::empty()).unwrap();
        assert!(matches!(pl.link(), Link::None));
        let pl = params(&mut task, "{Adds} a [integer!] {first}", MakeFlags::empty()).unwrap();
        let Link::Meta(meta) = pl.link() else {
            panic!("expected meta");
        };
        assert_eq!(Some("Adds".to_string()), meta.var(1).unwrap().as_text());
    }
}
