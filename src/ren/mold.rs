// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/mold.rs

// MOLD and FORM. Mold writes source text that loads back as the same
// value; form writes display text. Output goes to a buffer with a
// stack of checkpoints, and arrays and contexts being molded are
// tracked so cycles print as an ellipsis.

// <>

use std::fmt;

use super::cell::{Cell, Payload};
use super::context::Context;
use super::error::Error;
use super::func::Func;
use super::kinds::{Kind, TypeBits};
use super::paramlist::ParamClass;
use super::series::Array;

/// Growable output buffer shared by nested molds
#[derive(Default)]
pub struct MoldBuffer {
    buf: String,
    starts: Vec<usize>,
    /// addresses of arrays and contexts being molded
    cycles: Vec<usize>,
}

impl MoldBuffer {
    pub fn new() -> MoldBuffer {
        MoldBuffer::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn stack_depth(&self) -> usize {
        self.starts.len()
    }

    /// Rewind to a recorded length and checkpoint depth
    pub fn truncate(&mut self, len: usize, depth: usize) {
        if len <= self.buf.len() && self.buf.is_char_boundary(len) {
            self.buf.truncate(len);
        }
        self.starts.truncate(depth);
        if self.starts.is_empty() {
            self.cycles.clear();
        }
    }

    /// Checkpoint the current tail
    pub fn push(&mut self) -> usize {
        let start = self.buf.len();
        self.starts.push(start);
        start
    }

    /// Everything written since the matching `push`, rewinding to it
    pub fn pop(&mut self, start: usize) -> String {
        let text = self.buf.get(start..).unwrap_or_default().to_string();
        self.buf.truncate(start);
        if self.starts.last() == Some(&start) {
            self.starts.pop();
        }
        text
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s)
    }

    fn write_char(&mut self, c: char) {
        self.buf.push(c)
    }

    fn enter(&mut self, addr: usize) -> bool {
        if self.cycles.contains(&addr) {
            return false;
        }
        self.cycles.push(addr);
        true
    }

    fn exit(&mut self) {
        self.cycles.pop();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoldOpts {
    /// display text instead of source text
    pub form: bool,
    /// construction syntax for values that would otherwise load as
    /// words
    pub all: bool,
    /// no brackets around a top-level block
    pub only: bool,
    /// truncate with an ellipsis past this many bytes
    pub limit: Option<usize>,
}

/// Mold or form `cell` through a task's buffer
pub fn mold_with(buf: &mut MoldBuffer, cell: &Cell, opts: MoldOpts) -> String {
    let start = buf.push();
    if opts.only && cell.any_array() {
        if let Some((array, index)) = cell.array_parts() {
            emit_items(buf, &array, index, opts.form, opts.all);
        }
    } else {
        emit(buf, cell, opts.form, opts.all);
    }
    let mut text = buf.pop(start);
    if let Some(limit) = opts.limit {
        if text.len() > limit {
            let mut cut = limit;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("...");
        }
    }
    text
}

pub fn mold_value(cell: &Cell) -> String {
    mold_with(&mut MoldBuffer::new(), cell, MoldOpts::default())
}

pub fn form_value(cell: &Cell) -> String {
    mold_with(
        &mut MoldBuffer::new(),
        cell,
        MoldOpts {
            form: true,
            ..MoldOpts::default()
        },
    )
}

/// Mold a block's contents without its brackets
pub fn mold_only(cell: &Cell) -> String {
    mold_with(
        &mut MoldBuffer::new(),
        cell,
        MoldOpts {
            only: true,
            ..MoldOpts::default()
        },
    )
}

fn emit_items(buf: &mut MoldBuffer, array: &Array, index: usize, form: bool, all: bool) {
    for (i, item) in array.slice(index).iter().enumerate() {
        if i > 0 {
            buf.write_char(' ');
        }
        emit(buf, item, form, all);
    }
}

fn decimal_text(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e16 {
        format!("{:.1}", d)
    } else {
        format!("{}", d)
    }
}

/// Whole numbers without a fraction, others as decimals
fn coordinate(d: f64) -> String {
    if d.fract() == 0.0 && d.abs() < 1e16 {
        format!("{}", d as i64)
    } else {
        format!("{}", d)
    }
}

fn escape_char(c: char) -> Option<&'static str> {
    Some(match c {
        '\n' => "^/",
        '\t' => "^-",
        '^' => "^^",
        '"' => "^\"",
        '\0' => "^@",
        _ => return None,
    })
}

/// Characters that would end an unquoted file or url token
fn breaks_token(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | '"' | '{' | '}' | ';')
}

fn emit_quoted(buf: &mut MoldBuffer, text: &str) {
    buf.write_char('"');
    for c in text.chars() {
        match escape_char(c) {
            Some(esc) => buf.write(esc),
            None => buf.write_char(c),
        }
    }
    buf.write_char('"');
}

fn emit_array(buf: &mut MoldBuffer, cell: &Cell, array: &Array, index: usize, form: bool, all: bool) {
    let kind = cell.kind();
    let (open, close, sep) = match kind {
        Kind::Block => ("[", "]", " "),
        Kind::Group => ("(", ")", " "),
        Kind::Path => ("", "", "/"),
        Kind::SetPath => ("", ":", "/"),
        Kind::GetPath => (":", "", "/"),
        _ => ("'", "", "/"),
    };
    if !buf.enter(array.addr()) {
        buf.write(if kind == Kind::Group { "(...)" } else { "[...]" });
        return;
    }
    if form && kind == Kind::Block {
        emit_items(buf, array, index, true, all);
    } else {
        buf.write(open);
        for (i, item) in array.slice(index).iter().enumerate() {
            if i > 0 {
                buf.write(sep);
            }
            emit(buf, item, false, all);
        }
        buf.write(close);
    }
    buf.exit();
}

fn emit_context(buf: &mut MoldBuffer, kind: Kind, ctx: &Context, form: bool, all: bool) {
    if kind == Kind::Error && form {
        let text = format!("{}", Error::from_context(ctx.clone()));
        buf.write(&text);
        return;
    }
    if !form {
        buf.write("make ");
        buf.write(kind.name());
        buf.write("! [");
    }
    if !ctx.is_accessible() {
        buf.write("...expired...");
    } else if !buf.enter(ctx.varlist().addr()) {
        buf.write("...");
    } else {
        let pairs = ctx.pairs().unwrap_or_default();
        for (i, (sym, value)) in pairs.iter().enumerate() {
            if i > 0 {
                buf.write(if form { "\n" } else { " " });
            }
            buf.write(&sym.name());
            buf.write(": ");
            if value.is_void() {
                buf.write("#[void]");
            } else {
                emit(buf, value, false, all);
            }
        }
        buf.exit();
    }
    if !form {
        buf.write("]");
    }
}

fn emit_typeset(buf: &mut MoldBuffer, bits: TypeBits) {
    buf.write("make typeset! [");
    for (i, kind) in bits.kinds().enumerate() {
        if i > 0 {
            buf.write_char(' ');
        }
        buf.write(&format!("{}", kind));
    }
    buf.write("]");
}

/// Spec words of a function as they would be written
fn emit_params(buf: &mut MoldBuffer, func: &Func) {
    buf.write("[");
    let mut first = true;
    for param in func.params() {
        let (Some(sym), Some(class)) = (param.param_sym(), param.param_class()) else {
            continue;
        };
        let prefix = match class {
            ParamClass::Normal => "",
            ParamClass::Tight => "#",
            ParamClass::HardQuote => ":",
            ParamClass::SoftQuote => "'",
            ParamClass::Refinement => "/",
            _ => continue,
        };
        if !first {
            buf.write_char(' ');
        }
        first = false;
        buf.write(prefix);
        buf.write(&sym.name());
    }
    buf.write("]");
}

fn emit(buf: &mut MoldBuffer, cell: &Cell, form: bool, all: bool) {
    let kind = cell.kind();
    match cell.payload() {
        Payload::Empty => buf.write(match kind {
            Kind::Blank => "_",
            Kind::Bar => "|",
            Kind::LitBar => "'|",
            Kind::Void => "#[void]",
            Kind::Trash => "#[trash]",
            _ => "#[unset]",
        }),

        Payload::Logic(b) => {
            let word = if *b { "true" } else { "false" };
            if all && !form {
                buf.write("#[");
                buf.write(word);
                buf.write("]");
            } else {
                buf.write(word);
            }
        }

        Payload::Integer(i) => buf.write(&i.to_string()),

        Payload::Decimal(d) => match kind {
            Kind::Percent => {
                buf.write(&coordinate(d * 100.0));
                buf.write_char('%');
            }
            Kind::Money => buf.write(&format!("${:.2}", d)),
            _ => buf.write(&decimal_text(*d)),
        },

        Payload::Char(c) => {
            if form {
                buf.write_char(*c);
            } else {
                buf.write("#\"");
                match escape_char(*c) {
                    Some(esc) => buf.write(esc),
                    None => buf.write_char(*c),
                }
                buf.write_char('"');
            }
        }

        Payload::Pair(x, y) => {
            buf.write(&coordinate(*x));
            buf.write_char('x');
            buf.write(&coordinate(*y));
        }

        Payload::Tuple(bytes) => {
            let parts: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
            buf.write(&parts.join("."));
        }

        Payload::Word { sym, .. } => {
            let name = sym.name();
            if form {
                buf.write(&name);
                return;
            }
            match kind {
                Kind::SetWord => {
                    buf.write(&name);
                    buf.write_char(':');
                }
                Kind::GetWord => {
                    buf.write_char(':');
                    buf.write(&name);
                }
                Kind::LitWord => {
                    buf.write_char('\'');
                    buf.write(&name);
                }
                Kind::Refinement => {
                    buf.write_char('/');
                    buf.write(&name);
                }
                Kind::Issue => {
                    buf.write_char('#');
                    buf.write(&name);
                }
                _ => buf.write(&name),
            }
        }

        Payload::Array { array, index } => emit_array(buf, cell, array, *index, form, all),

        Payload::Text { text, index } => {
            let s = text.to_string_from(*index);
            if form {
                buf.write(&s);
                return;
            }
            match kind {
                Kind::File => {
                    buf.write_char('%');
                    if s.is_empty() || s.chars().any(breaks_token) {
                        emit_quoted(buf, &s);
                    } else {
                        buf.write(&s);
                    }
                }
                Kind::Tag => {
                    buf.write_char('<');
                    buf.write(&s);
                    buf.write_char('>');
                }
                Kind::Url => {
                    for c in s.chars() {
                        if breaks_token(c) || c == '%' {
                            let mut bytes = [0; 4];
                            for b in c.encode_utf8(&mut bytes).bytes() {
                                buf.write(&format!("%{:02X}", b));
                            }
                        } else {
                            buf.write_char(c);
                        }
                    }
                }
                Kind::Email => buf.write(&s),
                _ => emit_quoted(buf, &s),
            }
        }

        Payload::Bytes { bin, index } => {
            buf.write("#{");
            for b in bin.slice(*index) {
                buf.write(&format!("{:02X}", b));
            }
            buf.write("}");
        }

        Payload::Function(func) => {
            buf.write("make function! [");
            emit_params(buf, func);
            buf.write(" [...]]");
        }

        Payload::Context { varlist, .. } => emit_context(buf, kind, varlist, form, all),

        Payload::Typeset { bits, sym, .. } => match (sym, form) {
            (Some(sym), true) => buf.write(&sym.name()),
            _ => emit_typeset(buf, *bits),
        },

        Payload::Datatype(k) => buf.write(&format!("{}", k)),

        Payload::Varargs { .. } => buf.write("make varargs! [...]"),

        Payload::Map(map) => {
            if !buf.enter(map.addr()) {
                buf.write("make map! [...]");
                return;
            }
            buf.write("make map! [");
            for (i, (key, value)) in map.pairs().iter().enumerate() {
                if i > 0 {
                    buf.write_char(' ');
                }
                emit(buf, key, false, all);
                buf.write_char(' ');
                emit(buf, value, false, all);
            }
            buf.write("]");
            buf.exit();
        }

        Payload::Handle(h) => buf.write(&format!("#[handle! {:x}]", h)),

        Payload::Archetype(_) => buf.write("#[archetype]"),
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", mold_value(self))
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), mold_value(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::symtab::Sym;

    #[test]
    fn scalars() {
        assert_eq!("1.0", mold_value(&Cell::decimal(1.0)));
        assert_eq!("0.25", mold_value(&Cell::decimal(0.25)));
        assert_eq!("50%", mold_value(&Cell::percent(0.5)));
        assert_eq!("$3.50", mold_value(&Cell::money(3.5)));
        assert_eq!("1x2", mold_value(&Cell::pair(1.0, 2.0)));
        assert_eq!("1.2.3", mold_value(&Cell::tuple(&[1, 2, 3])));
        assert_eq!("#\"^/\"", mold_value(&Cell::char('\n')));
        assert_eq!("#{00FF}", mold_value(&Cell::bytes(&[0, 255])));
    }

    #[test]
    fn mold_versus_form() {
        let s = Cell::string("say \"hi\"");
        assert_eq!("\"say ^\"hi^\"\"", mold_value(&s));
        assert_eq!("say \"hi\"", form_value(&s));
        let block = Cell::block(Array::from_cells(vec![
            Cell::word(Kind::SetWord, Sym::intern("x")),
            Cell::string("a"),
            Cell::block(Array::from_cells(vec![Cell::integer(1)])),
        ]));
        assert_eq!("[x: \"a\" [1]]", mold_value(&block));
        assert_eq!("x a 1", form_value(&block));
        assert_eq!("x: \"a\" [1]", mold_only(&block));
    }

    #[test]
    fn cycles_are_cut() {
        let array = Array::from_cells(vec![Cell::integer(1)]);
        array.push_unchecked(Cell::block(array.clone()));
        assert_eq!("[1 [...]]", mold_value(&Cell::block(array)));
    }

    #[test]
    fn buffer_checkpoints_nest() {
        let mut buf = MoldBuffer::new();
        let outer = buf.push();
        buf.write("abc");
        let inner = buf.push();
        buf.write("def");
        assert_eq!(2, buf.stack_depth());
        assert_eq!("def", buf.pop(inner));
        assert_eq!("abc", buf.pop(outer));
        assert!(buf.is_empty());
    }

    #[test]
    fn limit_truncates() {
        let long = Cell::string(&"x".repeat(50));
        let opts = MoldOpts {
            limit: Some(10),
            ..MoldOpts::default()
        };
        assert_eq!("\"xxxxxxxxx...", mold_with(&mut MoldBuffer::new(), &long, opts));
    }
}
