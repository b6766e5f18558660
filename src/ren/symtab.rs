// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/symtab.rs

// A table to associate word spellings with compact internal IDs, and
// each spelling with its case-folded canon.

// <>

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Interned spelling of a word
///
/// Spellings are case-preserving; comparisons between words go through
/// `canon`, which folds case.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(u32);

pub struct SymbolTable {
    names: Vec<Rc<str>>,
    canons: Vec<u32>,
    by_name: HashMap<Rc<str>, u32>,
}

thread_local! {
    static SYMTAB: RefCell<SymbolTable> = RefCell::new(SymbolTable::new());
}

macro_rules! symbols {
    ( $( $name:ident $text:literal, )+ ) => {
        symbols!(@consts 0u32; $($name)+);

        /// Spellings interned in this order when the table is made
        const PRESET: &[&str] = &[$($text),+];
    };
    (@consts $n:expr; $first:ident $($rest:ident)*) => {
        pub const $first: Sym = Sym($n);
        symbols!(@consts $n + 1; $($rest)*);
    };
    (@consts $n:expr;) => {};
}

symbols! {
    S_RETURN "return",
    S_LEAVE "leave",
    S_LOCAL "local",
    S_WITH "with",
    S_DURABLE "durable",
    S_OPT "opt",
    S_END "end",
    S_ELLIPSIS "...",
    S_SELF "self",
    S_TYPE "type",
    S_ID "id",
    S_MESSAGE "message",
    S_ARG1 "arg1",
    S_ARG2 "arg2",
    S_ARG3 "arg3",
    S_NEAR "near",
    S_WHERE "where",
    S_FILE "file",
    S_LINE "line",
    S_DESCRIPTION "description",
    S_PARAMETER_TYPES "parameter-types",
    S_PARAMETER_NOTES "parameter-notes",
    S_TRUE "true",
    S_FALSE "false",
    S_VOID "void",
    S_HALT "halt",
    S_QUIT "quit",
    S_X "x",
    S_Y "y",
    S_ONLY "only",
    S_DEEP "deep",
    S_PART "part",
    S_VALUE "value",
}

impl SymbolTable {
    fn new() -> Self {
        let mut tab = SymbolTable {
            names: Vec::with_capacity(1024),
            canons: Vec::with_capacity(1024),
            by_name: HashMap::with_capacity(1024),
        };
        for name in PRESET {
            tab.intern(name);
        }
        tab
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }

        let lower = name.to_lowercase();
        let canon = if lower == name {
            self.names.len() as u32
        } else {
            self.intern(&lower)
        };

        let id = self.names.len() as u32;
        let spelling: Rc<str> = Rc::from(name);
        self.names.push(spelling.clone());
        self.canons.push(canon);
        self.by_name.insert(spelling, id);
        id
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

impl Sym {
    /// Intern a spelling, returning its symbol
    pub fn intern(name: &str) -> Sym {
        SYMTAB.with(|tab| Sym(tab.borrow_mut().intern(name)))
    }

    /// Look up a spelling without interning it
    pub fn lookup(name: &str) -> Option<Sym> {
        SYMTAB.with(|tab| tab.borrow().by_name.get(name).map(|id| Sym(*id)))
    }

    pub fn name(self) -> Rc<str> {
        SYMTAB.with(|tab| tab.borrow().names[self.0 as usize].clone())
    }

    /// Case-folded spelling shared by all synonyms
    pub fn canon(self) -> Sym {
        SYMTAB.with(|tab| Sym(tab.borrow().canons[self.0 as usize]))
    }

    pub fn same_canon(self, other: Sym) -> bool {
        self == other || self.canon() == other.canon()
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

/// Number of spellings interned so far on this thread
pub fn symbol_count() -> usize {
    SYMTAB.with(|tab| tab.borrow().len())
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sym({}:{})", self.0, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_line_up() {
        assert_eq!("return", &*S_RETURN.name());
        assert_eq!("parameter-notes", &*S_PARAMETER_NOTES.name());
        assert_eq!(S_VALUE, Sym::intern("value"));
    }

    #[test]
    fn canon_folds_case() {
        let upper = Sym::intern("Append");
        let lower = Sym::intern("append");
        assert_ne!(upper, lower);
        assert_eq!(lower, upper.canon());
        assert!(upper.same_canon(lower));
        assert_eq!("Append", &*upper.name());
    }

    #[test]
    fn lookup_does_not_intern() {
        let before = symbol_count();
        assert_eq!(None, Sym::lookup("never-interned-spelling"));
        assert_eq!(before, symbol_count());
    }
}
