// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/kinds.rs

// Value kinds, their datatype names, class predicates, and the
// typeset bitfield used by parameters and typecheckers.

// <>

use std::fmt;

macro_rules! enum_and_tryfrom {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vmeta:meta])* $vname:ident $(= $val:expr)?,)*
    }) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$vmeta])* $vname $(= $val)?,)*
        }

        impl std::convert::TryFrom<u8> for $name {
            type Error = ();

            #[inline(always)]
            fn try_from(v: u8) -> Result<Self, ()> {
                match v {
                    $(x if x == $name::$vname as u8 => Ok($name::$vname),)*
                    _ => Err(()),
                }
            }
        }
    }
}

enum_and_tryfrom! {
    /// Discriminant of every cell
    ///
    /// `Trash` is the internal sentinel kind and never reaches user code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[repr(u8)]
    pub enum Kind {
        Trash = 0,
        Void,
        Bar,
        LitBar,
        Blank,
        Logic,
        Integer,
        Decimal,
        Percent,
        Money,
        Char,
        Pair,
        Tuple,
        Time,
        Date,
        Word,
        SetWord,
        GetWord,
        LitWord,
        Refinement,
        Issue,
        Block,
        Group,
        Path,
        SetPath,
        GetPath,
        LitPath,
        String,
        Binary,
        File,
        Email,
        Url,
        Tag,
        Bitset,
        Image,
        Vector,
        Map,
        Datatype,
        Typeset,
        Function,
        Varargs,
        Object,
        Frame,
        Module,
        Error,
        Port,
        Gob,
        Event,
        Handle,
        Struct,
        Library,
    }
}

pub const KIND_COUNT: u8 = Kind::Library as u8 + 1;

const KIND_NAMES: [&str; KIND_COUNT as usize] = [
    "trash", "void", "bar", "lit-bar", "blank", "logic", "integer", "decimal", "percent", "money",
    "char", "pair", "tuple", "time", "date", "word", "set-word", "get-word", "lit-word",
    "refinement", "issue", "block", "group", "path", "set-path", "get-path", "lit-path", "string",
    "binary", "file", "email", "url", "tag", "bitset", "image", "vector", "map", "datatype",
    "typeset", "function", "varargs", "object", "frame", "module", "error", "port", "gob",
    "event", "handle", "struct", "library",
];

impl Kind {
    /// Datatype name without the trailing `!`
    pub fn name(self) -> &'static str {
        KIND_NAMES[self as usize]
    }

    /// Look up a kind by its datatype name, with or without `!`
    pub fn from_name(name: &str) -> Option<Kind> {
        let name = name.strip_suffix('!').unwrap_or(name);
        KIND_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|i| Kind::try_from(i as u8).ok())
            .filter(|k| *k != Kind::Trash)
    }

    /// Every user-visible kind, in order
    pub fn all() -> impl Iterator<Item = Kind> {
        (Kind::Void as u8..KIND_COUNT).filter_map(|i| Kind::try_from(i).ok())
    }

    pub fn any_word(self) -> bool {
        (Kind::Word..=Kind::Issue).contains(&self)
    }

    pub fn any_array(self) -> bool {
        (Kind::Block..=Kind::LitPath).contains(&self)
    }

    pub fn any_path(self) -> bool {
        (Kind::Path..=Kind::LitPath).contains(&self)
    }

    pub fn any_string(self) -> bool {
        matches!(
            self,
            Kind::String | Kind::File | Kind::Email | Kind::Url | Kind::Tag
        )
    }

    pub fn any_series(self) -> bool {
        self.any_array()
            || self.any_string()
            || matches!(self, Kind::Binary | Kind::Image | Kind::Vector)
    }

    pub fn any_context(self) -> bool {
        matches!(
            self,
            Kind::Object | Kind::Frame | Kind::Module | Kind::Error | Kind::Port
        )
    }

    pub fn any_number(self) -> bool {
        matches!(
            self,
            Kind::Integer | Kind::Decimal | Kind::Percent | Kind::Money
        )
    }

    pub fn any_scalar(self) -> bool {
        self.any_number()
            || matches!(
                self,
                Kind::Char | Kind::Pair | Kind::Tuple | Kind::Time | Kind::Date
            )
    }

    /// Kinds whose cells may carry a binding
    pub fn bindable(self) -> bool {
        self.any_word() || self.any_array() || self == Kind::Function || self == Kind::Frame
    }

    /// Immediate kinds are copied by value; a path poke into one must
    /// write the updated value back into the variable that held it
    pub fn immediate(self) -> bool {
        self.any_scalar() || matches!(self, Kind::Logic | Kind::Blank | Kind::Datatype)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!", self.name())
    }
}

/// Bitset over kinds; the payload of TYPESET! cells and parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeBits(u64);

impl TypeBits {
    pub const NONE: TypeBits = TypeBits(0);

    /// Every kind a variable may hold, excluding void
    pub fn any_value() -> TypeBits {
        let mut bits = TypeBits::NONE;
        for kind in Kind::all() {
            if kind != Kind::Void {
                bits = bits.with(kind);
            }
        }
        bits
    }

    pub fn of(kinds: &[Kind]) -> TypeBits {
        kinds.iter().fold(TypeBits::NONE, |acc, k| acc.with(*k))
    }

    pub fn matching(pred: fn(Kind) -> bool) -> TypeBits {
        Kind::all().filter(|k| pred(*k)).fold(TypeBits::NONE, |acc, k| acc.with(k))
    }

    pub fn with(self, kind: Kind) -> TypeBits {
        TypeBits(self.0 | (1u64 << kind as u8))
    }

    pub fn without(self, kind: Kind) -> TypeBits {
        TypeBits(self.0 & !(1u64 << kind as u8))
    }

    pub fn union(self, other: TypeBits) -> TypeBits {
        TypeBits(self.0 | other.0)
    }

    pub fn contains(self, kind: Kind) -> bool {
        self.0 & (1u64 << kind as u8) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn kinds(self) -> impl Iterator<Item = Kind> {
        Kind::all().filter(move |k| self.contains(*k))
    }
}

/// Named typesets available to specs and to the boot library
pub fn typeset_by_name(name: &str) -> Option<TypeBits> {
    let bits = match name.to_ascii_lowercase().as_str() {
        "any-value!" => TypeBits::any_value(),
        "any-word!" => TypeBits::matching(Kind::any_word),
        "any-array!" => TypeBits::matching(Kind::any_array),
        "any-path!" => TypeBits::matching(Kind::any_path),
        "any-string!" => TypeBits::matching(Kind::any_string),
        "any-series!" => TypeBits::matching(Kind::any_series),
        "any-context!" => TypeBits::matching(Kind::any_context),
        "any-number!" => TypeBits::matching(Kind::any_number),
        "any-scalar!" => TypeBits::matching(Kind::any_scalar),
        "any-function!" => TypeBits::of(&[Kind::Function]),
        _ => return None,
    };
    Some(bits)
}

pub const TYPESET_NAMES: &[&str] = &[
    "any-value!",
    "any-word!",
    "any-array!",
    "any-path!",
    "any-string!",
    "any-series!",
    "any-context!",
    "any-number!",
    "any-scalar!",
    "any-function!",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in Kind::all() {
            assert_eq!(Some(kind), Kind::from_name(&format!("{}", kind)));
        }
        assert_eq!(None, Kind::from_name("trash!"));
        assert_eq!(Some(Kind::SetWord), Kind::from_name("SET-WORD!"));
    }

    #[test]
    fn fits_in_typeset() {
        assert!(KIND_COUNT <= 64);
        let bits = TypeBits::of(&[Kind::Integer, Kind::Void]);
        assert!(bits.contains(Kind::Integer));
        assert!(bits.contains(Kind::Void));
        assert!(!bits.contains(Kind::Decimal));
        assert!(!TypeBits::any_value().contains(Kind::Void));
    }

    #[test]
    fn classes() {
        assert!(Kind::Issue.any_word());
        assert!(Kind::LitPath.any_array() && Kind::LitPath.any_path());
        assert!(!Kind::Binary.any_string() && Kind::Binary.any_series());
        assert!(Kind::Frame.any_context());
        assert_eq!(
            5,
            typeset_by_name("any-string!").map_or(0, |b| b.kinds().count())
        );
    }
}
