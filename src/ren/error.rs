// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/error.rs

// ERROR! values: the fixed-layout error context, the table of error
// ids with their message templates, and error rendering.

// <>

use std::fmt;

use super::cell::Cell;
use super::context::Context;
use super::kinds::Kind;
use super::mold;
use super::series::Array;
use super::symtab::*;
use super::throws::Flow;

/// Generates the error id table
///
/// Each entry names the variant, the error type, the id word, and a
/// message template in which `:arg1` through `:arg3` are replaced by
/// the error's arguments.
macro_rules! error_ids {
    ( $( $var:ident $typ:literal $id:literal $msg:literal, )+ ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ErrId {
            $( $var, )+
        }

        impl ErrId {
            /// (type, id, message template)
            pub fn info(self) -> (&'static str, &'static str, &'static str) {
                match self {
                    $( ErrId::$var => ($typ, $id, $msg), )+
                }
            }

            pub fn from_id(id: &str) -> Option<ErrId> {
                match id {
                    $( $id => Some(ErrId::$var), )+
                    _ => None,
                }
            }
        }
    };
}

error_ids! {
    InvalidArg "script" "invalid-arg" "invalid argument: :arg1",
    BadFuncDef "script" "bad-func-def" "invalid function definition: :arg1",
    BadMake "script" "bad-make" "cannot MAKE :arg1 from: :arg2",
    NoValue "script" "no-value" ":arg1 has no value",
    NotInContext "script" "not-in-context" ":arg1 is not in the specified context",
    DupVars "script" "dup-vars" "duplicate variable specified: :arg1",
    PastEnd "script" "past-end" "out of range or past end",
    NoReturn "script" "no-return" "block did not return a value",
    BadReturnType "script" "bad-return-type" ":arg1 does not allow :arg2 for its return value",
    InvalidExit "script" "invalid-exit" "no frame to exit from: :arg1",
    InvalidChars "script" "invalid-chars" "contains invalid characters: :arg1",
    UseEvalForEval "script" "use-eval-for-eval" "use EVAL to run a FUNCTION! value held in a variable",
    UseFailForError "script" "use-fail-for-error" "use FAIL instead of THROW to raise :arg1",
    NoCatch "script" "no-catch" "missing CATCH for THROW of :arg1 with name :arg2",
    RefinementArgOpt "script" "refinement-arg-opt" "refinement arguments may not be optional: :arg1",
    HardQuoteVoid "script" "hard-quote-void" "hard quoted parameters may only be void when endable: :arg1",
    ExpectArg "script" "expect-arg" ":arg1 does not allow :arg2 for its :arg3 argument",
    ArgType "script" "arg-type" ":arg1 argument :arg2 cannot be :arg3",
    BadRefine "script" "bad-refine" "incompatible or invalid refinement: :arg1",
    NoArg "script" "no-arg" ":arg1 is missing its :arg2 argument",
    ExpressionBarrier "script" "expression-barrier" "expression barrier reached while fulfilling :arg1",
    NotBound "script" "not-bound" ":arg1 word is not bound to a context",
    NeedValue "script" "need-value" ":arg1 needs a value",
    ExpiredFrame "script" "expired-frame" "cannot access the frame of a call that has ended",
    BadPathSelect "script" "bad-path-select" "cannot pick :arg2 from :arg1",
    BadPathSet "script" "bad-path-set" "cannot set :arg2 in :arg1",
    CannotUse "script" "cannot-use" "cannot use :arg1 on :arg2 value",
    NoLeftArg "script" "no-left-arg" ":arg1 has no left-hand argument",
    BadSibling "script" "bad-sibling" ":arg1 is not frame-compatible with the running function",
    FrameNotOnStack "script" "frame-not-on-stack" "the frame is not running",
    BadVarargs "script" "bad-varargs" "varargs cannot do :arg1 here",
    User "user" "message" ":arg1",
    ScanInvalid "syntax" "scan-invalid" "invalid :arg1 -- :arg2",
    ScanMissing "syntax" "scan-missing" "missing :arg1 before end of :arg2",
    Protected "access" "protected" "protected value or series - cannot modify",
    PermissionDenied "access" "permission-denied" "permission denied",
    ReadOnly "access" "read-only" "read-only - write not allowed",
    LockedWord "access" "locked-word" "protected variable - cannot modify: :arg1",
    Overflow "math" "overflow" "math or number overflow",
    Positive "math" "positive" "value must be positive",
    ZeroDivide "math" "zero-divide" "attempt to divide by zero",
    OutOfRange "math" "out-of-range" "value out of range: :arg1",
    Misc "internal" "misc" "internal error: :arg1",
    NoMemory "internal" "no-memory" "not enough memory",
    StackOverflow "internal" "stack-overflow" "stack overflow",
    Halt "internal" "halt" "halted by user or script",
}

const FIELDS: [Sym; 10] = [
    S_TYPE, S_ID, S_MESSAGE, S_ARG1, S_ARG2, S_ARG3, S_NEAR, S_WHERE, S_FILE, S_LINE,
];

/// An ERROR! context
#[derive(Clone)]
pub struct Error(Context);

/// Shorthand for raising an error as a flow
pub fn fail(id: ErrId, args: &[Cell]) -> Flow {
    Flow::Error(Error::new(id, args))
}

/// Splits a template into literal strings and `:argN` get-words
fn message_template(template: &str) -> Array {
    let mut cells = Vec::new();
    let mut run = String::new();
    for token in template.split_whitespace() {
        if token.starts_with(":arg") {
            if !run.is_empty() {
                cells.push(Cell::string(&run));
                run.clear();
            }
            cells.push(Cell::word(Kind::GetWord, Sym::intern(&token[1..])));
        } else {
            if !run.is_empty() {
                run.push(' ');
            }
            run.push_str(token);
        }
    }
    if !run.is_empty() {
        cells.push(Cell::string(&run));
    }
    Array::from_cells(cells)
}

impl Error {
    fn blank_context() -> Context {
        let ctx = Context::from_names(Kind::Error, &FIELDS);
        for i in 1..=FIELDS.len() {
            ctx.init_var(i, Cell::blank());
        }
        ctx
    }

    pub fn new(id: ErrId, args: &[Cell]) -> Error {
        let (typ, ident, template) = id.info();
        let ctx = Self::blank_context();
        ctx.init_var(1, Cell::word(Kind::Word, Sym::intern(typ)));
        ctx.init_var(2, Cell::word(Kind::Word, Sym::intern(ident)));
        ctx.init_var(3, Cell::block(message_template(template)));
        for (i, arg) in args.iter().take(3).enumerate() {
            ctx.init_var(4 + i, arg.clone());
        }
        Error(ctx)
    }

    /// Error raised by FAIL with a plain message
    pub fn user(message: &str) -> Error {
        let err = Error::new(ErrId::User, &[]);
        err.set_field(S_MESSAGE, Cell::string(message));
        err
    }

    /// Adopt an ERROR! context built by user code, filling any
    /// missing standard fields
    pub fn from_context(ctx: Context) -> Error {
        for sym in FIELDS {
            if ctx.find(sym).is_none() {
                let i = ctx.append_key(sym);
                ctx.init_var(i, Cell::blank());
            }
        }
        Error(ctx)
    }

    pub fn context(&self) -> &Context {
        &self.0
    }

    pub fn to_cell(&self) -> Cell {
        Cell::context(Kind::Error, self.0.clone())
    }

    pub fn field(&self, sym: Sym) -> Cell {
        self.0
            .find(sym)
            .and_then(|i| self.0.var(i).ok())
            .unwrap_or_else(Cell::blank)
    }

    pub fn set_field(&self, sym: Sym, value: Cell) {
        let i = self.0.find_or_append(sym);
        self.0.init_var(i, value);
    }

    pub fn id(&self) -> Option<Sym> {
        self.field(S_ID).word_sym()
    }

    pub fn type_sym(&self) -> Option<Sym> {
        self.field(S_TYPE).word_sym()
    }

    pub fn is(&self, id: ErrId) -> bool {
        let (typ, ident, _) = id.info();
        let same = |have: Option<Sym>, want: &str| have.map_or(false, |s| &*s.canon().name() == want);
        same(self.type_sym(), typ) && same(self.id(), ident)
    }

    /// Message text with the arguments substituted
    pub fn message(&self) -> String {
        let message = self.field(S_MESSAGE);
        if let Some(text) = message.as_text() {
            return text;
        }
        let Some((template, index)) = message.array_parts() else {
            return mold::form_value(&message);
        };

        let mut parts = Vec::new();
        for cell in template.slice(index) {
            match (cell.kind(), cell.word_sym()) {
                (Kind::GetWord, Some(sym)) => {
                    let arg = self.field(sym);
                    parts.push(if arg.any_string() {
                        mold::form_value(&arg)
                    } else {
                        mold::mold_value(&arg)
                    });
                }
                _ => parts.push(mold::form_value(&cell)),
            }
        }
        parts.join(" ")
    }

    /// True once a frame has recorded where this error happened
    pub fn has_location(&self) -> bool {
        !self.field(S_WHERE).is_blank()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let typ = self
            .type_sym()
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| "user".to_string());
        let mut title = typ;
        if let Some(first) = title.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        write!(f, "** {} error: {}", title, self.message())?;

        let near = self.field(S_NEAR);
        if !near.is_blank() {
            write!(f, "\n** Near: {}", mold::mold_only(&near))?;
        }
        let place = self.field(S_WHERE);
        if !place.is_blank() {
            write!(f, "\n** Where: {}", mold::mold_only(&place))?;
        }
        let file = self.field(S_FILE);
        if !file.is_blank() {
            write!(
                f,
                "\n** File: {} line {}",
                mold::form_value(&file),
                mold::form_value(&self.field(S_LINE))
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (typ, id) = (self.type_sym(), self.id());
        write!(f, "Error({:?}/{:?}: {})", typ, id, self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_substitution() {
        let err = Error::new(
            ErrId::ExpectArg,
            &[
                Cell::word(Kind::Word, Sym::intern("foo")),
                Cell::datatype(Kind::Integer),
                Cell::word(Kind::Word, Sym::intern("x")),
            ],
        );
        assert_eq!("foo does not allow integer! for its x argument", err.message());
        assert!(err.is(ErrId::ExpectArg));
        assert!(!err.is(ErrId::NoArg));
    }

    #[test]
    fn user_message() {
        let err = Error::user("something broke");
        assert_eq!("something broke", err.message());
        assert_eq!("** User error: something broke", err.to_string());
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(Some(ErrId::ZeroDivide), ErrId::from_id("zero-divide"));
        assert_eq!(None, ErrId::from_id("not-an-error"));
    }
}
