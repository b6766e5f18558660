// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/throws.rs

// Out-of-band results: named throws and raised errors travel as the
// `Err` side of every evaluator result. Also the resume instruction
// format used by breakpoints, and the host-facing error type.

// <>

use std::fmt;

use super::cell::{Binding, Cell, CellFlags};
use super::context::Context;
use super::error::Error;
use super::kinds::Kind;
use super::mold;
use super::series::Array;

/// Unwinding result of an evaluation
pub enum Flow {
    /// A named throw: return, leave, exit, redo, resume, quit, halt,
    /// or a user THROW
    Throw(Thrown),
    /// A raised ERROR!
    Error(Error),
}

/// Name and payload of an in-flight throw
pub struct Thrown {
    name: Cell,
    payload: Cell,
}

impl Thrown {
    pub fn name(&self) -> &Cell {
        &self.name
    }

    pub fn payload(&self) -> &Cell {
        &self.payload
    }

    /// Frame the throw is aimed at, for definitional throws. Only a
    /// function name bound to a frame counts; a word name carries
    /// whatever binding it was loaded with.
    pub fn target(&self) -> Option<&Context> {
        if !self.name.is_function() {
            return None;
        }
        self.name.binding().context().filter(|ctx| ctx.is_frame())
    }

    /// Claim the throw, clearing its thrown state
    pub fn catch(self) -> (Cell, Cell) {
        let mut name = self.name;
        name.clear_flag(CellFlags::THROWN);
        (name, self.payload)
    }

    pub fn into_payload(self) -> Cell {
        self.catch().1
    }
}

impl Flow {
    pub fn throw(name: Cell, payload: Cell) -> Flow {
        let mut name = name;
        name.set_flag(CellFlags::THROWN);
        Flow::Throw(Thrown { name, payload })
    }

    /// Throw aimed at a specific frame through a native's identity
    pub fn throw_to(native: Cell, target: &Context, payload: Cell) -> Flow {
        Flow::throw(
            native.with_binding(Binding::Specific(target.clone())),
            payload,
        )
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Throw(t) => write!(
                f,
                "Throw({} {})",
                mold::mold_value(&t.name),
                mold::mold_value(&t.payload)
            ),
            Flow::Error(e) => write!(f, "{:?}", e),
        }
    }
}

/// How a breakpoint should resume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    /// use the breakpoint's default result
    Default,
    /// return the payload as is
    With,
    /// evaluate the payload
    Do,
}

/// Decoded `(mode payload target)` resume instruction
pub struct Resume {
    pub mode: ResumeMode,
    pub payload: Cell,
    pub target: Option<Context>,
}

impl Resume {
    pub fn to_cell(&self) -> Cell {
        let mode = match self.mode {
            ResumeMode::Default => Cell::blank(),
            ResumeMode::With => Cell::logic(false),
            ResumeMode::Do => Cell::logic(true),
        };
        let payload = if self.payload.is_void() {
            Cell::blank()
        } else {
            self.payload.clone()
        };
        let target = match &self.target {
            Some(ctx) => ctx.to_cell(),
            None => Cell::blank(),
        };
        Cell::group(Array::from_cells(vec![mode, payload, target]))
    }

    /// Anything that is not a well-formed instruction resumes with
    /// the default result
    pub fn from_cell(cell: &Cell) -> Resume {
        let default = Resume {
            mode: ResumeMode::Default,
            payload: Cell::void(),
            target: None,
        };
        let Some((array, index)) = cell.array_parts() else {
            return default;
        };
        if cell.kind() != Kind::Group {
            return default;
        }
        let slots = array.slice(index);
        if slots.len() != 3 {
            return default;
        }
        let mode = match slots[0].as_logic() {
            Some(false) => ResumeMode::With,
            Some(true) => ResumeMode::Do,
            None => ResumeMode::Default,
        };
        let target = if slots[2].kind() == Kind::Frame {
            slots[2].as_context()
        } else {
            None
        };
        Resume {
            mode,
            payload: slots[1].clone(),
            target,
        }
    }
}

/// Failure surfaced to the host
pub enum RenError {
    Error(Error),
    Quit(i32),
    Halt,
}

impl RenError {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            RenError::Error(_) => 1,
            RenError::Quit(code) => *code,
            RenError::Halt => 130,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            RenError::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenError::Error(e) => write!(f, "{}", e),
            RenError::Quit(code) => write!(f, "quit with code {}", code),
            RenError::Halt => write!(f, "** halted"),
        }
    }
}

impl fmt::Debug for RenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenError::Error(e) => write!(f, "{:?}", e),
            RenError::Quit(code) => write!(f, "Quit({})", code),
            RenError::Halt => write!(f, "Halt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ren::symtab::Sym;

    #[test]
    fn thrown_flag_is_transient() {
        let name = Cell::word(Kind::Word, Sym::intern("foo"));
        let Flow::Throw(thrown) = Flow::throw(name, Cell::integer(7)) else {
            panic!("expected throw");
        };
        assert!(thrown.name().get_flag(CellFlags::THROWN));
        let (name, payload) = thrown.catch();
        assert!(!name.get_flag(CellFlags::THROWN));
        assert_eq!(Some(7), payload.as_integer());
    }

    #[test]
    fn bound_word_names_are_not_aimed() {
        let ctx = Context::new(Kind::Object);
        let name = Cell::word(Kind::Word, Sym::intern("foo"))
            .with_binding(Binding::Specific(ctx.clone()));
        let Flow::Throw(thrown) = Flow::throw(name, Cell::integer(7)) else {
            panic!("expected throw");
        };
        assert!(thrown.target().is_none());
    }

    #[test]
    fn resume_instruction_round_trip() {
        let resume = Resume {
            mode: ResumeMode::With,
            payload: Cell::integer(10),
            target: None,
        };
        let back = Resume::from_cell(&resume.to_cell());
        assert_eq!(ResumeMode::With, back.mode);
        assert_eq!(Some(10), back.payload.as_integer());
        assert!(back.target.is_none());

        let junk = Resume::from_cell(&Cell::integer(3));
        assert_eq!(ResumeMode::Default, junk.mode);
    }
}
