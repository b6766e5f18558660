// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/frame.rs

// Evaluation levels. A feed is the shared cursor over the array being
// evaluated; a frame is one level of evaluation over a feed, and owns
// a varlist while it is running a function.

// <>

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use super::cell::{Binding, Cell};
use super::context::Context;
use super::error::{fail, ErrId};
use super::func::Func;
use super::kinds::Kind;
use super::series::Array;
use super::symtab::Sym;
use super::throws::Flow;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u16 {
        /// evaluate until the feed is exhausted
        const TO_END = 1 << 0;
        /// this level produces an argument for a caller
        const FULFILLING_ARG = 1 << 1;
        /// do not look ahead for enfix functions (tight arguments)
        const NO_LOOKAHEAD = 1 << 2;
        /// arguments come from a prebuilt frame, not the feed
        const APPLYING = 1 << 3;
    }
}

/// Result protocol between dispatchers and the dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum R {
    /// the result is in the frame's output cell
    Out,
    Void,
    True,
    False,
    Blank,
    Bar,
    /// rerun dispatch with the (possibly changed) phase, typechecking
    /// the arguments first
    RedoChecked,
    /// rerun dispatch without typechecking
    RedoUnchecked,
    /// evaluate the frame's scratch cell in place of the call
    Reevaluate,
    /// as above, without enfix lookahead
    ReevaluateOnly,
    /// the call produced nothing
    Invisible,
    /// the dispatcher does not handle this combination
    Unhandled,
}

/// Run-time information attached to a frame varlist
#[derive(Clone)]
pub struct FrameMeta {
    /// function whose dispatcher runs next
    pub phase: Func,
    /// function that was invoked
    pub original: Func,
    /// binding of the invoked function value
    pub binding: Binding,
    pub label: Option<Sym>,
    /// feed of the caller, while the call is running
    pub feed: Option<Feed>,
}

struct FeedData {
    array: Array,
    index: usize,
    specifier: Option<Context>,
    /// position of an enfix function that a deferring argument left
    /// for the level above
    deferred: Option<usize>,
}

/// Shared cursor over an array
#[derive(Clone)]
pub struct Feed(Rc<RefCell<FeedData>>);

impl Feed {
    pub fn new(array: Array, index: usize, specifier: Option<Context>) -> Feed {
        Feed(Rc::new(RefCell::new(FeedData {
            array,
            index,
            specifier,
            deferred: None,
        })))
    }

    /// Feed over nothing, for calls whose arguments are prebuilt
    pub fn empty() -> Feed {
        Feed::new(Array::empty(), 0, None)
    }

    pub fn at_end(&self) -> bool {
        let data = self.0.borrow();
        data.index >= data.array.len()
    }

    pub fn peek(&self) -> Option<Cell> {
        let data = self.0.borrow();
        data.array.get(data.index)
    }

    /// Cell `n` positions past the current one
    pub fn peek_ahead(&self, n: usize) -> Option<Cell> {
        let data = self.0.borrow();
        data.array.get(data.index + n)
    }

    pub fn fetch(&self) -> Option<Cell> {
        let mut data = self.0.borrow_mut();
        let cell = data.array.get(data.index)?;
        data.index += 1;
        Some(cell)
    }

    pub fn index(&self) -> usize {
        self.0.borrow().index
    }

    pub fn array(&self) -> Array {
        self.0.borrow().array.clone()
    }

    pub fn specifier(&self) -> Option<Context> {
        self.0.borrow().specifier.clone()
    }

    pub fn deferred(&self) -> Option<usize> {
        self.0.borrow().deferred
    }

    pub fn set_deferred(&self, deferred: Option<usize>) {
        self.0.borrow_mut().deferred = deferred
    }

    pub fn same(&self, other: &Feed) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A few cells around the current position, for error reports
    pub fn near(&self) -> Array {
        let data = self.0.borrow();
        let at = data.index.min(data.array.len());
        let from = at.saturating_sub(3);
        Array::from_cells(data.array.slice_range(from, at + 2))
    }
}

/// One level of evaluation
pub struct Frame {
    pub feed: Feed,
    pub out: Cell,
    /// scratch cell for dispatchers that reevaluate
    pub cell: Cell,
    pub flags: FrameFlags,
    pub varlist: Option<Context>,
    pub label: Option<Sym>,
    /// data stack height when the call began
    pub ds_base: usize,
}

impl Frame {
    pub fn new(feed: Feed, flags: FrameFlags) -> Frame {
        Frame {
            feed,
            out: Cell::trash(),
            cell: Cell::trash(),
            flags,
            varlist: None,
            label: None,
            ds_base: 0,
        }
    }

    pub fn specifier(&self) -> Option<Context> {
        self.feed.specifier()
    }

    /// Varlist of the running call
    pub fn ctx(&self) -> Result<&Context, Flow> {
        self.varlist
            .as_ref()
            .ok_or_else(|| fail(ErrId::FrameNotOnStack, &[]))
    }

    /// Argument by 1-based parameter index; void when absent
    pub fn arg(&self, n: usize) -> Cell {
        self.varlist
            .as_ref()
            .and_then(|v| v.varlist().get(n))
            .unwrap_or_else(Cell::void)
    }

    pub fn meta(&self) -> Option<FrameMeta> {
        self.varlist.as_ref().and_then(|v| v.frame_meta())
    }

    pub fn phase(&self) -> Result<Func, Flow> {
        self.meta()
            .map(|m| m.phase)
            .ok_or_else(|| fail(ErrId::FrameNotOnStack, &[]))
    }

    pub fn set_phase(&self, phase: Func) {
        if let (Some(varlist), Some(meta)) = (&self.varlist, self.meta()) {
            varlist.set_frame_meta(FrameMeta { phase, ..meta });
        }
    }

    /// Binding of the function value that was invoked
    pub fn binding(&self) -> Binding {
        self.meta().map(|m| m.binding).unwrap_or_default()
    }

    /// Label as a word, or blank for anonymous calls
    pub fn label_cell(&self) -> Cell {
        match self.label {
            Some(sym) => Cell::word(Kind::Word, sym),
            None => Cell::blank(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_walks_and_peeks() {
        let array = Array::from_cells(vec![Cell::integer(1), Cell::integer(2), Cell::integer(3)]);
        let feed = Feed::new(array, 0, None);
        assert_eq!(Some(2), feed.peek_ahead(1).and_then(|c| c.as_integer()));
        assert_eq!(Some(1), feed.fetch().and_then(|c| c.as_integer()));
        let other = feed.clone();
        other.fetch();
        assert_eq!(2, feed.index());
        assert!(feed.same(&other));
        feed.fetch();
        assert!(feed.at_end());
        assert!(feed.fetch().is_none());
    }

    #[test]
    fn near_is_bounded() {
        let cells = (0..10).map(Cell::integer).collect();
        let feed = Feed::new(Array::from_cells(cells), 5, None);
        let near = feed.near();
        assert_eq!(5, near.len());
        assert_eq!(Some(2), near.get(0).and_then(|c| c.as_integer()));
    }
}
