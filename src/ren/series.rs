// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/series.rs

// Shared series storage: arrays of cells, strings of characters, and
// binaries. Series are shared by reference; identity is the node.

// <>

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use bitflags::bitflags;

use super::cell::Cell;
use super::context::Context;
use super::error::{fail, ErrId};
use super::frame::FrameMeta;
use super::func::Dispatcher;
use super::memmgt;
use super::symtab::Sym;
use super::throws::Flow;

bitflags! {
    /// Series node flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SeriesFlags: u16 {
        const ARRAY = 1 << 0;
        const PARAMLIST = 1 << 1;
        const VARLIST = 1 << 2;
        const FIXED_SIZE = 1 << 3;
        /// deep, permanent immutability
        const FROZEN = 1 << 4;
        const FILE_LINE = 1 << 5;
        const POWER_OF_2 = 1 << 6;
        const HAS_DYNAMIC = 1 << 7;
        const MANAGED = 1 << 8;
        /// shallow, revocable write protection
        const PROTECTED = 1 << 9;
        /// varlist of a call that is still running
        const STACK = 1 << 10;
        /// varlist of a call that has ended
        const INACCESSIBLE = 1 << 11;
        const SINGULAR = 1 << 12;
    }
}

/// Auxiliary word whose meaning depends on the series flags
#[derive(Clone, Default)]
pub enum Link {
    #[default]
    None,
    /// paramlist: meta-information object
    Meta(Context),
    /// body holder: specialized argument frame
    Exemplar(Context),
    /// varlist: parallel array of key typesets
    Keylist(Array),
    /// file-line array: origin
    File(Sym),
}

/// Second auxiliary word whose meaning depends on the series flags
#[derive(Clone, Default)]
pub enum Misc {
    #[default]
    None,
    /// body holder
    Dispatcher(Dispatcher),
    /// paramlist whose facade is not itself
    Facade(Array),
    /// frame varlist
    Frame(FrameMeta),
    /// file-line array: first line
    Line(u32),
}

pub struct SeriesNode<T> {
    data: RefCell<Vec<T>>,
    flags: std::cell::Cell<SeriesFlags>,
    link: RefCell<Link>,
    misc: RefCell<Misc>,
}

/// Reference to a shared series node
pub struct Series<T>(Rc<SeriesNode<T>>);

pub type Array = Series<Cell>;
pub type Text = Series<char>;
pub type Binary = Series<u8>;

impl<T> Clone for Series<T> {
    fn clone(&self) -> Self {
        Series(self.0.clone())
    }
}

impl<T: Clone> Series<T> {
    pub fn new(flags: SeriesFlags) -> Self {
        Self::from_vec(Vec::new(), flags)
    }

    pub fn with_capacity(capacity: usize, flags: SeriesFlags) -> Self {
        Self::from_vec(Vec::with_capacity(capacity), flags)
    }

    pub fn from_vec(items: Vec<T>, flags: SeriesFlags) -> Self {
        let flags = if items.capacity() > 1 {
            flags | SeriesFlags::HAS_DYNAMIC
        } else {
            flags
        };
        memmgt::note_series_made(items.len());
        Series(Rc::new(SeriesNode {
            data: RefCell::new(items),
            flags: std::cell::Cell::new(flags),
            link: RefCell::new(Link::None),
            misc: RefCell::new(Misc::None),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `i`, or `None` for the end position and beyond
    pub fn get(&self, i: usize) -> Option<T> {
        self.0.data.borrow().get(i).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.data.borrow().clone()
    }

    /// Items from `from` to the tail; empty if `from` is past the tail
    pub fn slice(&self, from: usize) -> Vec<T> {
        let data = self.0.data.borrow();
        data.get(from..).map(|s| s.to_vec()).unwrap_or_default()
    }

    pub fn slice_range(&self, from: usize, to: usize) -> Vec<T> {
        let data = self.0.data.borrow();
        let to = to.min(data.len());
        if from >= to {
            Vec::new()
        } else {
            data[from..to].to_vec()
        }
    }

    /// Read-only view of the items; must not be held across evaluation
    pub fn borrow(&self) -> Ref<'_, Vec<T>> {
        self.0.data.borrow()
    }

    pub fn flags(&self) -> SeriesFlags {
        self.0.flags.get()
    }

    pub fn has_flag(&self, flag: SeriesFlags) -> bool {
        self.0.flags.get().contains(flag)
    }

    pub fn set_flags(&self, flags: SeriesFlags) {
        self.0.flags.set(self.0.flags.get() | flags)
    }

    pub fn clear_flags(&self, flags: SeriesFlags) {
        self.0.flags.set(self.0.flags.get() - flags)
    }

    pub fn is_frozen(&self) -> bool {
        self.has_flag(SeriesFlags::FROZEN)
    }

    /// Fails with `protected` unless the series may be modified
    pub fn ensure_mutable(&self) -> Result<(), Flow> {
        let flags = self.flags();
        if flags.contains(SeriesFlags::INACCESSIBLE) {
            Err(fail(ErrId::ExpiredFrame, &[]))
        } else if flags.intersects(SeriesFlags::FROZEN | SeriesFlags::PROTECTED) {
            Err(fail(ErrId::Protected, &[]))
        } else {
            Ok(())
        }
    }

    fn ensure_resizable(&self) -> Result<(), Flow> {
        self.ensure_mutable()?;
        if self.has_flag(SeriesFlags::FIXED_SIZE) {
            Err(fail(ErrId::ReadOnly, &[]))
        } else {
            Ok(())
        }
    }

    pub fn push(&self, item: T) -> Result<(), Flow> {
        self.ensure_resizable()?;
        self.push_unchecked(item);
        Ok(())
    }

    pub fn push_unchecked(&self, item: T) {
        self.0.data.borrow_mut().push(item)
    }

    /// Insert `items` before position `at` (clamped to the tail)
    pub fn insert_all(&self, at: usize, items: Vec<T>) -> Result<(), Flow> {
        self.ensure_resizable()?;
        let mut data = self.0.data.borrow_mut();
        let at = at.min(data.len());
        data.splice(at..at, items);
        Ok(())
    }

    /// Remove up to `count` items starting at `at`, returning them
    pub fn remove_range(&self, at: usize, count: usize) -> Result<Vec<T>, Flow> {
        self.ensure_resizable()?;
        let mut data = self.0.data.borrow_mut();
        let at = at.min(data.len());
        let end = at.saturating_add(count).min(data.len());
        Ok(data.drain(at..end).collect())
    }

    pub fn set(&self, i: usize, item: T) -> Result<(), Flow> {
        self.ensure_mutable()?;
        if i >= self.len() {
            return Err(fail(ErrId::PastEnd, &[]));
        }
        self.set_unchecked(i, item);
        Ok(())
    }

    pub fn set_unchecked(&self, i: usize, item: T) {
        self.0.data.borrow_mut()[i] = item
    }

    /// Overwrite items from `at`, growing the series if needed
    pub fn overwrite(&self, at: usize, items: Vec<T>) -> Result<(), Flow> {
        self.ensure_mutable()?;
        let mut data = self.0.data.borrow_mut();
        let at = at.min(data.len());
        let end = (at + items.len()).min(data.len());
        data.splice(at..end, items);
        Ok(())
    }

    pub fn reverse_range(&self, at: usize, count: usize) -> Result<(), Flow> {
        self.ensure_mutable()?;
        let mut data = self.0.data.borrow_mut();
        let at = at.min(data.len());
        let end = at.saturating_add(count).min(data.len());
        data[at..end].reverse();
        Ok(())
    }

    /// Set the length, dropping anything past it
    pub fn term_len(&self, len: usize) {
        self.0.data.borrow_mut().truncate(len)
    }

    pub fn same(&self, other: &Series<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address used for cycle detection and identity hashing
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const u8 as usize
    }

    pub fn link(&self) -> Link {
        self.0.link.borrow().clone()
    }

    pub fn set_link(&self, link: Link) {
        *self.0.link.borrow_mut() = link
    }

    pub fn misc(&self) -> Misc {
        self.0.misc.borrow().clone()
    }

    pub fn set_misc(&self, misc: Misc) {
        *self.0.misc.borrow_mut() = misc
    }

    /// Shallow freeze
    pub fn freeze(&self) {
        self.set_flags(SeriesFlags::FROZEN)
    }
}

impl Array {
    /// A one-cell array, used for bodies and expired frames
    pub fn singular(cell: Cell, flags: SeriesFlags) -> Array {
        let array = Array::from_vec(vec![cell], flags | SeriesFlags::ARRAY | SeriesFlags::SINGULAR);
        array.clear_flags(SeriesFlags::HAS_DYNAMIC);
        array
    }

    pub fn from_cells(cells: Vec<Cell>) -> Array {
        Array::from_vec(cells, SeriesFlags::ARRAY)
    }

    pub fn empty() -> Array {
        Array::new(SeriesFlags::ARRAY)
    }

    /// New array holding the cells from `from` to the tail; nested
    /// arrays stay shared
    pub fn copy_shallow(&self, from: usize) -> Array {
        Array::from_cells(self.slice(from))
    }

    /// New array with every nested array copied as well
    pub fn copy_deep(&self, from: usize) -> Array {
        let cells = self
            .slice(from)
            .into_iter()
            .map(|cell| match cell.array_parts() {
                Some((inner, index)) => {
                    let copy = inner.copy_deep(0);
                    cell.with_array(copy, index)
                }
                None => cell,
            })
            .collect();
        Array::from_cells(cells)
    }

    /// Freeze this array and every array reachable from it
    pub fn freeze_deep(&self) {
        if self.is_frozen() {
            return;
        }
        self.freeze();
        for cell in self.to_vec() {
            if let Some((inner, _)) = cell.array_parts() {
                inner.freeze_deep();
            }
        }
    }

    pub fn is_singular(&self) -> bool {
        self.has_flag(SeriesFlags::SINGULAR)
    }

    /// Source file and line, for arrays that came from the scanner
    pub fn file_line(&self) -> Option<(Sym, u32)> {
        if !self.has_flag(SeriesFlags::FILE_LINE) {
            return None;
        }
        match (self.link(), self.misc()) {
            (Link::File(file), Misc::Line(line)) => Some((file, line)),
            _ => None,
        }
    }
}

impl Text {
    pub fn from_str(s: &str) -> Text {
        Text::from_vec(s.chars().collect(), SeriesFlags::empty())
    }

    pub fn to_string_from(&self, from: usize) -> String {
        self.borrow().iter().skip(from).collect()
    }
}

impl Binary {
    pub fn from_bytes(bytes: &[u8]) -> Binary {
        Binary::from_vec(bytes.to_vec(), SeriesFlags::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_rejects_writes() {
        let array = Array::from_cells(vec![Cell::integer(1), Cell::integer(2)]);
        array.freeze();
        assert!(array.push(Cell::integer(3)).is_err());
        assert!(array.remove_range(0, 1).is_err());
        assert!(array.set(0, Cell::blank()).is_err());
        assert_eq!(Some(2), array.get(1).and_then(|c| c.as_integer()));
        assert_eq!(None, array.get(2).map(|c| c.kind()));
    }

    #[test]
    fn deep_freeze_is_transitive() {
        let inner = Array::from_cells(vec![Cell::integer(1)]);
        let outer = Array::from_cells(vec![Cell::block(inner.clone())]);
        outer.freeze_deep();
        assert!(inner.is_frozen());
        assert!(inner.push(Cell::blank()).is_err());
    }

    #[test]
    fn deep_copy_detaches() {
        let inner = Array::from_cells(vec![Cell::integer(1)]);
        let outer = Array::from_cells(vec![Cell::block(inner.clone())]);
        let copy = outer.copy_deep(0);
        let (copied_inner, _) = copy.get(0).and_then(|c| c.array_parts()).unwrap();
        assert!(!copied_inner.same(&inner));
        assert!(!copy.same(&outer));

        let shallow = outer.copy_shallow(0);
        let (shared, _) = shallow.get(0).and_then(|c| c.array_parts()).unwrap();
        assert!(shared.same(&inner));
    }

    #[test]
    fn singular_holds_one() {
        let body = Array::singular(Cell::blank(), SeriesFlags::empty());
        assert!(body.is_singular());
        assert_eq!(1, body.len());
        assert!(!body.has_flag(SeriesFlags::HAS_DYNAMIC));
    }

    #[test]
    fn term_len_truncates() {
        let text = Text::from_str("abcdef");
        text.term_len(3);
        assert_eq!("abc", text.to_string_from(0));
        assert_eq!("c", text.to_string_from(2));
    }
}
