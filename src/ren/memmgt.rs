// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/memmgt.rs

// Series bookkeeping: managed-series accounting, the guard stack,
// and the state snapshots that trapping code restores on failure.

// <>

use std::cell::Cell as Counter;

use super::cell::Cell;
use super::series::{Array, Series, SeriesFlags};

thread_local! {
    static SERIES_MADE: Counter<u64> = const { Counter::new(0) };
    static SERIES_MANAGED: Counter<u64> = const { Counter::new(0) };
}

/// Records the creation of a series node
pub fn note_series_made(len: usize) {
    let id = SERIES_MADE.with(|ctr| {
        let id = ctr.get();
        ctr.set(id + 1);
        id
    });

    if cfg!(feature = "memdbg") {
        log::debug!("S {id} BIRTH (len {len})");
    }
}

/// Hands a series over to the collector's bookkeeping
pub fn manage<T: Clone>(series: &Series<T>) {
    if series.has_flag(SeriesFlags::MANAGED) {
        return;
    }
    series.set_flags(SeriesFlags::MANAGED);
    SERIES_MANAGED.with(|ctr| ctr.set(ctr.get() + 1));

    if cfg!(feature = "memdbg") {
        log::debug!("S {:x} MANAGED (len {})", series.addr(), series.len());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub series_made: u64,
    pub series_managed: u64,
    pub guards: usize,
    pub guards_peak: usize,
}

/// Something kept alive across a potential collection
pub enum Guard {
    Array(Array),
    Value(Cell),
}

/// Per-task guard stack
#[derive(Default)]
pub struct Heap {
    guards: Vec<Guard>,
    peak: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_guard_array(&mut self, array: &Array) {
        self.guards.push(Guard::Array(array.clone()));
        self.peak = self.peak.max(self.guards.len());

        if cfg!(feature = "memdbg") {
            log::debug!("GUARD {:x} depth {}", array.addr(), self.guards.len());
        }
    }

    pub fn push_guard_value(&mut self, value: &Cell) {
        self.guards.push(Guard::Value(value.clone()));
        self.peak = self.peak.max(self.guards.len());
    }

    /// Pops the top guard, which must be `array`
    pub fn drop_guard_array(&mut self, array: &Array) {
        match self.guards.pop() {
            Some(Guard::Array(top)) if top.same(array) => {
                if cfg!(feature = "memdbg") {
                    log::debug!("UNGUARD {:x} depth {}", array.addr(), self.guards.len());
                }
            }
            _ => panic!("guard stack dropped out of order"),
        }
    }

    pub fn drop_guard_value(&mut self) {
        match self.guards.pop() {
            Some(Guard::Value(_)) => (),
            _ => panic!("guard stack dropped out of order"),
        }
    }

    pub fn guard_depth(&self) -> usize {
        self.guards.len()
    }

    /// Unwinds guards pushed after a trap was set
    pub fn truncate_guards(&mut self, depth: usize) {
        self.guards.truncate(depth)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            series_made: SERIES_MADE.with(|c| c.get()),
            series_managed: SERIES_MANAGED.with(|c| c.get()),
            guards: self.guards.len(),
            guards_peak: self.peak,
        }
    }

    /// Collection checkpoint; the guard stack must be empty when this
    /// runs from the top level
    pub fn recycle(&mut self, top_level: bool) -> Stats {
        if top_level {
            assert!(self.guards.is_empty(), "guards leaked past top level");
        }

        let stats = self.stats();
        if cfg!(feature = "memdbg") {
            log::debug!(
                "RECYCLE made {} managed {} guards {} (peak {})",
                stats.series_made,
                stats.series_managed,
                stats.guards,
                stats.guards_peak
            );
        }
        stats
    }
}

/// Task state recorded when a trap is pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub data_stack: usize,
    pub calls: usize,
    pub guards: usize,
    pub mold: usize,
    pub mold_stack: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_balance() {
        let mut heap = Heap::new();
        let a = Array::empty();
        let b = Array::empty();
        heap.push_guard_array(&a);
        heap.push_guard_array(&b);
        assert_eq!(2, heap.guard_depth());
        heap.drop_guard_array(&b);
        heap.drop_guard_array(&a);
        assert_eq!(0, heap.recycle(true).guards);
        assert_eq!(2, heap.stats().guards_peak);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn guards_out_of_order() {
        let mut heap = Heap::new();
        let a = Array::empty();
        let b = Array::empty();
        heap.push_guard_array(&a);
        heap.push_guard_array(&b);
        heap.drop_guard_array(&a);
    }

    #[test]
    fn value_guards_nest_with_array_guards() {
        let mut heap = Heap::new();
        let a = Array::empty();
        heap.push_guard_array(&a);
        heap.push_guard_value(&Cell::integer(1));
        assert_eq!(2, heap.guard_depth());
        heap.drop_guard_value();
        heap.drop_guard_array(&a);
        assert_eq!(0, heap.guard_depth());
    }

    #[test]
    fn manage_counts_once() {
        let a = Array::empty();
        let before = Heap::new().stats().series_managed;
        manage(&a);
        manage(&a);
        assert!(a.has_flag(SeriesFlags::MANAGED));
        assert_eq!(before + 1, Heap::new().stats().series_managed);
    }
}
