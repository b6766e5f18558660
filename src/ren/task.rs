// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/task.rs

// Interpreter task state: the library context, the data stack, the
// call stack, the guard and mold stacks, signals, and the breakpoint
// hook. Everything the evaluator touches is reached through a Task.

// <>

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;

use super::binding::{bind_deep, BindMode};
use super::cell::{Binding, Cell};
use super::context::Context;
use super::error::{fail, ErrId, Error};
use super::frame::Feed;
use super::func::Func;
use super::kinds::Kind;
use super::memmgt::{Heap, Snapshot};
use super::mold::MoldBuffer;
use super::scan::scan_source;
use super::series::Array;
use super::stdenv;
use super::symtab::*;
use super::throws::{Flow, RenError, Thrown};

/// Called at a breakpoint with the cell to fill with a resume
/// instruction and whether the pause came from an interrupt; returns
/// true to quit instead of resuming
pub type BreakpointHook = Box<dyn FnMut(&mut Task, &mut Cell, bool) -> bool>;

/// Natives whose identity the evaluator recognizes in throws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Return,
    Leave,
    Exit,
    Redo,
    Quit,
    Resume,
}

#[derive(Default)]
pub struct Specials {
    specials: [Option<Func>; 6],
}

impl Specials {
    pub fn get(&self, which: Special) -> Option<&Func> {
        self.specials[which as usize].as_ref()
    }

    pub fn set(&mut self, which: Special, func: Func) {
        self.specials[which as usize] = Some(func)
    }

    /// Does `cell` hold the native `which`, bound or not
    pub fn is(&self, which: Special, cell: &Cell) -> bool {
        match (self.get(which), cell.as_func()) {
            (Some(special), Some(func)) => special.same(&func),
            _ => false,
        }
    }

    pub fn cell(&self, which: Special) -> Result<Cell, Flow> {
        self.get(which).map(|f| f.to_cell()).ok_or_else(|| {
            fail(ErrId::Misc, &[Cell::string("native used before boot")])
        })
    }
}

/// One running function call
pub struct CallRecord {
    pub varlist: Context,
    pub original: Func,
    pub label: Option<Sym>,
    pub feed: Feed,
}

pub struct Task {
    /// the single global context user code is bound into
    pub lib: Context,
    pub ds: Vec<Cell>,
    pub calls: Vec<CallRecord>,
    pub heap: Heap,
    pub mold: MoldBuffer,
    pub config: Config,
    pub specials: Specials,
    pub eval_count: u64,
    depth: usize,
    /// native stack address at the outermost evaluation, 0 outside one
    stack_base: usize,
    halt: Arc<AtomicBool>,
    pub(crate) hook: Option<BreakpointHook>,
}

impl Task {
    /// Task with an empty library and no natives
    pub fn bare() -> Task {
        Task::with_config(Config::default())
    }

    fn with_config(config: Config) -> Task {
        Task {
            lib: Context::new(Kind::Module),
            ds: Vec::with_capacity(256),
            calls: Vec::with_capacity(64),
            heap: Heap::new(),
            mold: MoldBuffer::new(),
            config,
            specials: Specials::default(),
            eval_count: 0,
            depth: 0,
            stack_base: 0,
            halt: Arc::new(AtomicBool::new(false)),
            hook: None,
        }
    }

    /// Booted task: natives, actions, and the boot script are loaded
    pub fn new(config: Config) -> Result<Task, RenError> {
        let limit = config.eval_limit;
        let mut task = Task::with_config(Config {
            eval_limit: 0,
            ..config
        });
        if let Err(flow) = stdenv::boot(&mut task) {
            return Err(task.host_error(flow));
        }
        task.config.eval_limit = limit;
        task.eval_count = 0;
        log::debug!(
            "booted with {} library words, {} symbols",
            task.lib.len(),
            symbol_count()
        );
        Ok(task)
    }

    /// Flag that requests a halt at the next evaluation step; safe to
    /// set from a signal handler thread
    pub fn halt_flag(&self) -> Arc<AtomicBool> {
        self.halt.clone()
    }

    pub fn set_breakpoint_hook(&mut self, hook: BreakpointHook) {
        self.hook = Some(hook)
    }

    pub fn lib_get(&self, name: &str) -> Option<Cell> {
        let sym = Sym::lookup(name)?;
        let index = self.lib.find(sym)?;
        self.lib.var(index).ok()
    }

    pub fn lib_set(&self, name: &str, value: Cell) {
        let index = self.lib.find_or_append(Sym::intern(name));
        self.lib.init_var(index, value);
    }

    /// Scan source text and bind it into the library
    pub fn load(&mut self, source: &str, file: Option<&str>) -> Result<Array, Flow> {
        let array = scan_source(source, file)?;
        bind_deep(&array, 0, &self.lib, BindMode::AddAll);
        Ok(array)
    }

    /// Load and evaluate source text, restoring task state on failure
    pub fn do_string(&mut self, source: &str) -> Result<Cell, RenError> {
        self.do_source(source, None)
    }

    /// The evaluation limit counts from the start of each call
    pub fn do_source(&mut self, source: &str, file: Option<&str>) -> Result<Cell, RenError> {
        let snapshot = self.snapshot();
        self.eval_count = 0;
        let outermost = self.calls.is_empty() && self.depth == 0;
        if outermost {
            self.stack_base = stack_address();
        }
        let result = self
            .load(source, file)
            .and_then(|array| self.do_array(&array, 0, None));
        if outermost {
            self.stack_base = 0;
        }
        match result {
            Ok(value) => Ok(value),
            Err(flow) => {
                self.restore(&snapshot);
                Err(self.host_error(flow))
            }
        }
    }

    /// Classify an unwinding result that reached the host
    pub fn host_error(&mut self, flow: Flow) -> RenError {
        match flow {
            Flow::Error(err) => RenError::Error(err),
            Flow::Throw(thrown) => {
                if self.specials.is(Special::Quit, thrown.name()) {
                    let payload = thrown.into_payload();
                    RenError::Quit(payload.as_integer().map_or(0, |i| i as i32))
                } else if is_halt(thrown.name()) {
                    RenError::Halt
                } else {
                    RenError::Error(uncaught(thrown))
                }
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            data_stack: self.ds.len(),
            calls: self.calls.len(),
            guards: self.heap.guard_depth(),
            mold: self.mold.len(),
            mold_stack: self.mold.stack_depth(),
        }
    }

    /// Unwind everything pushed after `snapshot`
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.ds.truncate(snapshot.data_stack);
        for record in self.calls.drain(snapshot.calls..) {
            record.varlist.expire();
        }
        self.heap.truncate_guards(snapshot.guards);
        self.mold.truncate(snapshot.mold, snapshot.mold_stack);
    }

    pub(crate) fn push_call(&mut self, record: CallRecord) -> Result<(), Flow> {
        if self.calls.len() >= self.config.stack_limit {
            return Err(fail(ErrId::StackOverflow, &[]));
        }
        self.check_native_stack()?;
        if cfg!(feature = "stkdbg") {
            log::trace!(
                "CALL {} depth {}",
                record.label.map_or("(anonymous)".into(), |s| s.name()),
                self.calls.len()
            );
        }
        self.calls.push(record);
        Ok(())
    }

    pub(crate) fn pop_call(&mut self) {
        if let Some(record) = self.calls.pop() {
            if cfg!(feature = "stkdbg") {
                log::trace!(
                    "RETURN {} depth {}",
                    record.label.map_or("(anonymous)".into(), |s| s.name()),
                    self.calls.len()
                );
            }
        }
    }

    /// Guards nesting of evaluation levels that are not calls
    pub(crate) fn enter_level(&mut self) -> Result<(), Flow> {
        if self.depth >= self.config.stack_limit.saturating_mul(4) {
            return Err(fail(ErrId::StackOverflow, &[]));
        }
        self.check_native_stack()?;
        self.depth += 1;
        Ok(())
    }

    /// Fail before recursion exhausts the thread's own stack
    fn check_native_stack(&self) -> Result<(), Flow> {
        let used = self.stack_base.abs_diff(stack_address());
        if self.stack_base != 0 && used > self.config.native_stack {
            log::debug!("native stack budget of {} bytes used up", self.config.native_stack);
            return Err(fail(ErrId::StackOverflow, &[]));
        }
        Ok(())
    }

    pub(crate) fn leave_level(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Polled once per function dispatch
    pub(crate) fn check_signals(&mut self) -> Result<(), Flow> {
        self.eval_count += 1;
        let limit = self.config.eval_limit;
        if limit > 0 && self.eval_count > limit {
            log::warn!("evaluation limit of {} reached", limit);
            self.eval_count = 0;
            return Err(halt_throw());
        }
        if self.halt.swap(false, Ordering::Relaxed) {
            log::info!("halt requested");
            return Err(halt_throw());
        }
        Ok(())
    }

    /// Labels of the innermost `limit` running calls, innermost first,
    /// ending in `...` when more are running
    pub fn backtrace(&self, limit: usize) -> Vec<Cell> {
        let mut labels: Vec<Cell> = self
            .calls
            .iter()
            .rev()
            .take(limit)
            .map(|c| match c.label {
                Some(sym) => Cell::word(Kind::Word, sym),
                None => Cell::blank(),
            })
            .collect();
        if self.calls.len() > limit {
            labels.push(Cell::word(Kind::Word, Sym::intern("...")));
        }
        labels
    }

    pub fn is_running(&self, ctx: &Context) -> bool {
        self.calls.iter().any(|c| c.varlist.same(ctx))
    }
}

#[inline(never)]
fn stack_address() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

pub fn halt_throw() -> Flow {
    Flow::throw(Cell::word(Kind::Word, S_HALT), Cell::blank())
}

/// Is `name` the unbound HALT throw name
pub fn is_halt(name: &Cell) -> bool {
    name.kind() == Kind::Word
        && name.word_sym().map_or(false, |s| s.same_canon(S_HALT))
        && matches!(name.binding(), Binding::Unbound)
}

/// The error a throw becomes when nothing catches it
pub fn uncaught(thrown: Thrown) -> Error {
    let (name, payload) = thrown.catch();
    log::warn!("no catch for throw of {} named {}", payload, name);
    Error::new(ErrId::NoCatch, &[payload, name])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boots_with_default_config() {
        match Task::new(Config::default()) {
            Ok(task) => assert!(task.ds.is_empty()),
            Err(err) => panic!("boot failed: {}", err),
        }
    }

    #[test]
    fn halt_flag_interrupts() {
        let mut task = Task::bare();
        task.halt_flag().store(true, Ordering::Relaxed);
        match task.check_signals() {
            Err(Flow::Throw(t)) => assert!(is_halt(t.name())),
            _ => panic!("expected a halt throw"),
        }
        assert!(task.check_signals().is_ok());
    }

    #[test]
    fn restore_unwinds_stacks() {
        let mut task = Task::bare();
        let snap = task.snapshot();
        task.ds.push(Cell::integer(1));
        let array = Array::empty();
        task.heap.push_guard_array(&array);
        task.restore(&snap);
        assert!(task.ds.is_empty());
        assert_eq!(0, task.heap.guard_depth());
    }

    #[test]
    fn call_depth_is_limited() {
        let mut task = Task::bare();
        task.config.stack_limit = 2;
        assert!(task.enter_level().is_ok());
        assert!(task.enter_level().is_ok());
        for _ in 0..6 {
            let _ = task.enter_level();
        }
        assert!(matches!(task.enter_level(), Err(Flow::Error(_))));
    }
}
