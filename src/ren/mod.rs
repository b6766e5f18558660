// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/ren/mod.rs

// The evaluator: values and series, binding, function construction
// and composition, the frame-based dispatch loop, and the native
// library booted into every task.

// <>

pub mod kinds;
pub mod symtab;

pub mod cell;
pub mod memmgt;
pub mod series;

pub mod binding;
pub mod context;
pub mod map;

pub mod func;
pub mod paramlist;

pub mod call;
pub mod eval;
pub mod frame;
pub mod path;
pub mod task;

pub mod compose;
pub mod varargs;

pub mod error;
pub mod throws;

pub mod compare;
pub mod mold;
pub mod scan;

#[macro_use]
mod stdenv;

pub mod actions;
pub mod control;

pub use cell::Cell;
pub use control::console_hook;
pub use task::Task;
pub use throws::RenError;
