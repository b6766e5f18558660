// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/lib.rs

// Library root: the evaluator and its configuration.

// <>

pub mod config;
pub mod ren;

pub use config::{Config, ConfigError};
pub use ren::{console_hook, Cell, RenError, Task};
