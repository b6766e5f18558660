// RENC, an evaluator core for the Ren-C language.

// SPDX-FileCopyrightText: © 2024 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// RENC is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/main.rs

// Command-line host: runs a script, a single expression, or a line
// REPL with a nested debug prompt at breakpoints.

// <>

use clap::Parser;

use renc::ren::mold::{mold_with, MoldOpts};
use renc::{console_hook, Config, RenError, Task};

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Stack beyond the evaluator's native budget, for the host and for
/// work between stack checks
const STACK_MARGIN: usize = 8 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "renc", version, about = "Evaluator core for the Ren-C language")]
struct Args {
    /// Script to run
    script: Option<PathBuf>,

    /// Evaluate EXPR and print its result
    #[arg(long = "do", value_name = "EXPR")]
    expr: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL")]
    log: Option<String>,

    /// Print no banner or results
    #[arg(long, short)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).unwrap_or_else(|err| {
            eprintln!("renc: {}", err);
            process::exit(2)
        }),
        None => Config::default(),
    };
    if let Some(level) = &args.log {
        config.log_level = level.clone();
    }
    let level = config.level().unwrap_or_else(|err| {
        eprintln!("renc: {}", err);
        process::exit(2)
    });
    if let Err(err) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("renc: cannot start logging: {}", err);
    }

    // The evaluator gets its own thread so the stack can be sized for it
    let stack_size = config.native_stack.saturating_add(STACK_MARGIN);
    let evaluator = thread::Builder::new()
        .name("evaluator".to_string())
        .stack_size(stack_size)
        .spawn(move || run(args, config));

    let code = match evaluator.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => {
            log::error!("evaluator thread panicked");
            101
        }
        Err(err) => {
            eprintln!("renc: cannot start evaluator: {}", err);
            1
        }
    };
    process::exit(code);
}

/// SIGINT sets the halt flag; the evaluator checks it between calls
fn install_interrupt(flag: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGINT, flag) {
            log::warn!("cannot install interrupt handler: {}", err);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = flag;
    }
}

fn run(args: Args, config: Config) -> i32 {
    let mut task = match Task::new(config) {
        Ok(task) => task,
        Err(err) => return report(err),
    };
    install_interrupt(task.halt_flag());

    let result = if let Some(expr) = &args.expr {
        task.do_source(expr, None).map(|value| {
            if !args.quiet && !value.is_void() {
                println!("== {}", value);
            }
        })
    } else if let Some(path) = &args.script {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("renc: cannot read {}: {}", path.display(), err);
                return 1;
            }
        };
        task.do_source(&text, Some(&path.to_string_lossy()))
            .map(|_| ())
    } else {
        return repl(&mut task, args.quiet);
    };

    match result {
        Ok(()) => 0,
        Err(err) => report(err),
    }
}

fn report(err: RenError) -> i32 {
    match &err {
        RenError::Quit(_) => (),
        _ => eprintln!("{}", err),
    }
    err.exit_code()
}

fn read_stdin_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    match io::stdin().read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line)),
    }
}

fn repl(task: &mut Task, quiet: bool) -> i32 {
    task.set_breakpoint_hook(console_hook(read_stdin_line, io::stdout()));
    let halt = task.halt_flag();
    if !quiet {
        println!("RENC {}", env!("CARGO_PKG_VERSION"));
    }

    loop {
        if !quiet {
            print!(">> ");
            let _ = io::stdout().flush();
        }
        let line = match read_stdin_line() {
            Ok(Some(line)) => line,
            Ok(None) => return 0,
            Err(err) => {
                eprintln!("renc: {}", err);
                return 1;
            }
        };
        halt.store(false, Ordering::Relaxed);

        match task.do_string(&line) {
            Ok(value) if value.is_void() || quiet => (),
            Ok(value) => {
                let opts = MoldOpts {
                    limit: task.config.mold_limit,
                    ..MoldOpts::default()
                };
                println!("== {}", mold_with(&mut task.mold, &value, opts));
            }
            Err(RenError::Quit(code)) => return code,
            Err(err) => println!("{}", err),
        }
    }
}
