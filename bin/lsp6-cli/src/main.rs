//! `lsp6-cli`: command-line helpers for LSP6 key managers.

use clap::Parser;
use lsp6_cli::{Error, MainCmd};

fn main() -> Result<(), Error> {
    set_thread_panic_hook();
    let cmd = MainCmd::parse();
    cmd.log_args.init()?;
    cmd.run().inspect_err(|e| eprintln!("{e}"))
}

/// Sets thread panic hook, useful for having tests that panic.
fn set_thread_panic_hook() {
    use std::{
        backtrace::Backtrace,
        panic::{set_hook, take_hook},
        process::exit,
    };
    let orig_hook = take_hook();
    set_hook(Box::new(move |panic_info| {
        println!("Custom backtrace: {}", Backtrace::capture());
        orig_hook(panic_info);
        exit(1);
    }));
}
