use clap::Parser;
use env_logger::{Builder, Env};
use log::debug;

mod app;
mod args;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(level)).init();
    debug!("main: args: {:?}", args);

    if let Err(e) = app::run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
