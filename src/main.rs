mod args;
mod tabulator;

use clap::Parser;
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let res = tabulator::run_tabulation(args.config, args.reference, args.out);
    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
