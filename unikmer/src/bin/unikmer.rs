use clap::Parser;
use unikmer::args::{Cli, Command};
use unikmer::commands;
use unikmer::error::UnikError;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn main() -> Result<(), UnikError> {
    env_logger::Builder::new().filter_level(log::LevelFilter::Info).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Count(args) => commands::count::run(&args),
        Command::Concat(args) => commands::concat::run(&args),
        Command::Inter(args) => commands::inter::run(&args),
        Command::Diff(args) => commands::diff::run(&args),
        Command::Sort(args) => commands::sort::run(&args),
        Command::Sample(args) => commands::sample::run(&args),
        Command::Tsplit(args) => commands::tsplit::run(&args),
        Command::Rfilter(args) => commands::rfilter::run(&args),
        Command::Db(args) => commands::db::run(&args),
        Command::Info(args) => commands::info::run(&args),
        Command::Num(args) => commands::num::run(&args),
    }
}
