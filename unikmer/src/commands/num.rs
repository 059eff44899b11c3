use crate::args::NumArgs;
use crate::error::{Result, UnikError};
use crate::setops::open_reader;

pub fn run(args: &NumArgs) -> Result<()> {
    let reader = open_reader(&args.input)?;
    match reader.header.number {
        Some(n) if n >= 0 => {
            println!("{n}");
            Ok(())
        }
        _ => Err(UnikError::NumberUnknown(format!(
            "{}: k-mer count is unknown",
            args.input.display()
        ))),
    }
}
