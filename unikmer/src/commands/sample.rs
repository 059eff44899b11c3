use crate::args::SampleArgs;
use crate::error::Result;
use crate::setops::open_reader;
use crate::unikfile::header::{HAS_GLOBAL_TAXID, HAS_NUMBER, INCLUDE_TAXID};
use crate::unikfile::Writer;
use std::fs::File;

pub fn run(args: &SampleArgs) -> Result<()> {
    let mut reader = open_reader(&args.input)?;
    let mut header = reader.header.clone();
    header.set_flag(INCLUDE_TAXID, false);
    header.set_flag(HAS_GLOBAL_TAXID, false);
    header.global_taxid = None;
    header.set_flag(HAS_NUMBER, true);
    header.number = Some(-1);
    // Sampling preserves relative order, so SORTED survives unchanged.

    let codes = reader.read_all()?;
    let file = File::create(&args.out)?;
    let mut writer = Writer::new(file, header)?;
    let start = args.start as usize;
    let window = args.window.max(1) as usize;
    for code in codes.into_iter().skip(start).step_by(window) {
        writer.write_code(code)?;
    }
    writer.finalize()?;
    Ok(())
}
