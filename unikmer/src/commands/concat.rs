use crate::args::ConcatArgs;
use crate::error::Result;
use crate::setops::{self, open_reader};
use crate::unikfile::header::{HAS_GLOBAL_TAXID, HAS_NUMBER, INCLUDE_TAXID, SORTED};
use crate::unikfile::Writer;
use std::fs::File;

pub fn run(args: &ConcatArgs) -> Result<()> {
    let paths: Vec<&std::path::Path> = args.inputs.iter().map(|p| p.as_path()).collect();
    let mut header = open_reader(paths[0])?.header;
    // setops::concat moves bare codes only; per-file taxid/order guarantees
    // don't survive a union of possibly-overlapping, differently-ordered inputs.
    header.set_flag(SORTED, false);
    header.set_flag(INCLUDE_TAXID, false);
    header.set_flag(HAS_GLOBAL_TAXID, false);
    header.global_taxid = None;
    header.set_flag(HAS_NUMBER, true);
    header.number = Some(-1);

    let file = File::create(&args.out)?;
    let mut writer = Writer::new(file, header)?;
    setops::concat(&paths, &mut writer)?;
    writer.finalize()?;
    Ok(())
}
