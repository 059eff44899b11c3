use crate::args::SortArgs;
use crate::error::Result;
use crate::setops::{self, open_reader};
use crate::unikfile::header::{HAS_GLOBAL_TAXID, INCLUDE_TAXID};
use std::fs::File;

pub fn run(args: &SortArgs) -> Result<()> {
    let mut header = open_reader(&args.input)?.header;
    header.set_flag(INCLUDE_TAXID, false);
    header.set_flag(HAS_GLOBAL_TAXID, false);
    header.global_taxid = None;

    let codes = setops::sort(&args.input, args.unique)?;
    let file = File::create(&args.out)?;
    setops::write_sorted_codes(&codes, header, file)
}
