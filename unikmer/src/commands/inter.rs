use crate::args::InterArgs;
use crate::error::Result;
use crate::setops::{self, open_reader};
use crate::unikfile::header::{HAS_GLOBAL_TAXID, INCLUDE_TAXID};
use std::fs::File;

pub fn run(args: &InterArgs) -> Result<()> {
    let paths: Vec<&std::path::Path> = args.inputs.iter().map(|p| p.as_path()).collect();
    let mut header = open_reader(paths[0])?.header;
    header.set_flag(INCLUDE_TAXID, false);
    header.set_flag(HAS_GLOBAL_TAXID, false);
    header.global_taxid = None;

    let codes = setops::intersect(&paths)?;
    let file = File::create(&args.out)?;
    setops::write_sorted_codes(&codes, header, file)
}
