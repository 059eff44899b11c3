//! `tsplit`: split a sorted, taxid-bearing `.unik` file into one file per
//! taxid under `out_dir`.

use crate::args::TsplitArgs;
use crate::error::Result;
use crate::setops;

pub fn run(args: &TsplitArgs) -> Result<()> {
    std::fs::create_dir_all(&args.out_dir)?;
    let summary = setops::tsplit(&args.input, &args.out_dir)?;
    for (taxid, count) in summary {
        println!("{taxid}\t{count}");
    }
    Ok(())
}
