//! `rfilter`: keep codes whose taxid's rank (or an ancestor's) passes an
//! ordered-rank filter, per an NCBI `nodes.dmp` taxonomy.

use crate::args::RfilterArgs;
use crate::error::{Result, UnikError};
use crate::setops::open_reader;
use crate::taxonomy::Taxonomy;
use crate::unikfile::header::HAS_NUMBER;
use crate::unikfile::Writer;
use std::fs::File;

pub fn run(args: &RfilterArgs) -> Result<()> {
    if args.ranks.is_empty() {
        return Err(UnikError::ConfigError("rfilter requires at least one rank".into()));
    }
    let nodes_file = File::open(&args.nodes_dmp)?;
    let mut taxonomy = Taxonomy::parse_nodes_file(nodes_file)?;

    let mut reader = open_reader(&args.input)?;
    if !reader.header.includes_taxid() && reader.header.global_taxid.is_none() {
        return Err(UnikError::ConfigError(
            "rfilter requires a file carrying per-code or global taxids".into(),
        ));
    }
    let mut header = reader.header.clone();
    header.set_flag(HAS_NUMBER, true);
    header.number = Some(-1);

    let file = File::create(&args.out)?;
    let mut writer = Writer::new(file, header)?;
    while let Some((code, taxid)) = reader.read_code_with_taxid()? {
        if taxonomy.rank_passes(taxid, &args.ranks) {
            writer.write_code_with_taxid(code, taxid)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
