//! `info`: prints one header summary line per input file, in input order —
//! headers are read in parallel but fanned back in by sequence number.

use crate::args::InfoArgs;
use crate::concurrency::OrderedCollector;
use crate::error::Result;
use crate::setops::open_reader;
use crossbeam_channel::unbounded;
use rayon::prelude::*;

struct Line {
    path: String,
    k: u8,
    canonical: bool,
    sorted: bool,
    hashed: bool,
    scaled: bool,
    number: Option<i64>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let (send, recv) = unbounded();
    args.inputs.par_iter().enumerate().for_each(|(seq, path)| {
        let line = match open_reader(path) {
            Ok(reader) => Line {
                path: path.display().to_string(),
                k: reader.header.k,
                canonical: reader.header.is_canonical(),
                sorted: reader.header.is_sorted(),
                hashed: reader.header.is_hashed(),
                scaled: reader.header.is_scaled(),
                number: reader.header.number,
            },
            Err(e) => Line {
                path: format!("{}: error: {e}", path.display()),
                k: 0,
                canonical: false,
                sorted: false,
                hashed: false,
                scaled: false,
                number: None,
            },
        };
        let _ = send.send((seq as u64, line));
    });
    drop(send);

    for line in OrderedCollector::new(recv).collect_in_order() {
        let number = match line.number {
            Some(n) if n >= 0 => n.to_string(),
            _ => "unknown".to_string(),
        };
        println!(
            "{}\tk={}\tcanonical={}\tsorted={}\thashed={}\tscaled={}\tnumber={}",
            line.path, line.k, line.canonical, line.sorted, line.hashed, line.scaled, number
        );
    }
    Ok(())
}
