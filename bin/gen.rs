use clap::{Arg, Command};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic CSV file to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("with_header")
                .long("with-header")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cols")
                .long("cols")
                .value_parser(clap::value_parser!(usize))
                .default_value("3"),
        )
        .arg(Arg::new("delim").long("delim").default_value(","))
        .arg(
            Arg::new("bom")
                .long("bom")
                .help("Prefix the output with a UTF-8 byte-order mark")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no_trailing_newline")
                .long("no-trailing-newline")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").expect("required by clap");
    let with_header = matches.get_flag("with_header");
    let cols: usize = *matches.get_one("cols").expect("defaulted by clap");
    let delim = matches.get_one::<String>("delim").expect("defaulted by clap");
    let trailing_newline = !matches.get_flag("no_trailing_newline");

    let mut out = io::BufWriter::new(io::stdout().lock());

    if matches.get_flag("bom") {
        out.write_all("\u{feff}".as_bytes())?;
    }

    if with_header {
        write!(&mut out, "sku")?;
        for i in 1..cols {
            write!(&mut out, "{}col{}", delim, i)?;
        }
        writeln!(&mut out)?;
    }

    // Deterministic data: sku, col1, col2, ...
    for i in 0..rows {
        write!(&mut out, "SKU{:010}", i)?;
        for c in 1..cols {
            write!(&mut out, "{}v{}_{}", delim, c, i)?;
        }
        if trailing_newline || i + 1 < rows {
            writeln!(&mut out)?;
        }
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
