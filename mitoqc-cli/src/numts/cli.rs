use clap::{Arg, ArgAction, Command, arg, value_parser};

use mitoqc_io::consts::SAMPLE_COL;

pub const NUMTS_CMD: &str = "numts";

pub fn create_numts_cli() -> Command {
    Command::new(NUMTS_CMD)
        .about("Flag NUMT-like coverage outliers per target and score them against null regions.")
        .arg(
            arg!(--targets <TARGETS>)
                .required(true)
                .help("Target region coverage: a .kt table or a long TSV (s chrom pos target coverage)"),
        )
        .arg(
            arg!(--nulls <NULLS>)
                .required(false)
                .help("Null region coverage, same formats as --targets"),
        )
        .arg(
            Arg::new("load-null")
                .long("load-null")
                .conflicts_with("nulls")
                .help("Null population saved by an earlier run with --save-null"),
        )
        .arg(
            arg!(--qc <QC>)
                .required(false)
                .help("QC table with per-sample mean_coverage"),
        )
        .arg(
            Arg::new("sample-col")
                .long("sample-col")
                .default_value(SAMPLE_COL)
                .help("Sample id column of the QC table"),
        )
        .arg(
            arg!(--output <OUTPUT>)
                .short('o')
                .required(true)
                .help("Per-target output TSV"),
        )
        .arg(
            Arg::new("save-null")
                .long("save-null")
                .help("Also write the null population to this path"),
        )
        .arg(
            Arg::new("numt-only")
                .long("numt-only")
                .action(ArgAction::SetTrue)
                .help("Only count outliers over targets, skip null scoring"),
        )
        .arg(
            Arg::new("trim-bases")
                .long("trim-bases")
                .value_parser(value_parser!(i64))
                .help("Bases trimmed from each end of a target"),
        )
        .arg(
            Arg::new("n-pick")
                .long("n-pick")
                .value_parser(value_parser!(u64))
                .help("Null regions kept, by index"),
        )
        .arg(
            Arg::new("thresholds")
                .long("thresholds")
                .value_delimiter(',')
                .value_parser(value_parser!(f64))
                .help("Comma separated significance levels; the first one gets no column suffix"),
        )
        .arg(
            Arg::new("bounds-mode")
                .long("bounds-mode")
                .value_parser(["derive", "label"])
                .help("Take target bounds from the data or from the |<min>_<max> label suffix"),
        )
        .arg(
            Arg::new("label-width")
                .long("label-width")
                .value_parser(value_parser!(usize))
                .help("Digits per bound in label suffixes"),
        )
        .arg(
            Arg::new("null-statistic")
                .long("null-statistic")
                .value_parser(["occupied_count", "occupied_ranks", "outlier_fraction"])
                .help("Statistic computed from each null track"),
        )
        .arg(
            Arg::new("low-tail")
                .long("low-tail")
                .value_parser(["greater", "less"])
                .help("Which null values count as more extreme in the low tail"),
        )
}
