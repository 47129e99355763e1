use clap::{Arg, ArgGroup, Command, arg, value_parser};

pub const COMBINE_CMD: &str = "combine";

pub fn create_combine_cli() -> Command {
    Command::new(COMBINE_CMD)
        .about("Merge per-sample mtDNA coverage into one table with per-position annotations.")
        .arg(
            Arg::new("input-tsv")
                .long("input-tsv")
                .short('i')
                .help("Manifest TSV: participant_id, base_level_coverage_metrics, sample"),
        )
        .arg(
            Arg::new("matrix-input")
                .long("matrix-input")
                .help("TSV with batch and coverage columns naming wide coverage matrices"),
        )
        .group(
            ArgGroup::new("inputs")
                .args(["input-tsv", "matrix-input"])
                .required(true),
        )
        .arg(
            arg!(--output <OUTPUT>)
                .short('o')
                .required(true)
                .help("Merged table to write; must end with .kt"),
        )
        .arg(
            Arg::new("temp-dir")
                .long("temp-dir")
                .short('t')
                .required(true)
                .help("Directory for stage checkpoints"),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_parser(value_parser!(usize))
                .help("Tables merged per job at each stage (overrides the config)"),
        )
        .arg(
            Arg::new("keep-targets")
                .long("keep-targets")
                .action(clap::ArgAction::SetTrue)
                .help("Keep the target label in the row key"),
        )
        .arg(
            Arg::new("expect-shifted")
                .long("expect-shifted")
                .action(clap::ArgAction::SetTrue)
                .help("Also read coverage_remapped_self_shifted"),
        )
        .arg(arg!(--overwrite "Replace existing outputs"))
        .arg(
            Arg::new("binary-only")
                .long("binary-only")
                .action(clap::ArgAction::SetTrue)
                .help("Only write the .kt table, skip the flat files"),
        )
}
