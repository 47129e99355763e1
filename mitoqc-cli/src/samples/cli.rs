use clap::{Arg, ArgAction, Command, arg};

pub const SAMPLES_CMD: &str = "samples";
pub const SAMPLES_TABLE: &str = "table";
pub const SAMPLES_COLLATE: &str = "collate";
pub const SAMPLES_STATS: &str = "stats";
pub const SAMPLES_NUC_COVERAGE: &str = "nuc-coverage";

fn output_arg() -> Arg {
    arg!(--output <OUTPUT>)
        .short('o')
        .required(true)
        .help("Output TSV")
}

fn create_table_cli() -> Command {
    Command::new(SAMPLES_TABLE)
        .about("List per-sample files by suffix and join them on sample id.")
        .arg(
            arg!(--folder <FOLDER>)
                .required(true)
                .action(ArgAction::Append)
                .help("Folder to search; may be given more than once"),
        )
        .arg(
            arg!(--kind <KIND>)
                .required(true)
                .action(ArgAction::Append)
                .help("kind=suffix pair, e.g. stats=_mtanalysis_diagnostic_statistics.tsv"),
        )
        .arg(arg!(--recursive "Search every subfolder"))
        .arg(
            Arg::new("enforce-nonmissing")
                .long("enforce-nonmissing")
                .action(ArgAction::SetTrue)
                .help("Fail when a sample lacks any kind of file"),
        )
        .arg(output_arg())
}

fn create_collate_cli() -> Command {
    Command::new(SAMPLES_COLLATE)
        .about("Stack per-sample stats files and join per-sample QC metrics.")
        .arg(
            arg!(--files <FILES>)
                .required(true)
                .help("Sample file table, as written by `samples table`"),
        )
        .arg(
            Arg::new("stats-col")
                .long("stats-col")
                .default_value("stats")
                .help("Column of --files holding stats TSV paths"),
        )
        .arg(
            Arg::new("qc-files")
                .long("qc-files")
                .help("Sample file table listing key/value QC files"),
        )
        .arg(
            Arg::new("qc-col")
                .long("qc-col")
                .default_value("qc")
                .help("Column of --qc-files holding QC file paths"),
        )
        .arg(
            Arg::new("check-ids")
                .long("check-ids")
                .action(ArgAction::SetTrue)
                .help("Require the stats files to hold exactly the listed samples"),
        )
        .arg(
            Arg::new("coverage-manifest")
                .long("coverage-manifest")
                .help("Also write a manifest for `mitoqc combine`"),
        )
        .arg(
            Arg::new("coverage-col")
                .long("coverage-col")
                .default_value("coverage")
                .help("Column holding per-base coverage paths"),
        )
        .arg(output_arg())
}

fn create_stats_cli() -> Command {
    Command::new(SAMPLES_STATS)
        .about("Drop contaminated samples and samples with mtDNA overlaps; add haplogroup and mtCN.")
        .arg(
            Arg::new("sample-stats")
                .long("sample-stats")
                .required(true)
                .help("Sample stats table keyed by s"),
        )
        .arg(
            Arg::new("contamination")
                .long("contamination")
                .required(true)
                .help("Table keyed by s with a boolean keep column"),
        )
        .arg(output_arg())
}

fn create_nuc_coverage_cli() -> Command {
    Command::new(SAMPLES_NUC_COVERAGE)
        .about("Estimate nuclear coverage per sample from idxstats and read length.")
        .arg(
            Arg::new("input-tsv")
                .long("input-tsv")
                .short('i')
                .required(true)
                .help("Sample table keyed by s with idxstats and read length paths"),
        )
        .arg(
            Arg::new("idxstats")
                .long("idxstats")
                .default_value("idxstats")
                .help("Column holding idxstats paths"),
        )
        .arg(
            Arg::new("read-length")
                .long("read-length")
                .default_value("read_length")
                .help("Column holding read length table paths"),
        )
        .arg(
            Arg::new("main-chroms")
                .long("main-chroms")
                .action(ArgAction::SetTrue)
                .help("Count chr1-chr22, chrX and chrY only"),
        )
        .arg(
            Arg::new("include-mtdna")
                .long("include-mtdna")
                .action(ArgAction::SetTrue)
                .help("Include chrM in the coverage estimate"),
        )
        .arg(
            Arg::new("mapped-counts")
                .long("mapped-counts")
                .help("Also write mapped read counts per chromosome and sample"),
        )
        .arg(output_arg())
}

pub fn create_samples_cli() -> Command {
    Command::new(SAMPLES_CMD)
        .about("Build and filter per-sample metadata tables.")
        .subcommand_required(true)
        .subcommand(create_table_cli())
        .subcommand(create_collate_cli())
        .subcommand(create_stats_cli())
        .subcommand(create_nuc_coverage_cli())
}
