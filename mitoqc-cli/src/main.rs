mod combine;
mod config;
mod numts;
mod progress;
mod samples;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::{LevelFilter, debug};

use config::PipelineConfig;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "mitoqc";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Mitochondrial coverage QC: combine per-sample coverage, flag NUMT-like outliers and manage sample metadata.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("More log output (-v info, -vv debug)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("TOML file with pipeline settings"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(usize))
                .global(true)
                .help("Worker threads (overrides the config)"),
        )
        .subcommand(combine::cli::create_combine_cli())
        .subcommand(numts::cli::create_numts_cli())
        .subcommand(samples::cli::create_samples_cli())
        .subcommand(config::cli::create_config_cli())
}

fn init_logging(verbosity: u8) {
    env_logger::Builder::new()
        .filter_level(match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        })
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<PipelineConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => PipelineConfig::from_file(Path::new(path)),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    init_logging(matches.get_count("verbose"));
    let config = load_config(&matches)?;

    let threads = matches.get_one::<usize>("threads").copied().or(config.threads);
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the thread pool")?;
        debug!("Using {} worker threads", threads);
    }

    match matches.subcommand() {
        //
        // COMBINE
        //
        Some((combine::cli::COMBINE_CMD, matches)) => {
            combine::handlers::run_combine(matches, &config)?;
        }

        //
        // NUMTS
        //
        Some((numts::cli::NUMTS_CMD, matches)) => {
            numts::handlers::run_numts(matches, &config)?;
        }

        //
        // SAMPLE METADATA
        //
        Some((samples::cli::SAMPLES_CMD, matches)) => {
            samples::handlers::run_samples(matches)?;
        }

        //
        // CONFIG
        //
        Some((config::cli::CONFIG_CMD, matches)) => {
            config::handlers::run_config(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }

    #[rstest]
    fn test_global_args_after_subcommand() {
        let matches = build_parser()
            .try_get_matches_from(["mitoqc", "config", "-vv", "--threads", "2"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        assert_eq!(matches.get_one::<usize>("threads"), Some(&2));
    }

    #[rstest]
    fn test_combine_requires_one_input() {
        let result = build_parser().try_get_matches_from([
            "mitoqc", "combine", "-o", "out.kt", "-t", "tmp",
        ]);
        assert!(result.is_err());
    }
}
