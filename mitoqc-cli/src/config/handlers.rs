use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;
use log::info;

use super::PipelineConfig;

pub fn run_config(matches: &ArgMatches) -> Result<()> {
    let output = matches
        .get_one::<String>("output")
        .expect("output has a default");
    let output = Path::new(output);

    if output.exists() && !matches.get_flag("overwrite") {
        anyhow::bail!("{:?} already exists; pass --overwrite to replace it", output);
    }

    PipelineConfig::default().to_file(output)?;
    info!("Wrote default config to {:?}", output);
    Ok(())
}
