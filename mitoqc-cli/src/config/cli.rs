use clap::{Command, arg};

pub const CONFIG_CMD: &str = "config";
pub const DEFAULT_CONFIG_OUT: &str = "mitoqc.toml";

pub fn create_config_cli() -> Command {
    Command::new(CONFIG_CMD)
        .about("Write a pipeline config file holding the default settings.")
        .arg(
            arg!(--output <OUTPUT>)
                .required(false)
                .default_value(DEFAULT_CONFIG_OUT)
                .help("Where to write the TOML config"),
        )
        .arg(arg!(--overwrite "Replace an existing file"))
}
