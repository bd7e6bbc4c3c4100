use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Path to the harvest configuration file (built-in targets are used when it is missing)
    #[arg(long, default_value = "harvest_config.json")]
    pub config_file: PathBuf,

    /// Directory the per-employer JSON files are written to
    #[arg(long, default_value = "data")]
    pub out_dir: PathBuf,

    /// Sites to leave out of this run
    #[arg(long, value_enum, value_delimiter = ',')]
    pub skip: Vec<Site>,

    /// Never launch a browser; Apple is skipped and Workday only uses its JSON API
    #[arg(long)]
    pub no_browser: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_parser = parse_level)]
    pub log_level: Level,
}

fn parse_level(value: &str) -> Result<Level, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level `{value}`"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Site {
    Greenhouse,
    Icims,
    Apple,
    Workday,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Greenhouse => "greenhouse",
            Site::Icims => "icims",
            Site::Apple => "apple",
            Site::Workday => "workday",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
