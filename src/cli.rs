use clap::Parser;
use std::path::PathBuf;

use netdrop::utils::version;

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    /// Files to upload, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Upload to the local development server
    #[arg(long)]
    pub dev: bool,

    /// Address of the netdrop server (overrides config and NETDROP_ORIGIN)
    #[arg(long, value_name = "URL")]
    pub origin: Option<String>,

    /// Print the final records as JSON instead of a summary table
    #[arg(long)]
    pub json: bool,
}
