use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Directory whose regular files are packed into the image
    #[arg(long, short)]
    pub source: PathBuf,

    /// Output image path
    #[arg(long, short)]
    pub out: PathBuf,

    /// Image size in MiB
    #[arg(long, default_value_t = 16)]
    pub size_mib: u64,
}
