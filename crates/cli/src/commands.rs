use clap::*;

pub mod cache;
pub mod info;
pub mod resolve;

use cache::CacheCommands;
use resolve::ResolveArgs;

#[derive(Subcommand, Debug)]
#[command(flatten_help = true)]
pub enum Commands {
    /// Show information on the modfs configuration and search paths.
    #[clap(disable_version_flag = true)]
    Info,

    /// Show which package serves each virtual path under a profile.
    #[clap(disable_version_flag = true)]
    Resolve(ResolveArgs),

    #[clap(subcommand, disable_version_flag = true)]
    Cache(CacheCommands),
}
