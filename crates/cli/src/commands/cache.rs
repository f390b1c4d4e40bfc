use std::path::PathBuf;

use clap::{Args, Subcommand};
use color_eyre::Result;
use modfs_overlay::CacheDirectory;
use tracing::info;

use crate::config::Config;

#[derive(Subcommand, Debug)]
#[command(flatten_help = true)]
/// Manage cache namespaces.
pub enum CacheCommands {
    /// Print (and create) the cache directory for each key, in order.
    Path(PathArgs),

    /// Delete a cache namespace and everything in it.
    Clear(ClearArgs),
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Cache namespace, a single directory name under the cache root.
    namespace: String,

    /// Keys to allocate, e.g. `data/models/hud.txd`. Repeating a key with `--distinct` places
    /// each repetition in its own bucket.
    #[clap(required = true)]
    keys: Vec<String>,

    /// Place the key in the unique bucket.
    #[clap(long)]
    unique: bool,

    /// Place the key in a shared bucket that doesn't hold it yet.
    #[clap(long, conflicts_with = "unique")]
    distinct: bool,

    /// Print the absolute path rather than one relative to the cache root.
    #[clap(long)]
    absolute: bool,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    namespace: String,
}

pub fn path(config: Config, args: PathArgs) -> Result<()> {
    let mut cache = CacheDirectory::new(config.cache_config()?);
    cache.startup(&args.namespace)?;

    let result = allocate(&mut cache, &args);
    cache.shutdown(false);

    for path in result? {
        println!("{}", path.to_string_lossy());
    }

    Ok(())
}

fn allocate(cache: &mut CacheDirectory, args: &PathArgs) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(args.keys.len());

    for key in &args.keys {
        let path = if args.distinct {
            cache.get_distinct_cache_path(key, args.absolute)?
        } else {
            cache.get_cache_path(key, args.absolute, args.unique)?
        };

        paths.push(path);
    }

    Ok(paths)
}

pub fn clear(config: Config, args: ClearArgs) -> Result<()> {
    let mut cache = CacheDirectory::new(config.cache_config()?);
    cache.startup(&args.namespace)?;
    cache.shutdown(true);

    info!(namespace = %args.namespace, "cleared cache namespace");

    Ok(())
}

#[cfg(test)]
mod test {
    use modfs_overlay::{CacheConfig, CacheDirectory};

    use super::{allocate, PathArgs};

    fn args(keys: &[&str], unique: bool, distinct: bool) -> PathArgs {
        PathArgs {
            namespace: "ns".to_string(),
            keys: keys.iter().map(|key| key.to_string()).collect(),
            unique,
            distinct,
            absolute: false,
        }
    }

    fn started(root: &std::path::Path) -> CacheDirectory {
        let mut cache = CacheDirectory::new(CacheConfig::new(root));
        cache.startup("ns").unwrap();
        cache
    }

    #[test]
    fn distinct_repeats_land_in_separate_buckets() {
        let root = tempfile::tempdir().unwrap();
        let mut cache = started(root.path());

        let keys = ["hud.txd", "hud.txd", "hud.txd"];
        let paths = allocate(&mut cache, &args(&keys, false, true)).unwrap();

        assert_eq!(
            paths,
            [
                root.path().join("ns/1/hud.txd"),
                root.path().join("ns/2/hud.txd"),
                root.path().join("ns/3/hud.txd"),
            ]
        );
    }

    #[test]
    fn shared_repeats_reuse_the_first_path() {
        let root = tempfile::tempdir().unwrap();
        let mut cache = started(root.path());

        let paths = allocate(&mut cache, &args(&["hud.txd", "hud.txd"], false, false)).unwrap();

        assert_eq!(paths[0], paths[1]);
    }

    #[test]
    fn unique_keys_use_bucket_zero() {
        let root = tempfile::tempdir().unwrap();
        let mut cache = started(root.path());

        let paths = allocate(&mut cache, &args(&["a", "b"], true, false)).unwrap();

        assert_eq!(paths, [root.path().join("ns/0/a"), root.path().join("ns/0/b")]);
    }
}
