use clap::Args;
use color_eyre::{owo_colors::OwoColorize, Result};
use modfs_mod_protocol::ModProfile;
use modfs_overlay::{CacheDirectory, FileResolver, OverrideMapping, Resolution};
use tracing::info;

use crate::{config::Config, output::OutputBuilder};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Name of a profile in the profile directory, or a path to a profile file.
    profile: String,

    /// Virtual paths to resolve, e.g. `data0:/models/hud.txd`.
    #[clap(required = true)]
    paths: Vec<String>,

    /// Allocate cache directories in this namespace for paths that more than one package
    /// overrides.
    #[clap(long)]
    namespace: Option<String>,
}

pub fn resolve(config: Config, args: ResolveArgs) -> Result<()> {
    let profile_path = config.resolve_profile(&args.profile)?;
    let profile = ModProfile::from_file(&profile_path)?;

    let mut mapping = OverrideMapping::new();
    mapping.scan_profile(&profile)?;

    let resolver = mapping.into_resolver();

    info!(profile = ?profile_path, candidates = resolver.len(), "loaded profile");

    let mut output = OutputBuilder::new(format!("Profile {}", profile_path.to_string_lossy()));

    match &args.namespace {
        Some(namespace) => {
            let mut cache = CacheDirectory::new(config.cache_config()?);
            cache.startup(namespace)?;

            let result = print_cached(&resolver, &args.paths, &mut cache, &mut output);
            cache.shutdown(false);
            result?;
        }
        None => {
            for path in &args.paths {
                output.section(path, |builder| {
                    let sources = resolver.resolve_all(path);

                    if sources.is_empty() {
                        builder.property("Winner", "<none>".red());
                    }

                    for (rank, candidate) in sources.iter().enumerate() {
                        let label = if rank == 0 {
                            "Winner".to_string()
                        } else {
                            format!("#{rank}")
                        };

                        builder.property(
                            label,
                            format!(
                                "{} ({}, priority {})",
                                candidate.file.to_string_lossy(),
                                candidate.source,
                                candidate.priority
                            ),
                        );
                    }
                });
            }
        }
    }

    print!("{}", output.build());

    Ok(())
}

fn print_cached(
    resolver: &FileResolver,
    paths: &[String],
    cache: &mut CacheDirectory,
    output: &mut OutputBuilder,
) -> Result<()> {
    for path in paths {
        let resolution = resolver.resolve_with_cache(path, cache)?;

        output.section(path, |builder| match resolution {
            None => builder.property("Winner", "<none>".red()),
            Some(Resolution::Direct(candidate)) => {
                builder.property("Winner", candidate.file.to_string_lossy());
                builder.property("Source", &candidate.source);
            }
            Some(Resolution::Merged {
                sources,
                cache_path,
            }) => {
                let ids = sources
                    .iter()
                    .map(|candidate| candidate.source.as_str())
                    .collect::<Vec<_>>();

                builder.property("Merged from", ids.join(", "));
                builder.property("Cache path", cache_path.to_string_lossy());
            }
        });
    }

    Ok(())
}
