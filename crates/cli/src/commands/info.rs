use color_eyre::owo_colors::OwoColorize;

use crate::{config::Config, output::OutputBuilder};

fn format_path<P: AsRef<std::path::Path>>(path: Option<P>) -> String {
    match path {
        None => "<none>".red().to_string(),
        Some(path) => path.as_ref().to_string_lossy().to_string(),
    }
}

fn format_status(status: bool) -> String {
    if status {
        "Found".green().to_string()
    } else {
        "Not found".red().to_string()
    }
}

pub fn info(config: Config) -> color_eyre::Result<()> {
    let mut output = OutputBuilder::new("Configuration");

    let cache_root = config.cache_config().ok().map(|cache| cache.root);

    output.property("Cache directory", format_path(cache_root.as_ref()));
    output.property("Profile directory", format_path(config.profile_dir()));
    output.property("Log file", format_path(config.log_file()));

    output.section("Configuration search paths", |builder| {
        for (index, item) in config.known_dirs.config_dirs().enumerate() {
            let path = item.join("modfs.toml");

            builder.property(
                format!("{index}"),
                format!("{} ({})", path.to_string_lossy(), format_status(path.is_file())),
            );
        }
    });

    print!("{}", output.build());

    Ok(())
}
