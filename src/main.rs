use clap::Parser;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use bindwriter::settings::Settings;
use bindwriter::writer::{FormatOptions, Indent};

// the doc comments for this struct turn into the CLI help text
#[derive(Debug, Parser)]
/// Generate BIND 9 zone files and a named.conf from a YAML manifest.
///
/// Every zone in the manifest which has an SOA or any records gets a
/// zone file under the output directory, at the path given by its
/// `file` field.  The configuration is written alongside.
///
/// Set `RUST_LOG` to change the log level, and `RUST_LOG_FORMAT` to one
/// of `full`, `compact`, `pretty`, or `json` to change the log format.
struct Args {
    /// Path to the manifest file
    #[clap(short, long)]
    manifest: String,

    /// Directory to write the configuration and zone files to
    #[clap(short, long)]
    output_dir: PathBuf,

    /// File name of the generated configuration
    #[clap(long, default_value = "named.conf")]
    conf_name: String,

    /// Number of spaces per indentation level in the configuration
    #[clap(long, default_value_t = 4, conflicts_with = "tabs")]
    indent: usize,

    /// Indent the configuration with tabs
    #[clap(long)]
    tabs: bool,

    /// Do not align zone file records into columns
    #[clap(long)]
    no_align: bool,
}

impl Args {
    fn format_options(&self) -> FormatOptions {
        FormatOptions {
            indent: if self.tabs {
                Indent::Tabs
            } else {
                Indent::Spaces(self.indent)
            },
            align_columns: !self.no_align,
            ..FormatOptions::default()
        }
    }
}

fn begin_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let logger = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match env::var("RUST_LOG_FORMAT").as_deref() {
        Ok("json") => logger.json().init(),
        Ok("pretty") => logger.pretty().init(),
        Ok("compact") => logger.compact().init(),
        _ => logger.init(),
    }
}

/// Resolve a zone file path against the output directory.  Absolute
/// paths are taken relative to it too, so nothing escapes it.
fn output_path(output_dir: &Path, file: &str) -> PathBuf {
    let relative: PathBuf = Path::new(file)
        .components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .collect();
    output_dir.join(relative)
}

fn main() {
    let args = Args::parse();
    begin_logging();

    let settings = match Settings::new(&args.manifest) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(manifest = %args.manifest, ?error, "could not read manifest");
            process::exit(1);
        }
    };

    let manifest = match settings.build() {
        Ok(m) => m,
        Err(error) => {
            tracing::error!(manifest = %args.manifest, %error, "invalid manifest");
            process::exit(1);
        }
    };

    let options = args.format_options();

    for output in &manifest.zones {
        let path = output_path(&args.output_dir, &output.file);
        if let Some(parent) = path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                tracing::error!(?parent, ?error, "could not create directory");
                process::exit(1);
            }
        }
        if let Err(error) = output.zone.write_file_with(&path, &options) {
            tracing::error!(%error, "could not write zone file");
            process::exit(1);
        }
        tracing::info!(origin = %output.zone.origin(), ?path, "wrote zone file");
    }

    if let Err(error) = fs::create_dir_all(&args.output_dir) {
        tracing::error!(output_dir = ?args.output_dir, ?error, "could not create directory");
        process::exit(1);
    }
    let conf_path = args.output_dir.join(&args.conf_name);
    if let Err(error) = manifest.conf.write_file_with(&conf_path, &options) {
        tracing::error!(%error, "could not write configuration");
        process::exit(1);
    }
    tracing::info!(
        path = ?conf_path,
        zones = manifest.zones.len(),
        "wrote configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_stays_inside_output_dir() {
        let dir = Path::new("/srv/bind");
        assert_eq!(
            PathBuf::from("/srv/bind/db.example.com"),
            output_path(dir, "db.example.com")
        );
        assert_eq!(
            PathBuf::from("/srv/bind/var/named/db.example.com"),
            output_path(dir, "/var/named/db.example.com")
        );
        assert_eq!(
            PathBuf::from("/srv/bind/etc/named.root"),
            output_path(dir, "../etc/named.root")
        );
    }

    #[test]
    fn format_options_from_args() {
        let args = Args::parse_from(["bindwriter", "-m", "m.yaml", "-o", "out", "--tabs", "--no-align"]);
        let options = args.format_options();
        assert_eq!(Indent::Tabs, options.indent);
        assert!(!options.align_columns);
        assert!(options.trailing_newline);
    }
}
