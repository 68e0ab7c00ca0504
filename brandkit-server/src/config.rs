//! Command line and environment configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;

use brandkit_core::project::DEFAULT_SIZES;
use brandkit_core::{ExportSpec, ExtraAsset};
use clap::{Args, Parser, Subcommand};

use crate::validation::{validate_export_spec, ValidationError};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 9474;

/// Default location of the bold typeface used for social images.
pub const DEFAULT_FONT_PATH: &str = "assets/fonts/Inter-ExtraBold.ttf";

/// Brandkit: turn one SVG logo into a full set of brand assets.
#[derive(Debug, Parser)]
#[command(name = "brandkit-server", version, about)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// What to run; `serve` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

impl Cli {
    /// The selected command, defaulting to `serve` with top-level flags.
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Export an asset archive for a logo without starting the server.
    Export(ExportArgs),
}

/// Options for `serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port to listen on (localhost only).
    #[arg(long, env = "BRANDKIT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bold typeface for social images, read on every request.
    #[arg(long, env = "BRANDKIT_FONT_PATH", default_value = DEFAULT_FONT_PATH)]
    pub font_path: PathBuf,

    /// Directory for JSON project persistence; in-memory only when unset.
    #[arg(long, env = "BRANDKIT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            port: args.port,
            font_path: args.font_path,
            data_dir: args.data_dir,
        }
    }
}

/// Options for `export`.
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Logo file.
    #[arg(long)]
    pub svg: PathBuf,

    /// Project name, used for file naming and descriptors.
    #[arg(long)]
    pub name: String,

    /// Icon sizes, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_SIZES)]
    pub sizes: Vec<u32>,

    /// Optional extras, comma separated; all of them when omitted.
    #[arg(long, value_delimiter = ',', value_parser = parse_extra_asset)]
    pub extras: Vec<ExtraAsset>,

    /// Canvas background color.
    #[arg(long)]
    pub background: Option<String>,

    /// Corner radius in canonical units (0-256).
    #[arg(long)]
    pub border_radius: Option<f32>,

    /// Logo zoom.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    /// Project description for descriptors and the social image.
    #[arg(long)]
    pub description: Option<String>,

    /// Typeface for the social image; the preview layout is used without it.
    #[arg(long, env = "BRANDKIT_FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// Output directory.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

impl ExportArgs {
    /// The archive contents these flags select.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for sizes the HTTP export would reject.
    pub fn export_spec(&self) -> Result<ExportSpec, ValidationError> {
        let defaults = ExportSpec::default();
        let sizes: BTreeSet<u32> = self.sizes.iter().copied().collect();
        let spec = ExportSpec {
            sizes,
            extra_assets: if self.extras.is_empty() {
                defaults.extra_assets
            } else {
                self.extras.iter().copied().collect()
            },
        };
        validate_export_spec(&spec)?;
        Ok(spec)
    }
}

fn parse_extra_asset(value: &str) -> Result<ExtraAsset, String> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase()))
        .map_err(|_| format!("unknown asset '{value}' (favicon, splash, manifest, appjson, opengraph)"))
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
    /// Social image typeface.
    pub font_path: PathBuf,
    /// Optional project persistence directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            data_dir: None,
        }
    }
}
