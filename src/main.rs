use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use stronghold_map::config::{ConfigError, EditorConfig};
use stronghold_map::engine::EngineCore;
use stronghold_map::export::{ExportError, ExportPipeline, Quality, Theme};
use stronghold_map::icons::{FsIconSource, HttpIconSource, IconError, IconSource};
use stronghold_map::share::{self, ShareError, ShareState};
use stronghold_map::store::{FileStore, KeyValueStore, NullStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid --quality '{0}' (expected 1, 2 or 4)")]
    InvalidQuality(String),
    #[error("invalid --theme '{0}' (expected 'light' or 'dark')")]
    InvalidTheme(String),
    #[error("no share token found in '{0}'")]
    MissingToken(String),
    #[error("share token rejected: {0}")]
    Share(#[from] ShareError),
    #[error("icon source unavailable: {0}")]
    Icons(#[from] IconError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "stronghold-map", about = "Stronghold hex map export and share-link tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the map to PNG.
    Export(ExportArgs),
    /// Write the untransformed map SVG.
    Svg(SvgArgs),
    /// Build a share token from a marks or share-state JSON file.
    Encode(EncodeArgs),
    /// Print the state behind a share token or share URL.
    Decode(DecodeArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Share token or share URL. Stored marks are used when absent.
    #[arg(long)]
    share: Option<String>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long)]
    quality: Option<String>,

    #[arg(long)]
    theme: Option<String>,

    #[arg(long, default_value_t = false)]
    no_watermark: bool,
}

#[derive(Args, Debug)]
struct SvgArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long, default_value = "stronghold-map.svg")]
    out: PathBuf,

    #[arg(long)]
    theme: Option<String>,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// JSON file holding a marks array or `{ "marks": [...], "annotations": [...] }`.
    input: PathBuf,

    /// Print a full share URL on this base instead of the bare token.
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Share token or share URL.
    token: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = EditorConfig::from_env()?;
    init_tracing(&config.log_level);

    match cli.command {
        Command::Export(args) => run_export(&config, args).await,
        Command::Svg(args) => run_svg(&config, args).await,
        Command::Encode(args) => run_encode(args).await,
        Command::Decode(args) => run_decode(&args),
    }
}

fn init_tracing(level: &str) {
    let max_level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(max_level).with_writer(std::io::stderr).init();
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_export(config: &EditorConfig, args: ExportArgs) -> Result<(), CliError> {
    let mut options = config.export_options();
    if let Some(raw) = args.quality {
        options.quality = Quality::parse(&raw).ok_or(CliError::InvalidQuality(raw))?;
    }
    if let Some(raw) = args.theme {
        options.theme = Theme::parse(&raw).ok_or(CliError::InvalidTheme(raw))?;
    }
    if args.no_watermark {
        options.watermark.clear();
    }

    let core = load_core(config, &args.source)?;
    let pipeline = ExportPipeline::new(icon_source(&config.icon_dir)?);
    let artifact = pipeline.export(&core.scene, &config.map, &options).await?;

    let path = args.out_dir.join(&artifact.file_name);
    write_file(&path, &artifact.png).await?;
    println!("{}", path.display());
    Ok(())
}

async fn run_svg(config: &EditorConfig, args: SvgArgs) -> Result<(), CliError> {
    let theme = match args.theme {
        Some(raw) => Theme::parse(&raw).ok_or(CliError::InvalidTheme(raw))?,
        None => config.export_theme,
    };
    let core = load_core(config, &args.source)?;
    let pipeline = ExportPipeline::new(icon_source(&config.icon_dir)?);
    let svg = pipeline.render_svg(&core.scene, &config.map, theme).await;

    write_file(&args.out, svg.as_bytes()).await?;
    println!("{}", args.out.display());
    Ok(())
}

async fn run_encode(args: EncodeArgs) -> Result<(), CliError> {
    let raw = tokio::fs::read(&args.input).await.map_err(|source| CliError::Io { path: args.input.clone(), source })?;
    let state = match serde_json::from_slice::<Value>(&raw)? {
        Value::Array(values) => ShareState { marks: share::marks_from_values(values), annotations: Vec::new() },
        other => serde_json::from_value::<ShareState>(other)?,
    };

    let token = share::encode(&state)?;
    match args.base_url {
        Some(base) => println!("{}", share::share_url(&base, &token)),
        None => println!("{token}"),
    }
    Ok(())
}

fn run_decode(args: &DecodeArgs) -> Result<(), CliError> {
    let token = extract_token(&args.token)?;
    let state = share::try_decode(&token)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// The token itself, or the `map` parameter of a share URL.
fn extract_token(raw: &str) -> Result<String, CliError> {
    let raw = raw.trim();
    let Some((_, query)) = raw.split_once('?') else {
        return Ok(raw.to_owned());
    };
    let query = query.split('#').next().unwrap_or(query);
    share::token_from_query(query).ok_or_else(|| CliError::MissingToken(raw.to_owned()))
}

/// Engine seeded from a share link, or from the persisted marks.
fn load_core(config: &EditorConfig, source: &SourceArgs) -> Result<EngineCore, CliError> {
    let token = match &source.share {
        Some(raw) => Some(extract_token(raw)?),
        None => None,
    };
    // Rendering a shared map must not overwrite the local marks.
    let store: Box<dyn KeyValueStore> = match token {
        Some(_) => Box::new(NullStore),
        None => Box::new(FileStore::new(&config.store_dir)),
    };
    let mut core = EngineCore::new(config.map, &config.icon_dir, store);
    core.load(token.as_deref());
    Ok(core)
}

fn icon_source(icon_dir: &str) -> Result<Arc<dyn IconSource>, CliError> {
    if icon_dir.starts_with("http://") || icon_dir.starts_with("https://") {
        return Ok(Arc::new(HttpIconSource::new()?));
    }
    Ok(Arc::new(FsIconSource::new(icon_dir)))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|source| CliError::Io { path: parent.to_path_buf(), source })?;
    }
    tokio::fs::write(path, bytes).await.map_err(|source| CliError::Io { path: path.to_path_buf(), source })
}
