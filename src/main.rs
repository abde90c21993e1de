//! CLI entry point for `mailpreview`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};

use mailpreview::config::{self, Config};
use mailpreview::provider::directory::DirectoryResolver;
use mailpreview::{DecodeRequest, ImageAttachmentRequest};

/// Resolve and read image attachment previews from an attachment store.
#[derive(Parser)]
#[command(name = "mailpreview", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Attachment store directory (contains attachments.json)
    #[arg(short, long, global = true, env = "MAILPREVIEW_STORE", value_name = "DIR")]
    store: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an attachment and show what a decoder would receive
    Inspect {
        lookup: String,
        /// Rendition to request (0 = simple, 1 = best)
        #[arg(short, long)]
        rendition: Option<i32>,
        /// Decode width
        #[arg(short, long)]
        width: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Copy a rendition's bytes to a file
    Extract {
        lookup: String,
        #[arg(short, long)]
        rendition: Option<i32>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List lookup identifiers in the store
    List {
        #[arg(long)]
        json: bool,
    },
    /// Write the current configuration to the config file
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Inspect {
            lookup,
            rendition,
            width,
            json,
        } => {
            let store = store_dir(cli.store, &config)?;
            cmd_inspect(&store, &config, &lookup, rendition, width, json)
        }
        Commands::Extract {
            lookup,
            rendition,
            output,
        } => {
            let store = store_dir(cli.store, &config)?;
            cmd_extract(&store, &config, &lookup, rendition, &output)
        }
        Commands::List { json } => {
            let store = store_dir(cli.store, &config)?;
            cmd_list(&store, json)
        }
        Commands::InitConfig { force } => cmd_init_config(config, cli.store, force),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = log_path.parent().map(Path::to_path_buf);
    let log_name = log_path.file_name().map(|n| n.to_os_string());

    match (log_dir, log_name) {
        (Some(dir), Some(name)) if std::fs::create_dir_all(&dir).is_ok() => {
            let file_appender = tracing_appender::rolling::never(&dir, name);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
        }
    }
}

/// Pick the store directory: `--store` first, then the config file.
fn store_dir(cli_store: Option<PathBuf>, config: &Config) -> anyhow::Result<PathBuf> {
    let dir = cli_store
        .or_else(|| config.preview.store_dir.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No attachment store given (use --store or preview.store_dir)")
        })?;
    if !dir.is_dir() {
        anyhow::bail!("Attachment store not found: {}", dir.display());
    }
    Ok(dir)
}

fn build_request(
    store: &Path,
    config: &Config,
    lookup: &str,
    rendition: Option<i32>,
    width: Option<u32>,
) -> ImageAttachmentRequest {
    let resolver = Arc::new(DirectoryResolver::new(store));
    ImageAttachmentRequest::new(
        resolver,
        lookup,
        rendition.unwrap_or(config.preview.rendition),
        width.unwrap_or(config.preview.dest_width),
    )
}

/// Resolve an attachment and print its locator, type and orientation hint.
fn cmd_inspect(
    store: &Path,
    config: &Config,
    lookup: &str,
    rendition: Option<i32>,
    width: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let request = build_request(store, config, lookup, rendition, width);
    let orientation = request.has_orientation_exif()?;
    let size = if request.is_resolved() {
        request.create_fd()?.declared_length()
    } else {
        None
    };

    if json {
        let value = serde_json::json!({
            "lookup": request.lookup_uri(),
            "rendition": request.rendition(),
            "dest_width": request.dest_width(),
            "resolved": request.is_resolved(),
            "uri": request.resolved_uri(),
            "mime_type": request.resolved_mime_type(),
            "orientation_exif": orientation,
            "size": size,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("  Request:      {request}");
    match request.resolved_uri() {
        Some(uri) => println!("  Locator:      {uri}"),
        None => println!("  Locator:      (not found)"),
    }
    println!(
        "  Mime type:    {}",
        request.resolved_mime_type().as_deref().unwrap_or("(unknown)")
    );
    println!("  Orientation:  {}", if orientation { "check EXIF" } else { "none" });
    if let Some(size) = size {
        println!(
            "  Size:         {}",
            humansize::format_size(size, humansize::BINARY)
        );
    }
    Ok(())
}

/// Copy the selected rendition to `output`.
fn cmd_extract(
    store: &Path,
    config: &Config,
    lookup: &str,
    rendition: Option<i32>,
    output: &Path,
) -> anyhow::Result<()> {
    let request = build_request(store, config, lookup, rendition, None);
    let mut handle = request.create_fd()?;
    let mut file = std::fs::File::create(output)?;
    let written = std::io::copy(&mut handle, &mut file)?;
    file.flush()?;
    tracing::info!(request = %request, output = %output.display(), bytes = written, "Extracted");
    println!(
        "  Wrote {} to {}",
        humansize::format_size(written, humansize::BINARY),
        output.display()
    );
    Ok(())
}

/// List lookup identifiers in the store.
fn cmd_list(store: &Path, json: bool) -> anyhow::Result<()> {
    let lookups = DirectoryResolver::new(store).lookups()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&lookups)?);
    } else {
        for lookup in &lookups {
            println!("{lookup}");
        }
    }
    Ok(())
}

/// Write `config` (with `--store` recorded as the default store) to the
/// config file location.
fn cmd_init_config(
    mut config: Config,
    store: Option<PathBuf>,
    force: bool,
) -> anyhow::Result<()> {
    if let Some(path) = config::config_file_path() {
        if path.exists() && !force {
            anyhow::bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
    }
    if store.is_some() {
        config.preview.store_dir = store;
    }
    let path = config::save_config(&config)?;
    println!("  Wrote config to {}", path.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailpreview", &mut std::io::stdout());
    Ok(())
}
