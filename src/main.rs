use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use mokuroku::{
    Config, create_app,
    manifest::{Manifest, MediaItem, MediaType},
    naming,
    sync::{
        CdnProvider, DynCdnProvider, HttpCdnProvider, NullCdnProvider, SyncRunner, resolve_api_key,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the collection editor server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Synchronize local collections to the CDN and the gallery manifest
    Sync {
        /// Record per-file failures and keep going instead of aborting
        #[arg(long)]
        keep_going: bool,

        /// Resolve and reconcile without performing any uploads
        #[arg(long)]
        dry_run: bool,
    },

    /// Import a single remote URL into a manifest collection
    Add {
        /// Category key, e.g. photos
        #[arg(long)]
        category: String,

        /// Stable collection id (slug)
        #[arg(long)]
        collection_id: String,

        /// Public URL to import via the CDN API
        #[arg(long)]
        source_url: String,

        #[arg(long)]
        category_label: Option<String>,

        #[arg(long)]
        collection_name: Option<String>,

        #[arg(long, default_value = "")]
        collection_description: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, default_value = "")]
        caption: String,

        #[arg(long)]
        alt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Sync {
            keep_going,
            dry_run,
        }) => run_sync(cli.config, keep_going, dry_run).await,
        Some(Commands::Add {
            category,
            collection_id,
            source_url,
            category_label,
            collection_name,
            collection_description,
            title,
            caption,
            alt,
        }) => {
            run_add(AddArgs {
                config_path: cli.config,
                category,
                collection_id,
                source_url,
                category_label,
                collection_name,
                collection_description,
                title,
                caption,
                alt,
            })
            .await
        }
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(cli.config, port, host, quit_after).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(cli.config, None, None, None).await
        }
    }
}

fn load_config(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

async fn run_server(
    config_path: PathBuf,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;

    let host = host.unwrap_or(config.server.host.clone());
    // CLI flag beats the environment, which beats the config file.
    let env_port = std::env::var("COLLECTION_MANAGER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok());
    let port = port.or(env_port).unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    for library in &config.libraries {
        let directory = config.sync.base_dir.join(&library.directory);
        if directory.is_dir() {
            info!("Managing root '{}': {:?}", library.id, directory);
        } else {
            warn!(
                "Root '{}' directory does not exist yet: {:?}",
                library.id, directory
            );
        }
    }
    info!(
        "Manifest: {:?}",
        config.sync.base_dir.join(&config.sync.manifest_path)
    );

    let app = create_app(config, config_path);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Collection manager listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    Ok(())
}

async fn run_sync(
    config_path: PathBuf,
    keep_going: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&config_path)?;
    if keep_going {
        config.sync.continue_on_error = true;
    }

    let provider: DynCdnProvider = if dry_run {
        info!("Dry run: uploads will be logged, not performed");
        Arc::new(NullCdnProvider::new())
    } else {
        let env_file = config.sync.base_dir.join(&config.sync.env_file);
        let Some(api_key) = resolve_api_key(&env_file).await else {
            eprintln!("Missing CDN_API_KEY environment variable.");
            std::process::exit(1);
        };
        Arc::new(HttpCdnProvider::new(config.sync.api_base.clone(), api_key))
    };

    let runner = SyncRunner::new(&config, provider);
    let summary = match runner.run().await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    println!("Local gallery sync complete.");
    println!("Uploaded: {}", summary.uploaded);
    println!("Reused existing CDN files: {}", summary.reused);
    println!("Manifest items touched: {}", summary.items_touched);
    println!("Manifest: {}", runner.manifest_path().display());
    println!("Cache: {}", runner.cache_path().display());

    if !summary.failures.is_empty() {
        eprintln!("Failed files:");
        for failure in &summary.failures {
            eprintln!("  {}: {}", failure.path, failure.message);
        }
        std::process::exit(1);
    }

    Ok(())
}

struct AddArgs {
    config_path: PathBuf,
    category: String,
    collection_id: String,
    source_url: String,
    category_label: Option<String>,
    collection_name: Option<String>,
    collection_description: String,
    title: Option<String>,
    caption: String,
    alt: Option<String>,
}

async fn run_add(args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config_path)?;

    let env_file = config.sync.base_dir.join(&config.sync.env_file);
    let Some(api_key) = resolve_api_key(&env_file).await else {
        eprintln!("Missing CDN_API_KEY environment variable.");
        std::process::exit(1);
    };
    let provider = HttpCdnProvider::new(config.sync.api_base.clone(), api_key);

    let category_label = args
        .category_label
        .unwrap_or_else(|| naming::title_from_slug(&args.category));
    let title = args.title.unwrap_or_else(|| "Untitled".to_string());
    let alt = args.alt.unwrap_or_else(|| title.clone());

    println!("Uploading to CDN API...");
    let upload = match provider.upload_from_url(&args.source_url).await {
        Ok(upload) => upload,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let manifest_path = config.sync.base_dir.join(&config.sync.manifest_path);
    let mut manifest = Manifest::load(&manifest_path).await;

    let category = manifest.ensure_category(&args.category, &category_label);
    let is_new_collection = category.collection_mut(&args.collection_id).is_none();
    let collection = category.ensure_collection(&args.collection_id);
    if is_new_collection {
        if let Some(name) = args.collection_name {
            collection.name = name;
        }
        collection.description = args.collection_description;
    }

    let item_id = upload
        .id
        .clone()
        .unwrap_or_else(|| format!("{}-{}", args.collection_id, naming::slugify(&title)));
    collection.items.push(MediaItem {
        id: item_id,
        title,
        caption: args.caption,
        url: upload.url.clone(),
        alt,
        media_type: MediaType::from_file_name(&args.source_url).unwrap_or(MediaType::Image),
        source: None,
    });

    manifest.save(&manifest_path).await?;

    println!("Done.");
    println!("CDN URL: {}", upload.url);
    println!("Updated manifest: {}", manifest_path.display());
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
