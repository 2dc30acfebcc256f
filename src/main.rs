//! Drive daemon - file-entry API server and listing client
//!
//! Serves the drive API over HTTP and provides client commands that list
//! entries through the same paginated cache the UI layer uses.

mod cache;
mod config;
mod drive;
mod listing;
mod server;
mod state;

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cache::EntryCache;
use config::Config;
use drive::DriveClient;
use listing::{EntryModels, Listing, ListingContext, NextPage, PaginatedEntries};
use server::{DriveServer, MemoryStore};
use state::{DrivePage, DriveState, SortColumn, SortDescriptor, SortDirection};

/// CLI command
#[derive(Debug)]
enum Command {
    /// Run the API server (default)
    Serve,
    /// Write the demo drive to a snapshot file
    Seed { path: Option<PathBuf> },
    /// List a section or folder through the paginated cache
    Entries {
        page: String,
        query: Option<String>,
        sort: Option<SortDescriptor>,
    },
    /// Print the path of a folder
    Path { hash: String, link: Option<String> },
    /// Print the full record of an entry, refreshing the listing it is in
    Entry { id: u64, page: String },
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"Drive daemon - file-entry API server and listing client

USAGE:
    drive-daemon [serve]                     # Run the API server (default)
    drive-daemon seed [path]
    drive-daemon entries [section|folder-hash] [query] [--sort column[:asc|desc]]
    drive-daemon path <folder-hash> [shareable-link]
    drive-daemon entry <id> [section|folder-hash]
    drive-daemon help

COMMANDS:
    serve    Serve the drive API from the snapshot in DRIVE_DATA
    seed     Write the demo drive to a snapshot (default: DRIVE_DATA)
    entries  List root, recent, shared, starred, trash, search or a folder
             Columns: updated_at, name, file_size, type, created_at
    path     Print the folder path, optionally as seen through a link
    entry    Print the full record of one entry as found in a listing
             (default: root), reloading the listing if it was stale

ENVIRONMENT:
    DRIVE_API_URL          API root for client commands (default http://127.0.0.1:8080)
    DRIVE_BIND             Server listen address (default 127.0.0.1:8080)
    DRIVE_DATA             Snapshot file (default <data dir>/drive/snapshot.json)
    DRIVE_PER_PAGE         Page size for client commands (default 50)
    DRIVE_CACHE_IDLE_SECS  Listing cache idle retention (default 300)
    DRIVE_USER             Viewer id sent by client commands
    RUST_LOG               Log level (trace, debug, info, warn, error)
"#
    );
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Serve);
    }

    match args[1].as_str() {
        "serve" => Ok(Command::Serve),
        "seed" => Ok(Command::Seed {
            path: args.get(2).map(PathBuf::from),
        }),
        "entries" => {
            let mut positional = Vec::new();
            let mut sort = None;
            let mut rest = args[2..].iter();
            while let Some(arg) = rest.next() {
                if arg == "--sort" {
                    let value = rest
                        .next()
                        .ok_or_else(|| anyhow!("--sort needs a column, e.g. name:asc"))?;
                    sort = Some(parse_sort(value)?);
                } else {
                    positional.push(arg.clone());
                }
            }
            let mut positional = positional.into_iter();
            Ok(Command::Entries {
                page: positional.next().unwrap_or_default(),
                query: positional.next(),
                sort,
            })
        }
        "path" => {
            let hash = args
                .get(2)
                .cloned()
                .ok_or_else(|| anyhow!("Usage: drive-daemon path <folder-hash> [shareable-link]"))?;
            Ok(Command::Path {
                hash,
                link: args.get(3).cloned(),
            })
        }
        "entry" => {
            let id = args
                .get(2)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| anyhow!("Usage: drive-daemon entry <id>"))?;
            Ok(Command::Entry {
                id,
                page: args.get(3).cloned().unwrap_or_default(),
            })
        }
        "help" | "--help" | "-h" => Ok(Command::Help),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            Ok(Command::Help)
        }
    }
}

/// Parse `column[:direction]`, direction defaulting to desc
fn parse_sort(value: &str) -> Result<SortDescriptor> {
    let (column, direction) = match value.split_once(':') {
        Some((column, direction)) => (column, Some(direction)),
        None => (value, None),
    };
    let order_by = SortColumn::parse(column).ok_or_else(|| anyhow!("Cannot sort by {}", column))?;
    let order_dir = match direction {
        Some(d) => SortDirection::parse(d).ok_or_else(|| anyhow!("Invalid sort direction {}", d))?,
        None => SortDirection::default(),
    };
    Ok(SortDescriptor { order_by, order_dir })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let command = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    let config = Config::from_env();

    match command {
        Command::Serve => serve(&config).await,
        Command::Seed { path } => {
            let path = path.unwrap_or_else(|| config.data_file.clone());
            MemoryStore::demo().persist(&path)?;
            println!("Wrote demo drive to {}", path.display());
            Ok(())
        }
        Command::Help => {
            print_help();
            Ok(())
        }
        command => {
            let client = client(&config)?;
            let result = run_client(&client, &config, command).await;
            if result.is_err() {
                report_client_failure(&client);
            }
            result
        }
    }
}

async fn run_client(client: &DriveClient, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Entries { page, query, sort } => {
            list_entries(client, config, &page, query, sort).await
        }
        Command::Path { hash, link } => {
            let path = client.fetch_folder_path(&hash, link.as_deref()).await?;
            let names: Vec<&str> = path.iter().map(|f| f.name.as_str()).collect();
            println!("/{}", names.join("/"));
            Ok(())
        }
        Command::Entry { id, page } => show_entry(client, config, id, &page).await,
        other => Err(anyhow!("{:?} does not talk to the drive API", other)),
    }
}

/// Log the client's health and its recent request errors
fn report_client_failure(client: &DriveClient) {
    error!(
        api = %client.base_url(),
        health = client.health_status(),
        "Drive API request failed"
    );
    for e in client.recent_errors() {
        warn!(
            timestamp = e.timestamp,
            operation = %e.operation,
            path = %e.path,
            error = %e.error,
            "Recent API error"
        );
    }
}

fn client(config: &Config) -> Result<DriveClient> {
    Ok(DriveClient::new(&config.api_url)?.with_viewer(config.viewer))
}

async fn serve(config: &Config) -> Result<()> {
    let store = if config.data_file.exists() {
        MemoryStore::load(&config.data_file)?
    } else {
        warn!(
            path = %config.data_file.display(),
            "Snapshot not found, serving the demo drive"
        );
        MemoryStore::demo()
    };

    let mut server = DriveServer::new(Arc::new(store));
    if let Err(e) = server.start(config.bind_addr).await {
        error!(error = %e, "Failed to start drive server");
        return Err(e);
    }

    info!("Drive server ready. Press Ctrl+C to stop.");

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal, stopping...");
        })
        .await?;

    info!("Shutdown complete.");
    Ok(())
}

/// One listing walk: view state, cache and the paginated listing over them
struct ListingSession {
    state: Arc<DriveState>,
    cache: Arc<EntryCache>,
    listing: PaginatedEntries<DriveClient>,
    ctx: ListingContext,
}

impl ListingSession {
    fn open(
        client: &DriveClient,
        config: &Config,
        page: &str,
        query: Option<String>,
        sort: Option<SortDescriptor>,
    ) -> Self {
        let state = Arc::new(DriveState::new());
        state.set_active_page(DrivePage::from_name(page));
        if let Some(sort) = sort {
            state.set_sort_descriptor(sort);
        }

        let cache = Arc::new(EntryCache::with_idle(config.cache_idle));
        let listing = PaginatedEntries::new(client.clone(), Arc::clone(&cache), Arc::clone(&state));

        let mut search_params = BTreeMap::from([("perPage".to_string(), config.per_page.to_string())]);
        if let Some(query) = query {
            search_params.insert("query".to_string(), query);
        }
        let ctx = ListingContext {
            search_params,
            workspace_id: None,
        };

        Self {
            state,
            cache,
            listing,
            ctx,
        }
    }

    /// Fetch every page. False when the listing is disabled.
    async fn load_all(&self) -> Result<bool> {
        if let Listing::Disabled = self.listing.fetch(&self.ctx).await? {
            return Ok(false);
        }
        while let NextPage::Fetched(_) = self.listing.fetch_next_page(&self.ctx).await? {}
        Ok(true)
    }
}

async fn list_entries(
    client: &DriveClient,
    config: &Config,
    page: &str,
    query: Option<String>,
    sort: Option<SortDescriptor>,
) -> Result<()> {
    let session = ListingSession::open(client, config, page, query, sort);
    if !session.load_all().await? {
        println!("Nothing to search for.");
        return Ok(());
    }

    if let Some(folder) = session.state.active_page().and_then(|p| p.folder.clone()) {
        println!("{} ({})", folder.name, folder.hash);
    }
    for entry in session.listing.get_all_entries() {
        let marker = if entry.is_folder() { "/" } else { "" };
        println!("  {}{}  {}", entry.name, marker, entry.hash);
    }

    session.cache.log_metrics();
    Ok(())
}

async fn show_entry(client: &DriveClient, config: &Config, id: u64, page: &str) -> Result<()> {
    let session = ListingSession::open(client, config, page, None, None);
    session.load_all().await?;

    let models = EntryModels::with_idle(client.clone(), config.cache_idle);
    let listed = session.listing.get_all_entries().into_iter().find(|e| e.id == id);
    let entry = match listed {
        Some(listed) => {
            let fresh = models.load(&listed).await?;
            if fresh != listed {
                info!(entry = id, "Listed entry is out of date, reloading the listing");
                session.listing.refetch(&session.ctx).await?;
            }
            fresh
        }
        None => {
            debug!(entry = id, "Entry is not in the listing, fetching it directly");
            models.get_or_fetch(id).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}
