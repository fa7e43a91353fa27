//!
//! src/main.rs  Andrew Belles  Sept 15, 2025
//!
//! Command line front end. Connects to the catalog, previews a venue
//! lineup, and writes the preview into a playlist
//!
//!

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};

use lineup_sync::config::{self, AppConfig};
use lineup_sync::{
    CatalogClient, FileTokenStore, LineupSync, Resolution, Selection, SyncError,
    SyncOptions, TokenGuard, auth, logging, snapshot, source
};

#[derive(Parser)]
#[command(name = "rs-lineup-sync", version, about = "Turn a venue lineup into a playlist")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the authorization url to open in a browser
    Connect,
    /// Store the token from the redirect the browser landed on
    Callback {
        /// Full redirect url or just its fragment
        redirect: String,
        /// State printed by `connect`, checked when given
        #[arg(long)]
        state: Option<String>,
    },
    /// Forget the stored token
    Disconnect,
    /// List playlists you can write to
    Playlists,
    /// Scrape a lineup page and show what would be added
    Preview {
        #[arg(long)]
        url: String,
        /// CSS selector for performer names
        #[arg(long)]
        selector: Option<String>,
        /// Keep the preview for a later `sync --from`
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Resolve a lineup (or load a saved preview) and write it to a playlist
    Sync {
        #[arg(long, required_unless_present = "from", conflicts_with = "from")]
        url: Option<String>,
        #[arg(long)]
        selector: Option<String>,
        /// Saved preview to write instead of scraping again
        #[arg(long)]
        from: Option<PathBuf>,
        /// Playlist id, or `new` to create one
        #[arg(long, default_value = "new")]
        playlist: Selection,
        /// Name for a new playlist
        #[arg(long)]
        name: Option<String>,
        /// Empty an existing playlist first
        #[arg(long)]
        clear_first: bool,
        /// Show the preview and stop
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    let cli    = Cli::parse();
    let cfgs   = config::load_config()?;
    let _guard = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service="rs-lineup-sync",
        version=%env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let guard = Arc::new(TokenGuard::with_store(FileTokenStore::new(&cfgs.token_store.path)));

    match run(cli.command, &cfgs, guard).await {
        Ok(()) => Ok(()),
        Err(e) => {
            report(&e);
            Err(e)
        }
    }
}

async fn run(command: Command, cfgs: &AppConfig, guard: Arc<TokenGuard>) -> Result<(), SyncError> {
    match command {
        Command::Connect => {
            let state = auth::new_state();
            let url = auth::authorize_url(&cfgs.catalog, &state)?;
            println!("Open this url and authorize access:\n{url}\n");
            println!("Then run: rs-lineup-sync callback '<redirect url>' --state {state}");
        }
        Command::Callback { redirect, state } => {
            let token = auth::parse_redirect(&redirect, state.as_deref(), Utc::now())?;
            let expires_at = token.expires_at;
            guard.authorize(token)?;
            println!("Connected, token valid until {expires_at}");
        }
        Command::Disconnect => {
            guard.disconnect();
            println!("Disconnected");
        }
        Command::Playlists => {
            let service = service(cfgs, guard)?;
            for c in service.writable_destinations().await? {
                let shared = if c.collaborative { " (collaborative)" } else { "" };
                println!("{}\t{}\t{} tracks{shared}", c.id, c.name, c.tracks_total);
            }
        }
        Command::Preview { url, selector, save } => {
            let service = service(cfgs, guard)?;
            let resolution = resolve_page(&service, cfgs, &url, selector.as_deref()).await?;
            print_preview(&resolution);
            if let Some(path) = save {
                snapshot::save(&path, &resolution)?;
                println!("\nPreview saved to {}", path.display());
            }
        }
        Command::Sync { url, selector, from, playlist, name, clear_first, dry_run } => {
            let service = service(cfgs, guard)?;
            let resolution = match (from, url) {
                (Some(path), _) => snapshot::load(&path)?,
                (None, Some(url)) => resolve_page(&service, cfgs, &url, selector.as_deref()).await?,
                (None, None) => return Err(SyncError::Config("either --url or --from is required".into()))
            };
            print_preview(&resolution);
            if dry_run {
                return Ok(());
            }

            let selection = match (playlist, name) {
                (Selection::CreateNew { .. }, Some(name)) => Selection::CreateNew { name },
                (selection, _) => selection
            };
            let result = service.sync_to_destination(
                &selection,
                &resolution.entries,
                SyncOptions { clear_first }
            ).await?;

            if result.cleared > 0 {
                println!("\nRemoved {} existing tracks", result.cleared);
            }
            let verb = if result.created { "new playlist" } else { "playlist" };
            println!("\nAdded {} tracks to {verb} {}", result.appended, result.destination_id);
        }
    }
    Ok(())
}

fn service(cfgs: &AppConfig, guard: Arc<TokenGuard>) -> Result<LineupSync<CatalogClient>, SyncError> {
    let catalog = Arc::new(CatalogClient::new(&cfgs.http, &cfgs.catalog, guard)?);
    Ok(LineupSync::new(catalog, &cfgs.pipeline, &cfgs.sync))
}

async fn resolve_page(
    service: &LineupSync<CatalogClient>,
    cfgs: &AppConfig,
    url: &str,
    selector: Option<&str>
) -> Result<Resolution, SyncError> {
    let client = lineup_sync::fetch::page_client(&cfgs.http, &cfgs.source.user_agent)?;
    let html = source::fetch_page(&client, &cfgs.source, url).await?;
    let names = source::extract_names(&html, selector.unwrap_or(&cfgs.source.selector))?;
    if names.is_empty() {
        return Err(SyncError::Source(format!("no performer names found on {url}")));
    }
    println!("Found {} performers, resolving...\n", names.len());
    let resolution = service.resolve_candidates(&names).await?;
    if resolution.needs_reconnect() {
        print_preview(&resolution);
        return Err(SyncError::AuthExpired);
    }
    Ok(resolution)
}

fn print_preview(resolution: &Resolution) {
    for entry in &resolution.entries {
        println!("{}", entry.name);
        for track in &entry.tracks {
            println!("  - {}", track.display_title);
        }
    }
    if !resolution.skipped.is_empty() {
        println!("\nSkipped:");
        for s in &resolution.skipped {
            println!("  {} ({})", s.name, s.reason);
        }
    }
    println!(
        "\n{} artists, {} tracks",
        resolution.entries.len(),
        resolution.track_count()
    );
}

fn report(e: &SyncError) {
    for line in failure_notes(e) {
        eprintln!("{line}");
    }
}

fn failure_notes(e: &SyncError) -> Vec<String> {
    let mut notes = Vec::new();
    if e.is_auth_expired() {
        notes.push("Catalog authorization expired. Run `rs-lineup-sync connect` to reconnect.".to_string());
    }
    match e {
        SyncError::WriteFailed { written, .. } => notes.push(format!(
            "Write stopped partway: {written} tracks were already added and remain in the playlist."
        )),
        SyncError::ClearFailed { removed, .. } => notes.push(format!(
            "Clearing stopped partway: {removed} tracks were removed, nothing was added."
        )),
        SyncError::NoTracksToWrite => notes.push("Nothing to add, the preview has no tracks.".to_string()),
        _ => {}
    }
    notes
}
