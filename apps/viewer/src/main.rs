use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_client_settings, CollectionLoader, Discipline, GalleryEvent, GallerySession,
    GallerySnapshot, HttpCollectionBackend, KeyboardHub, MemorySessionStore, ViewSnapshot,
};
use shared::domain::{Category, MediaItem, MediaKey};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Browse wedding gallery collections from a terminal")]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = "gallery")]
    category: String,
    #[arg(long, default_value = "viewer.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Auto-advancing single image view.
    Slideshow {
        #[arg(long, default_value_t = 5)]
        ticks: usize,
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Fixed-size pages, optionally opening one item enlarged.
    Pages {
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        open: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_client_settings(&args.config);
    if let Some(server_url) = args.server_url {
        settings.backend_url = server_url;
    }

    let backend = HttpCollectionBackend::new(&settings.backend_url)?;
    let loader = Arc::new(CollectionLoader::new_with_clock(
        Arc::new(backend),
        Arc::new(MemorySessionStore::new()),
        Arc::new(client_core::SystemClock),
        settings.cache_ttl,
    ));
    let hub = KeyboardHub::new();
    let category = Category::new(args.category);

    match args.command {
        Command::Slideshow { ticks, interval_ms } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or(settings.rotation_interval);
            slideshow(loader, category, interval, ticks, &hub).await
        }
        Command::Pages {
            page_size,
            page,
            open,
            json,
        } => {
            let page_size = page_size.unwrap_or(settings.page_size);
            pages(loader, category, page_size, page, open, json, &hub).await
        }
    }
}

async fn slideshow(
    loader: Arc<CollectionLoader>,
    category: Category,
    interval: Duration,
    ticks: usize,
    hub: &KeyboardHub,
) -> Result<()> {
    let session = GallerySession::mount(loader, category, Discipline::Rotation { interval }, hub)?;
    let mut events = BroadcastStream::new(session.subscribe_events());
    session.settled().await;

    let snapshot = session.snapshot().await;
    if let Some(line) = empty_state(&snapshot) {
        println!("{line}");
        session.unmount().await;
        return Ok(());
    }
    print_slide(&snapshot.items, 0);

    let mut shown = 0;
    while shown < ticks {
        match events.next().await {
            Some(Ok(GalleryEvent::ActiveIndexChanged(index))) => {
                print_slide(&snapshot.items, index);
                shown += 1;
            }
            Some(Ok(GalleryEvent::Loaded { count, source, .. })) => {
                println!("loaded {count} images from {source}");
            }
            Some(Ok(_)) => {}
            Some(Err(error)) => warn!(%error, "slideshow fell behind"),
            None => break,
        }
    }
    session.unmount().await;
    Ok(())
}

fn print_slide(items: &[MediaItem], index: usize) {
    if let Some(item) = items.get(index) {
        println!("[{}/{}] {} {}", index + 1, items.len(), item.key, item.display_url);
    }
}

async fn pages(
    loader: Arc<CollectionLoader>,
    category: Category,
    page_size: usize,
    page: usize,
    open: Option<String>,
    json: bool,
    hub: &KeyboardHub,
) -> Result<()> {
    let session =
        GallerySession::mount(loader, category, Discipline::Pagination { page_size }, hub)?;
    session.settled().await;

    if let Some(line) = empty_state(&session.snapshot().await) {
        println!("{line}");
        session.unmount().await;
        return Ok(());
    }
    if page > 1 {
        session.go_to_page(page - 1).await?;
    }

    let snapshot = session.snapshot().await;
    let ViewSnapshot::Pagination { visible, .. } = &snapshot.view else {
        bail!("pagination view expected");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(visible)?);
    } else {
        let info = session.page_info().await?;
        println!(
            "page {} of {} ({} items)",
            info.page, info.total_pages, info.item_count
        );
        for item in visible {
            println!("  {}", card_line(item));
        }
    }

    if let Some(key) = open {
        session.open(&MediaKey::new(key)).await?;
        if let Some(item) = session.snapshot().await.selected {
            println!("\n{}", card_line(&item));
            if let Some(label) = &item.label {
                println!("  {label}");
            }
            println!("  {}", item.display_url);
        }
        session.close().await;
    }

    session.unmount().await;
    Ok(())
}

/// A failed load renders like an empty collection; the reason only goes to
/// the log.
fn empty_state(snapshot: &GallerySnapshot) -> Option<String> {
    if let Some(reason) = &snapshot.failure {
        warn!(category = %snapshot.category, %reason, "showing empty gallery after failed load");
    }
    snapshot
        .items
        .is_empty()
        .then(|| format!("'{}' has no images yet.", snapshot.category))
}

fn card_line(item: &MediaItem) -> String {
    match (&item.title, &item.accent) {
        (Some(title), Some(accent)) => format!("{} \"{title}\" [{accent}]", item.key),
        (Some(title), None) => format!("{} \"{title}\"", item.key),
        _ => item.key.to_string(),
    }
}
