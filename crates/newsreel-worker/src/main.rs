//! Reel production worker binary.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsreel_media::{check_ffmpeg, Compositor, FfmpegRunner};
use newsreel_models::BackgroundAsset;
use newsreel_storage::S3Client;
use newsreel_worker::{
    ArticleFilters, LlmClient, MemoryRepository, NewsClient, ReelPipeline, Repository,
    TranscribeClient, TtsClient, WorkerConfig,
};

const POLL_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("newsreel=info".parse().unwrap())
        .add_directive("aws_config=warn".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting newsreel-worker");

    if let Err(e) = check_ffmpeg() {
        error!("FFmpeg check failed: {}", e);
        std::process::exit(1);
    }

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let store = match S3Client::from_env().await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create object store client: {}", e);
            std::process::exit(1);
        }
    };

    let (news, llm, tts, transcriber) = match build_clients() {
        Ok(clients) => clients,
        Err(e) => {
            error!("Failed to create service clients: {}", e);
            std::process::exit(1);
        }
    };

    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
    if let Err(e) = seed_backgrounds(repo.as_ref()).await {
        error!("Failed to seed background pool: {}", e);
        std::process::exit(1);
    }

    let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout.as_secs());
    let compositor = Compositor::new(Arc::new(runner));

    let pipeline = ReelPipeline::new(
        repo,
        store,
        Arc::new(llm),
        Arc::new(tts),
        Arc::new(transcriber),
        compositor,
        config,
    );

    let filters = headline_filters();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = run_cycle(&pipeline, &news, &filters) => {}
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }

    info!("Worker shutdown complete");
}

type Clients = (NewsClient, LlmClient, TtsClient, TranscribeClient);

fn build_clients() -> newsreel_worker::PipelineResult<Clients> {
    Ok((
        NewsClient::from_env()?,
        LlmClient::from_env()?,
        TtsClient::from_env()?,
        TranscribeClient::from_env()?,
    ))
}

fn headline_filters() -> ArticleFilters {
    let mut filters = ArticleFilters::new(
        std::env::var("NEWS_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10),
    );
    filters.country = std::env::var("NEWS_COUNTRY").ok();
    filters.category = std::env::var("NEWS_CATEGORY").ok();
    filters
}

/// Register the background video pool from `BACKGROUND_KEYS`, a
/// comma-separated list of object storage keys.
async fn seed_backgrounds(repo: &dyn Repository) -> newsreel_worker::PipelineResult<()> {
    let keys = std::env::var("BACKGROUND_KEYS").unwrap_or_default();
    let mut count = 0usize;
    for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        let name = key.rsplit('/').next().unwrap_or(key);
        repo.insert_background(BackgroundAsset::new(name, key, None))
            .await?;
        count += 1;
    }
    if count == 0 {
        warn!("BACKGROUND_KEYS is empty; composition will fail until backgrounds exist");
    } else {
        info!("Seeded {} background assets", count);
    }
    Ok(())
}

/// One fetch-and-produce cycle: pull headlines, enqueue reels for new
/// articles, and drive each reel to a terminal state.
async fn run_cycle(pipeline: &ReelPipeline, news: &NewsClient, filters: &ArticleFilters) {
    let articles = match news.fetch(filters).await {
        Ok(articles) => articles,
        Err(e) => {
            error!("Headline fetch failed: {}", e);
            return;
        }
    };

    let reel_ids = match pipeline.ingest_articles(articles).await {
        Ok(ids) => ids,
        Err(e) => {
            error!("Article ingestion failed: {}", e);
            return;
        }
    };

    info!("Enqueued {} reels this cycle", reel_ids.len());

    for reel_id in reel_ids {
        // Failures are recorded on the reel; the cycle continues.
        if let Err(e) = pipeline.process_reel(reel_id).await {
            error!(reel_id = %reel_id, "Reel production failed: {}", e);
        }
    }
}
