use std::time::Duration;

use anyhow::{bail, Context};
use ca_core::SourceName;
use ca_scrapers::runner::{RunLimits, RunnerConfig};
use ca_scrapers::sources::{all_sources, spec_for, SourceSpec, TraversalKind};
use ca_service::{ServiceConfig, SyncService, SyncStatus};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Incremental current-affairs article sync", long_about = None)]
struct Cli {
    /// Storage backend: memory or postgres.
    #[arg(long, default_value = "memory", env = "STORAGE_BACKEND")]
    storage: String,
    /// Connection string for the postgres backend.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Seconds to pause between article fetches.
    #[arg(long, default_value_t = 2, env = "SCRAPER_RATE_LIMIT")]
    rate_limit: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run one sync across the configured sources and print a summary.
    Sync {
        /// Sources to sync (gktoday, drishti); all when omitted.
        #[arg(long, value_delimiter = ',')]
        sources: Vec<String>,
        #[arg(long, default_value_t = 5)]
        max_pages: usize,
        #[arg(long, default_value_t = 3)]
        max_days: usize,
        #[arg(long, default_value_t = 50)]
        max_articles: usize,
        /// Consecutive already-stored articles before a source stops.
        #[arg(long, default_value_t = 5)]
        threshold: usize,
        /// Run sources one after another instead of in parallel.
        #[arg(long)]
        sequential: bool,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Print the most recently published stored articles.
    Latest {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List the configured sources.
    List,
}

fn resolve_sources(names: &[String]) -> anyhow::Result<Vec<SourceSpec>> {
    if names.is_empty() {
        return Ok(all_sources());
    }
    let mut specs = Vec::with_capacity(names.len());
    for name in names {
        let Some(source) = SourceName::parse_cli_name(name) else {
            bail!(
                "Unknown source '{}'. Available: {}",
                name,
                all_sources()
                    .iter()
                    .map(|s| s.name.cli_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        };
        specs.push(spec_for(source));
    }
    Ok(specs)
}

fn service_config(cli: &Cli, limits: RunLimits, threshold: usize, sequential: bool) -> ServiceConfig {
    ServiceConfig {
        runner: RunnerConfig {
            limits,
            politeness_delay: Duration::from_secs(cli.rate_limit),
            stop_threshold: threshold,
            ..RunnerConfig::default()
        },
        sequential,
        ..ServiceConfig::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let store = ca_storage::create_store(&cli.storage, cli.database_url.as_deref())
        .await
        .context("failed to initialize storage")?;
    store.ping().await.context("storage is unreachable")?;
    info!("💾 Storage initialized (using {})", cli.storage);

    match &cli.command {
        Commands::List => {
            for spec in all_sources() {
                let traversal = match spec.traversal {
                    TraversalKind::Paginated => "paginated",
                    TraversalKind::Calendar { .. } => "calendar",
                };
                println!("{:<10} {:<10} {}", spec.name.cli_name(), traversal, spec.base_url);
            }
        }
        Commands::Latest { limit } => {
            let articles = store.latest(*limit).await?;
            if articles.is_empty() {
                println!("No articles stored yet.");
            }
            for article in articles {
                println!(
                    "{:<14} {:<12} {}",
                    article.published_date_raw, article.source, article.title
                );
                println!("               {}", article.url);
            }
        }
        Commands::Sync {
            sources,
            max_pages,
            max_days,
            max_articles,
            threshold,
            sequential,
        } => {
            let specs = resolve_sources(sources)?;
            let limits = RunLimits {
                max_pages: *max_pages,
                max_days: *max_days,
                max_articles: *max_articles,
            };
            let config = service_config(&cli, limits, *threshold, *sequential);
            let service = SyncService::with_sources(store, config, specs);

            info!("🔄 Starting sync");
            service.start().await?;
            let combined = loop {
                tokio::time::sleep(Duration::from_millis(500)).await;
                let progress = service.progress().await;
                if progress.status.is_terminal() {
                    if let Some(result) = service.result().await {
                        break result;
                    }
                }
            };

            for entry in &combined.reports {
                info!(
                    "📄 {}: {} new, {} skipped, {} error(s)",
                    entry.source,
                    entry.report.articles_scraped,
                    entry.report.articles_skipped,
                    entry.report.errors.len()
                );
            }
            println!("Sync finished: {}", combined.summary());
            if !combined.success {
                for error in &combined.errors {
                    eprintln!("  {error}");
                }
                bail!("sync finished with errors");
            }
        }
        Commands::Serve { port } => {
            let config = service_config(&cli, RunLimits::default(), 5, false);
            let service = SyncService::new(store, config);
            let app = ca_web::create_app(ca_web::AppState { service }).await;

            let addr = format!("0.0.0.0:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!("🌐 Listening on http://{addr}");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
