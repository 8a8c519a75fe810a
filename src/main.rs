//! Nelum gateway — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config
//!   4. Resolve effective log level (CLI `-v` flags > env > config)
//!   5. Init logger once (JSON events when telemetry is configured)
//!   6. Build the credential cell and service clients
//!   7. Build the approach registry
//!   8. Spawn Ctrl-C → shutdown signal watcher
//!   9. Serve HTTP until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use nelum::approaches::{
    ApproachHandler, ApproachKind, ApproachRegistry, ChatApproach, RetrieveThenReadApproach,
};
use nelum::auth::token::{CredentialClient, HttpCredentialClient, StaticCredential, TokenCell};
use nelum::bootstrap::logger;
use nelum::clients::blob::{BlobStore, HttpBlobStore, MemoryBlobStore};
use nelum::clients::completion::{CompletionClient, DummyCompletionClient, HttpCompletionClient};
use nelum::clients::docdb::{HttpUsageStore, MemoryUsageStore, UsageStore};
use nelum::clients::embedding::{DummyEmbeddingClient, EmbeddingClient, HttpEmbeddingClient};
use nelum::clients::search::{HttpSearchClient, NullSearchClient, SearchClient};
use nelum::config::{self, Config};
use nelum::error::GatewayError;
use nelum::http::{AppState, serve};
use nelum::usage::UsageLogger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), GatewayError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level, config.telemetry_enabled())?;

    info!(
        bind = %config.server.bind,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        telemetry = config.telemetry_enabled(),
        "config loaded"
    );

    // Credential provider + process-wide token cell. The cell starts
    // expired, so the first inbound request performs the initial fetch.
    let credential = if config.auth.token_url.is_empty() {
        warn!("no credential endpoint configured — using static dev token");
        CredentialClient::Static(StaticCredential::new("dev-token"))
    } else {
        CredentialClient::Http(HttpCredentialClient::new(
            config.auth.token_url.clone(),
            config.auth.token_scope.clone(),
        )?)
    };
    let token = Arc::new(TokenCell::new(credential));

    // Service clients. Each unconfigured service falls back to its offline
    // backend so the gateway still starts on a bare laptop.
    let completion = if config.completion.service.is_empty() {
        warn!("no completion service configured — using echo client");
        CompletionClient::Dummy(DummyCompletionClient::new())
    } else {
        CompletionClient::Http(HttpCompletionClient::new(
            &config.completion.service,
            &config.completion.chat_deployment,
            &config.completion.api_version,
            config.completion.temperature,
            config.completion.timeout_seconds,
            token.clone(),
        )?)
    };
    let completion = Arc::new(completion);

    let embedding = if config.completion.service.is_empty()
        || config.completion.embedding_deployment.is_empty()
    {
        EmbeddingClient::Dummy(DummyEmbeddingClient)
    } else {
        EmbeddingClient::Http(HttpEmbeddingClient::new(
            &config.completion.service,
            &config.completion.embedding_deployment,
            &config.completion.api_version,
            config.completion.timeout_seconds,
            token.clone(),
        )?)
    };
    let embedding = Arc::new(embedding);

    let search = if config.search.service.is_empty() {
        warn!("no search service configured — docsearch will retrieve nothing");
        SearchClient::Null(NullSearchClient)
    } else {
        SearchClient::Http(HttpSearchClient::new(
            &config.search.service,
            &config.search.index,
            &config.search.api_version,
            config.search.api_key.clone(),
            config.search.content_field.clone(),
            config.search.sourcepage_field.clone(),
        )?)
    };
    let search = Arc::new(search);

    let blob = if config.storage.account.is_empty() {
        warn!("no storage account configured — content proxy starts empty");
        BlobStore::Memory(MemoryBlobStore::new())
    } else {
        BlobStore::Http(HttpBlobStore::new(
            &config.storage.account,
            &config.storage.container,
            config.storage.api_key.clone(),
        )?)
    };
    let blob = Arc::new(blob);

    let usage_store = if config.usage.endpoint.is_empty() {
        warn!("no usage store configured — keeping usage records in memory");
        UsageStore::Memory(MemoryUsageStore::new())
    } else {
        UsageStore::Http(HttpUsageStore::new(
            &config.usage.endpoint,
            &config.usage.database,
            &config.usage.container,
            config.usage.api_key.clone(),
        )?)
    };
    let usage = Arc::new(UsageLogger::new(usage_store));

    // One approach per kind for now; the registry takes more without any
    // route changes.
    let mut registry = ApproachRegistry::new();
    registry.register(
        ApproachKind::Chat,
        "chat",
        ApproachHandler::Chat(ChatApproach::new(completion.clone(), usage.clone())),
    );
    registry.register(
        ApproachKind::DocSearch,
        "docsearch",
        ApproachHandler::Retrieve(RetrieveThenReadApproach::new(
            search,
            embedding,
            completion,
            usage,
        )),
    );

    // Shared shutdown token — Ctrl-C cancels it, the serve loop watches it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config);

    let state = AppState {
        registry: Arc::new(registry),
        token,
        blob,
        identity_header: Arc::from(config.auth.identity_header.as_str()),
        static_dir: Arc::new(config.server.static_dir.clone()),
    };

    serve(&config.server.bind, state, shutdown).await
}

fn print_startup_summary(config: &Config) {
    let live = |configured: bool| if configured { "live" } else { "offline" };

    let fit = |text: String| -> String {
        const WIDTH: usize = 56;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║ 🌸 Nelum Gateway                                           ║");
    println!("╟────────────────────────────────────────────────────────────╢");
    println!("║ 🌐 {}║", fit(format!("bind: {}", config.server.bind)));
    println!("║ 🧠 {}║", fit(format!(
        "completion: {} ({})",
        live(!config.completion.service.is_empty()),
        if config.completion.service.is_empty() { "echo" } else { config.completion.chat_deployment.as_str() }
    )));
    println!("║ 🔎 {}║", fit(format!(
        "search: {} (index: {})",
        live(!config.search.service.is_empty()),
        if config.search.index.is_empty() { "-" } else { config.search.index.as_str() }
    )));
    println!("║ 📦 {}║", fit(format!("storage: {}", live(!config.storage.account.is_empty()))));
    println!("║ 🧾 {}║", fit(format!("usage log: {}", live(!config.usage.endpoint.is_empty()))));
    println!("╟────────────────────────────────────────────────────────────╢");
    println!("║ 🤝 {}║", fit("approaches: chat, docsearch".to_string()));
    println!("╚════════════════════════════════════════════════════════════╝");
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: nelum [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn   (suppress info noise, show warnings+errors only)
    //   -vv     → info   (normal operational output — the typical default)
    //   -vvv    → debug  (flow-level diagnostics: dispatch, client calls)
    //   -vvvv+  → trace  (full payload dumps, very verbose)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
