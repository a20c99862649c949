// # autoshare
//
// Thin integration layer: parses the command line, loads credentials from the
// environment, wires the concrete implementations into `autoshare-core` and
// maps the outcome onto an exit code. Provisioning logic lives in the core.
//
// ## Configuration
//
// DNS commands and `serve` (unless `--no-dns`) read:
// - `CLOUDFLARE_EMAIL`: Account email
// - `CLOUDFLARE_API_KEY`: Global API key
// - `CLOUDFLARE_ZONE_ID`: Zone to create records in
// - `BASE_DOMAIN`: Domain the random subdomains go under
//
// `AUTOSHARE_LOG_LEVEL` (or `--log-level`) sets the log level.
//
// A `.env` file in the working directory (or any parent) is loaded first.
// Variables already set in the environment take precedence over it.
//
// ## Example
//
// ```bash
// export CLOUDFLARE_EMAIL=ops@example.com
// export CLOUDFLARE_API_KEY=your_key
// export CLOUDFLARE_ZONE_ID=your_zone_id
// export BASE_DOMAIN=example.com
//
// autoshare serve ./public -p 8080
// ```

mod cli;

use anyhow::{Context, Result};
use autoshare_core::config::{AUTO_RECORD_COMMENT, ProviderCredentials, ServerConfig};
use autoshare_core::record::{DnsRecordConfig, RecordSettings};
use autoshare_core::traits::{DnsProvider, RecordFilter};
use autoshare_core::{
    AddressResolver, Orchestrator, OrchestratorEvent, ProvisionOptions, ShutdownTrigger,
    shutdown, subdomain,
};
use autoshare_ip_http::default_public_sources;
use autoshare_ip_local::LocalIpSource;
use autoshare_provider_cloudflare::CloudflareProvider;
use autoshare_server::FileServer;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::cli::{AddressArgs, Cli, Command, CreateArgs, DeleteArgs, DnsCommand, ListArgs, ServeArgs};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Prefix of the comment on records this tool creates
const AUTO_COMMENT_PREFIX: &str = "Auto-generated subdomain";

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or validation error, before any resource is acquired
/// - 2: Runtime error (server failed to start, DNS command failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration or validation error
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<AppExitCode> for ExitCode {
    fn from(code: AppExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl AppExitCode {
    /// Validation failures are configuration errors; everything else happened at runtime
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<autoshare_core::Error>() {
            Some(e) if e.is_validation() => Self::ConfigError,
            _ => Self::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    // Before parsing, so `.env` can also carry AUTOSHARE_LOG_LEVEL
    let env_file = match load_dotenv(dotenvy::dotenv()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return AppExitCode::ConfigError.into();
        }
    };

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let _ = e.print();
            return if e.use_stderr() {
                AppExitCode::ConfigError.into()
            } else {
                AppExitCode::CleanShutdown.into()
            };
        }
    };

    // Initialize tracing
    let log_level = match parse_log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return AppExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AppExitCode::ConfigError.into();
    }

    if let Some(path) = env_file {
        debug!(path = %path.display(), "Loaded environment file");
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AppExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let outcome = match cli.command {
            Command::Dns { command } => run_dns(command).await,
            Command::Serve(args) => run_serve(args).await,
        };

        match outcome {
            Ok(()) => AppExitCode::CleanShutdown,
            Err(e) => {
                error!("{}", render_error(&e));
                AppExitCode::for_error(&e)
            }
        }
    });

    result.into()
}

/// Treat a missing `.env` as empty; anything else wrong with it is a config error
fn load_dotenv(loaded: dotenvy::Result<PathBuf>) -> autoshare_core::Result<Option<PathBuf>> {
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(autoshare_core::Error::validation(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Map a log level name onto a tracing level
fn parse_log_level(name: &str) -> Result<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            name
        ),
    }
}

/// Error text including any structured provider entries
fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<autoshare_core::Error>() {
        Some(e) => e.details(),
        None => format!("{:#}", err),
    }
}

/// Address resolver with the standard public chain and the local fallback
fn default_resolver() -> Result<AddressResolver> {
    Ok(AddressResolver::new(
        default_public_sources()?,
        Box::new(LocalIpSource::new()),
    ))
}

fn cloudflare_from_env() -> Result<(ProviderCredentials, CloudflareProvider)> {
    let credentials = ProviderCredentials::from_env()?;
    let provider = CloudflareProvider::new(&credentials)?;
    Ok((credentials, provider))
}

async fn run_dns(command: DnsCommand) -> Result<()> {
    let (credentials, provider) = cloudflare_from_env()?;

    match command {
        DnsCommand::Create(args) => dns_create(&credentials, &provider, args).await,
        DnsCommand::List(args) => dns_list(&provider, args).await,
        DnsCommand::Delete(args) => dns_delete(&provider, args).await,
    }
}

async fn resolve_address(address: &AddressArgs) -> Result<std::net::IpAddr> {
    match address.ip {
        Some(ip) => Ok(ip),
        None => Ok(default_resolver()?.resolve(!address.local_ip).await),
    }
}

async fn dns_create(
    credentials: &ProviderCredentials,
    provider: &CloudflareProvider,
    args: CreateArgs,
) -> Result<()> {
    let label = match args.subdomain {
        Some(sub) => sub,
        None => subdomain::generate(args.length)?,
    };

    // Validate locally before spending time on address lookups
    let name = credentials.fqdn(&label);
    DnsRecordConfig::builder(&name, "0.0.0.0").ttl(args.ttl).build()?;

    let ip = resolve_address(&args.address).await?;
    info!(%ip, "Using IP address");

    let record = DnsRecordConfig::builder(name, ip.to_string())
        .proxied(!args.no_proxied)
        .ttl(args.ttl)
        .comment(AUTO_RECORD_COMMENT)
        .settings(RecordSettings::default())
        .build()?;

    let created = provider.create_record(&record).await?;
    println!(
        "Created DNS record {} -> {} (id: {})",
        created.name, created.content, created.id
    );
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

/// Whether a raw record carries the comment this tool writes
fn is_auto_generated(record: &serde_json::Value) -> bool {
    record
        .get("comment")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|comment| comment.starts_with(AUTO_COMMENT_PREFIX))
}

async fn dns_list(provider: &CloudflareProvider, args: ListArgs) -> Result<()> {
    let mut filter = RecordFilter::new();
    if let Some(name) = args.name {
        filter.insert("name".to_string(), name);
    }

    let records: Vec<serde_json::Value> = provider
        .list_records(&filter)
        .await?
        .into_iter()
        .filter(|record| args.all || is_auto_generated(record))
        .collect();

    if records.is_empty() {
        println!("No DNS records found");
        return Ok(());
    }

    for record in &records {
        let field = |key: &str| {
            record
                .get(key)
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .unwrap_or_default()
        };
        println!(
            "{}\t{}\t{}\t{}\tproxied={}",
            field("id"),
            field("type"),
            field("name"),
            field("content"),
            field("proxied")
        );
    }
    Ok(())
}

async fn dns_delete(provider: &CloudflareProvider, args: DeleteArgs) -> Result<()> {
    let deleted = provider.delete_record(&args.record_id).await?;
    println!("Deleted DNS record {}", deleted.id);
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    // Everything that can be checked is checked before anything is acquired
    let server_config = ServerConfig::new(
        &args.directory,
        args.host.clone(),
        args.port,
        !args.no_directory_listing,
    )?;

    let options = ProvisionOptions {
        ip: args.address.ip,
        prefer_public_ip: !args.address.local_ip,
        subdomain: args.subdomain,
        subdomain_length: args.length,
        ttl: args.ttl,
        no_dns: args.no_dns,
        no_proxy: args.no_proxy,
        ..ProvisionOptions::default()
    };
    let no_proxy = options.no_proxy;

    let dns = if options.no_dns {
        None
    } else {
        Some(cloudflare_from_env()?)
    };

    let (orchestrator, events) =
        Orchestrator::new(Box::new(FileServer::new(server_config)), options)?;
    let orchestrator = match dns {
        Some((credentials, provider)) => orchestrator
            .with_dns(Box::new(provider), credentials.base_domain)
            .with_resolver(default_resolver()?),
        None => orchestrator,
    };

    let (trigger, signal) = shutdown::channel();
    let signal_task = tokio::spawn(watch_signals(trigger));
    let report_task = tokio::spawn(report_events(events, no_proxy));

    let result = orchestrator.run(signal).await;

    signal_task.abort();
    // The orchestrator dropped its sender, so the reporter drains and ends
    if let Err(e) = report_task.await {
        warn!("Event reporter ended abnormally: {}", e);
    }

    let summary = result.context("File server could not be started")?;
    info!(
        final_state = %summary.final_state,
        record_deleted = summary.record_deleted,
        "Shutdown complete"
    );
    Ok(())
}

/// Print what an operator needs to know as the run progresses
async fn report_events(mut events: mpsc::Receiver<OrchestratorEvent>, mut no_proxy: bool) {
    let mut record_name: Option<String> = None;

    while let Some(event) = events.recv().await {
        match event {
            OrchestratorEvent::RecordCreated { id, name } => {
                info!(record_id = %id, %name, "DNS record ready");
                record_name = Some(name);
            }
            OrchestratorEvent::ProxyDisabled => no_proxy = true,
            OrchestratorEvent::ServerStarted { addr } => {
                println!("Serving HTTP on {} (http://{}/)", addr, addr);
                if let Some(name) = &record_name {
                    if no_proxy {
                        println!("Public URL: http://{}:{}/", name, addr.port());
                    } else {
                        println!("Public URL: https://{}/", name);
                    }
                }
                println!("Press Ctrl+C to stop");
            }
            OrchestratorEvent::RecordDeleted { id } => {
                println!("Cleaned up DNS record {}", id);
            }
            _ => {}
        }
    }
}

/// Trigger shutdown on the first signal, log and ignore the rest
fn report_signal(trigger: &ShutdownTrigger, name: &str) {
    if trigger.trigger() {
        info!("Received {}, shutting down", name);
    } else {
        warn!("Received {} while already shutting down, ignoring", name);
    }
}

#[cfg(unix)]
async fn watch_signals(trigger: ShutdownTrigger) {
    let handlers = signal(SignalKind::terminate())
        .and_then(|sigterm| signal(SignalKind::interrupt()).map(|sigint| (sigterm, sigint)));

    let (mut sigterm, mut sigint) = match handlers {
        Ok(handlers) => handlers,
        Err(e) => {
            error!("Failed to install signal handlers: {}", e);
            trigger.trigger();
            return;
        }
    };

    loop {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        report_signal(&trigger, name);
    }
}

#[cfg(not(unix))]
async fn watch_signals(trigger: ShutdownTrigger) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            trigger.trigger();
            return;
        }
        report_signal(&trigger, "Ctrl+C");
    }
}
