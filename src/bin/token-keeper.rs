use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tokio::signal::unix::{signal, SignalKind};
use token_keeper::config::provider::ProviderConfig;
use token_keeper::helpers::time::format_unix_ts;
use token_keeper::oauth::authorize::{authorization_url, register_app_url};
use token_keeper::oauth::transport::build_client;
use token_keeper::oauth::TokenExchanger;
use token_keeper::server;
use token_keeper::store::JsonFileStore;
use token_keeper::utils::config_loader;
use token_keeper::utils::logging::{self, LogLevel};
use token_keeper::workflow::{BindError, BindingWorkflow, CycleReport, RenewalOutcome, RenewalPolicy, RenewalScheduler};
use token_keeper::ServiceConfig;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-keeper.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bind an account from the consent redirect: `<redirect-url> <alias>`
    Bind {
        #[arg(long)]
        principal: String,
        #[arg(long, env = "CLIENT_ID")]
        client_id: Option<String>,
        #[arg(long, env = "CLIENT_SECRET")]
        client_secret: Option<String>,
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,
    },
    /// Run a single renewal cycle
    Renew,
    /// Run renewal cycles on a timer and serve metrics
    Serve,
    /// Print the consent URL for an application
    AuthUrl {
        #[arg(long, env = "CLIENT_ID")]
        client_id: Option<String>,
    },
    /// Print the app registration URL
    RegisterUrl,
    /// List the bindings of a principal
    List {
        #[arg(long)]
        principal: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Create request client, exchanger and store
    // -------------------------------

    let client = build_client(&service_config.settings.http)?;
    let exchanger = TokenExchanger::new(client, service_config.provider.clone());
    let store = Arc::new(JsonFileStore::open(&service_config.storage.path).await?);

    // -------------------------------
    // 3. Dispatch
    // -------------------------------

    match args.command {
        Command::Bind { principal, client_id, client_secret, input } => {
            let (client_id, client_secret) =
                app_credentials(&service_config.provider, client_id, client_secret)?;
            let workflow = BindingWorkflow::new(exchanger, store);
            match workflow.bind(&principal, &input.join(" "), &client_id, &client_secret).await {
                Ok(outcome) => {
                    println!("Bind successful!");
                    println!("MS_ID(digest): {}", outcome.binding.subject_id);
                    println!("userPrincipalName: {}", outcome.profile.user_principal_name.unwrap_or_default());
                    println!("displayName: {}", outcome.profile.display_name.unwrap_or_default());
                    println!("alias: {}", outcome.binding.display_alias);
                }
                Err(err) => return Err(anyhow!("{} ({})", bind_error_message(&err), err)),
            }
        }
        Command::Renew => {
            let scheduler = renewal_scheduler(&service_config, exchanger, store);
            let report = scheduler.run_cycle().await?;
            print_report(&report);
        }
        Command::Serve => serve(&service_config, exchanger, store).await?,
        Command::AuthUrl { client_id } => {
            let client_id = client_id
                .or_else(|| service_config.provider.client_id.clone())
                .ok_or_else(|| anyhow!("no client id given and none configured"))?;
            println!("{}", authorization_url(&service_config.provider, &client_id)?);
        }
        Command::RegisterUrl => println!("{}", register_app_url(&service_config.provider)),
        Command::List { principal } => {
            let workflow = BindingWorkflow::new(exchanger, store);
            let bindings = workflow.bindings_of(&principal).await?;
            println!("{} binding(s) for {}", bindings.len(), principal);
            for b in bindings {
                println!(
                    "#{} {} subject={} client_id={} last_success={}",
                    b.id,
                    b.display_alias,
                    b.subject_id,
                    b.client_id,
                    format_unix_ts(b.last_success_at)
                );
            }
        }
    }

    Ok(())
}

async fn serve(
    service_config: &ServiceConfig,
    exchanger: TokenExchanger,
    store: Arc<JsonFileStore>,
) -> Result<()> {
    let renewal = &service_config.settings.renewal;
    let scheduler = renewal_scheduler(service_config, exchanger, store);
    let renewals = scheduler.loop_renewals(Duration::from_secs(renewal.interval_seconds), renewal.run_on_start);
    let http_server = server::server::start(&service_config.settings);

    info!("Service starting...");
    tokio::select! {
        res = async { tokio::try_join!(renewals, http_server) } => {
            res?;
        },
        res = shutdown_signal() => {
            res?;
            info!("shutting down gracefully");
        }
    }
    Ok(())
}

fn renewal_scheduler(
    service_config: &ServiceConfig,
    exchanger: TokenExchanger,
    store: Arc<JsonFileStore>,
) -> RenewalScheduler<JsonFileStore> {
    let policy = RenewalPolicy::from(&service_config.settings.renewal);
    RenewalScheduler::new(exchanger, store, policy)
}

fn app_credentials(
    provider: &ProviderConfig,
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Result<(String, String)> {
    let client_id = client_id
        .or_else(|| provider.client_id.clone())
        .ok_or_else(|| anyhow!("no client id given and none configured"))?;
    let client_secret = client_secret
        .or_else(|| provider.client_secret.clone())
        .ok_or_else(|| anyhow!("no client secret given and none configured"))?;
    Ok((client_id, client_secret))
}

fn bind_error_message(err: &BindError) -> &'static str {
    match err {
        BindError::Format(_) => "Wrong bind format, send '<redirect-url> <alias>'",
        BindError::Token(_) => "Failed to acquire a refresh token",
        BindError::ProfileFetch(_) => "Failed to read the account profile",
        BindError::Duplicate { .. } => "This application is already bound, no need to bind it again",
        BindError::Persistence(_) => "Failed to save the binding",
    }
}

fn print_report(report: &CycleReport) {
    println!(
        "renewal cycle {} -> {}: {} renewed, {} failed",
        format_unix_ts(report.started_at),
        format_unix_ts(report.finished_at),
        report.succeeded(),
        report.failed()
    );
    for record in &report.records {
        match &record.outcome {
            RenewalOutcome::Renewed => {
                println!("  #{} {} ({}) ok", record.binding_id, record.display_alias, record.subject_id)
            }
            RenewalOutcome::Failed { kind, detail, .. } => println!(
                "  #{} {} ({}) {}: {}",
                record.binding_id, record.display_alias, record.subject_id, kind, detail
            ),
        }
    }
}

async fn shutdown_signal() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {},
    }
    Ok(())
}
