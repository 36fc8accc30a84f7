//! `persona` - look up psychological profiles through the analysis service.
//!
//! Usage:
//!   persona -k APIKEY            Validate and store a new API key
//!   persona -i 100077649716158   Look up a target (repeat -i for several)
//!   persona -b                   Show account balance
//!   persona -s                   Show the stored API key, masked
//!   persona -d ...               Log raw service responses

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use persona_client::{
    AccountInfo, ClientError, HttpLookupApi, LookupPipeline, PollSettings, ProfileRecord, Session,
};
use persona_core::{AppConfig, Credential};
use persona_vault::FileCredentialStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

type Pipeline = LookupPipeline<HttpLookupApi, FileCredentialStore>;

/// Persona command-line client
#[derive(Debug, Parser)]
#[command(name = "persona", version, about = "Generate psychological profiles from public account identifiers")]
struct Cli {
    /// API key to validate and store (replaces the stored key)
    #[arg(short = 'k', long = "apikey")]
    api_key: Option<String>,

    /// Account ID or username to analyze; may be repeated
    #[arg(short = 'i', long = "id", visible_alias = "facebook")]
    targets: Vec<String>,

    /// Show the stored API key, masked
    #[arg(short = 's', long = "show-key", visible_alias = "showkey")]
    show_key: bool,

    /// Check account balance
    #[arg(short = 'b', long)]
    balance: bool,

    /// Log raw service responses
    #[arg(short = 'd', long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if debug {
        "info,persona=debug"
    } else {
        "info,persona=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(debug))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    info!("Starting Persona v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env().context("failed to load configuration")?;
    let credential_dir = config.credential_dir()?;
    let pipeline = LookupPipeline::new(
        Arc::new(HttpLookupApi::new(&config.service)?),
        Arc::new(FileCredentialStore::new(&credential_dir)),
        PollSettings::from(&config.polling),
    );

    let supplied = cli.api_key.as_deref().map(Credential::new).transpose()?;
    let replaced_key = supplied.is_some();
    let (session, prompted) = establish(&pipeline, supplied).await?;

    if replaced_key || prompted {
        println!("API key saved to {}", credential_dir.display());
        print_account(&session.account);
    }

    if !cli.targets.is_empty() {
        let cancel = CancellationToken::new();
        spawn_interrupt_handler(cancel.clone());
        return run_lookups(&pipeline, &session.credential, &cli.targets, &cancel).await;
    }

    if cli.balance {
        let account = pipeline.account_info(&session.credential).await?;
        print_account(&account);
    } else if cli.show_key {
        println!("Current API key: {}", session.credential.masked());
    } else if !(replaced_key || prompted) {
        Cli::command().print_help()?;
    }

    Ok(())
}

/// Use the stored key, asking for one on stdin when none is stored.
async fn establish(pipeline: &Pipeline, supplied: Option<Credential>) -> Result<(Session, bool)> {
    match pipeline.establish_credential(supplied).await {
        Ok(session) => Ok((session, false)),
        Err(ClientError::NoCredential) => {
            let entered = prompt_for_key().await?;
            let session = pipeline.establish_credential(Some(entered)).await?;
            Ok((session, true))
        }
        Err(e) => Err(e.into()),
    }
}

async fn prompt_for_key() -> Result<Credential> {
    let line = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
        use std::io::Write;

        print!("Enter your API key: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line)
    })
    .await
    .context("prompt task failed")??;

    Ok(Credential::new(line)?)
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, cancelling lookups...");
            cancel.cancel();
        }
    });
}

async fn run_lookups(
    pipeline: &Pipeline,
    credential: &Credential,
    targets: &[String],
    cancel: &CancellationToken,
) -> Result<()> {
    if let [target] = targets {
        let record = pipeline.run_lookup(credential, target, cancel).await?;
        print_record(&record);
        return Ok(());
    }

    let mut failed = 0usize;
    for outcome in pipeline.run_many(credential, targets, cancel).await {
        match outcome.result {
            Ok(record) => {
                println!("Target: {}", outcome.target);
                print_record(&record);
            }
            Err(e) => {
                failed += 1;
                eprintln!("Target {}: {e}", outcome.target);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} lookups failed", targets.len());
    }
    Ok(())
}

fn print_account(account: &AccountInfo) {
    println!("Balance: {} {}", account.balance, account.currency);
    println!("Credits: {}", account.credits);
    println!(
        "Expiration Date: {}",
        account.expiration.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Status: {}", account.status);
}

fn print_record(record: &ProfileRecord) {
    println!("################## Psychological Profile ##################");
    println!("Name: {}", record.person_name);
    println!();
    println!("PsychoPortrait: {}", record.psychological_portrait);
    println!();
    if record.danger_detail.is_empty() {
        println!("Level Of Danger: {}", record.danger_severity);
    } else {
        println!(
            "Level Of Danger: {}, {}",
            record.danger_severity, record.danger_detail
        );
    }
    println!();
    println!(
        "Predicted Characteristics: {}.",
        record.predicted_characteristics.join(", ")
    );
    if let Some(url) = &record.image_url {
        println!("Image: {url}");
    }
    println!("##########################################################");
}
