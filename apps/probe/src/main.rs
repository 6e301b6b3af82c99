mod cli;
mod config;
mod database;
mod domain;
mod error;
mod monitoring;
mod orchestrator;
mod pool;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::{debug, error, info, warn};

use cli::Args;
use config::Config;
use database::{LibsqlStore, PersistenceStore};
use domain::{Domain, normalize_name};
use error::ProbeError;
use monitoring::DnsQueryRunner;
use orchestrator::{Orchestrator, Termination};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let mut config = match Config::from_config(args.config.as_ref()).map_err(ProbeError::from) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    config.apply_args(&args);

    logger::init(logger::level_from_verbosity(config.logging.verbosity));
    debug!("{}", config);

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}. Exiting..", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: Config) -> Result<()> {
    if config.database.name.trim().is_empty() {
        return Err(ProbeError::MissingDatabase.into());
    }

    let store = LibsqlStore::connect(&config.database).await.map_err(ProbeError::from)?;

    let names: Vec<String> = args
        .domains
        .iter()
        .filter_map(|raw| {
            let name = normalize_name(raw);
            if name.is_none() {
                warn!("Ignoring empty domain name {:?}", raw);
            }
            name
        })
        .collect();

    if args.delete {
        let domains: Vec<Domain> = names.into_iter().map(Domain::new).collect();
        if let Err(e) = store.delete_domains(&domains).await {
            error!("Failed to delete domains: {}", e);
        }
    } else if args.add {
        add_new_domains(&store, names).await;
    }

    let mut termination = Termination::install()?;
    let resolver = config.resolver.clone();

    let mut orchestrator = Orchestrator::new(store, config.schedule());
    let outcome = orchestrator.start(|_| DnsQueryRunner::new(&resolver), termination.recv()).await;
    debug!(state = ?orchestrator.state(), "Orchestrator returned");

    orchestrator.into_store().disconnect().await;
    outcome?;

    info!("DNS probe finished");
    Ok(())
}

/// Insert the names that are not stored yet
async fn add_new_domains<S: PersistenceStore>(store: &S, names: Vec<String>) {
    let existing = match store.load_domains().await {
        Ok(domains) => domains,
        Err(e) => {
            error!("Failed to load domains: {}", e);
            return;
        }
    };

    let mut fresh: Vec<Domain> = Vec::new();
    for name in names {
        let known = existing.iter().any(|d| d.name() == name) || fresh.iter().any(|d| d.name() == name);
        if known {
            debug!("Domain {} already in database", name);
        } else {
            fresh.push(Domain::new(name));
        }
    }

    if let Err(e) = store.add_domains(&fresh).await {
        error!("Failed to add domains: {}", e);
    }
}
