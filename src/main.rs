use std::sync::Arc;

use clap::Parser;
use gatehouse::gates::builtin::register_builtin;
use gatehouse::gates::loader::load_policies;
use gatehouse::gates::middleware::{GatesMiddleware, JsonResponses};
use gatehouse::gates::registry::GateManager;
use gatehouse::{settings, web};
use miette::Result;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "gatehouse",
    version,
    about = "HTTP service with controller/action authorization gates"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    let mut manager = GateManager::new();
    register_builtin(&mut manager, settings.gates.admin_token.clone());
    tracing::info!(gates = ?manager, "Registered gates");

    let responses = JsonResponses {
        expose_errors: settings.gates.expose_errors,
    };

    let rules = if settings.gates.enabled {
        let rules = load_policies(&settings.gates.policies_dir)?;
        match manager.validate(&rules) {
            Ok(()) => {}
            Err(e) if settings.gates.strict => return Err(e.into()),
            Err(e) => tracing::warn!(error = %e, "Policy references an unregistered gate"),
        }
        Some(Arc::new(rules))
    } else {
        None
    };

    let mut gates = GatesMiddleware::new(Arc::new(manager)).with_responses(Arc::new(responses));
    if let Some(rules) = rules {
        gates = gates.with_rules(rules);
    }

    // start web server
    web::serve(settings, gates).await?;
    Ok(())
}
