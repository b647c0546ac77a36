use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vd_agent::config::DEFAULT_CONFIG_PATH;
use vd_agent::error::{EXIT_FATAL, EXIT_SHUTDOWN, error_chain};
use vd_agent::{Agent, CliEngine, Config, run_until_signal};

#[derive(Parser, Debug)]
#[command(name = "vd-agent", version, about = "Periodic yt-dlp batch download agent")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "VD_AGENT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// Load and validate the configuration, then exit
    #[arg(long)]
    check: bool,
}

/// RUST_LOG wins, then --verbose, then the configured level
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let startup_level = if args.verbose { "debug" } else { "info" };

    // the configured level is only known after loading, so loading logs
    // through a temporary subscriber
    let loaded = tracing::subscriber::with_default(
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(startup_level))
            .finish(),
        || {
            tracing::info!(path = %args.config.display(), "loading configuration file");
            Config::load(&args.config)
        },
    );

    let level = match &loaded {
        Ok(config) if !args.verbose => config.logging.level.as_directive(),
        _ => startup_level,
    };
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => return fatal(&e),
    };

    if args.check {
        tracing::info!(sets = config.sets.len(), "configuration is valid");
        return ExitCode::from(EXIT_SHUTDOWN);
    }

    let engine = match CliEngine::from_config(&config.engine, config.dry_run) {
        Ok(engine) => engine,
        Err(e) => return fatal(&e),
    };
    tracing::info!(binary = %engine.binary_path().display(), "using yt-dlp");

    tracing::info!("running agent");
    match run_until_signal(Agent::new(config, Arc::new(engine))).await {
        Ok(()) => ExitCode::from(EXIT_SHUTDOWN),
        Err(e) => fatal(&e),
    }
}

fn fatal(err: &vd_agent::Error) -> ExitCode {
    tracing::error!(code = err.error_code(), "{}", error_chain(err));
    ExitCode::from(EXIT_FATAL)
}
