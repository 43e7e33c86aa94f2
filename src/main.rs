//! debug-mirror binary entry point.

use std::sync::Arc;

use debug_mirror::cli::{self, Args};
use debug_mirror::config::Config;
use debug_mirror::scenario::{LoggingTabs, Scenario, ScenarioPlayer};
use debug_mirror::{
    logging, FrontendSession, InMemoryBackend, Project, Scope, SessionServices,
    UiThread,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'debug-mirror --help' for more information.");
            std::process::exit(2);
        }
    };

    if args.help {
        cli::print_help();
        return;
    }

    if args.version {
        cli::print_version();
        return;
    }

    if let Err(e) = run(args).await {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> debug_mirror::Result<()> {
    let config = Config::load(&args)?;

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging already initialized");
    }

    info!("debug-mirror v{}", env!("CARGO_PKG_VERSION"));

    let path = config.scenario_path()?;
    let scenario = Scenario::from_file(path)?;
    info!(path = %path.display(), steps = scenario.steps.len(), "scenario loaded");

    let backend = Arc::new(InMemoryBackend::new());
    let ui = Arc::new(UiThread::spawn(config.ui.thread_name.clone())?);
    let services = SessionServices {
        remote: backend.clone(),
        evaluation: backend.clone(),
        tabs: Arc::new(LoggingTabs),
        ui: ui.clone(),
    };

    let root = Scope::root("debug-mirror");
    let session = FrontendSession::open(
        Project::new(scenario.project.clone()),
        &root,
        scenario.session.clone(),
        services,
        config.session_options(),
    );

    let mut player =
        ScenarioPlayer::new(&backend, &session, ui.as_ref()).with_settle(scenario.settle());
    let reports = tokio::select! {
        reports = player.play(&scenario.steps) => reports,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, shutting down");
            Ok(Vec::new())
        }
    };

    let shutdown = session.shutdown().await;
    root.close().await;
    let reports = reports?;
    shutdown?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{}", output);

    Ok(())
}
