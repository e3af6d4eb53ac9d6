//! `tapedeck run` command.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};

use crate::cassette::{Cassette, CassetteStore};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{CassetteError, Error};
use crate::mode::{Controller, Mode};
use crate::report::{Reporter, RunMetadata};
use crate::server;

/// Execute the `run` command.
///
/// Loads the environment, builds the live context and runs the configured
/// mode until it finishes or a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable cassette, a
/// listener failure or a cassette that cannot be saved.
pub async fn run(env_file: Option<&Path>) -> Result<(), Error> {
    Config::load_env_file(env_file)?;
    let config = Config::from_env()?;
    let context = ServiceContext::live()?;
    run_until(&config, context, shutdown_signal()).await.map(|_| ())
}

/// Runs the configured mode with the given context. Inbound modes serve
/// until `shutdown` resolves; playback stops at the end of the cassette or
/// at `shutdown`, whichever comes first. The cassette is closed and the
/// reporter flushed on every path out.
///
/// # Errors
///
/// Returns an error if the cassette cannot be opened or saved, or the
/// listener fails.
pub async fn run_until<F>(
    config: &Config,
    context: ServiceContext,
    shutdown: F,
) -> Result<RunMetadata, Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Starting in {} mode against {}", config.mode, config.target);
    info!(
        "Matching requests on [{}], responses on [{}], record mode {}",
        config.request_criteria, config.response_criteria, config.record_mode
    );

    let cassette = open_cassette(config)?;
    let store = Arc::new(CassetteStore::new(&config.cassette, cassette, config.record_mode));
    let clock = Arc::clone(&context.clock);
    let reporter = Arc::new(Reporter::new(&config.report_dir, config.mode, clock));
    let target = config.target.clone();
    let controller = Arc::new(
        Controller::new(config.mode, context, Arc::clone(&store), Arc::clone(&reporter), target)
            .with_response_criteria(config.response_criteria.clone())
            .with_report_matches(config.report_matches),
    );

    let outcome = if config.mode.serves_inbound() {
        server::serve(config.listen, server::router(Arc::clone(&controller)), shutdown).await
    } else {
        tokio::select! {
            played = controller.playback() => info!("Played back {played} interactions"),
            () = shutdown => warn!("Playback interrupted before the end of the cassette"),
        }
        Ok(())
    };

    let closed = store.close().await;
    let metadata = reporter.finish().await;
    outcome?;
    closed?;
    Ok(metadata)
}

fn open_cassette(config: &Config) -> Result<Cassette, CassetteError> {
    let criteria = config.request_criteria.clone();
    match config.mode {
        Mode::Record => Cassette::load_or_empty(&config.cassette, criteria),
        Mode::Serve | Mode::Playback | Mode::Observe => Cassette::load(&config.cassette, criteria),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
