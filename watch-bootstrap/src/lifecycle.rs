use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use watch_application::AppError;
use watch_infrastructure::{schedule_polls, AppConfig};
use watch_interfaces_bot::run_command_responder;

use crate::context::AppContext;

const FRESH_TOKEN_HINT: &str =
    "bearer token rejected; restart with a fresh token via --token or BATTLEFIELD_BEARER_TOKEN";

pub async fn run_standalone(config: AppConfig, cli_token: Option<String>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested");
        signal_token.cancel();
    });

    let context = match AppContext::new(config, cli_token, shutdown.clone()).await {
        Ok(context) => context,
        Err(err) if shutdown.is_cancelled() => {
            info!("startup interrupted by shutdown: {}", err);
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let state = context.state;

    let responder = context.chat_gateway.map(|gateway| {
        tokio::spawn(run_command_responder(
            state.clone(),
            gateway,
            shutdown.clone(),
        ))
    });
    let poller = tokio::spawn(schedule_polls(state.clone(), shutdown.clone()));

    let outcome = match poller.await {
        Ok(result) => result,
        Err(err) => Err(anyhow!("poll worker panicked: {}", err)),
    };
    shutdown.cancel();
    if let Some(handle) = responder {
        if let Err(err) = handle.await {
            warn!("command responder panicked: {}", err);
        }
    }
    info!(metrics = %state.metrics.render_summary(), "battlefield watch stopped");

    outcome.map_err(|err| {
        let fatal_auth = err
            .downcast_ref::<AppError>()
            .map(AppError::is_fatal)
            .unwrap_or(false);
        if fatal_auth {
            err.context(FRESH_TOKEN_HINT)
        } else {
            err
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("sigterm handler unavailable: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
