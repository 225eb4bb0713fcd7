use tokio_util::sync::CancellationToken;

/// Install a shutdown handler for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` cancelled when either signal arrives. The
/// main loop checks the token before starting a new heartbeat cycle and
/// before starting a new job; in-flight exchanges run to completion or their
/// own timeout rather than being aborted.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, requesting shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, requesting shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl-C, requesting shutdown");
    }
}
