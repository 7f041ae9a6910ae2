use tokio_util::sync::CancellationToken;

/// Cancel the returned token on Ctrl-C.
///
/// Jobs already handed to the engine are not aborted; the controller just
/// stops waiting for them.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                return;
            }
        }
        trigger.cancel();
    });

    token
}
