use tokio::signal;

/// Wait for Ctrl-C, or SIGTERM on unix.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result?,
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
    }

    tracing::debug!("Shutdown signal received");
    Ok(())
}
