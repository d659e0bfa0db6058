//! # Termination signals.
//!
//! [`wait_for_shutdown_signal`] resolves with the name of the first termination
//! signal the process receives. Unix listens for SIGINT, SIGTERM (systemd stop)
//! and SIGQUIT; other platforms for Ctrl-C only.

use std::io;

/// Waits for a termination signal and returns its name.
///
/// Fails if a signal handler cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl_c")
}
