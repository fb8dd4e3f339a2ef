//! Stopping the control loop on SIGINT/SIGTERM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

/// Raise `stop` when the process is asked to terminate.
///
/// The handlers are registered before this returns, so a signal that arrives
/// afterwards is always routed to `stop` instead of killing the process.
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be registered.
pub fn watch(stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating shutdown...");
                }
            }
            stop.store(true, Ordering::SeqCst);
        }))
    }

    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, initiating shutdown...");
                stop.store(true, Ordering::SeqCst);
            }
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    use nix::sys::signal::{raise, Signal};

    #[tokio::test]
    async fn test_sigterm_sets_stop_flag() {
        let stop = Arc::new(AtomicBool::new(false));
        let watcher = watch(Arc::clone(&stop)).unwrap();

        raise(Signal::SIGTERM).unwrap();

        tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .expect("watcher finished")
            .unwrap();
        assert!(stop.load(Ordering::SeqCst));
    }
}
