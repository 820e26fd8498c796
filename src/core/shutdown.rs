//! Shutdown coordination between signal handlers and route threads
//!
//! Signals arrive on the tokio runtime; the route itself runs on plain
//! threads (producers, SEDA workers, delivery threads). The coordinator
//! broadcasts to async tasks and exposes a cheap [`ShutdownFlag`] that
//! blocking code can poll between units of work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Cloneable, thread-safe view of the shutdown request
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Coordinates graceful shutdown across the application
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    flag: ShutdownFlag,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let coordinator = Self {
            shutdown_tx,
            flag: ShutdownFlag::default(),
        };
        (coordinator, shutdown_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Flag for threads that cannot await the broadcast
    pub fn flag(&self) -> ShutdownFlag {
        self.flag.clone()
    }

    pub fn trigger_shutdown(&self) {
        self.flag.set();
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.is_set()
    }

    /// Run `future_fn` with signal handlers installed
    ///
    /// The first SIGINT/SIGTERM/SIGHUP/SIGQUIT requests a graceful stop; a
    /// second one exits the process immediately.
    pub async fn guard_with_coordinator<F, Fut, R, E>(future_fn: F) -> Result<R, E>
    where
        F: FnOnce(Self, broadcast::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
    {
        let (coordinator, shutdown_rx) = Self::new();
        setup_signal_handlers(coordinator.shutdown_tx.clone(), coordinator.flag.clone());
        future_fn(coordinator, shutdown_rx).await
    }
}

fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>, flag: ShutdownFlag) {
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        use std::sync::atomic::AtomicUsize;
        use tokio::signal::unix::{signal, SignalKind};
        let signal_count = Arc::new(AtomicUsize::new(0));
        let signals = [
            SignalKind::interrupt(),
            SignalKind::terminate(),
            SignalKind::hangup(),
            SignalKind::quit(),
        ];

        for kind in signals {
            let tx = shutdown_tx.clone();
            let flag = flag.clone();
            let counter = Arc::clone(&signal_count);

            tokio::spawn(async move {
                let Ok(mut sig) = signal(kind) else {
                    return;
                };
                while sig.recv().await.is_some() {
                    let previous = counter.fetch_add(1, Ordering::AcqRel);
                    flag.set();
                    let _ = tx.send(());
                    if previous >= 1 {
                        log::warn!("Second shutdown signal received; exiting without draining");
                        std::process::exit(130);
                    }
                    log::info!("Shutdown requested; draining route (signal again to force exit)");
                }
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.set();
                let _ = shutdown_tx.send(());
            }
        });
    }
}
