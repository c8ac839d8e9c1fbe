use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::configuration::Config;
use crate::data_capture::{PcapSource, TrafficSniffer};
use crate::error_handling::types::*;
use crate::event_classification::EventClassifier;
use crate::log_tailing::{open_at_end, LogTailer};
use crate::metrics::{write_json_lines, ChannelSink, DeviceIdentity, EventEmitter};
use crate::network::{established_ssh_sessions, resolve_local_ipv4};
use crate::session_management::SessionStore;
use crate::statistics::StatsFlusher;

/// Owns the configuration and drives the whole engine: startup checks, the
/// three workers sharing one [`SessionStore`], and their orderly shutdown.
pub struct Controller {
    pub config: Config,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Starts every worker and blocks until a termination signal or a capture
    /// failure.
    ///
    /// Startup failures (interface lookup, auth log, capture device) are
    /// returned before any worker runs.
    pub async fn run(&self) -> Result<(), GuardError> {
        let device = Arc::new(DeviceIdentity::resolve(self.config.device_id.as_deref()));
        info!("[+] device id: {}", device.id());

        let local_address = resolve_local_ipv4(&self.config.interface_tracked)?;
        let classifier = EventClassifier::new()?;

        let store = Arc::new(SessionStore::new());
        store.seed(established_ssh_sessions().await?);
        info!("[+] tracking {} existing ssh sessions", store.len());

        let reader = open_at_end(&self.config.auth_log_path).await?;
        let mut source =
            PcapSource::open(&self.config.interface_tracked, self.config.ssh_listen_port)?;

        let (sink, events) = ChannelSink::new();
        let emitter = EventEmitter::new(Arc::new(sink), device);
        let writer = tokio::spawn(write_json_lines(events, tokio::io::stdout()));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let capture_stop = Arc::new(AtomicBool::new(false));

        let tailer = tokio::spawn(
            LogTailer::new(
                reader,
                classifier,
                Arc::clone(&store),
                emitter.clone(),
                shutdown_rx.clone(),
            )
            .run(),
        );

        let sniffer = TrafficSniffer::new(
            Arc::clone(&store),
            local_address,
            self.config.ssh_listen_port,
        );
        let stop = Arc::clone(&capture_stop);
        let mut capture = tokio::task::spawn_blocking(move || sniffer.run(&mut source, &stop));

        let flusher = tokio::spawn(
            StatsFlusher::new(store, emitter, self.config.flush_interval(), shutdown_rx).run(),
        );

        let finished_early = tokio::select! {
            _ = shutdown_signal() => {
                info!("[+] shutdown requested");
                None
            }
            result = &mut capture => Some(result),
        };
        let capture = match finished_early {
            Some(result) => CaptureTask::Finished(result),
            None => CaptureTask::Running(capture),
        };

        let outcome = stop_workers(
            &capture_stop,
            capture,
            &shutdown_tx,
            vec![("log tailer", tailer), ("statistics flusher", flusher)],
        )
        .await;

        // every emitter clone is gone once the workers returned
        match writer.await {
            Ok(Ok(written)) => info!("[+] {} events written", written),
            Ok(Err(e)) => warn!("event writer failed: {}", e),
            Err(e) => warn!("event writer task failed: {}", e),
        }

        let frames = outcome?;
        info!("[+] {} frames attributed to ssh sessions", frames);
        Ok(())
    }
}

type CaptureResult = Result<Result<u64, CaptureError>, JoinError>;

/// The blocking capture thread, possibly already returned.
enum CaptureTask {
    Running(JoinHandle<Result<u64, CaptureError>>),
    Finished(CaptureResult),
}

/// Stops the capture, then the async workers, and joins all of them.
///
/// The capture thread is joined before the watch fires, so the flusher's final
/// drain sees every byte the sniffer credited. Every worker is joined even when
/// one of them failed; the capture error comes first, then the first failed
/// worker.
async fn stop_workers(
    capture_stop: &AtomicBool,
    capture: CaptureTask,
    shutdown_tx: &watch::Sender<bool>,
    workers: Vec<(&str, JoinHandle<()>)>,
) -> Result<u64, GuardError> {
    capture_stop.store(true, Ordering::Relaxed);
    let capture_result = match capture {
        CaptureTask::Running(handle) => handle.await,
        CaptureTask::Finished(result) => result,
    };

    let _ = shutdown_tx.send(true);
    let mut failed = None;
    for (name, handle) in workers {
        if let Err(e) = join_worker(name, handle).await {
            failed.get_or_insert(e);
        }
    }

    let frames = match capture_result {
        Ok(Ok(frames)) => frames,
        Ok(Err(e)) => return Err(e.into()),
        Err(e) => return Err(GuardError::TaskFailed(format!("traffic sniffer: {}", e))),
    };
    match failed {
        Some(e) => Err(e),
        None => Ok(frames),
    }
}

async fn join_worker(name: &str, handle: JoinHandle<()>) -> Result<(), GuardError> {
    handle.await.map_err(|e| {
        error!("[!] {} task failed: {}", name, e);
        GuardError::TaskFailed(format!("{}: {}", name, e))
    })
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Unable to listen for SIGTERM: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("[!] Unable to listen for Ctrl-C: {}", e);
    }
}
