use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use invoice_logging::{invoice_debug, invoice_info};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::InvoiceSource;
use crate::{EngineEvent, InvoiceId};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

enum PollerCommand {
    Watch { invoice_id: InvoiceId },
    Unwatch { invoice_id: InvoiceId },
    Shutdown,
}

/// Handle to the background polling thread.
///
/// Each watched invoice gets its own loop that fetches the record every
/// `interval`. Fetches run as separate tasks so a slow response never delays
/// the next tick; every request is stamped with a sequence number that is
/// strictly increasing across all loops, so the receiver can drop responses
/// that arrive out of order.
pub struct PollerHandle {
    cmd_tx: mpsc::Sender<PollerCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl PollerHandle {
    pub fn new(source: Arc<dyn InvoiceSource>, settings: PollSettings) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("invoice-poller")
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let next_seq = Arc::new(AtomicU64::new(1));

        thread::Builder::new()
            .name("invoice-poller-control".to_string())
            .spawn(move || {
                let mut loops: HashMap<InvoiceId, CancellationToken> = HashMap::new();
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        PollerCommand::Watch { invoice_id } => {
                            if loops.contains_key(&invoice_id) {
                                continue;
                            }
                            let token = CancellationToken::new();
                            loops.insert(invoice_id.clone(), token.clone());
                            runtime.spawn(poll_loop(
                                source.clone(),
                                invoice_id,
                                settings.interval,
                                next_seq.clone(),
                                token,
                                event_tx.clone(),
                            ));
                        }
                        PollerCommand::Unwatch { invoice_id } => {
                            if let Some(token) = loops.remove(&invoice_id) {
                                token.cancel();
                            }
                        }
                        PollerCommand::Shutdown => break,
                    }
                }
                for (_, token) in loops.drain() {
                    token.cancel();
                }
                runtime.shutdown_timeout(Duration::from_secs(1));
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn watch(&self, invoice_id: impl Into<InvoiceId>) {
        let _ = self.cmd_tx.send(PollerCommand::Watch {
            invoice_id: invoice_id.into(),
        });
    }

    pub fn unwatch(&self, invoice_id: impl Into<InvoiceId>) {
        let _ = self.cmd_tx.send(PollerCommand::Unwatch {
            invoice_id: invoice_id.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PollerCommand::Shutdown);
    }
}

async fn poll_loop(
    source: Arc<dyn InvoiceSource>,
    invoice_id: InvoiceId,
    interval: Duration,
    next_seq: Arc<AtomicU64>,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    invoice_info!(
        "Polling started invoice_id={} interval_ms={}",
        invoice_id,
        interval.as_millis()
    );
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let seq = next_seq.fetch_add(1, Ordering::Relaxed);
                tokio::spawn(fetch_once(
                    source.clone(),
                    invoice_id.clone(),
                    seq,
                    token.child_token(),
                    event_tx.clone(),
                ));
            }
        }
    }
    invoice_info!("Polling stopped invoice_id={}", invoice_id);
}

async fn fetch_once(
    source: Arc<dyn InvoiceSource>,
    invoice_id: InvoiceId,
    seq: u64,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let result = tokio::select! {
        _ = token.cancelled() => None,
        result = source.fetch_invoice(&invoice_id) => Some(result),
    };
    match result {
        Some(result) => {
            let _ = event_tx.send(EngineEvent::PollCompleted {
                invoice_id,
                seq,
                result,
            });
        }
        None => {
            invoice_debug!("In-flight poll aborted invoice_id={} seq={}", invoice_id, seq);
        }
    }
}
