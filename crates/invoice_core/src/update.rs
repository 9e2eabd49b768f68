use invoice_logging::{invoice_debug, invoice_info, invoice_warn};

use crate::tracker::Applied;
use crate::{Effect, Msg, WatchState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: WatchState, msg: Msg) -> (WatchState, Vec<Effect>) {
    let effects = match msg {
        Msg::Watch { invoice_id } => {
            let invoice_id = invoice_id.trim().to_string();
            if invoice_id.is_empty() {
                return (state, Vec::new());
            }
            if state.watch(&invoice_id) {
                invoice_info!("Watching invoice_id={}", invoice_id);
                vec![Effect::StartPolling { invoice_id }]
            } else {
                // Already polled on behalf of another view.
                Vec::new()
            }
        }
        Msg::Unwatch { invoice_id } => match state.unwatch(invoice_id.trim()) {
            Some(true) => {
                invoice_info!("Last watcher left invoice_id={}", invoice_id);
                vec![Effect::StopPolling {
                    invoice_id: invoice_id.trim().to_string(),
                }]
            }
            Some(false) | None => Vec::new(),
        },
        Msg::PollSucceeded {
            invoice_id,
            seq,
            snapshot,
        } => match state.apply_snapshot(&invoice_id, seq, snapshot) {
            Some(Applied::Completed) => {
                invoice_info!("Invoice completed invoice_id={} seq={}", invoice_id, seq);
                vec![
                    Effect::StopPolling {
                        invoice_id: invoice_id.clone(),
                    },
                    Effect::NotifyComplete { invoice_id },
                ]
            }
            Some(Applied::Halted(reason)) => {
                invoice_warn!(
                    "Invoice halted invoice_id={} seq={} reason={}",
                    invoice_id,
                    seq,
                    reason
                );
                vec![
                    Effect::StopPolling {
                        invoice_id: invoice_id.clone(),
                    },
                    Effect::NotifyHalted { invoice_id, reason },
                ]
            }
            Some(Applied::StageChanged) => {
                invoice_debug!(
                    "Stage advanced invoice_id={} seq={} stage={:?}",
                    invoice_id,
                    seq,
                    state.stage_of(&invoice_id)
                );
                Vec::new()
            }
            Some(Applied::Stale) | Some(Applied::Unchanged) => Vec::new(),
            None => {
                invoice_debug!(
                    "Response for unwatched invoice_id={} seq={}",
                    invoice_id,
                    seq
                );
                Vec::new()
            }
        },
        Msg::PollFailed {
            invoice_id,
            seq,
            error,
        } => {
            if state.apply_failure(&invoice_id, seq, error.clone()) {
                invoice_warn!(
                    "Poll failed invoice_id={} seq={} error={}",
                    invoice_id,
                    seq,
                    error
                );
            }
            Vec::new()
        }
        Msg::Tick { elapsed } => {
            state.tick(elapsed);
            Vec::new()
        }
    };

    (state, effects)
}
