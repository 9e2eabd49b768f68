use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use invoice_core::{update, HaltReason, InvoiceId, Msg, Stage, WatchState, WatchViewModel};
use invoice_engine::{ensure_output_dir, InvoiceClient, PollerHandle};
use invoice_logging::invoice_info;

use crate::cli::WatchArgs;
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::render;

/// Full redraws are throttled to this cadence; stage changes print at once.
const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

type RowSignature = (Stage, Option<HaltReason>, bool);

/// Polls every requested invoice until each one completes or halts.
pub fn watch(config: &AppConfig, client: InvoiceClient, args: &WatchArgs) -> Result<()> {
    if let Some(dir) = &args.save_dir {
        ensure_output_dir(dir).with_context(|| format!("preparing {}", dir.display()))?;
    }
    let poller = PollerHandle::new(Arc::new(client), config.poll_settings())
        .context("starting the poller")?;
    let mut session = WatchSession::new(
        EffectRunner::new(poller, args.save_dir.clone()),
        WatchState::new().with_log_limit(config.log_entries),
        args.once_per_status,
    );

    for invoice_id in &args.invoice_ids {
        session.dispatch(Msg::Watch {
            invoice_id: invoice_id.clone(),
        });
    }
    session.run(config.tick_interval());
    Ok(())
}

struct WatchSession {
    runner: EffectRunner,
    state: WatchState,
    once_per_status: bool,
    printed: HashMap<InvoiceId, RowSignature>,
    last_redraw: Option<Instant>,
}

impl WatchSession {
    fn new(runner: EffectRunner, state: WatchState, once_per_status: bool) -> Self {
        Self {
            runner,
            state,
            once_per_status,
            printed: HashMap::new(),
            last_redraw: None,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let (state, effects) = update(std::mem::take(&mut self.state), msg);
        self.state = state;
        for notice in self.runner.run(effects) {
            println!("{notice}");
        }
    }

    fn run(&mut self, tick: Duration) {
        let mut last_tick = Instant::now();
        loop {
            if let Some(event) = self.runner.recv_timeout(tick) {
                let msg = self.runner.translate(event);
                self.dispatch(msg);
            }

            let now = Instant::now();
            let elapsed = now.duration_since(last_tick);
            if elapsed >= tick {
                self.dispatch(Msg::Tick { elapsed });
                last_tick = now;
            }

            if self.state.consume_dirty() {
                let view = self.state.view();
                self.present(&view, now);
            }

            if self.state.all_terminal() {
                invoice_info!("All watched invoices reached a terminal state");
                break;
            }
        }
    }

    fn present(&mut self, view: &WatchViewModel, now: Instant) {
        let mut changed = Vec::new();
        for row in &view.rows {
            let signature = (row.stage, row.halted, row.loading);
            if self.printed.get(&row.invoice_id) != Some(&signature) {
                self.printed.insert(row.invoice_id.clone(), signature);
                changed.push(row);
            }
        }

        if self.once_per_status {
            for row in changed {
                for line in render::render_row(row) {
                    println!("{line}");
                }
            }
            return;
        }

        let due = self
            .last_redraw
            .map_or(true, |last| now.duration_since(last) >= REDRAW_INTERVAL);
        if changed.is_empty() && !due {
            return;
        }
        self.last_redraw = Some(now);
        for line in render::render(view) {
            println!("{line}");
        }
        println!();
    }
}
