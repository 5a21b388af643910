use chrono::Utc;
use pulsemon_engine::evaluator::Evaluator;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Drives the batch evaluator on a fixed tick.
///
/// The evaluator itself rejects overlapping batches, so a tick that
/// lands while the previous batch is still running is simply dropped.
pub struct EvaluationScheduler {
    evaluator: Arc<Evaluator>,
    tick_secs: u64,
}

impl EvaluationScheduler {
    pub fn new(evaluator: Arc<Evaluator>, tick_secs: u64) -> Self {
        Self {
            evaluator,
            tick_secs,
        }
    }

    pub async fn run(&self) {
        tracing::info!(tick_secs = self.tick_secs, "Evaluation scheduler started");

        let mut tick = interval(Duration::from_secs(self.tick_secs));
        loop {
            tick.tick().await;
            let summary = self.evaluator.run_batch(Utc::now()).await;
            if summary.skipped {
                continue;
            }
            if summary.triggered > 0 || summary.failed > 0 {
                tracing::info!(
                    evaluated = summary.evaluated,
                    triggered = summary.triggered,
                    failed = summary.failed,
                    "Evaluation batch finished"
                );
            } else {
                tracing::debug!(evaluated = summary.evaluated, "Evaluation batch finished");
            }
        }
    }
}
