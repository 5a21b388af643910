use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use pulsemon_engine::evaluator::{Evaluator, EvaluatorConfig};
use pulsemon_engine::lifecycle::LifecycleManager;
use pulsemon_engine::mute::MuteController;
use pulsemon_engine::repo::{AlertNotifier, AlertRepository, RuleRepository};
use pulsemon_notify::dispatcher::NotificationDispatcher;
use pulsemon_storage::metrics::build_catalog;
use pulsemon_storage::Store;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub evaluator: Arc<Evaluator>,
    pub lifecycle: Arc<LifecycleManager>,
    pub mute: Arc<MuteController>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires the engine components around one shared store handle.
    pub fn build(
        config: Arc<ServerConfig>,
        store: Arc<Store>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        let catalog = Arc::new(build_catalog(&store, &config.metrics.types));
        let rules: Arc<dyn RuleRepository> = store.clone();
        let alerts: Arc<dyn AlertRepository> = store.clone();
        let notifier: Arc<dyn AlertNotifier> = dispatcher;

        let lifecycle = Arc::new(LifecycleManager::new(rules.clone(), alerts, notifier));
        let evaluator = Arc::new(Evaluator::new(
            rules.clone(),
            catalog,
            lifecycle.clone(),
            EvaluatorConfig {
                max_concurrent: config.evaluation.max_concurrent,
                fetch_timeout: Duration::from_secs(config.evaluation.fetch_timeout_secs),
                batch_deadline: Duration::from_secs(config.evaluation.batch_timeout_secs),
            },
        ));
        let mute = Arc::new(MuteController::new(rules));

        Self {
            store,
            evaluator,
            lifecycle,
            mute,
            start_time: Utc::now(),
            config,
        }
    }
}
