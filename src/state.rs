use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::DispatchSettings;
use crate::directory::CourierDirectory;
use crate::engine::ledger::AssignmentLedger;
use crate::mailer::{CodeMailer, LogMailer};
use crate::models::order::Order;
use crate::notify::Notifier;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub directory: CourierDirectory,
    pub orders: DashMap<Uuid, Order>,
    pub ledger: AssignmentLedger,
    pub notifier: Notifier,
    pub mailer: Arc<dyn CodeMailer>,
    pub settings: DispatchSettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            directory: CourierDirectory::new(),
            orders: DashMap::new(),
            ledger: AssignmentLedger::new(),
            notifier: Notifier::new(),
            mailer: Arc::new(LogMailer),
            settings,
            metrics: Metrics::new(),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn CodeMailer>) -> Self {
        self.mailer = mailer;
        self
    }
}
