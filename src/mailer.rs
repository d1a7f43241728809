use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;

/// Out-of-band delivery of the one-time delivery code. Failures are the
/// caller's to log; issuing the code never depends on delivery succeeding.
#[async_trait]
pub trait CodeMailer: Send + Sync {
    async fn send_delivery_code(&self, recipient: Uuid, code: &str) -> Result<(), AppError>;
}

/// Default transport: records issuance without the code itself.
pub struct LogMailer;

#[async_trait]
impl CodeMailer for LogMailer {
    async fn send_delivery_code(&self, recipient: Uuid, _code: &str) -> Result<(), AppError> {
        info!(%recipient, "delivery code issued");
        Ok(())
    }
}
