use async_trait::async_trait;
use tracing::warn;

use super::types::Reply;
use crate::domain::Domain;

/// Executes measurements against a domain
///
/// One runner is built per monitored domain. Implementations must turn
/// network failures into `Timeout`/`Error` replies instead of returning early.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Issue one query for a fresh target below `domain`.
    ///
    /// The flag is `false` when no answer was received.
    async fn send_query(&self, domain: &mut Domain) -> (Reply, bool);

    /// Query `domain` once and record the outcome in its event log
    async fn probe(&self, domain: &mut Domain) -> bool {
        let (reply, success) = self.send_query(domain).await;

        if !success {
            warn!(domain = %domain.name(), qname = %reply.target, kind = %reply.kind, "Probe failed");
        }

        domain.update(reply.into());
        success
    }
}
