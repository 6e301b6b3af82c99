use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::error::ProtoErrorKind;
use hickory_resolver::proto::rr::RecordType;
use tracing::{debug, info};

use super::runner::QueryRunner;
use super::types::Reply;
use crate::config::ResolverSettings;
use crate::domain::Domain;
use crate::error::ProbeError;

/// How a failed lookup is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// A response arrived but carried no usable records (NXDOMAIN, NODATA)
    Answered,
    Timeout,
    Other,
}

fn classify(error: &ResolveError) -> Failure {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => Failure::Answered,
        ResolveErrorKind::Timeout => Failure::Timeout,
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => Failure::Timeout,
        _ => Failure::Other,
    }
}

/// A record lookup through the system's configured name servers
pub struct DnsQueryRunner {
    resolver: TokioAsyncResolver,
}

impl DnsQueryRunner {
    /// Build a resolver from the system configuration (`/etc/resolv.conf`).
    pub fn new(settings: &ResolverSettings) -> Result<Self, ProbeError> {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| ProbeError::Resolver(e.to_string()))?;

        opts.attempts = settings.attempts;
        opts.timeout = Duration::from_millis(settings.timeout_ms);

        debug!(
            nameservers = config.name_servers().len(),
            attempts = settings.attempts,
            timeout_ms = settings.timeout_ms,
            "Resolver created"
        );

        Ok(Self { resolver: TokioAsyncResolver::tokio(config, opts) })
    }
}

#[async_trait]
impl QueryRunner for DnsQueryRunner {
    async fn send_query(&self, domain: &mut Domain) -> (Reply, bool) {
        let target = format!("{}.{}.", domain.random_target(), domain.name());
        let reply = Reply::new(target);

        info!(qname = %reply.target, "Sending query");

        let start = Instant::now();
        let outcome = self.resolver.lookup(reply.target.as_str(), RecordType::A).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(lookup) => {
                info!(
                    qname = %reply.target,
                    records = lookup.records().len(),
                    duration_ms = elapsed_ms,
                    "Got answer"
                );
                (reply.received(elapsed_ms), true)
            }
            Err(error) => match classify(&error) {
                Failure::Answered => {
                    info!(qname = %reply.target, status = %error, duration_ms = elapsed_ms, "Got answer");
                    (reply.received(elapsed_ms), true)
                }
                Failure::Timeout => {
                    debug!(qname = %reply.target, %error, "Query timed out");
                    (reply.timed_out(elapsed_ms), false)
                }
                Failure::Other => {
                    debug!(qname = %reply.target, %error, "Query failed");
                    (reply.failed(elapsed_ms), false)
                }
            },
        }
    }
}
