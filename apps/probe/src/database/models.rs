use crate::domain::{Domain, Event};

/// Row of the `domain` table
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    pub rank: Option<i64>,
    pub name: String,
    pub query_time_avg: f64,
    pub query_time_stddev: f64,
    pub query_count: i64,
    pub time_first: Option<i64>,
    pub time_last: Option<i64>,
}

impl DomainRecord {
    pub fn from_domain(domain: &Domain) -> Self {
        Self {
            rank: domain.rank(),
            name: domain.name().to_string(),
            query_time_avg: domain.query_time_avg(),
            query_time_stddev: domain.query_time_stddev(),
            query_count: i64::try_from(domain.query_count()).unwrap_or(i64::MAX),
            time_first: domain.time_first(),
            time_last: domain.time_last(),
        }
    }

    pub fn into_domain(self) -> Domain {
        Domain::restore(
            self.rank,
            self.name,
            self.query_time_avg,
            self.query_time_stddev,
            u64::try_from(self.query_count).unwrap_or_default(),
            self.time_first,
            self.time_last,
        )
    }
}

/// Row of the `measurement` table
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub time: i64,
    pub target: String,
    pub kind: i64,
    pub duration_ms: f64,
    pub domain_rank: i64,
}

impl MeasurementRecord {
    pub fn from_event(event: Event, domain_rank: i64) -> Self {
        Self {
            time: event.time,
            target: event.target,
            kind: event.kind.code(),
            duration_ms: event.duration,
            domain_rank,
        }
    }
}
