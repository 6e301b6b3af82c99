use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::event::{Event, EventKind};

const TARGET_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TARGET_LEN_MIN: usize = 4;
const TARGET_LEN_MAX: usize = 10;

/// A monitored domain with its running query statistics
///
/// Statistics only move on [`EventKind::RecvReply`] events. Mean and standard
/// deviation are population figures (no Bessel correction), updated in a
/// single pass so no history has to be kept in memory.
#[derive(Debug, Clone)]
pub struct Domain {
    rank: Option<i64>,
    name: String,
    query_time_avg: f64,
    query_time_stddev: f64,
    query_count: u64,
    time_first: Option<i64>,
    time_last: Option<i64>,
    events: VecDeque<Event>,
    generator: StdRng,
}

/// 64-bit FNV-1a over the name bytes
fn name_seed(name: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    name.bytes().fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

impl Domain {
    /// A domain that has not been stored yet
    pub fn new(name: impl Into<String>) -> Self {
        Self::restore(None, name, 0.0, 0.0, 0, None, None)
    }

    /// Rebuild a domain from persisted aggregates
    pub fn restore(
        rank: Option<i64>,
        name: impl Into<String>,
        query_time_avg: f64,
        query_time_stddev: f64,
        query_count: u64,
        time_first: Option<i64>,
        time_last: Option<i64>,
    ) -> Self {
        let name = name.into();
        debug!(
            domain = %name,
            ?rank,
            query_time_avg,
            query_time_stddev,
            query_count,
            ?time_first,
            ?time_last,
            "Domain constructed"
        );

        let generator = StdRng::seed_from_u64(name_seed(&name));
        Self {
            rank,
            name,
            query_time_avg,
            query_time_stddev,
            query_count,
            time_first,
            time_last,
            events: VecDeque::new(),
            generator,
        }
    }

    pub fn rank(&self) -> Option<i64> {
        self.rank
    }

    pub(crate) fn set_rank(&mut self, rank: i64) {
        self.rank = Some(rank);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query_time_avg(&self) -> f64 {
        self.query_time_avg
    }

    pub fn query_time_stddev(&self) -> f64 {
        self.query_time_stddev
    }

    pub fn query_count(&self) -> u64 {
        self.query_count
    }

    pub fn time_first(&self) -> Option<i64> {
        self.time_first
    }

    pub fn time_last(&self) -> Option<i64> {
        self.time_last
    }

    /// Events recorded since the last drain, oldest first
    pub fn pending_events(&self) -> impl ExactSizeIterator<Item = &Event> {
        self.events.iter()
    }

    /// Take every pending event, leaving the live queue empty
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Record `event` and fold it into the statistics.
    ///
    /// Returns `true` when the event was a reply and the aggregates changed.
    pub fn update(&mut self, event: Event) -> bool {
        let kind = event.kind;
        let time = event.time;
        let duration = event.duration;
        self.events.push_back(event);

        if kind != EventKind::RecvReply {
            return false;
        }

        if self.time_first.is_none() {
            self.time_first = Some(time);
        }
        self.time_last = Some(time);

        let n = self.query_count as f64;
        let old_avg = self.query_time_avg;
        let old_stddev = self.query_time_stddev;

        let second_moment = ((old_avg * old_avg + old_stddev * old_stddev) * n + duration * duration) / (n + 1.0);
        let avg = (old_avg * n + duration) / (n + 1.0);

        // Round-off can push the variance slightly below zero
        let variance = (second_moment - avg * avg).max(0.0);

        self.query_count += 1;
        self.query_time_avg = avg;
        self.query_time_stddev = variance.sqrt();
        true
    }

    /// A fresh label for cache-busting lookups below this domain
    pub fn random_target(&mut self) -> String {
        let len = self.generator.gen_range(TARGET_LEN_MIN..=TARGET_LEN_MAX);
        (0..len)
            .map(|_| char::from(TARGET_ALPHABET[self.generator.gen_range(0..TARGET_ALPHABET.len())]))
            .collect()
    }
}
