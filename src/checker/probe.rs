//! Phase timing instrumentation for a single outbound check.
//!
//! The transport calls [`Probe::mark`] as each phase begins or ends. When the
//! body has been read the caller finishes the probe into a [`Timeline`],
//! which is guaranteed to be causally ordered:
//!
//! ```text
//! dns_start ≤ dns_done ≤ connect_start ≤ connect_done
//!     ≤ [tls_start ≤ tls_done] ≤ conn_acquired ≤ first_byte ≤ body_done
//! ```
//!
//! Phases that never happened are filled with the previous timestamp, so a
//! reused or IP-literal connection yields zero-length DNS/connect segments
//! instead of negative ones.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Timestamped events of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    DnsStart,
    DnsDone,
    ConnectStart,
    ConnectDone,
    TlsStart,
    TlsDone,
    ConnAcquired,
    FirstByte,
}

/// Collects phase timestamps while a check runs.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    dns_start: Option<Instant>,
    dns_done: Option<Instant>,
    connect_start: Option<Instant>,
    connect_done: Option<Instant>,
    tls_start: Option<Instant>,
    tls_done: Option<Instant>,
    conn_acquired: Option<Instant>,
    first_byte: Option<Instant>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `phase` as happening now.
    pub fn mark(&mut self, phase: Phase) {
        self.mark_at(phase, Instant::now());
    }

    /// Record `phase` at an explicit instant.
    pub fn mark_at(&mut self, phase: Phase, at: Instant) {
        match phase {
            // first DNS activity of the whole check, kept across redirects
            Phase::DnsStart => {
                self.dns_start.get_or_insert(at);
            }
            Phase::DnsDone => self.dns_done = Some(at),
            Phase::ConnectStart => {
                // connecting straight to an IP: no resolution took place
                if self.dns_done.is_none() {
                    self.dns_start.get_or_insert(at);
                    self.dns_done = Some(at);
                }
                self.connect_start = Some(at);
            }
            Phase::ConnectDone => self.connect_done = Some(at),
            Phase::TlsStart => self.tls_start = Some(at),
            Phase::TlsDone => self.tls_done = Some(at),
            Phase::ConnAcquired => self.conn_acquired = Some(at),
            Phase::FirstByte => self.first_byte = Some(at),
        }
    }

    /// Forget the per-hop phases before following a redirect.
    ///
    /// `dns_start` survives so the total covers every hop.
    pub fn next_hop(&mut self) {
        *self = Self {
            dns_start: self.dns_start,
            ..Self::default()
        };
    }

    /// Whether any network activity has been recorded.
    pub fn started(&self) -> bool {
        self.dns_start.is_some()
    }

    /// Close the probe with the instant the body finished reading.
    pub fn finish(&self, body_done: Instant) -> Timeline {
        let dns_start = self
            .dns_start
            .or(self.connect_start)
            .unwrap_or(body_done);
        let dns_done = self.dns_done.unwrap_or(dns_start).max(dns_start);
        // no new connect observed: dns_done stands in as the connect marker
        let connect_start = self.connect_start.unwrap_or(dns_done).max(dns_done);
        let connect_done = self.connect_done.unwrap_or(connect_start).max(connect_start);

        let tls = match (self.tls_start, self.tls_done) {
            (Some(start), done) => {
                let start = start.max(connect_done);
                let done = done.unwrap_or(start).max(start);
                Some((start, done))
            }
            (None, _) => None,
        };
        let ready = tls.map(|(_, done)| done).unwrap_or(connect_done);

        let conn_acquired = self.conn_acquired.unwrap_or(ready).max(ready);
        let first_byte = self.first_byte.unwrap_or(conn_acquired).max(conn_acquired);
        let body_done = body_done.max(first_byte);

        Timeline {
            dns_start,
            dns_done,
            connect_start,
            connect_done,
            tls,
            conn_acquired,
            first_byte,
            body_done,
        }
    }
}

/// Ordered timestamps of a finished check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    pub dns_start: Instant,
    pub dns_done: Instant,
    pub connect_start: Instant,
    pub connect_done: Instant,
    pub tls: Option<(Instant, Instant)>,
    pub conn_acquired: Instant,
    pub first_byte: Instant,
    pub body_done: Instant,
}

impl Timeline {
    /// Elapsed time from first DNS activity to body read complete.
    pub fn total(&self) -> Duration {
        self.body_done - self.dns_start
    }

    /// Total rounded to the nearest millisecond.
    pub fn response_time_millis(&self) -> u64 {
        round_millis(self.total())
    }

    /// Per-phase durations in milliseconds.
    pub fn timings(&self) -> PhaseTimings {
        PhaseTimings {
            dns: round_millis(self.dns_done - self.dns_start),
            connect: round_millis(self.connect_done - self.connect_start),
            tls: self.tls.map(|(start, done)| round_millis(done - start)),
            server_processing: round_millis(self.first_byte - self.conn_acquired),
            content_transfer: round_millis(self.body_done - self.first_byte),
            total: round_millis(self.total()),
        }
    }
}

/// Per-phase breakdown reported with a check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTimings {
    pub dns: u64,
    pub connect: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<u64>,
    pub server_processing: u64,
    pub content_transfer: u64,
    pub total: u64,
}

fn round_millis(duration: Duration) -> u64 {
    let millis = (duration.as_nanos() + 500_000) / 1_000_000;
    u64::try_from(millis).unwrap_or(u64::MAX)
}
