//! URL check subsystem.
//!
//! # Data Flow
//! ```text
//! CheckRequest {"url": ...}
//!     → result.rs (validate into Target, no network yet)
//!     → Checker::check (overall deadline)
//!         → transport.rs (DNS → connect → TLS → GET, per hop)
//!         → probe.rs (phase timestamps)
//!         → redirects followed until a terminal response
//!     → CheckResult (+ timeline, + transport error if any)
//! ```
//!
//! # Design Decisions
//! - Transport failures are part of the result, not errors of the call
//! - Headers and dump are captured only for failure-classified statuses
//! - The redirect target is reported verbatim, without normalization

use std::time::{Duration, Instant};

use url::Url;

pub mod error;
pub mod probe;
pub mod result;
pub mod transport;

pub use error::CheckError;
pub use probe::{Phase, PhaseTimings, Probe, Timeline};
pub use result::{CheckRequest, CheckResult, Target};

use crate::config::CheckerConfig;
use crate::dispatch::FailurePolicy;
use transport::{Fetched, Transport};

/// Everything a check produced.
#[derive(Debug)]
pub struct CheckOutcome {
    pub result: CheckResult,
    /// Present whenever any network activity happened.
    pub timeline: Option<Timeline>,
    /// Transport failure; also rendered into `result.error`.
    pub error: Option<CheckError>,
}

/// Performs instrumented checks against target URLs.
pub struct Checker {
    transport: Transport,
    timeout: Duration,
    max_redirects: usize,
    policy: FailurePolicy,
}

impl Checker {
    pub fn new(config: &CheckerConfig, policy: FailurePolicy) -> Result<Self, CheckError> {
        Ok(Self {
            transport: Transport::new(config)?,
            timeout: Duration::from_secs(config.timeout_secs),
            max_redirects: config.max_redirects,
            policy,
        })
    }

    /// Fetch `target`, following redirects, within the deadline.
    pub async fn check(&self, target: &Target) -> CheckOutcome {
        let mut probe = Probe::new();
        let fetched = tokio::time::timeout(self.timeout, self.follow(target.url(), &mut probe)).await;
        let body_done = Instant::now();

        let mut result = CheckResult::for_link(target.link());
        let timeline = probe.started().then(|| probe.finish(body_done));
        if let Some(timeline) = &timeline {
            result.response_time_millis = timeline.response_time_millis();
            result.timings = Some(timeline.timings());
        }

        let error = match fetched {
            Ok(Ok((terminal, response))) => {
                self.fill(&mut result, target, terminal, &response);
                None
            }
            Ok(Err(e)) => Some(e),
            Err(_) => Some(CheckError::Timeout(self.timeout)),
        };

        match &error {
            Some(e) => {
                tracing::warn!(url = %target.link(), kind = e.kind(), error = %e, "Check failed");
                result.error = Some(e.to_string());
            }
            None => tracing::debug!(
                url = %target.link(),
                status = result.status_code,
                timings = ?result.timings,
                "Check completed"
            ),
        }

        CheckOutcome {
            result,
            timeline,
            error,
        }
    }

    /// Returns the terminal URL when at least one redirect was followed.
    async fn follow(&self, start: &Url, probe: &mut Probe) -> Result<(Option<Url>, Fetched), CheckError> {
        let mut current = start.clone();
        let mut redirected = false;

        for hop in 0..=self.max_redirects {
            if hop > 0 {
                probe.next_hop();
            }
            let response = self.transport.fetch(&current, probe).await?;
            match response.redirect_location(&current)? {
                Some(next) => {
                    tracing::debug!(from = %current, to = %next, status = %response.status, "Following redirect");
                    current = next;
                    redirected = true;
                }
                None => return Ok((redirected.then_some(current), response)),
            }
        }
        Err(CheckError::TooManyRedirects(self.max_redirects))
    }

    fn fill(&self, result: &mut CheckResult, target: &Target, terminal: Option<Url>, response: &Fetched) {
        result.status_code = response.status.as_u16();
        if let Some(terminal) = terminal {
            if terminal.as_str() != target.link() {
                result.redirect_url = terminal.into();
            }
        }
        if self.policy.is_failure_class(result.status_code) {
            result.dump = response.dump();
            result.headers = Some(response.header_map());
        }
    }
}
