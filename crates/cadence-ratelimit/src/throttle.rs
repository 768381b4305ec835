use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cadence_config::{ThrottleConfig, parse_duration};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::error::RateLimitError;

/// A provider that needs a minimum interval between requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleRule {
    host: String,
    min_interval: Duration,
}

impl ThrottleRule {
    /// Create a rule for `host` (matched case-insensitively)
    pub fn new(host: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            min_interval,
        }
    }

    /// Hostname or domain suffix this rule applies to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Minimum time between consecutive admitted requests
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Whether requests to `endpoint` fall under this rule
    ///
    /// URLs match on their hostname, either exactly or as a subdomain of
    /// the rule's host. Anything that does not parse as a URL falls back to
    /// a substring check.
    pub fn matches(&self, endpoint: &str) -> bool {
        let host = Url::parse(endpoint)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase));

        match host {
            Some(host) => {
                host == self.host
                    || host
                        .strip_suffix(self.host.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            None => endpoint.to_ascii_lowercase().contains(&self.host),
        }
    }
}

/// Per-rule throttle state: when the last request was admitted
struct Slot {
    rule: ThrottleRule,
    last_request: Mutex<Option<Instant>>,
}

/// Process-wide request pacing shared by every client of a provider
///
/// Cloning is cheap and shares state, so one gate created at startup can be
/// handed to every chat client. Callers for the same provider are admitted
/// one at a time in the order they reached the gate, each at least the
/// rule's `min_interval` after the previous one. Endpoints that match no
/// rule pass straight through.
#[derive(Clone)]
pub struct ThrottleGate {
    slots: Arc<Vec<Slot>>,
}

impl ThrottleGate {
    /// Create a gate enforcing the given rules
    pub fn new(rules: Vec<ThrottleRule>) -> Self {
        let slots = rules
            .into_iter()
            .map(|rule| Slot {
                rule,
                last_request: Mutex::new(None),
            })
            .collect();

        Self { slots: Arc::new(slots) }
    }

    /// A gate that admits every request immediately
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// Create from configuration
    pub fn from_config(config: &ThrottleConfig) -> Result<Self, RateLimitError> {
        let rules = config
            .providers
            .iter()
            .map(|provider| {
                let interval = parse_duration(&provider.min_interval).map_err(RateLimitError::Config)?;
                Ok(ThrottleRule::new(provider.host.clone(), interval))
            })
            .collect::<Result<Vec<_>, RateLimitError>>()?;

        Ok(Self::new(rules))
    }

    /// The rule governing `endpoint`, if any
    pub fn rule_for(&self, endpoint: &str) -> Option<&ThrottleRule> {
        self.slot_for(endpoint).map(|slot| &slot.rule)
    }

    fn slot_for(&self, endpoint: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.rule.matches(endpoint))
    }

    /// Wait until a request to `endpoint` may be sent
    ///
    /// The wait happens while holding the provider's slot so that two
    /// callers can never both observe an expired interval. Dropping the
    /// returned future gives the slot up without recording a request.
    pub async fn admit(&self, endpoint: &str) {
        let Some(slot) = self.slot_for(endpoint) else {
            return;
        };

        let mut last_request = slot.last_request.lock().await;

        if let Some(previous) = *last_request {
            let ready_at = previous + slot.rule.min_interval;
            let now = Instant::now();

            if ready_at > now {
                tracing::debug!(
                    provider = %slot.rule.host,
                    wait = ?(ready_at - now),
                    "throttling request to rate-limited provider"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

impl Default for ThrottleGate {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for ThrottleGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleGate")
            .field("rules", &self.slots.iter().map(|slot| &slot.rule).collect::<Vec<_>>())
            .finish()
    }
}
