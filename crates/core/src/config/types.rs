use serde::{Deserialize, Serialize};

use crate::extract::DiscountLabel;
use crate::fetcher::Session;
use crate::policy::FilterPolicy;

/// Browser identity presented to trackers when the config does not
/// name one. NexusPHP installs reject obviously non-browser agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3770.142 Safari/537.36";

/// Root configuration
///
/// The policy keys (`discount`, `seeders`, `leechers`, `left-time`,
/// `hr`, `remember`) sit at the top level of the file alongside the
/// credential fields.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Session cookie sent with every tracker request.
    pub cookie: String,
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
    #[serde(flatten)]
    pub policy: FilterPolicy,
    /// Discount marker overrides, keyed by label. Replaces every
    /// built-in discount table when present.
    #[serde(default)]
    pub adapter: Option<AdapterOverride>,
    /// Copy each item's link into its artifact comment field.
    #[serde(default)]
    pub comment: bool,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Config {
    /// Header material for the fetcher.
    pub fn session(&self) -> Session {
        Session::new(&self.cookie, &self.user_agent)
    }
}

/// Replacement discount marker patterns, one per label. Labels left
/// unset keep the stock NexusPHP tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdapterOverride {
    #[serde(default = "default_free_token")]
    pub free: String,
    #[serde(rename = "2x", default = "default_two_x_token")]
    pub two_x: String,
    #[serde(rename = "2xfree", default = "default_two_x_free_token")]
    pub two_x_free: String,
    #[serde(rename = "30%", default = "default_thirty_percent_token")]
    pub thirty_percent: String,
    #[serde(rename = "50%", default = "default_half_down_token")]
    pub half_down: String,
    #[serde(rename = "2x50%", default = "default_two_x_half_down_token")]
    pub two_x_half_down: String,
}

impl Default for AdapterOverride {
    fn default() -> Self {
        Self {
            free: default_free_token(),
            two_x: default_two_x_token(),
            two_x_free: default_two_x_free_token(),
            thirty_percent: default_thirty_percent_token(),
            half_down: default_half_down_token(),
            two_x_half_down: default_two_x_half_down_token(),
        }
    }
}

impl AdapterOverride {
    /// Patterns paired with their labels, in matching order.
    pub fn tokens(&self) -> Vec<(DiscountLabel, &str)> {
        vec![
            (DiscountLabel::Free, self.free.as_str()),
            (DiscountLabel::TwoX, self.two_x.as_str()),
            (DiscountLabel::TwoXFree, self.two_x_free.as_str()),
            (DiscountLabel::ThirtyPercent, self.thirty_percent.as_str()),
            (DiscountLabel::HalfDown, self.half_down.as_str()),
            (DiscountLabel::TwoXHalfDown, self.two_x_half_down.as_str()),
        ]
    }
}

fn default_free_token() -> String {
    "free".to_string()
}

fn default_two_x_token() -> String {
    "twoup".to_string()
}

fn default_two_x_free_token() -> String {
    "twoupfree".to_string()
}

fn default_thirty_percent_token() -> String {
    "thirtypercent".to_string()
}

fn default_half_down_token() -> String {
    "halfdown".to_string()
}

fn default_two_x_half_down_token() -> String {
    "twouphalfdown".to_string()
}

/// HTTP client tuning.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Extra attempts after a transient failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            retries: default_retries(),
        }
    }
}

fn default_timeout() -> u32 {
    20
}

fn default_retries() -> u32 {
    5
}

/// Batch execution tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Concurrent in-flight items.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub malformed_peer_rows: MalformedRowMode,
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            malformed_peer_rows: MalformedRowMode::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

fn default_workers() -> usize {
    3
}

/// What to do with a peer-table row that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRowMode {
    /// Keep the row as a zeroed placeholder so roster counts stay honest.
    Placeholder,
    /// Drop the row.
    Skip,
}

impl Default for MalformedRowMode {
    fn default() -> Self {
        MalformedRowMode::Placeholder
    }
}

/// Pacing between item submissions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThrottleConfig {
    #[serde(default)]
    pub mode: ThrottleMode,
    /// Pause between submissions in `fixed_delay` mode.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Refill rate in `token_bucket` mode.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            mode: ThrottleMode::default(),
            delay_ms: default_delay_ms(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_delay_ms() -> u64 {
    500
}

fn default_requests_per_minute() -> u32 {
    120
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleMode {
    FixedDelay,
    TokenBucket,
    Off,
}

impl Default for ThrottleMode {
    fn default() -> Self {
        ThrottleMode::FixedDelay
    }
}

/// Sanitized config for logs and debug output (cookie redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub cookie_configured: bool,
    #[serde(rename = "user-agent")]
    pub user_agent: String,
    #[serde(flatten)]
    pub policy: FilterPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<AdapterOverride>,
    pub comment: bool,
    pub fetch: FetchConfig,
    pub pipeline: PipelineConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            cookie_configured: !config.cookie.is_empty(),
            user_agent: config.user_agent.clone(),
            policy: config.policy.clone(),
            adapter: config.adapter.clone(),
            comment: config.comment,
            fetch: config.fetch,
            pipeline: config.pipeline.clone(),
        }
    }
}
