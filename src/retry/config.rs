use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Webhook origins with a registered retry policy.
///
/// Stored rows keep the provider as text; parse at the boundary with
/// [`Provider::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Stripe,
    Mux,
    Twilio,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Stripe, Provider::Mux, Provider::Twilio];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::Mux => "mux",
            Provider::Twilio => "twilio",
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            Provider::Stripe => "RETRY_STRIPE",
            Provider::Mux => "RETRY_MUX",
            Provider::Twilio => "RETRY_TWILIO",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Provider::Stripe),
            "mux" => Ok(Provider::Mux),
            "twilio" => Ok(Provider::Twilio),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed replays allowed before the row is quarantined.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub const STRIPE: RetryPolicy = RetryPolicy {
        max_retries: 5,
        initial_delay_ms: 5_000,
        max_delay_ms: 3_600_000,
    };
    pub const MUX: RetryPolicy = RetryPolicy {
        max_retries: 3,
        initial_delay_ms: 2_000,
        max_delay_ms: 60_000,
    };
    pub const TWILIO: RetryPolicy = RetryPolicy {
        max_retries: 3,
        initial_delay_ms: 1_000,
        max_delay_ms: 30_000,
    };
}

/// Per-provider policy table.
///
/// Anything that does not name a known provider gets the stripe policy,
/// the most patient one in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicies {
    pub stripe: RetryPolicy,
    pub mux: RetryPolicy,
    pub twilio: RetryPolicy,
}

impl RetryPolicies {
    pub fn get(&self, provider: Provider) -> RetryPolicy {
        match provider {
            Provider::Stripe => self.stripe,
            Provider::Mux => self.mux,
            Provider::Twilio => self.twilio,
        }
    }

    pub fn for_name(&self, provider: &str) -> RetryPolicy {
        provider
            .parse::<Provider>()
            .map_or_else(|_| self.fallback(), |provider| self.get(provider))
    }

    pub fn fallback(&self) -> RetryPolicy {
        self.stripe
    }

    fn get_mut(&mut self, provider: Provider) -> &mut RetryPolicy {
        match provider {
            Provider::Stripe => &mut self.stripe,
            Provider::Mux => &mut self.mux,
            Provider::Twilio => &mut self.twilio,
        }
    }
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            stripe: RetryPolicy::STRIPE,
            mux: RetryPolicy::MUX,
            twilio: RetryPolicy::TWILIO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub policies: RetryPolicies,
    pub handler_timeout_ms: u64,
    pub batch_limit: i64,
    pub stale_processing_ms: u64,
}

impl RetryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("RETRY_HANDLER_TIMEOUT_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.handler_timeout_ms = parsed.max(1);
        }
        if let Some(value) = lookup("RETRY_BATCH_LIMIT")
            && let Ok(parsed) = value.parse::<i64>()
        {
            config.batch_limit = parsed.max(1);
        }
        if let Some(value) = lookup("RETRY_STALE_PROCESSING_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.stale_processing_ms = parsed.max(1);
        }

        for provider in Provider::ALL {
            let prefix = provider.env_prefix();
            let policy = config.policies.get_mut(provider);

            if let Some(value) = lookup(&format!("{prefix}_MAX_RETRIES"))
                && let Ok(parsed) = value.parse::<u32>()
            {
                policy.max_retries = parsed.max(1);
            }
            if let Some(value) = lookup(&format!("{prefix}_INITIAL_DELAY_MS"))
                && let Ok(parsed) = value.parse::<u64>()
            {
                policy.initial_delay_ms = parsed;
            }
            if let Some(value) = lookup(&format!("{prefix}_MAX_DELAY_MS"))
                && let Ok(parsed) = value.parse::<u64>()
            {
                policy.max_delay_ms = parsed;
            }
            policy.max_delay_ms = policy.max_delay_ms.max(policy.initial_delay_ms);
        }

        config
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            policies: RetryPolicies::default(),
            handler_timeout_ms: 30_000,
            batch_limit: 50,
            stale_processing_ms: 900_000,
        }
    }
}
