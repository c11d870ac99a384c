use serde::Deserialize;

/// Layered runtime configuration for the engine. The teacher workspace
/// declares the `config` crate but never wires it up; this is where it
/// earns its keep: environment variables prefixed `LOAN_ENGINE_` override
/// whatever defaults are supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Connection string for the persistent store (§6 "Environment").
    pub database_url: String,
    /// Base URL of the external payment provider the `PaymentProvider`
    /// implementation calls into (disbursement transfers, repayment debits).
    pub payment_provider_url: String,
    /// Signing secret for bearer tokens.
    pub token_signing_secret: String,
    /// Bearer token lifetime, in seconds.
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    /// Shared secret required to create an operator account.
    pub operator_creation_secret: String,
    /// 32-byte symmetric key for sensitive-field encryption, base64-encoded.
    pub field_encryption_key: String,
    /// Allowed CORS origins for the HTTP front door.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Upper bound on a `PaymentProvider` call before it's treated as a
    /// timeout (§5: "bounded timeout, implementer chooses, ≤30s").
    #[serde(default = "default_provider_timeout_seconds")]
    pub provider_timeout_seconds: u64,
    /// How many times a lost balance CAS is retried inside the engine
    /// before surfacing to the caller (§7: "retried up to a small bound ≤3").
    #[serde(default = "default_cas_retry_limit")]
    pub cas_retry_limit: u8,
}

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_provider_timeout_seconds() -> u64 {
    30
}

fn default_cas_retry_limit() -> u8 {
    3
}

impl EngineConfig {
    /// Load configuration from (in increasing precedence) a `config/default`
    /// file, a `config/{RUN_MODE}` file, and `LOAN_ENGINE_*` environment
    /// variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("LOAN_ENGINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
