use clap::Parser;
use std::time::Duration;

// Origin that is always allowed to read responses cross-origin
pub const PRODUCTION_ORIGIN: &str = "https://solarastudios.com.br";

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "contact-relay")]
#[command(about = "Contact form endpoint that relays submissions by email")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Email provider API key
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    // Address that receives the submissions
    #[arg(
        long,
        env = "CONTACT_RECEIVER_EMAIL",
        default_value = "contato@solarastudios.com.br"
    )]
    pub receiver: String,

    // Fixed sender identity
    #[arg(
        long,
        env = "CONTACT_SENDER",
        default_value = "Contato Solara Studios <contato-site@solarastudios.com.br>"
    )]
    pub sender: String,

    // Extra trusted origin, e.g. "http://localhost:3000"
    #[arg(long, env = "API_URL_DEV")]
    pub dev_origin: Option<String>,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 5)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Upper bound on client keys kept in memory
    #[arg(long, env = "MAX_TRACKED_CLIENTS", default_value_t = 10_000)]
    pub max_tracked_clients: usize,

    // Seconds between sweeps of expired rate windows
    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 60)]
    pub cleanup_interval: u64,

    // Proxies in front of the service that append to X-Forwarded-For.
    // 0 ignores the header, N keys on the Nth entry from the right
    #[arg(long, env = "TRUSTED_PROXY_HOPS", default_value_t = 0)]
    pub trusted_proxy_hops: usize,

    // Email provider endpoint
    #[arg(
        long,
        env = "RESEND_API_URL",
        default_value = "https://api.resend.com/emails"
    )]
    pub resend_url: String,

    // Timeout for the email provider call, in seconds
    #[arg(long, env = "EMAIL_TIMEOUT", default_value_t = 10)]
    pub email_timeout: u64,

    // Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 8 * 1024 * 1024)]
    pub max_body_bytes: usize,

    // Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

// Runtime configuration, built once at startup and shared read-only
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub receiver: Option<String>,
    pub sender: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit: u32,
    pub rate_window: Duration,
    pub max_tracked_clients: usize,
    pub cleanup_interval: Duration,
    pub trusted_proxy_hops: usize,
    pub resend_url: String,
    pub email_timeout: Duration,
    pub max_body_bytes: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mut allowed_origins = Vec::new();
        if let Some(dev) = non_empty(args.dev_origin) {
            allowed_origins.push(dev);
        }
        allowed_origins.push(PRODUCTION_ORIGIN.to_string());

        Self {
            api_key: non_empty(args.resend_api_key),
            receiver: non_empty(Some(args.receiver)),
            sender: args.sender,
            allowed_origins,
            rate_limit: args.rate_limit,
            rate_window: Duration::from_secs(args.rate_window),
            max_tracked_clients: args.max_tracked_clients,
            cleanup_interval: Duration::from_secs(args.cleanup_interval),
            trusted_proxy_hops: args.trusted_proxy_hops,
            resend_url: args.resend_url,
            email_timeout: Duration::from_secs(args.email_timeout),
            max_body_bytes: args.max_body_bytes,
        }
    }
}

// blank env vars count as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
