use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("contact_requests_total", "Total number of contact submissions")
            .unwrap();
    pub static ref RATE_LIMITED: Counter = register_counter!(
        "contact_rate_limited_total",
        "Submissions rejected by the rate limiter"
    )
    .unwrap();
    pub static ref VALIDATION_FAILURES: Counter = register_counter!(
        "contact_validation_failures_total",
        "Submissions rejected by validation"
    )
    .unwrap();
    pub static ref EMAILS_SENT: Counter =
        register_counter!("contact_emails_sent_total", "Emails accepted by the provider").unwrap();
    pub static ref EMAIL_FAILURES: Counter = register_counter!(
        "contact_email_failures_total",
        "Emails the provider failed to accept"
    )
    .unwrap();
    pub static ref DISPATCH_LATENCY: Histogram = register_histogram!(
        "contact_dispatch_latency_seconds",
        "Email provider call latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMITER_CLIENTS: Gauge = register_gauge!(
        "contact_rate_limiter_clients",
        "Client keys currently tracked by the rate limiter"
    )
    .unwrap();
}
