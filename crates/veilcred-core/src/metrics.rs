//! Operation counters, in the teacher crates' `once_cell::sync::Lazy<Counter>`
//! style rather than a registry threaded through every constructor.

use once_cell::sync::Lazy;
use prometheus_client::metrics::counter::Counter;

pub static IDENTITIES_REGISTERED: Lazy<Counter> = Lazy::new(Counter::default);
pub static CREDENTIALS_ISSUED: Lazy<Counter> = Lazy::new(Counter::default);
pub static CREDENTIALS_REVOKED: Lazy<Counter> = Lazy::new(Counter::default);
pub static PROOFS_GENERATED: Lazy<Counter> = Lazy::new(Counter::default);
pub static PROOFS_GENERATION_FAILURES: Lazy<Counter> = Lazy::new(Counter::default);
pub static PROOFS_VERIFIED: Lazy<Counter> = Lazy::new(Counter::default);
pub static PROOFS_VERIFICATION_CACHE_HITS: Lazy<Counter> = Lazy::new(Counter::default);
pub static AUDIT_EVENTS_RECORDED: Lazy<Counter> = Lazy::new(Counter::default);
