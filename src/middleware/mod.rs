//! Request-security pipeline.
//!
//! The layers are applied in this order, outermost first:
//!
//! 1. [`honeypot`] - trap paths, permanent block
//! 2. [`blocklist`] - permanent and temporary bans
//! 3. [`validation::limit_request_size`] - declared body size
//! 4. [`validation::validate_request_headers`] - JSON content type, forwarding headers
//! 5. [`injection::sql_injection_guard`] - SQL patterns in query and body
//! 6. [`injection::xss_sanitizer`] - strips script-like payloads
//! 7. [`csrf`] - origin/referer check
//! 8. [`bot`] - user-agent filtering
//! 9. [`activity`] - failure tracking
//! 10. [`rate_limit`] - strict, general and per-prefix limiters
//!
//! [`security_headers`] wraps the whole app, including the health routes.

pub mod activity;
pub mod admin;
pub mod blocklist;
pub mod bot;
pub mod csrf;
pub mod honeypot;
pub mod injection;
pub mod ip;
pub mod rate_limit;
pub mod security_headers;
pub mod validation;

pub use admin::RequireAdmin;
pub use rate_limit::{EndpointRateLimiter, RateLimitTiers, RateLimiter, RateLimiters};
