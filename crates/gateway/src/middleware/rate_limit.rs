//! Transport-level rate limiting using a token bucket
//!
//! This guards the process as a whole; the per-user submission quotas
//! live in the repository and are enforced transactionally.

use axum::{extract::Request, middleware::Next, response::{IntoResponse, Response}};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use lectorate_common::errors::AppError;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Process-wide rate limiter using the governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Create a new rate limiter
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<GlobalRateLimiter> {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_second(rps).allow_burst(burst);

    Arc::new(RateLimiter::direct(quota))
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    request: Request,
    next: Next,
    limiter: Arc<GlobalRateLimiter>,
) -> Response {
    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!("Transport rate limit exceeded");
            AppError::RateLimited.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(100, 200);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_zero_config_falls_back_to_minimum() {
        let limiter = create_rate_limiter(0, 0);
        // One request fits the minimal burst, the immediate second does not
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
