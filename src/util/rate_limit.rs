//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// Rate limiter keyed by user id
pub type UserLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

/// Create a per-user rate limiter with the specified requests per second
pub fn create_user_limiter(requests_per_second: u32) -> Arc<UserLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_have_independent_quotas() {
        let limiter = create_user_limiter(2);
        let busy = Uuid::new_v4();
        let quiet = Uuid::new_v4();

        assert!(limiter.check_key(&busy).is_ok());
        assert!(limiter.check_key(&busy).is_ok());
        assert!(limiter.check_key(&busy).is_err());
        assert!(limiter.check_key(&quiet).is_ok());
    }

    #[test]
    fn zero_quota_falls_back_to_one() {
        let limiter = create_user_limiter(0);
        let user = Uuid::new_v4();
        assert!(limiter.check_key(&user).is_ok());
        assert!(limiter.check_key(&user).is_err());
    }
}
