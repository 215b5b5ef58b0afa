//! Fixed-minute-window rate limiting (§4.9), keyed by `(client, route class)`
//! with a boosted allowance for requests a fresh cache entry would serve.

use std::collections::HashMap;
use std::sync::Mutex;

use marketcache_core::RouteLimit;

/// The two route classes carrying distinct budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    ChartData,
    General,
}

impl RouteClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChartData => "chart-data",
            Self::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    client_id: String,
    class: RouteClass,
    fresh: bool,
    window: i64,
}

struct Bucket {
    count: u64,
}

/// Outcome of a rate-limit check, carrying enough to populate the
/// `X-RateLimit-*` response headers regardless of the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub retry_after_secs: u64,
}

/// Fixed-minute-window counters with soft-cap reaping (§4.9).
pub struct RateLimiter {
    chart_data_limit: RouteLimit,
    general_limit: RouteLimit,
    soft_cap: usize,
    buckets: Mutex<HashMap<BucketKey, Bucket>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(chart_data_limit: RouteLimit, general_limit: RouteLimit, soft_cap: usize) -> Self {
        Self {
            chart_data_limit,
            general_limit,
            soft_cap,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn limit_for(&self, class: RouteClass) -> RouteLimit {
        match class {
            RouteClass::ChartData => self.chart_data_limit,
            RouteClass::General => self.general_limit,
        }
    }

    /// Check and (if allowed) consume one unit of budget for `client_id` in
    /// `class`, at the minute window containing `now_unix_secs`. `fresh`
    /// marks a request a fresh cache entry would serve, which uses a
    /// distinct, boosted budget so polling clients don't eat the base quota.
    pub fn check(
        &self,
        client_id: &str,
        class: RouteClass,
        fresh: bool,
        now_unix_secs: i64,
    ) -> RateLimitDecision {
        let route_limit = self.limit_for(class);
        let effective_limit = if fresh {
            route_limit.rpm.saturating_mul(route_limit.fresh_multiplier)
        } else {
            route_limit.rpm
        };
        let window = now_unix_secs.div_euclid(60);
        let key = BucketKey {
            client_id: client_id.to_string(),
            class,
            fresh,
            window,
        };

        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let entry = buckets.entry(key).or_insert(Bucket { count: 0 });

        let decision = if entry.count < effective_limit {
            entry.count += 1;
            RateLimitDecision {
                allowed: true,
                limit: effective_limit,
                remaining: effective_limit - entry.count,
                retry_after_secs: 60,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                limit: effective_limit,
                remaining: 0,
                retry_after_secs: 60,
            }
        };

        if buckets.len() > self.soft_cap {
            buckets.retain(|k, _| window - k.window < 2);
        }

        decision
    }
}
