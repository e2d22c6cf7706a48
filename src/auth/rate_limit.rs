use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::AppConfig;

/// Actions throttled independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateAction {
    Login,
    Register,
    Contact,
}

impl RateAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RateAction::Login => "login",
            RateAction::Register => "register",
            RateAction::Contact => "contact",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub max_attempts: u32,
    pub window: Duration,
}

/// Outcome of counting one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, RateDecision::Limited { .. })
    }

    /// Wait time rounded up to whole minutes, for user-facing messages.
    pub fn retry_after_minutes(&self) -> u64 {
        match self {
            RateDecision::Allowed => 0,
            RateDecision::Limited { retry_after_secs } => retry_after_secs.div_ceil(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    attempts: u32,
    first_attempt: Instant,
}

/// Fixed-window attempt counter keyed by (action, client IP).
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    login: Policy,
    register: Policy,
    contact: Policy,
    windows: Arc<Mutex<HashMap<(RateAction, IpAddr), Window>>>,
}

impl RateLimiter {
    pub fn new(enabled: bool, login: Policy, register: Policy, contact: Policy) -> Self {
        Self {
            enabled,
            login,
            register,
            contact,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Login and register share the configured policy; contact is fixed at 3 per 10 minutes.
    pub fn from_config(config: &AppConfig) -> Self {
        let shared = Policy {
            max_attempts: config.rate_limit_attempts,
            window: Duration::from_secs(config.rate_limit_window_secs),
        };
        let contact = Policy {
            max_attempts: 3,
            window: Duration::from_secs(600),
        };
        Self::new(config.rate_limiting_enabled, shared, shared, contact)
    }

    pub fn policy(&self, action: RateAction) -> Policy {
        match action {
            RateAction::Login => self.login,
            RateAction::Register => self.register,
            RateAction::Contact => self.contact,
        }
    }

    /// Count one attempt for `action` from `ip` and decide whether it may proceed.
    pub fn check(&self, action: RateAction, ip: IpAddr) -> RateDecision {
        self.check_at(action, ip, Instant::now())
    }

    pub fn check_at(&self, action: RateAction, ip: IpAddr, now: Instant) -> RateDecision {
        if !self.enabled {
            return RateDecision::Allowed;
        }
        let policy = self.policy(action);
        let mut map = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        // Expired windows would restart anyway; dropping them keeps the map bounded.
        map.retain(|(a, _), w| now.saturating_duration_since(w.first_attempt) <= self.policy(*a).window);
        let window = map.entry((action, ip)).or_insert(Window {
            attempts: 0,
            first_attempt: now,
        });

        let elapsed = now.saturating_duration_since(window.first_attempt);
        if elapsed > policy.window {
            *window = Window {
                attempts: 1,
                first_attempt: now,
            };
            return RateDecision::Allowed;
        }

        if window.attempts >= policy.max_attempts {
            let remaining = policy.window.saturating_sub(elapsed);
            return RateDecision::Limited {
                retry_after_secs: remaining.as_secs(),
            };
        }

        window.attempts += 1;
        RateDecision::Allowed
    }

    /// Forget the window for `action` from `ip` (after a successful login or submission).
    pub fn reset(&self, action: RateAction, ip: IpAddr) {
        let mut map = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&(action, ip));
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
