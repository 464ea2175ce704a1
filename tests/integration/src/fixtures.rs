//! Test fixtures and data generators
//!
//! Provides reusable test data for integration tests.

use session_service::dto::{LoginRequest, RegisterRequest};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Password every fixture account starts with
pub const PASSWORD: &str = "TestPass123!";

/// A password that differs from [`PASSWORD`] and passes the policy
pub const NEW_PASSWORD: &str = "NewPass456!";

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Credentials for a throwaway account
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub email: String,
    pub password: String,
}

impl TestAccount {
    /// An account whose email will not collide with other tests, even
    /// across runs against a shared database
    pub fn unique() -> Self {
        let suffix = unique_suffix();
        let nonce = chrono::Utc::now().timestamp_micros();
        Self {
            email: format!("test{suffix}-{nonce}@example.com"),
            password: PASSWORD.to_string(),
        }
    }

    pub fn register_request(&self) -> RegisterRequest {
        RegisterRequest {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    pub fn login_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    /// Same account, different password
    pub fn with_password(&self, password: &str) -> Self {
        Self {
            email: self.email.clone(),
            password: password.to_string(),
        }
    }
}
