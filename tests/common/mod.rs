//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_service;

use async_trait::async_trait;
use sqlcheck::config::ServiceConfig;
use sqlcheck::model::{RequestId, ValidationReport, ValidationRequest, ValidationResult};
use sqlcheck::service::ValidationService;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Mutex;
use tokio::sync::{oneshot, watch};

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Service config pointing at `base_url` with short timeouts.
pub fn service_config(base_url: &str, timeout_seconds: u32) -> ServiceConfig {
    ServiceConfig {
        base_url: base_url.to_string(),
        timeout_seconds,
        connect_timeout_seconds: 1,
    }
}

pub fn valid_report() -> ValidationResult {
    ValidationResult::Success(ValidationReport {
        valid: true,
        issues: Vec::new(),
        fixed_text: None,
    })
}

/// In-process service whose answers are released by the test.
///
/// In gated mode every call parks until [`ScriptedService::release`] is
/// called with its request id. Aborted calls drop their receiver, so
/// `release` returns false for them.
pub struct ScriptedService {
    gated: bool,
    requests: Mutex<Vec<ValidationRequest>>,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<ValidationResult>>>,
    count: watch::Sender<usize>,
}

impl ScriptedService {
    /// Every call waits for an explicit release.
    pub fn gated() -> Self {
        Self::build(true)
    }

    /// Every call answers "valid" immediately.
    pub fn immediate() -> Self {
        Self::build(false)
    }

    fn build(gated: bool) -> Self {
        let (count, _) = watch::channel(0);
        Self {
            gated,
            requests: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            count,
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<ValidationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until at least `n` requests reached the service.
    pub async fn wait_for_requests(&self, n: usize) {
        let mut rx = self.count.subscribe();
        rx.wait_for(|count| *count >= n)
            .await
            .expect("service dropped");
    }

    /// Resolve once the call for `id` has been dropped by its caller.
    ///
    /// Returns false if no such call is parked.
    pub async fn aborted(&self, id: RequestId) -> bool {
        let tx = self.pending.lock().unwrap().remove(&id);
        match tx {
            Some(mut tx) => {
                tx.closed().await;
                true
            }
            None => false,
        }
    }

    /// Answer request `id`. Returns false if the call was already aborted.
    pub fn release(&self, id: RequestId, result: ValidationResult) -> bool {
        match self.pending.lock().unwrap().remove(&id) {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl ValidationService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn validate(&self, request: &ValidationRequest) -> ValidationResult {
        let rx = if self.gated {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().insert(request.request_id, tx);
            Some(rx)
        } else {
            None
        };

        self.requests.lock().unwrap().push(request.clone());
        self.count.send_modify(|count| *count += 1);

        match rx {
            Some(rx) => rx.await.unwrap_or_else(|_| ValidationResult::cancelled()),
            None => valid_report(),
        }
    }
}
