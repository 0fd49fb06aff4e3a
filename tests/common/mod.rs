//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use devloop::runtime::{CreateOptions, Runtime, Service};
use devloop::{Error, Result};
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(Service, CreateOptions),
    Update(Service),
    Delete(Service),
}

impl Call {
    pub fn service(&self) -> &Service {
        match self {
            Call::Create(s, _) | Call::Update(s) | Call::Delete(s) => s,
        }
    }
}

/// Runtime that records every call instead of running anything.
pub struct RecordingRuntime {
    kind: String,
    calls: Mutex<Vec<Call>>,
    fail_create: bool,
    fail_update: bool,
    delete_delay: Duration,
}

impl RecordingRuntime {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            calls: Mutex::new(Vec::new()),
            fail_create: false,
            fail_update: false,
            delete_delay: Duration::ZERO,
        }
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn slow_delete(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, Call::Create(..)))
    }

    pub fn updates(&self) -> usize {
        self.count(|c| matches!(c, Call::Update(_)))
    }

    pub fn deletes(&self) -> usize {
        self.count(|c| matches!(c, Call::Delete(_)))
    }

    /// Poll until `pred` holds or `timeout` elapses.
    pub async fn wait_for(&self, timeout: Duration, pred: impl Fn(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if pred(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        pred(self)
    }
}

#[async_trait]
impl Runtime for RecordingRuntime {
    async fn create(&self, service: &Service, options: CreateOptions) -> Result<()> {
        self.calls
            .lock()
            .push(Call::Create(service.clone(), options));
        if self.fail_create {
            return Err(Error::CreateFailed {
                name: service.name.clone(),
                attempts: options.attempts(),
                reason: "exited with status 1".to_string(),
            });
        }
        Ok(())
    }

    async fn update(&self, service: &Service) -> Result<()> {
        self.calls.lock().push(Call::Update(service.clone()));
        if self.fail_update {
            return Err(Error::Runtime("build failed".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, service: &Service) -> Result<()> {
        tokio::time::sleep(self.delete_delay).await;
        self.calls.lock().push(Call::Delete(service.clone()));
        Ok(())
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}
