//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use endpoint_failover::events::{EventBus, EventKind, TrackerEvent};
use endpoint_failover::health::{CheckResult, CheckStats, EndpointProbe, ProbeError};

/// Start a programmable HTTP backend. `f` decides the status and body of
/// every response.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Behavior of one endpoint behind a [`ScriptedProbe`].
#[derive(Debug, Clone, Copy)]
pub struct Script {
    pub latency: Duration,
    pub healthy: bool,
    pub block_number: Option<u64>,
    /// Time the probe actually spends before answering.
    pub delay: Duration,
}

impl Script {
    pub fn up(latency_ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
            healthy: true,
            block_number: None,
            delay: Duration::ZERO,
        }
    }

    pub fn down() -> Self {
        Self {
            latency: Duration::from_millis(1),
            healthy: false,
            block_number: None,
            delay: Duration::ZERO,
        }
    }

    pub fn at_block(mut self, block: u64) -> Self {
        self.block_number = Some(block);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Probe whose answers are set per endpoint by the test.
///
/// Endpoints without a script are reported healthy at 1ms.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, u32>>,
    total: AtomicU32,
}

impl ScriptedProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, endpoint: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), script);
    }

    pub fn calls(&self, endpoint: &str) -> u32 {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointProbe for ScriptedProbe {
    async fn check(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default() += 1;

        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or_else(|| Script::up(1));

        if !script.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                _ = tokio::time::sleep(script.delay) => {}
            }
        }

        if script.healthy {
            Ok(CheckResult::success(
                script.latency,
                CheckStats {
                    block_number: script.block_number,
                    ticker_count: None,
                },
            ))
        } else {
            Ok(CheckResult::failure(script.latency, "scripted failure"))
        }
    }
}

/// Collects every event published for one tracker key.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<TrackerEvent>>>,
}

impl EventLog {
    pub fn attach(bus: &EventBus, key: &str) -> Self {
        let log = Self::default();
        for kind in [EventKind::EndpointBanned, EventKind::EndpointsUpdated] {
            let events = log.events.clone();
            bus.subscribe(key, kind, move |event| {
                events.lock().unwrap().push(event.clone());
            });
        }
        log
    }

    pub fn all(&self) -> Vec<TrackerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Let spawned tasks run without advancing paused time.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
