// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Test fixtures for driving a bound server over HTTP

#![allow(dead_code)]

use std::{
    collections::HashMap,
    fmt,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use api::{LifecycleState, Server, ServerConfig, ServerResult, ShutdownConfig};
use axum::routing::{MethodRouter, any};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{
    Subscriber,
    field::{Field, Visit},
    span::{Attributes, Id, Record},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
};

/// A server serving on an ephemeral port in a background task
pub struct TestServer {
    pub addr: SocketAddr,
    pub token: CancellationToken,
    pub lifecycle: watch::Receiver<LifecycleState>,
    pub handle: JoinHandle<ServerResult<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until the lifecycle reaches at least `state`
    pub async fn reached(&mut self, state: LifecycleState) {
        tokio::time::timeout(
            Duration::from_secs(5),
            self.lifecycle.wait_for(|current| *current >= state),
        )
        .await
        .expect("lifecycle transition in time")
        .expect("lifecycle sender alive");
    }
}

/// Bind `server` on its configured address and serve it in the background
pub async fn start(server: Server) -> TestServer {
    let listener = server.bind().await.expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read bound address");
    let token = server.cancellation_token();
    let lifecycle = server.lifecycle();
    let handle = tokio::spawn(server.serve(listener));

    TestServer {
        addr,
        token,
        lifecycle,
        handle,
    }
}

/// Server with the real todo schema
pub fn todo_server() -> Server {
    Server::new(ServerConfig::for_testing(), ShutdownConfig::default())
        .expect("Failed to create server")
}

/// Server with an injected query executor and grace period
pub fn server_with(grace_period: Duration, query_service: MethodRouter) -> Server {
    let shutdown_config = ShutdownConfig {
        graceful_timeout: grace_period,
    };
    Server::with_query_service(ServerConfig::for_testing(), shutdown_config, query_service)
        .expect("Failed to create server")
}

/// Query executor that reports when it starts and then sleeps for `delay`
pub fn slow_query_service(delay: Duration, started: mpsc::UnboundedSender<()>) -> MethodRouter {
    any(move || {
        let started = started.clone();
        async move {
            let _ = started.send(());
            tokio::time::sleep(delay).await;
            "done"
        }
    })
}

/// Query executor counting how often it is reached
pub fn counting_query_service(hits: Arc<AtomicUsize>) -> MethodRouter {
    any(move || {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            "ok"
        }
    })
}

/// Fields recorded on one span
pub type SpanFields = HashMap<&'static str, String>;

/// Layer collecting the fields of every span with a given name
#[derive(Clone)]
pub struct SpanCapture {
    name: &'static str,
    spans: Arc<Mutex<Vec<(Id, SpanFields)>>>,
}

impl SpanCapture {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            spans: Arc::default(),
        }
    }

    /// Install the capture as the default subscriber for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// Fields of all captured spans, in creation order
    pub fn spans(&self) -> Vec<SpanFields> {
        let spans = self.spans.lock().expect("span capture lock");
        spans.iter().map(|(_, fields)| fields.clone()).collect()
    }
}

struct FieldVisitor<'a>(&'a mut SpanFields);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for SpanCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().name() != self.name {
            return;
        }
        let mut fields = SpanFields::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        self.spans
            .lock()
            .expect("span capture lock")
            .push((id.clone(), fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut spans = self.spans.lock().expect("span capture lock");
        if let Some((_, fields)) = spans.iter_mut().rev().find(|(span, _)| span == id) {
            values.record(&mut FieldVisitor(fields));
        }
    }
}
