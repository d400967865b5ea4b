// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct: router and middleware
//! assembly, listener lifecycle, and coordinated graceful shutdown using
//! `CancellationToken`.

use std::time::Duration;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::MethodRouter,
};
use todo_schema::{TodoStore, build_schema};
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    LatencyUnit,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, error, info};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    middleware::{
        OriginPolicy, REQUEST_ID_HEADER, origin_guard_middleware, request_context_middleware,
        request_span,
    },
    routes::{create_routes, graphql_route},
    state::{Lifecycle, LifecycleState},
};

const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 60;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight requests once shutdown starts
    pub graceful_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

impl From<&ServerConfig> for ShutdownConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            graceful_timeout: config.grace_period_seconds.value(),
        }
    }
}

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router with the middleware chain applied
    router: Router,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    shutdown_config: ShutdownConfig,
    /// Current lifecycle phase
    lifecycle: Lifecycle,
}

impl Server {
    /// Create new server instance serving the todo schema
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        let schema = build_schema(TodoStore::new());
        Self::with_query_service(config, shutdown_config, graphql_route(schema))
    }

    /// Create server with a custom query executor for dependency injection
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn with_query_service(
        config: ServerConfig,
        shutdown_config: ShutdownConfig,
        query_service: MethodRouter,
    ) -> ServerResult<Self> {
        let origin_policy = OriginPolicy::new(&config.allowed_origins)?;
        let router = Self::create_router(query_service, &origin_policy);

        Ok(Self {
            config,
            router,
            cancellation_token: CancellationToken::new(),
            shutdown_config,
            lifecycle: Lifecycle::new(),
        })
    }

    /// Create application router with middleware
    fn create_router(query_service: MethodRouter, origin_policy: &OriginPolicy) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(from_fn(request_context_middleware))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(request_span)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(LatencyUnit::Millis),
                    ),
            )
            .layer(from_fn_with_state(
                origin_policy.clone(),
                origin_guard_middleware,
            ))
            .layer(origin_policy.cors_layer());

        create_routes(query_service).layer(middleware)
    }

    /// Bind, serve until a shutdown signal, then drain within the grace period
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// `ServerError::Runtime` if the listener stops on its own, and
    /// `ServerError::ShutdownTimeout` if requests outlive the grace period.
    pub async fn run(self) -> ServerResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Bind the listener for the configured address
    ///
    /// A failure here is fatal and moves the server straight to `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let address = self.config.listen_address();
        match TcpListener::bind(address.as_str()).await {
            Ok(listener) => Ok(listener),
            Err(source) => {
                error!(address = %address, error = %source, "Listen failed");
                self.lifecycle.transition(LifecycleState::Stopped);
                Err(ServerError::Bind { address, source })
            }
        }
    }

    /// Serve connections on `listener` until shutdown completes
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Startup` if the bound address cannot be read,
    /// `ServerError::Runtime` if the listener stops without a shutdown request,
    /// and `ServerError::ShutdownTimeout` if requests outlive the grace period.
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        let Self {
            config,
            router,
            cancellation_token,
            shutdown_config,
            lifecycle,
        } = self;

        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(source) => {
                lifecycle.transition(LifecycleState::Stopped);
                return Err(ServerError::Startup { source });
            }
        };

        let shutdown_signal = match Self::register_shutdown_signals() {
            Ok(signal) => signal,
            Err(source) => {
                error!(error = %source, "Failed to register shutdown signal handlers");
                lifecycle.transition(LifecycleState::Stopped);
                return Err(ServerError::Signal { source });
            }
        };

        info!(
            "Connect to http://localhost:{}/ for GraphQL playground",
            local_addr.port()
        );
        info!(
            transport = "HTTP",
            address = %local_addr,
            port = %config.port,
            "Listen and serve",
        );

        let grace_period = shutdown_config.graceful_timeout;
        let signal_token = cancellation_token.clone();
        tokio::spawn(async move {
            Self::shutdown_signal_handler(shutdown_signal, signal_token, grace_period).await;
        });

        let drain_token = cancellation_token.clone();
        let mut serve_task: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(drain_token.cancelled_owned())
                .await
        });
        lifecycle.transition(LifecycleState::Serving);

        tokio::select! {
            biased;
            () = cancellation_token.cancelled() => {}
            joined = &mut serve_task => {
                lifecycle.transition(LifecycleState::Stopped);
                let message = match joined {
                    Ok(Ok(())) => "listener closed without a shutdown request".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                };
                error!(error = %message, "Listen failed");
                return Err(ServerError::Runtime { message });
            }
        }

        lifecycle.transition(LifecycleState::ShuttingDown);
        info!(timeout = ?grace_period, "waiting for in-flight requests to finish");

        let outcome = match tokio::time::timeout(grace_period, &mut serve_task).await {
            Ok(Ok(Ok(()))) => {
                info!("Exit");
                Ok(())
            }
            Ok(Ok(Err(source))) => {
                error!(error = %source, "Failed to gracefully shutdown");
                Err(ServerError::Shutdown { source })
            }
            Ok(Err(join_error)) => {
                error!(error = %join_error, "Failed to gracefully shutdown");
                Err(ServerError::from(join_error))
            }
            Err(_elapsed) => {
                serve_task.abort();
                error!(
                    timeout = ?grace_period,
                    "Failed to gracefully shutdown: grace period elapsed with requests in flight"
                );
                Err(ServerError::ShutdownTimeout { grace_period })
            }
        };

        lifecycle.transition(LifecycleState::Stopped);
        outcome
    }

    /// Register SIGINT and SIGTERM (Ctrl+C outside unix) handlers
    ///
    /// Registration happens before the server announces itself, so a signal
    /// sent once "Listen and serve" is logged always reaches the handler.
    /// The returned future resolves to the name of the first signal received.
    fn register_shutdown_signals()
    -> std::io::Result<impl Future<Output = &'static str> + Send + 'static> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            Ok(async move {
                tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                }
            })
        }

        #[cfg(not(unix))]
        {
            Ok(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for CTRL+C");
                    std::future::pending::<()>().await;
                }
                "CTRL+C"
            })
        }
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// Cancels the provided cancellation token once `signal_received`
    /// resolves, unless shutdown was already requested.
    async fn shutdown_signal_handler(
        signal_received: impl Future<Output = &'static str>,
        cancellation_token: CancellationToken,
        grace_period: Duration,
    ) {
        // Wait for either a signal or existing cancellation
        tokio::select! {
            signal_name = signal_received => {
                info!(
                    signal = signal_name,
                    timeout = ?grace_period,
                    "SIGNAL {} received, then shutting down...",
                    signal_name
                );
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                info!("shutdown already requested, signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    ///
    /// `run` and `serve` consume the server, so this token is the handle for
    /// stopping a server that is already serving. Cancelling it has the same
    /// effect as SIGINT or SIGTERM.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    ///
    /// Only reachable before `run` or `serve` take ownership; a server
    /// shut down this way drains immediately once it starts serving. Use
    /// [`Server::cancellation_token`] to stop a server that is already serving.
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Receiver tracking the server's lifecycle phase
    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GracePeriod;

    #[tokio::test]
    async fn server_creation() -> ServerResult<()> {
        let config = ServerConfig::for_testing();
        let server = Server::new(config, ShutdownConfig::default())?;
        assert_eq!(server.config().port, "0");
        assert_eq!(*server.lifecycle().borrow(), LifecycleState::Starting);
        assert!(!server.cancellation_token().is_cancelled());
        Ok(())
    }

    #[tokio::test]
    async fn programmatic_shutdown() -> ServerResult<()> {
        let config = ServerConfig::for_testing();
        let server = Server::new(config, ShutdownConfig::default())?;

        assert!(!server.cancellation_token().is_cancelled());

        server.shutdown();

        assert!(server.cancellation_token().is_cancelled());
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_before_serving_drains_immediately() -> ServerResult<()> {
        let config = ServerConfig::for_testing();
        let server = Server::new(config, ShutdownConfig::default())?;
        let lifecycle = server.lifecycle();

        server.shutdown();

        tokio::time::timeout(Duration::from_secs(5), server.run())
            .await
            .expect("server stopped without waiting for a signal")?;
        assert_eq!(*lifecycle.borrow(), LifecycleState::Stopped);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_origin_fails_construction() {
        let mut config = ServerConfig::for_testing();
        config.allowed_origins = vec!["*".to_string()];

        let result = Server::new(config, ShutdownConfig::default());
        assert!(matches!(result, Err(ServerError::Config { .. })));
    }

    #[test]
    fn shutdown_config_default() {
        let config = ShutdownConfig::default();
        assert_eq!(
            config.graceful_timeout,
            Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn shutdown_config_from_server_config() -> anyhow::Result<()> {
        let mut config = ServerConfig::for_testing();
        config.grace_period_seconds = GracePeriod::new(12)?;

        let shutdown = ShutdownConfig::from(&config);
        assert_eq!(shutdown.graceful_timeout, Duration::from_secs(12));
        Ok(())
    }
}
