//! Service session lifecycle
//!
//! Establishes a reachable handle to the serving endpoint, starting the
//! server process when one is configured and the endpoint does not answer.
//! The spawned process is released on every exit path: [`ServiceSession::shutdown`]
//! kills it explicitly, and `kill_on_drop` covers panics and cancellation.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::client::HttpModelService;
use crate::error::{ApiError, Result};

/// Interval between readiness probes while waiting for a started server
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Command used to start the serving process when the endpoint is down
#[derive(Debug, Clone)]
pub struct ServerCommand {
    /// Program to execute
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl ServerCommand {
    /// Create a server command
    #[must_use]
    pub fn new<S: Into<String>>(program: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Session establishment configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Endpoint base URL
    pub endpoint: String,
    /// Optional command to start the server if the endpoint is unreachable
    pub server: Option<ServerCommand>,
    /// How long to wait for a started server to become ready
    pub ready_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            server: None,
            ready_timeout: Duration::from_secs(30),
        }
    }
}

/// A live session against the serving endpoint
///
/// Owns the server process when this session started one.
#[derive(Debug)]
pub struct ServiceSession {
    client: HttpModelService,
    server: Option<Child>,
}

impl ServiceSession {
    /// Establish a session, starting the server if configured and needed
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unreachable`] when the endpoint does not answer
    /// and no server command is configured (or the started server never
    /// became ready), and [`ApiError::Spawn`] when the server process cannot
    /// be started.
    pub async fn establish(config: SessionConfig) -> Result<Self> {
        let client = HttpModelService::new(&config.endpoint)?;
        if client.reachable().await {
            debug!(endpoint = %config.endpoint, "service already reachable");
            return Ok(Self {
                client,
                server: None,
            });
        }

        let Some(command) = config.server else {
            return Err(ApiError::Unreachable {
                endpoint: config.endpoint,
                waited_ms: 0,
            });
        };

        info!(program = %command.program, "service not reachable, starting server");
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ApiError::Spawn {
                command: command.program.clone(),
                source,
            })?;

        let started = Instant::now();
        while started.elapsed() < config.ready_timeout {
            if client.reachable().await {
                info!(
                    endpoint = %config.endpoint,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "started server is ready"
                );
                return Ok(Self {
                    client,
                    server: Some(child),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        // child dropped here; kill_on_drop reaps the failed start
        Err(ApiError::Unreachable {
            endpoint: config.endpoint,
            waited_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// The client bound to this session's endpoint
    #[must_use]
    pub fn client(&self) -> &HttpModelService {
        &self.client
    }

    /// Whether this session started the server process itself
    #[must_use]
    pub fn owns_server(&self) -> bool {
        self.server.is_some()
    }

    /// Release the session, killing the server process if this session
    /// started it
    pub async fn shutdown(mut self) {
        if let Some(mut child) = self.server.take() {
            debug!("stopping server started by this session");
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
    }
}
