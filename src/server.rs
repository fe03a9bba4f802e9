use crate::config::Config;
use anyhow::{Context, bail};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Readiness poll interval
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Readiness poll attempts before giving up
const READY_POLL_ATTEMPTS: u32 = 60;

/// The inference server as an owned background resource.
///
/// The child is spawned with `kill_on_drop`, so the process is terminated on
/// every exit path even if [`LlamaServer::stop`] is never reached; `stop` is
/// the explicit, awaited teardown for normal paths and is idempotent.
pub struct LlamaServer {
    child: Option<Child>,
    base_url: String,
}

impl LlamaServer {
    /// Spawn the inference server in the background
    pub fn start(config: &Config) -> anyhow::Result<Self> {
        let base_url = config.server_url();
        info!(
            "Starting inference server: {} (model: {}, port: {}, ctx: {})",
            config.server_bin, config.model_path, config.port, config.context_size
        );

        let child = Command::new(&config.server_bin)
            .arg("-m")
            .arg(&config.model_path)
            .arg("--port")
            .arg(config.port.to_string())
            .arg("--ctx-size")
            .arg(config.context_size.to_string())
            // Server chatter would pollute the report channel
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start inference server '{}'", config.server_bin))?;

        Ok(Self {
            child: Some(child),
            base_url,
        })
    }

    /// Poll the health endpoint until the server is ready.
    ///
    /// Fails after [`READY_POLL_ATTEMPTS`] one-second attempts; the caller is
    /// expected to stop the server and abort.
    pub async fn wait_ready(&self, client: &reqwest::Client) -> anyhow::Result<()> {
        wait_for_health(client, &self.base_url, READY_POLL_ATTEMPTS).await
    }

    /// Terminate and await the child. Safe to call twice or when never started.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!("Stopping inference server");
            if let Err(e) = child.kill().await {
                warn!("Failed to kill inference server: {}", e);
            }
        }
    }
}

/// Probe `base_url/health` once per second until it answers 2xx
pub async fn wait_for_health(
    client: &reqwest::Client,
    base_url: &str,
    attempts: u32,
) -> anyhow::Result<()> {
    let url = format!("{}/health", base_url);
    for attempt in 1..=attempts {
        match client.get(&url).timeout(READY_POLL_INTERVAL).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Inference server ready after {} attempt(s)", attempt);
                return Ok(());
            }
            Ok(response) => {
                debug!("Health check attempt {}: {}", attempt, response.status());
            }
            Err(e) => {
                debug!("Health check attempt {}: {}", attempt, e);
            }
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
    bail!(
        "inference server not healthy after {} attempts",
        attempts
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_wait_for_health_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        assert!(wait_for_health(&client, &server.uri(), 3).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_health_never_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        assert!(wait_for_health(&client, &server.uri(), 2).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_when_never_started() {
        let mut server = LlamaServer {
            child: None,
            base_url: "http://127.0.0.1:0".into(),
        };
        server.stop().await;
        server.stop().await;
    }
}
