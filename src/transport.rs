//! Simulator transport: the five HTTP calls the viewer makes.
//!
//! [`SimulatorTransport`] is the seam the sync loop talks to.  The
//! production implementation, [`HttpTransport`], runs blocking `ureq`
//! requests on Tokio's blocking pool so the frame loop is never stalled.

use crate::error::{Result, SyncError};
use crate::protocol::{endpoints, CarPositions, InitParams, StopLights};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[async_trait]
pub trait SimulatorTransport: Send + Sync + 'static {
    /// `POST /init`: one-time spawn-rate handshake.
    async fn init(&self, params: InitParams) -> Result<()>;

    /// `GET /update`: advance the simulation one step.
    async fn step(&self) -> Result<()>;

    /// `GET /carPositions`
    async fn car_positions(&self) -> Result<CarPositions>;

    /// `GET /finishedCars`
    async fn finished_cars(&self) -> Result<CarPositions>;

    /// `GET /stopLightStatus`
    async fn stop_lights(&self) -> Result<StopLights>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// GET `endpoint` and return the body.
    async fn get_text(&self, endpoint: &'static str) -> Result<String> {
        let agent = self.agent.clone();
        let url = self.url(endpoint);
        run_blocking(endpoint, move || {
            let response = agent.get(&url).call().map_err(|e| classify(endpoint, e))?;
            response
                .into_string()
                .map_err(|e| SyncError::transport(endpoint, e))
        })
        .await
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, endpoint: &'static str) -> Result<T> {
        let body = self.get_text(endpoint).await?;
        serde_json::from_str(&body).map_err(|source| SyncError::Malformed {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SimulatorTransport for HttpTransport {
    async fn init(&self, params: InitParams) -> Result<()> {
        let agent = self.agent.clone();
        let url = self.url(endpoints::INIT);
        run_blocking(endpoints::INIT, move || {
            let fields = params.form_fields();
            let form: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
            agent
                .post(&url)
                .send_form(&form)
                .map(|_| ())
                .map_err(|e| classify(endpoints::INIT, e))
        })
        .await
    }

    async fn step(&self) -> Result<()> {
        self.get_text(endpoints::UPDATE).await.map(|_| ())
    }

    async fn car_positions(&self) -> Result<CarPositions> {
        self.get_json(endpoints::CAR_POSITIONS).await
    }

    async fn finished_cars(&self) -> Result<CarPositions> {
        self.get_json(endpoints::FINISHED_CARS).await
    }

    async fn stop_lights(&self) -> Result<StopLights> {
        self.get_json(endpoints::STOP_LIGHT_STATUS).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn run_blocking<T, F>(endpoint: &'static str, request: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(request)
        .await
        .map_err(|e| SyncError::Join {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?
}

fn classify(endpoint: &str, error: ureq::Error) -> SyncError {
    match error {
        ureq::Error::Status(status, _) => SyncError::Status {
            endpoint: endpoint.to_string(),
            status,
        },
        ureq::Error::Transport(t) => SyncError::transport(endpoint, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let t = HttpTransport::new("http://localhost:8585/");
        assert_eq!(t.base_url(), "http://localhost:8585");
        assert_eq!(t.url(endpoints::CAR_POSITIONS), "http://localhost:8585/carPositions");
    }
}
