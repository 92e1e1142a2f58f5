use serde_json::Value;
use std::time::Duration;

use super::payload::{InitRequest, RunRequest, RunResult};
use crate::config::DEFAULT_HTTP_TIMEOUT;
use crate::errors::HarnessError;

/// HTTP client for the control endpoints of one action container.
///
/// Every call returns the status and body the container produced, whatever
/// the status. Only failures to reach the container at all are errors.
#[derive(Debug, Clone)]
pub struct ActionClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ActionClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}", host, port),
            client: reqwest::Client::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn init(&self, request: &InitRequest) -> Result<RunResult, HarnessError> {
        self.init_raw(&request.to_payload()).await
    }

    /// Posts an arbitrary body to `/init`, for payloads the typed request
    /// cannot express (such as an empty object).
    pub async fn init_raw(&self, body: &Value) -> Result<RunResult, HarnessError> {
        self.post("/init", body).await
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunResult, HarnessError> {
        self.post("/run", &request.to_payload()).await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<RunResult, HarnessError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let transport = |source| HarnessError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let raw = response.text().await.map_err(transport)?;
        log::debug!("POST {} -> {}", url, status);

        Ok(RunResult::from_raw(status, &raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payload::DEFAULT_ENTRY_POINT;
    use crate::test_utils::mock_action_container::MockActionContainer;
    use serde_json::json;

    #[tokio::test]
    async fn test_init_and_run_against_compliant_container() {
        let container = MockActionContainer::start().await;
        let client = ActionClient::new("127.0.0.1", container.port());

        let init = client
            .init(&InitRequest::new("echo").with_main(DEFAULT_ENTRY_POINT))
            .await
            .unwrap();
        assert!(init.is_ok());

        let run = client
            .run(&RunRequest::new(json!({"string": "hello"})))
            .await
            .unwrap();
        assert_eq!(run.status, 200);
        assert_eq!(run.body, Some(json!({"string": "hello"})));

        container.shutdown().await;
    }

    #[tokio::test]
    async fn test_non_2xx_is_returned_as_data() {
        let container = MockActionContainer::start().await;
        let client = ActionClient::new("127.0.0.1", container.port());

        let result = client.init_raw(&json!({})).await.unwrap();
        assert_ne!(result.status, 200);
        assert_eq!(
            result.body,
            Some(json!({"error": "Missing main/no code to execute."}))
        );

        container.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_container_is_transport_error() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = ActionClient::new("127.0.0.1", port).with_timeout(Duration::from_secs(2));
        let result = client.run(&RunRequest::new(json!({}))).await;

        match result {
            Err(HarnessError::Transport { url, .. }) => {
                assert_eq!(url, format!("http://127.0.0.1:{}/run", port))
            }
            other => panic!("Expected transport error, got {:?}", other),
        }
    }
}
