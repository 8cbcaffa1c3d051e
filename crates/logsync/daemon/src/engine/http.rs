//! HTTP engine adapter

use super::PipelineEngine;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use logsync_types::PipelineExecution;
use reqwest::Url;
use std::time::Duration;

/// Engine reached over HTTP
///
/// `GET {base}/healthz` answers the pre-check and
/// `GET {base}/executions/{ns}/{name}/stages/{stage}/steps/{step}/log`
/// returns the step log as plain text. Path segments are percent-encoded.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpEngine {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> EngineResult<Self> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| EngineError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::InvalidUrl {
                url: raw,
                reason: "cannot be a base".to_string(),
            });
        }

        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Append `segments` to the base path, encoding each one
    fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn health_url(&self) -> Url {
        self.endpoint(["healthz"])
    }

    fn log_url(&self, execution: &PipelineExecution, stage: usize, step: usize) -> Url {
        self.endpoint([
            "executions".to_string(),
            execution.namespace.clone(),
            execution.name.clone(),
            "stages".to_string(),
            stage.to_string(),
            "steps".to_string(),
            step.to_string(),
            "log".to_string(),
        ])
    }
}

#[async_trait]
impl PipelineEngine for HttpEngine {
    async fn pre_check(&self) -> EngineResult<()> {
        let response = self
            .client
            .get(self.health_url())
            .send()
            .await
            .map_err(|e| EngineError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Unreachable(format!(
                "health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn get_step_log(
        &self,
        execution: &PipelineExecution,
        stage: usize,
        step: usize,
    ) -> EngineResult<String> {
        let url = self.log_url(execution, stage, step);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::LogUnavailable(format!("{} returned {}", url, status)));
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let engine = HttpEngine::new("http://engine:8080/", Duration::from_secs(1)).unwrap();
        let execution = PipelineExecution::new("p-ns", "exec-1", "cp-1");
        assert_eq!(engine.health_url().as_str(), "http://engine:8080/healthz");
        assert_eq!(
            engine.log_url(&execution, 1, 2).as_str(),
            "http://engine:8080/executions/p-ns/exec-1/stages/1/steps/2/log"
        );
    }

    #[test]
    fn test_urls_keep_base_path() {
        let engine = HttpEngine::new("http://engine:8080/api", Duration::from_secs(1)).unwrap();
        assert_eq!(engine.health_url().as_str(), "http://engine:8080/api/healthz");
    }

    #[test]
    fn test_log_url_encodes_names() {
        let engine = HttpEngine::new("http://engine:8080", Duration::from_secs(1)).unwrap();
        let execution = PipelineExecution::new("p ns", "exec 1/x?y", "cp-1");
        assert_eq!(
            engine.log_url(&execution, 0, 0).as_str(),
            "http://engine:8080/executions/p%20ns/exec%201%2Fx%3Fy/stages/0/steps/0/log"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpEngine::new("not a url", Duration::from_secs(1)),
            Err(EngineError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpEngine::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(EngineError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_pre_check_unreachable() {
        // Port 1 on loopback refuses connections.
        let engine = HttpEngine::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            engine.pre_check().await,
            Err(EngineError::Unreachable(_))
        ));
    }
}
