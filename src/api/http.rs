use super::decode::{decode_control_reply, decode_status};
use super::ControlPlane;
use crate::error::ClientError;
use crate::model::{ClientConfig, ControlReply, JobSnapshot};
use async_trait::async_trait;
use serde_json::Value;

/// reqwest-backed control-plane client.
///
/// The server keys a job to its cookie session, so one client (and its cookie
/// jar) must be reused for start, stop and every poll.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    http: reqwest::Client,
    base_url: String,
}

impl HttpControlPlane {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::transport("build http client", e))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Read a JSON body regardless of HTTP status; the server reports
    /// rejections as 4xx/5xx with a JSON payload.
    async fn read_json(
        context: &'static str,
        resp: reqwest::Response,
    ) -> Result<Value, ClientError> {
        let code = resp.status();
        match resp.json::<Value>().await {
            Ok(v) => Ok(v),
            Err(e) if code.is_success() => Err(ClientError::transport(context, e)),
            Err(_) => Err(ClientError::transport(
                context,
                format!("server answered {code}"),
            )),
        }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn start(&self, form: Vec<(String, String)>) -> Result<ControlReply, ClientError> {
        let resp = self
            .http
            .post(self.url("start_voting"))
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::transport("start_voting", e))?;
        let body = Self::read_json("start_voting", resp).await?;
        decode_control_reply(&body)
    }

    async fn stop(&self) -> Result<ControlReply, ClientError> {
        let resp = self
            .http
            .post(self.url("stop_voting"))
            .send()
            .await
            .map_err(|e| ClientError::transport("stop_voting", e))?;
        let body = Self::read_json("stop_voting", resp).await?;
        decode_control_reply(&body)
    }

    async fn status(&self) -> Result<JobSnapshot, ClientError> {
        let resp = self
            .http
            .get(self.url("check_status"))
            .send()
            .await
            .map_err(|e| ClientError::transport("check_status", e))?;
        let body = Self::read_json("check_status", resp).await?;
        decode_status(&body)
    }
}
