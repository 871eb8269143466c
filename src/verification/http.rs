use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Verifier;
use crate::error::AttendanceError;
use crate::model::check_in_record::CapturedImage;

#[derive(Serialize)]
struct LivenessReq {
    image: String,
}

#[derive(Deserialize)]
struct LivenessResp {
    live: bool,
}

#[derive(Serialize)]
struct MatchReq {
    image: String,
    reference: String,
}

#[derive(Deserialize)]
struct MatchResp {
    #[serde(rename = "match")]
    matched: bool,
}

/// Verifier reached over HTTP at `{base_url}/liveness` and `{base_url}/match`.
#[derive(Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpVerifier {
    pub fn new(client: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, AttendanceError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut req = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, url = %url, "verifier unreachable");
            AttendanceError::VerificationUnavailable(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, url = %url, "verifier returned error status");
            return Err(AttendanceError::VerificationUnavailable(format!(
                "verifier responded with {status}"
            )));
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| AttendanceError::VerificationUnavailable(format!("bad verifier reply: {e}")))
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify_liveness(&self, image: &CapturedImage) -> Result<bool, AttendanceError> {
        let body = LivenessReq {
            image: image.to_data_url(),
        };
        let resp: LivenessResp = self.post("liveness", &body).await?;
        Ok(resp.live)
    }

    async fn verify_match(
        &self,
        image: &CapturedImage,
        reference: &CapturedImage,
    ) -> Result<bool, AttendanceError> {
        let body = MatchReq {
            image: image.to_data_url(),
            reference: reference.to_data_url(),
        };
        let resp: MatchResp = self.post("match", &body).await?;
        Ok(resp.matched)
    }
}
