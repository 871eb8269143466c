use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    AttendanceSubmission, BroadcastAck, CheckInAck, ClockOutAck, RemoteAttendance, RemoteError,
};
use crate::model::check_in_record::CapturedImage;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileImageResp {
    image: String,
}

/// Remote attendance API over HTTP with an optional service bearer token.
#[derive(Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(client: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
        let status = resp.status();
        if !status.is_success() {
            // the API usually explains itself in {"message": ...}
            let detail = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(RemoteError(format!("{status}: {detail}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| RemoteError(format!("unreadable response: {e}")))
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let req = self.authorize(self.client.post(self.url(path)).json(body));
        let resp = req.send().await.map_err(|e| RemoteError(e.to_string()))?;
        Self::read(resp).await
    }
}

fn rejected(message: Option<String>) -> RemoteError {
    RemoteError(message.unwrap_or_else(|| "request rejected".to_string()))
}

#[async_trait]
impl RemoteAttendance for HttpRemote {
    async fn submit_check_in(&self, body: &AttendanceSubmission) -> Result<CheckInAck, RemoteError> {
        let ack: CheckInAck = self.post("/attendance/check-in", body).await?;
        if !ack.success {
            return Err(rejected(ack.message));
        }
        Ok(ack)
    }

    async fn submit_clock_out(
        &self,
        body: &AttendanceSubmission,
    ) -> Result<ClockOutAck, RemoteError> {
        let ack: ClockOutAck = self.post("/attendance/clock-out", body).await?;
        if !ack.success {
            return Err(rejected(ack.message));
        }
        Ok(ack)
    }

    async fn profile_image(&self, staff_id: u64) -> Result<CapturedImage, RemoteError> {
        let req = self.authorize(
            self.client
                .get(self.url(&format!("/staff/{staff_id}/profile-image"))),
        );
        let resp = req.send().await.map_err(|e| RemoteError(e.to_string()))?;
        let body: ProfileImageResp = Self::read(resp).await?;

        CapturedImage::from_data_url(&body.image)
            .ok_or_else(|| RemoteError(format!("profile image for staff {staff_id} is not a data url")))
    }

    async fn broadcast(&self, event_id: u64, message: &str) -> Result<BroadcastAck, RemoteError> {
        let ack: BroadcastAck = self
            .post(
                &format!("/events/{event_id}/broadcast"),
                &json!({ "messageContent": message }),
            )
            .await?;
        if !ack.success {
            return Err(rejected(Some(ack.message)));
        }
        Ok(ack)
    }
}
