//! HTTP client for the jukebox command API

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;

use super::api::{Command, PlayerApi, SongUpload};
use super::types::Song;
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
struct ValidateTokenResponse {
    valid: bool,
}

/// `PlayerApi` over the server's REST routes under `{server}/api`
#[derive(Clone)]
pub struct JukeboxClient {
    http: Client,
    api_base: String,
}

impl JukeboxClient {
    pub fn new(api_base: &Url, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.api_base, route)
    }

    async fn execute(
        &self,
        route: &'static str,
        request: RequestBuilder,
    ) -> ApiResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                route,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl PlayerApi for JukeboxClient {
    async fn validate_token(&self, token: &str) -> ApiResult<bool> {
        tracing::debug!("API: validate-token");
        let request = self
            .http
            .get(self.url("/validate-token"))
            .query(&[("token", token)]);
        let response = self.execute("/validate-token", request).await?;
        let body: ValidateTokenResponse = response.json().await?;
        Ok(body.valid)
    }

    async fn get_library(&self) -> ApiResult<Vec<Song>> {
        tracing::trace!("API: library");
        let response = self.execute("/library", self.http.get(self.url("/library"))).await?;
        Ok(response.json().await?)
    }

    async fn upload_song(&self, upload: SongUpload) -> ApiResult<()> {
        tracing::debug!(file = %upload.file_name, size = upload.bytes.len(), "API: library/upload");
        let part = Part::bytes(upload.bytes).file_name(upload.file_name);
        let form = Form::new().part("audioFile", part);
        let request = self.http.post(self.url("/library/upload")).multipart(form);
        self.execute("/library/upload", request).await?;
        Ok(())
    }

    async fn send_command(&self, command: &Command) -> ApiResult<()> {
        let route = command.route();
        tracing::debug!(route, "API: command");
        let mut request = self.http.post(self.url(route));
        if let Some(body) = command.body() {
            request = request.json(&body);
        }
        self.execute(route, request).await?;
        Ok(())
    }
}
