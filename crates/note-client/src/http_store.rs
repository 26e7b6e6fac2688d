//! `RemoteStore` over the notes REST API.
//!
//! - `POST {base}` with `{"note": text}` creates
//! - `PUT {base}/{id}` with `{"content": text}` updates
//! - `GET {base}/{id}` fetches
//! - `GET {base}/{id}/metadata` fetches metadata only

use async_trait::async_trait;
use note_sync::store::Result;
use note_sync::{Note, NoteId, NoteMetadata, RemoteStore, StoreError};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct CreateRequest<'a> {
    note: &'a str,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpStore {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, auth_token))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            auth_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn note_url(&self, id: &NoteId) -> String {
        format!("{}/{}", self.base_url, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header(AUTHORIZATION, token),
            None => request,
        }
    }

    /// Send the request and decode a 2xx body. `id` is what a 404 refers to.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        id: Option<&NoteId>,
    ) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let response = check_status(response, id).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

async fn check_status(response: Response, id: Option<&NoteId>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(StoreError::NotFound(id.clone()));
        }
    }

    // Best effort; the status alone is enough to act on.
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Server {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn create(&self, content: &str) -> Result<Note> {
        debug!("POST {} ({} bytes)", self.base_url, content.len());
        let request = self
            .client
            .post(&self.base_url)
            .json(&CreateRequest { note: content });
        self.send(request, None).await
    }

    async fn update(&self, id: &NoteId, content: &str) -> Result<Note> {
        debug!("PUT {} ({} bytes)", self.note_url(id), content.len());
        let request = self
            .client
            .put(self.note_url(id))
            .json(&UpdateRequest { content });
        self.send(request, Some(id)).await
    }

    async fn fetch(&self, id: &NoteId) -> Result<Note> {
        debug!("GET {}", self.note_url(id));
        let request = self.client.get(self.note_url(id));
        self.send(request, Some(id)).await
    }

    async fn fetch_metadata(&self, id: &NoteId) -> Result<NoteMetadata> {
        let url = format!("{}/metadata", self.note_url(id));
        debug!("GET {}", url);
        let request = self.client.get(url);
        self.send(request, Some(id)).await
    }
}
