//! HTTP links API backed by reqwest.

use super::{BoardApi, BoxFuture, GeometryWrite};
use crate::config::BoardConfig;
use crate::error::{ApiError, ApiResult};
use crate::identity::Identity;
use crate::link::{LinkPatch, LinkRecord};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Links API client speaking JSON over HTTP with bearer authentication.
pub struct HttpBoardApi {
    client: Client,
    base_url: Url,
    identity: Arc<dyn Identity>,
}

#[derive(Serialize)]
struct CreateLinkBody<'a> {
    url: &'a str,
}

impl HttpBoardApi {
    /// Build a client using the configured base URL and request timeout.
    pub fn new(config: &BoardConfig, identity: Arc<dyn Identity>) -> ApiResult<Self> {
        let base_url = Url::parse(config.base_url())
            .map_err(|e| ApiError::Transport(format!("Invalid API URL {}: {}", config.base_url(), e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Transport(format!(
                "Invalid API URL {}: not a base URL",
                config.base_url()
            )));
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            identity,
        })
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked to be a base URL in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn links_url(&self, board_id: &str) -> Url {
        self.url(&["boards", board_id, "links"])
    }

    fn link_url(&self, link_id: &str) -> Url {
        self.url(&["links", link_id])
    }

    fn geometry_url(&self, link_id: &str, write: &GeometryWrite) -> Url {
        self.url(&["links", link_id, write.endpoint()])
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("Accept", "application/json");
        match self.identity.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn send(builder: RequestBuilder) -> ApiResult<Response> {
    let resp = builder
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().to_string();
    let message = resp.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(url));
    }
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> ApiResult<T> {
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

impl BoardApi for HttpBoardApi {
    fn list_links(&self, board_id: &str) -> BoxFuture<'_, ApiResult<Vec<LinkRecord>>> {
        let request = self.authorized(self.client.get(self.links_url(board_id)));
        Box::pin(async move { decode(send(request).await?).await })
    }

    fn create_link(&self, board_id: &str, url: &str) -> BoxFuture<'_, ApiResult<LinkRecord>> {
        let request = self.authorized(
            self.client
                .post(self.links_url(board_id))
                .json(&CreateLinkBody { url }),
        );
        let fallback = LinkRecord::unconfirmed(board_id, url);
        Box::pin(async move {
            let resp = send(request).await?;
            let status = resp.status();
            let body = resp
                .bytes()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            match serde_json::from_slice::<LinkRecord>(&body) {
                Ok(record) => Ok(record),
                // Created, but the body is unusable: report success without an id.
                Err(_) if status == StatusCode::CREATED => {
                    log::debug!("Link created but response body was unreadable");
                    Ok(fallback)
                }
                Err(e) => Err(ApiError::Decode(e.to_string())),
            }
        })
    }

    fn delete_link(&self, link_id: &str) -> BoxFuture<'_, ApiResult<()>> {
        let request = self.authorized(self.client.delete(self.link_url(link_id)));
        Box::pin(async move {
            send(request).await?;
            Ok(())
        })
    }

    fn write_geometry(
        &self,
        link_id: &str,
        write: GeometryWrite,
    ) -> BoxFuture<'_, ApiResult<LinkRecord>> {
        let request = self.authorized(
            self.client
                .patch(self.geometry_url(link_id, &write))
                .query(&write.query()),
        );
        Box::pin(async move { decode(send(request).await?).await })
    }

    fn update_link(&self, link_id: &str, patch: &LinkPatch) -> BoxFuture<'_, ApiResult<LinkRecord>> {
        let request = self.authorized(
            self.client
                .patch(self.link_url(link_id))
                .json(patch),
        );
        Box::pin(async move { decode(send(request).await?).await })
    }
}
