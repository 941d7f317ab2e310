//! mreg-store-http
//!
//! [`ArtifactStore`] over a REST registry service.
//!
//! | operation         | request                                                          |
//! |-------------------|------------------------------------------------------------------|
//! | `list_collection` | `GET  /api/v1/{entity}/{project}/collections/{collection}/artifacts` |
//! | `fetch`           | `GET  /api/v1/{entity}/{project}/artifacts/{name}:{version}`     |
//! | `link`            | `POST /api/v1/links`                                             |
//! | `save`            | `PUT  /api/v1/{entity}/{project}/artifacts/{collection}:v{N}`    |
//!
//! Every request carries `Authorization: Bearer <api key>`. The key is passed
//! in by the caller (resolved by `mreg-config`); do not log it.

use std::time::Duration;

use mreg_artifacts::{Artifact, ArtifactRef, ArtifactStore, RegistryPath, StoreError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of `POST /api/v1/links`.
#[derive(Debug, Serialize)]
struct LinkRequest<'a> {
    artifact_id: Uuid,
    source: String,
    target: String,
    aliases: &'a [String],
}

pub struct HttpStore {
    base_url: Url,
    entity: String,
    project: String,
    api_key: String,
    http: Client,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url.as_str())
            .field("entity", &self.entity)
            .field("project", &self.project)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl HttpStore {
    pub fn new(
        base_url: &str,
        entity: impl Into<String>,
        project: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Transport(format!("invalid registry url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Transport(format!(
                "invalid registry url '{base_url}': cannot be a base"
            )));
        }
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            base_url,
            entity: entity.into(),
            project: project.into(),
            api_key: api_key.into(),
            http,
        })
    }

    /// `{base}/api/v1/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Transport("registry url cannot be a base".to_string()))?;
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        Ok(url)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        req.bearer_auth(&self.api_key)
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
        resp.json::<T>()
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// Map a non-success response to a store error.
fn check(resp: Response, what: &str) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(what.to_string()));
    }
    let message = resp.text().unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message: message.trim().to_string(),
    })
}

impl ArtifactStore for HttpStore {
    fn name(&self) -> &'static str {
        "http"
    }

    fn list_collection(&self, collection: &str) -> Result<Vec<Artifact>, StoreError> {
        let url = self.url(&[
            self.entity.as_str(),
            self.project.as_str(),
            "collections",
            collection,
            "artifacts",
        ])?;
        debug!(url = %url, "listing collection");
        let resp = self.send(self.http.get(url))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let mut artifacts: Vec<Artifact> = Self::decode(check(resp, collection)?)?;
        // The service is expected to answer in creation order; enforce it.
        artifacts.sort_by_key(|a| a.version);
        Ok(artifacts)
    }

    fn fetch(&self, reference: &ArtifactRef) -> Result<Artifact, StoreError> {
        let tail = format!("{}:{}", reference.name, reference.version);
        let url = self.url(&[
            reference.entity.as_str(),
            reference.project.as_str(),
            "artifacts",
            tail.as_str(),
        ])?;
        debug!(url = %url, "fetching artifact");
        let resp = self.send(self.http.get(url))?;
        Self::decode(check(resp, &reference.to_string())?)
    }

    fn link(
        &self,
        artifact: &Artifact,
        target: &RegistryPath,
        aliases: &[String],
    ) -> Result<(), StoreError> {
        let url = self.url(&["links"])?;
        let body = LinkRequest {
            artifact_id: artifact.id,
            source: artifact.qualified_name(),
            target: target.to_string(),
            aliases,
        };
        let resp = self.send(self.http.post(url).json(&body))?;
        check(resp, &artifact.qualified_name())?;
        Ok(())
    }

    fn save(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let name = artifact.name();
        let url = self.url(&[
            artifact.entity.as_str(),
            artifact.project.as_str(),
            "artifacts",
            name.as_str(),
        ])?;
        let resp = self.send(self.http.put(url).json(artifact))?;
        check(resp, &artifact.qualified_name())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_segments_are_encoded() {
        let store = HttpStore::new("http://localhost:8080/base/", "acme", "mnist", "k").unwrap();
        let url = store.url(&["acme", "mnist", "artifacts", "my model:v1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/base/api/v1/acme/mnist/artifacts/my%20model:v1"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpStore::new("not a url", "e", "p", "k"),
            Err(StoreError::Transport(_))
        ));
    }

    #[test]
    fn debug_redacts_key() {
        let store = HttpStore::new("http://localhost:1", "e", "p", "secret-key").unwrap();
        let dbg = format!("{store:?}");
        assert!(!dbg.contains("secret-key"));
    }
}
