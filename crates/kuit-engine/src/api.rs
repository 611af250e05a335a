//! REST client for the controller resources the scenarios reconcile against.

use crate::config::{ApiUrls, SuiteConfig};
use crate::poller::Poller;
use kuit_common::error::ApiError;
use kuit_common::protocol::{EvcPayload, EvcRecord, Keyed, MaintenanceWindow, TraceCollection};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Join a collection URL and a member id.
pub fn member_url(collection: &str, id: &str) -> String {
    if collection.ends_with('/') {
        format!("{}{}", collection, id)
    } else {
        format!("{}/{}", collection, id)
    }
}

/// Id of the first circuit named `name`, in server order.
pub fn find_circuit_by_name(circuits: &Keyed<EvcRecord>, name: &str) -> Option<String> {
    circuits
        .iter()
        .find(|(_, record)| record.name.as_deref() == Some(name))
        .map(|(id, record)| record.id.clone().unwrap_or_else(|| id.to_string()))
}

/// Member count of a topology listing.
///
/// Listings wrap their members under `key`, either as an object keyed by id
/// or as an array.
pub fn count_members(body: &Value, key: &str) -> Option<usize> {
    match body.get(key)? {
        Value::Object(map) => Some(map.len()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    urls: ApiUrls,
}

impl ApiClient {
    pub fn new(urls: ApiUrls, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { http, urls })
    }

    pub fn from_config(config: &SuiteConfig) -> Result<Self, ApiError> {
        Self::new(config.api_urls(), config.timeouts.request_timeout())
    }

    pub fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&EvcPayload>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!("{} {} -> {}", method, url, response.status());
        if !response.status().is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, url, None).await?;
        decode(url, response).await
    }

    async fn delete(&self, url: &str) -> Result<(), ApiError> {
        let response = self.send(Method::DELETE, url, None).await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            other => Err(ApiError::Status {
                method: "DELETE".into(),
                url: url.to_string(),
                status: other.as_u16(),
            }),
        }
    }

    pub async fn list_circuits(&self) -> Result<Keyed<EvcRecord>, ApiError> {
        self.get_json(&self.urls.circuits).await
    }

    pub async fn get_circuit(&self, id: &str) -> Result<EvcRecord, ApiError> {
        self.get_json(&member_url(&self.urls.circuits, id)).await
    }

    /// Create a circuit directly through the API, returning its id.
    pub async fn create_circuit(&self, payload: &EvcPayload) -> Result<String, ApiError> {
        let url = &self.urls.circuits;
        let response = self.send(Method::POST, url, Some(payload)).await?;
        let body: Value = decode(url, response).await?;
        body.get("circuit_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode {
                url: url.clone(),
                message: "response has no circuit_id".into(),
            })
    }

    pub async fn delete_circuit(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&member_url(&self.urls.circuits, id)).await
    }

    pub async fn list_windows(&self) -> Result<Vec<MaintenanceWindow>, ApiError> {
        self.get_json(&self.urls.maintenance).await
    }

    pub async fn delete_window(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&member_url(&self.urls.maintenance, id)).await
    }

    pub async fn list_traces(&self) -> Result<TraceCollection, ApiError> {
        self.get_json(&self.urls.traces).await
    }

    pub async fn count_switches(&self) -> Result<usize, ApiError> {
        self.count(&self.urls.switches, "switches").await
    }

    pub async fn count_links(&self) -> Result<usize, ApiError> {
        self.count(&self.urls.links, "links").await
    }

    pub async fn count_interfaces(&self) -> Result<usize, ApiError> {
        self.count(&self.urls.interfaces, "interfaces").await
    }

    async fn count(&self, url: &str, key: &str) -> Result<usize, ApiError> {
        let body: Value = self.get_json(url).await?;
        count_members(&body, key).ok_or_else(|| ApiError::Decode {
            url: url.to_string(),
            message: format!("response has no '{}' collection", key),
        })
    }

    /// Delete every circuit whose name is in `names`.
    ///
    /// Failures are logged and skipped. Returns the number deleted, so a
    /// second call for names already gone returns 0.
    pub async fn cleanup_circuits(&self, names: &[String]) -> usize {
        let circuits = match self.list_circuits().await {
            Ok(circuits) => circuits,
            Err(e) => {
                warn!("Cleanup skipped, could not list circuits: {}", e);
                return 0;
            }
        };

        let mut deleted = 0;
        for (id, record) in circuits.iter() {
            let Some(name) = record.name.as_deref() else {
                continue;
            };
            if !names.iter().any(|n| n == name) {
                continue;
            }
            match self.delete_circuit(id).await {
                Ok(()) => {
                    info!("Cleaned up circuit {} ({})", name, id);
                    deleted += 1;
                }
                Err(e) => warn!("Failed to delete circuit {}: {}", id, e),
            }
        }
        deleted
    }

    /// Delete every maintenance window selected by `select`, best effort.
    pub async fn cleanup_windows<F>(&self, select: F) -> usize
    where
        F: Fn(&MaintenanceWindow) -> bool,
    {
        let windows = match self.list_windows().await {
            Ok(windows) => windows,
            Err(e) => {
                warn!("Cleanup skipped, could not list maintenance windows: {}", e);
                return 0;
            }
        };

        let mut deleted = 0;
        for window in windows.iter().filter(|w| select(w)) {
            let Some(id) = window.id.as_deref() else {
                continue;
            };
            match self.delete_window(id).await {
                Ok(()) => {
                    info!("Cleaned up maintenance window {}", id);
                    deleted += 1;
                }
                Err(e) => warn!("Failed to delete maintenance window {}: {}", id, e),
            }
        }
        deleted
    }

    /// Poll the circuit until the controller reports it active.
    pub async fn wait_for_circuit_active(&self, id: &str, poller: &Poller) -> bool {
        poller
            .poll(
                || self.get_circuit(id),
                |record: &EvcRecord| record.active.then_some(()),
            )
            .await
            .is_some()
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await.map_err(|e| ApiError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_url() {
        assert_eq!(member_url("http://h/evc/", "abc"), "http://h/evc/abc");
        assert_eq!(member_url("http://h/evc", "abc"), "http://h/evc/abc");
    }

    #[test]
    fn test_find_circuit_by_name_uses_server_order() {
        let circuits: Keyed<EvcRecord> = serde_json::from_str(
            r#"{"id2": {"name": "dup"}, "id1": {"name": "dup"}, "id3": {"name": "other"}}"#,
        )
        .unwrap();
        assert_eq!(find_circuit_by_name(&circuits, "dup").as_deref(), Some("id2"));
        assert_eq!(find_circuit_by_name(&circuits, "missing"), None);
    }

    #[test]
    fn test_count_members_shapes() {
        assert_eq!(
            count_members(&json!({"switches": {"a": {}, "b": {}}}), "switches"),
            Some(2)
        );
        assert_eq!(count_members(&json!({"links": [1, 2, 3]}), "links"), Some(3));
        assert_eq!(count_members(&json!({"links": 3}), "links"), None);
        assert_eq!(count_members(&json!({}), "interfaces"), None);
    }
}
