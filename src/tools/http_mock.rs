//! Deterministic `http_get` mock. Never touches the network.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::adapter::HttpAdapter;
use crate::tools::ToolError;

/// Closed URL → response table; everything else is a 404.
pub struct HttpMock {
    responses: HashMap<String, Value>,
}

impl Default for HttpMock {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMock {
    /// Create the mock with the standard response table.
    pub fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "https://api.company.tld/status".to_owned(),
            json!({"status_code": 200, "body": "OK"}),
        );
        responses.insert(
            "https://api.company.tld/info".to_owned(),
            json!({"status_code": 200, "body": "INFO"}),
        );
        Self { responses }
    }
}

#[async_trait]
impl HttpAdapter for HttpMock {
    async fn get(&self, url: &str) -> Result<Value, ToolError> {
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| json!({"status_code": 404, "body": "NOT_FOUND"})))
    }

    fn set_allowed_domains(&self, _domains: &[String]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_url() {
        let mock = HttpMock::new();
        let res = mock.get("https://api.company.tld/status").await.expect("get");
        assert_eq!(res["status_code"], 200);
        assert_eq!(res["body"], "OK");
    }

    #[tokio::test]
    async fn test_unknown_url_is_404() {
        let mock = HttpMock::new();
        let res = mock.get("https://api.company.tld/other").await.expect("get");
        assert_eq!(res["status_code"], 404);
    }
}
