//! Knowledge-base index summaries.
//!
//! Agents with the knowledge-base search tool get a short description of
//! each index they can search, so the model knows what is in there.

use std::time::Duration;

use ar_domain::agent::Language;
use ar_domain::config::KnowledgeConfig;
use ar_domain::error::{Error, Result};
use ar_memory::from_reqwest;
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn summary(&self, index_name: &str, tenant_id: &str, language: Language)
        -> Result<String>;
}

/// Calls `GET {base_url}/indices/{index}/summary` on the vector index
/// service.
pub struct RestKnowledgeBase {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    summary: String,
}

impl RestKnowledgeBase {
    pub fn new(cfg: &KnowledgeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        let base_url = reqwest::Url::parse(cfg.base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("knowledge.base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "knowledge.base_url is not a base URL: {base_url}"
            )));
        }
        Ok(Self { http, base_url })
    }

    /// The index name is one path segment, percent-encoded as needed.
    fn summary_url(&self, index_name: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["indices", index_name, "summary"]);
        }
        url
    }
}

#[async_trait]
impl KnowledgeBase for RestKnowledgeBase {
    async fn summary(
        &self,
        index_name: &str,
        tenant_id: &str,
        language: Language,
    ) -> Result<String> {
        let lang = match language {
            Language::En => "en",
            Language::Zh => "zh",
        };
        let resp = self
            .http
            .get(self.summary_url(index_name))
            .query(&[("tenant_id", tenant_id), ("language", lang)])
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Knowledge(format!(
                "summary of {index_name} returned {status}: {body}"
            )));
        }

        let parsed: SummaryResponse = resp
            .json()
            .await
            .map_err(|e| Error::Knowledge(format!("summary of {index_name}: {e}")))?;
        Ok(parsed.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RestKnowledgeBase {
        RestKnowledgeBase::new(&KnowledgeConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_summary_with_tenant_and_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indices/docs/summary"))
            .and(query_param("tenant_id", "acme"))
            .and(query_param("language", "zh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"summary": "product manuals"})),
            )
            .mount(&server)
            .await;

        let text = client(&server).summary("docs", "acme", Language::Zh).await.unwrap();
        assert_eq!(text, "product manuals");
    }

    #[tokio::test]
    async fn missing_index_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).summary("gone", "acme", Language::En).await;
        assert!(matches!(err, Err(Error::Knowledge(_))));
    }

    #[tokio::test]
    async fn index_name_stays_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indices/a%2Fb%3Fc%23d/summary"))
            .and(query_param("tenant_id", "acme"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"summary": "odd"})),
            )
            .mount(&server)
            .await;

        let text = client(&server).summary("a/b?c#d", "acme", Language::En).await.unwrap();
        assert_eq!(text, "odd");
    }

    #[test]
    fn base_path_is_kept() {
        let kb = RestKnowledgeBase::new(&KnowledgeConfig {
            base_url: "http://kb.local/api/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(kb.summary_url("docs").as_str(), "http://kb.local/api/indices/docs/summary");
    }

    #[test]
    fn unparseable_base_url_is_a_config_error() {
        let err = RestKnowledgeBase::new(&KnowledgeConfig {
            base_url: "not a url".into(),
            ..Default::default()
        });
        assert!(matches!(err, Err(Error::Config(_))));
    }
}
