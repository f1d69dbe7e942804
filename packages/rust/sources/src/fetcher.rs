//! Executes one shaped source request and classifies its outcome.
//!
//! Every failure is reported exactly once: `warn!` for a non-success HTTP
//! status, `error!` for transport or decode failures. No retries.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use docenrich_shared::{CancelSignal, EnrichError, FetchConfig, FetchResult, Result};

use crate::request::{HttpMethod, SourceRequest};

/// HTTP client wrapper shared by every source fetch.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    /// Create a fetcher with the configured timeout and User-Agent.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Perform `request`, abandoning it if `cancel` fires first.
    ///
    /// Returns the decoded body on a 2xx response. Cancellation yields
    /// [`EnrichError::Cancelled`] and logs only at debug level.
    #[instrument(skip_all, fields(source = %request.source_type, method = request.method.as_str(), url = %request.url))]
    pub async fn fetch(&self, request: &SourceRequest, cancel: &CancelSignal) -> Result<FetchResult> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("source fetch cancelled");
                Err(EnrichError::Cancelled(format!(
                    "{} {}",
                    request.source_type, request.url
                )))
            }
            result = self.execute(request) => result,
        }
    }

    async fn execute(&self, request: &SourceRequest) -> Result<FetchResult> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Post => self.client.post(request.url.clone()),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "error fetching source data");
                return Err(self.failure(request, e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "failed to fetch source data");
            return Err(self.failure(request, format!("HTTP {status}")));
        }

        match response.json::<Value>().await {
            Ok(body) => {
                debug!(status = status.as_u16(), "source fetch succeeded");
                Ok(FetchResult::from_body(&request.source_type, body))
            }
            Err(e) => {
                error!(error = %e, "failed to decode source response");
                Err(self.failure(request, format!("body decode failed: {e}")))
            }
        }
    }

    fn failure(&self, request: &SourceRequest, message: String) -> EnrichError {
        EnrichError::source_fetch(&request.source_type, request.url.as_str(), message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tracing::Level;
    use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Records the level of every event emitted by this crate.
    #[derive(Clone, Default)]
    struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LevelRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
            if event.metadata().target().starts_with("docenrich_sources") {
                self.0.lock().unwrap().push(*event.metadata().level());
            }
        }
    }

    impl LevelRecorder {
        fn count(&self, level: Level) -> usize {
            self.0.lock().unwrap().iter().filter(|l| **l == level).count()
        }
    }

    fn fetcher() -> SourceFetcher {
        SourceFetcher::new(&FetchConfig {
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap()
    }

    fn get(server: &MockServer, p: &str) -> SourceRequest {
        SourceRequest::get("generic", Url::parse(&format!("{}{p}", server.uri())).unwrap())
    }

    #[tokio::test]
    async fn success_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(query_param("q", "rust"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"x": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let request = get(&server, "/data").with_query_param("q", "rust");
        let result = fetcher()
            .fetch(&request, &CancelSignal::never())
            .await
            .expect("fetch ok");
        assert_eq!(result.get("x"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn post_sends_headers_and_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gpt2"))
            .and(header("Authorization", "Bearer hf_1"))
            .and(body_json(json!({"inputs": "hi"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "hi there"}])),
            )
            .mount(&server)
            .await;

        let request = SourceRequest::post(
            "hugging_face",
            Url::parse(&format!("{}/models/gpt2", server.uri())).unwrap(),
        )
        .with_bearer("hf_1")
        .with_json(json!({"inputs": "hi"}));

        let result = fetcher()
            .fetch(&request, &CancelSignal::never())
            .await
            .expect("fetch ok");
        assert_eq!(result.get("hugging_face").unwrap()[0]["generated_text"], "hi there");
    }

    #[tokio::test]
    async fn error_status_warns_once() {
        let server = MockServer::start().await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let recorder = LevelRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let err = fetcher()
            .fetch(&get(&server, "/broken"), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::SourceFetch { .. }));
        assert!(err.to_string().contains("500"));
        assert_eq!(recorder.count(Level::WARN), 1);
        assert_eq!(recorder.count(Level::ERROR), 0);
    }

    #[tokio::test]
    async fn transport_failure_errors_once() {
        // Bind then drop a server so the port refuses connections.
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };

        let recorder = LevelRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = SourceRequest::get("generic", Url::parse(&format!("{uri}/gone")).unwrap());
        let err = fetcher()
            .fetch(&request, &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::SourceFetch { .. }));
        assert_eq!(recorder.count(Level::ERROR), 1);
        assert_eq!(recorder.count(Level::WARN), 0);
    }

    #[tokio::test]
    async fn undecodable_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&get(&server, "/html"), &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("decode"));
    }

    #[tokio::test]
    async fn cancellation_abandons_slow_fetch() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"late": true}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let cancel = CancelSignal::never().with_timeout(Duration::from_millis(50));
        let started = std::time::Instant::now();
        let err = fetcher()
            .fetch(&get(&server, "/slow"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
