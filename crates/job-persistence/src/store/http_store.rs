use crate::{document::Document, error::StoreError, store::DocumentStore};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const INDEX_NOT_FOUND: &str = "index_not_found_exception";
const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// Client for an Elasticsearch-compatible REST endpoint. Collections map to
/// indices and documents are indexed by id under `_doc`.
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url).map_err(|e| StoreError::Backend(Box::new(e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Backend(
                format!("'{base_url}' cannot be used as a base URL").into(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Backend("base URL has no path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn collection_url(&self, collection: &str) -> Result<Url, StoreError> {
        self.url(&[collection])
    }

    fn document_url(&self, collection: &str, document_id: &str) -> Result<Url, StoreError> {
        self.url(&[collection, "_doc", document_id])
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn upsert(
        &self,
        collection: &str,
        document_id: &str,
        document: &Document,
    ) -> Result<(), StoreError> {
        // Index APIs auto-create missing indices on most clusters; check first
        // so a write never brings a collection into existence.
        if !self.collection_exists(collection).await? {
            return Err(StoreError::CollectionMissing {
                collection: collection.to_string(),
            });
        }

        let url = self.document_url(collection, document_id)?;
        debug!(%url, "Indexing document");
        let resp = self.client.put(url).json(document).send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await?;
        Err(classify_failure(status.as_u16(), &body, collection))
    }

    async fn get(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let url = self.document_url(collection, document_id)?;
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            let mut hit: Value = serde_json::from_str(&body)?;
            return Ok(hit.get_mut("_source").map(Value::take));
        }
        if status == StatusCode::NOT_FOUND && document_not_found(&body) {
            return Ok(None);
        }
        Err(classify_failure(status.as_u16(), &body, collection))
    }

    async fn create_collection(&self, collection: &str) -> Result<(), StoreError> {
        if self.collection_exists(collection).await? {
            return Ok(());
        }

        let resp = self
            .client
            .put(self.collection_url(collection)?)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await?;
        if error_type(&body).as_deref() == Some(ALREADY_EXISTS) {
            return Ok(());
        }
        Err(classify_failure(status.as_u16(), &body, collection))
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        let resp = self
            .client
            .head(self.collection_url(collection)?)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(StoreError::Rejected {
                status: s.as_u16(),
                reason: format!("existence check for '{collection}' failed"),
            }),
        }
    }
}

fn error_type(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/type")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// A 404 for an existing index reports `"found": false` instead of an error.
fn document_not_found(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("found").and_then(Value::as_bool))
        == Some(false)
}

fn classify_failure(status: u16, body: &str, collection: &str) -> StoreError {
    if error_type(body).as_deref() == Some(INDEX_NOT_FOUND) {
        return StoreError::CollectionMissing {
            collection: collection.to_string(),
        };
    }

    let reason = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/reason")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());

    StoreError::Rejected { status, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    type Route = fn(&str, &str) -> (u16, &'static str);

    /// Canned-response HTTP server. Records `METHOD /path` for every request.
    struct StubServer {
        base: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(route: Route) -> Self {
            Self::serve(route, 0).await
        }

        /// Bodies are announced `extra_len` bytes longer than what is sent.
        async fn serve(route: Route, extra_len: usize) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));

            let seen = requests.clone();
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let Some((method, path)) = read_request(&mut socket).await else {
                            return;
                        };
                        seen.lock().unwrap().push(format!("{method} {path}"));

                        let (status, body) = route(&method, &path);
                        let body = if method == "HEAD" { "" } else { body };
                        let reply = format!(
                            "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            body.len() + if body.is_empty() { 0 } else { extra_len },
                        );
                        let _ = socket.write_all(reply.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
            });

            Self { base, requests }
        }

        fn store(&self) -> HttpDocumentStore {
            HttpDocumentStore::new(&self.base, Duration::from_secs(5)).unwrap()
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> Option<(String, String)> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.split_whitespace();
        Some((
            request_line.next()?.to_string(),
            request_line.next()?.to_string(),
        ))
    }

    #[tokio::test]
    async fn upsert_into_missing_index_sends_no_put() {
        let server = StubServer::start(|method, _| match method {
            "HEAD" => (404, ""),
            _ => (201, r#"{"result":"created"}"#),
        })
        .await;

        let err = server
            .store()
            .upsert("prelert-job-42", "42_data_counts", &json!({ "n": 1 }))
            .await
            .unwrap_err();

        assert!(
            matches!(err, StoreError::CollectionMissing { ref collection } if collection == "prelert-job-42")
        );
        assert_eq!(server.requests(), vec!["HEAD /prelert-job-42"]);
    }

    #[tokio::test]
    async fn upsert_puts_document_into_existing_index() {
        let server = StubServer::start(|method, _| match method {
            "HEAD" => (200, ""),
            _ => (200, r#"{"result":"updated"}"#),
        })
        .await;

        server
            .store()
            .upsert("prelert-a", "a_data_counts", &json!({ "n": 1 }))
            .await
            .unwrap();

        assert_eq!(
            server.requests(),
            vec!["HEAD /prelert-a", "PUT /prelert-a/_doc/a_data_counts"]
        );
    }

    #[tokio::test]
    async fn get_distinguishes_absent_document_from_missing_index() {
        let server = StubServer::start(|_, path| match path {
            "/c/_doc/present" => (200, r#"{"_index":"c","_id":"present","found":true,"_source":{"n":3}}"#),
            "/c/_doc/absent" => (404, r#"{"_index":"c","_id":"absent","found":false}"#),
            _ => (
                404,
                r#"{"error":{"type":"index_not_found_exception","reason":"no such index [gone]"},"status":404}"#,
            ),
        })
        .await;
        let store = server.store();

        assert_eq!(store.get("c", "present").await.unwrap(), Some(json!({ "n": 3 })));
        assert_eq!(store.get("c", "absent").await.unwrap(), None);
        let err = store.get("gone", "doc").await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionMissing { .. }));
    }

    #[tokio::test]
    async fn create_collection_tolerates_concurrent_creation() {
        let server = StubServer::start(|method, _| match method {
            "HEAD" => (404, ""),
            _ => (
                400,
                r#"{"error":{"type":"resource_already_exists_exception","reason":"index [c] already exists"},"status":400}"#,
            ),
        })
        .await;

        server.store().create_collection("c").await.unwrap();
        assert_eq!(server.requests(), vec!["HEAD /c", "PUT /c"]);
    }

    #[tokio::test]
    async fn failed_existence_check_is_rejected() {
        let server = StubServer::start(|_, _| (503, "")).await;
        let store = server.store();

        let err = store.collection_exists("c").await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 503, .. }));

        let err = store.upsert("c", "doc", &json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 503, .. }));
        assert!(server.requests().iter().all(|r| r.starts_with("HEAD")));
    }

    #[tokio::test]
    async fn unreadable_error_body_is_a_backend_error() {
        let server = StubServer::serve(
            |method, _| match method {
                "HEAD" => (200, ""),
                _ => (500, r#"{"error":{"type":"oops"}}"#),
            },
            64,
        )
        .await;

        let err = server
            .store()
            .upsert("c", "doc", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)), "got {err:?}");
    }

    fn store(base: &str) -> HttpDocumentStore {
        HttpDocumentStore::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn builds_document_urls() {
        let s = store("http://localhost:9200");
        assert_eq!(
            s.document_url("prelert-job-1", "job-1_data_counts")
                .unwrap()
                .as_str(),
            "http://localhost:9200/prelert-job-1/_doc/job-1_data_counts"
        );

        let s = store("http://es.internal:9200/proxy/");
        assert_eq!(
            s.collection_url("prelert-a").unwrap().as_str(),
            "http://es.internal:9200/proxy/prelert-a"
        );
    }

    #[test]
    fn escapes_path_segments() {
        let s = store("http://localhost:9200");
        assert_eq!(
            s.document_url("c", "a/b").unwrap().as_str(),
            "http://localhost:9200/c/_doc/a%2Fb"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(HttpDocumentStore::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
        assert!(HttpDocumentStore::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn classifies_missing_index() {
        let body = r#"{"error":{"type":"index_not_found_exception","reason":"no such index [prelert-job-42]"},"status":404}"#;
        let err = classify_failure(404, body, "prelert-job-42");
        assert!(
            matches!(err, StoreError::CollectionMissing { ref collection } if collection == "prelert-job-42")
        );
    }

    #[test]
    fn classifies_other_failures_as_rejected() {
        let body = r#"{"error":{"type":"cluster_block_exception","reason":"index read-only"},"status":403}"#;
        match classify_failure(403, body, "c") {
            StoreError::Rejected { status, reason } => {
                assert_eq!(status, 403);
                assert_eq!(reason, "index read-only");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match classify_failure(502, "Bad Gateway", "c") {
            StoreError::Rejected { reason, .. } => assert_eq!(reason, "Bad Gateway"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn detects_absent_documents() {
        assert!(document_not_found(
            r#"{"_index":"c","_id":"d","found":false}"#
        ));
        assert!(!document_not_found(
            r#"{"error":{"type":"index_not_found_exception"},"status":404}"#
        ));
    }
}
