//! services/api/src/adapters/remote.rs
//!
//! HTTP implementation of the `DocumentStore` port against the hosted
//! realtime document database. Documents are plain REST resources; the
//! live subscription is a server-sent-events stream where each event
//! carries the document's new contents (JSON `null` while it is absent).

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use samvaad_core::ports::{DocumentStore, DocumentWatch, PortError, PortResult, WriteOp};
use serde_json::{json, Value};
use tracing::warn;

/// A `DocumentStore` speaking the hosted database's REST + SSE API.
pub struct RemoteStore {
    http: reqwest::Client,
    base: String,
}

impl RemoteStore {
    pub fn new(base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/v1/{}/{}", self.base, collection, id)
    }

    async fn expect_ok(response: reqwest::Response) -> PortResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(PortError::NotFound(body)),
            StatusCode::BAD_REQUEST => Err(PortError::Invalid(body)),
            _ => Err(PortError::Unexpected(format!(
                "document store returned {status}: {body}"
            ))),
        }
    }

    fn write_body(op: &WriteOp) -> Value {
        match op {
            WriteOp::Set { collection, id, doc } => json!({
                "op": "set", "collection": collection, "id": id, "doc": doc,
            }),
            WriteOp::Update { collection, id, fields } => json!({
                "op": "update", "collection": collection, "id": id, "fields": fields,
            }),
            WriteOp::Append { collection, id, field, value } => json!({
                "op": "append", "collection": collection, "id": id,
                "field": field, "value": value,
            }),
        }
    }
}

fn network(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("document store request failed: {e}"))
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Value>> {
        let response = self
            .http
            .get(self.doc_url(collection, id))
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_ok(response).await?;
        let doc = response.json().await.map_err(network)?;
        Ok(Some(doc))
    }

    async fn set(&self, collection: &str, id: &str, doc: Value) -> PortResult<()> {
        let response = self
            .http
            .put(self.doc_url(collection, id))
            .json(&doc)
            .send()
            .await
            .map_err(network)?;
        Self::expect_ok(response).await.map(|_| ())
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> PortResult<()> {
        let response = self
            .http
            .patch(self.doc_url(collection, id))
            .json(&fields)
            .send()
            .await
            .map_err(network)?;
        Self::expect_ok(response).await.map(|_| ())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> PortResult<Vec<Value>> {
        let response = self
            .http
            .post(format!("{}/v1/{}:query", self.base, collection))
            .json(&json!({ "field": field, "equals": value }))
            .send()
            .await
            .map_err(network)?;
        let response = Self::expect_ok(response).await?;
        response.json().await.map_err(network)
    }

    async fn append(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> PortResult<()> {
        let response = self
            .http
            .post(format!("{}/v1/{}/{}:append", self.base, collection, id))
            .json(&json!({ "field": field, "value": value }))
            .send()
            .await
            .map_err(network)?;
        Self::expect_ok(response).await.map(|_| ())
    }

    async fn watch(&self, collection: &str, id: &str) -> PortResult<DocumentWatch> {
        let response = self
            .http
            .get(format!("{}/v1/{}/{}:watch", self.base, collection, id))
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(network)?;
        let response = Self::expect_ok(response).await?;

        let mut body = response.bytes_stream();
        let target = format!("{collection}/{id}");
        let stream = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!("Watch stream for {target} ended: {e}");
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE events are separated by a blank line.
                while let Some(end) = buffer.find("\n\n") {
                    let event: String = buffer.drain(..end + 2).collect();
                    for line in event.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        match serde_json::from_str::<Value>(data) {
                            Ok(Value::Null) => yield None,
                            Ok(doc) => yield Some(doc),
                            Err(e) => warn!("Bad watch event for {target}: {e}"),
                        }
                    }
                }
            }
        };
        Ok(stream.boxed())
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> PortResult<()> {
        let body: Vec<Value> = writes.iter().map(Self::write_body).collect();
        let response = self
            .http
            .post(format!("{}/v1:commit", self.base))
            .json(&json!({ "writes": body }))
            .send()
            .await
            .map_err(network)?;
        Self::expect_ok(response).await.map(|_| ())
    }
}
