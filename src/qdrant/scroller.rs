use async_stream::try_stream;
use futures_core::Stream;
use reqwest::Method;
use serde_json::{Value, json};

use super::client::QdrantClient;
use super::types::{QdrantError, ScrollResponse, StoredPoint};

const DEFAULT_SCROLL_LIMIT: usize = 256;

/// Stream every point matching `filter`, following `next_page_offset` until exhausted.
pub fn stream_points<'a>(
    client: &'a QdrantClient,
    collection: &'a str,
    filter: Value,
    with_vector: Option<&'a str>,
) -> impl Stream<Item = Result<StoredPoint, QdrantError>> + 'a {
    try_stream! {
        let mut offset = Value::Null;
        let vectors = match with_vector {
            Some(name) => json!([name]),
            None => Value::Bool(false),
        };

        loop {
            let body = json!({
                "filter": filter,
                "limit": DEFAULT_SCROLL_LIMIT,
                "offset": offset,
                "with_payload": true,
                "with_vector": vectors,
            });

            let response = client
                .request(Method::POST, &format!("collections/{collection}/points/scroll"))
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let ScrollResponse { result } = response.json().await?;
                for point in result.points {
                    yield point;
                }

                match result.next_page_offset {
                    Some(next) if !next.is_null() => offset = next,
                    _ => break,
                }
            } else {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(collection, %status, "Failed to scroll points");
                Err(QdrantError::UnexpectedStatus { status, body })?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::client::tests::client;
    use futures_util::{StreamExt, pin_mut};
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn follows_page_offsets_with_vectors() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/tenders/points/scroll")
                    .body_contains("\"offset\":null")
                    .body_contains("\"with_vector\":[\"requirement\"]");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [
                            { "id": "a", "payload": { "n": 1 }, "vector": { "requirement": [1.0] } }
                        ],
                        "next_page_offset": "b"
                    }
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/tenders/points/scroll")
                    .body_contains("\"offset\":\"b\"");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [{ "id": "b", "payload": { "n": 2 } }],
                        "next_page_offset": null
                    }
                }));
            })
            .await;

        let client = client(&server);
        let stream = stream_points(&client, "tenders", json!({ "must": [] }), Some("requirement"));
        pin_mut!(stream);
        let mut points = Vec::new();
        while let Some(point) = stream.next().await {
            points.push(point.expect("point"));
        }

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].named_vector("requirement"), Some(vec![1.0]));
        assert_eq!(points[1].named_vector("requirement"), None);
    }

    #[tokio::test]
    async fn error_status_ends_stream_with_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/tenders/points/scroll");
                then.status(500).body("boom");
            })
            .await;

        let client = client(&server);
        let stream = stream_points(&client, "tenders", json!({ "must": [] }), None);
        pin_mut!(stream);
        let first = stream.next().await.expect("item");
        assert!(matches!(first, Err(QdrantError::UnexpectedStatus { .. })));
    }
}
