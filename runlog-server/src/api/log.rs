//! Log API Handlers
//!
//! HTTP endpoints for log ingest, cursor reads, streaming and export.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt, stream};
use runlog_core::dto::log::{
    CursorQuery, FlushResponse, IngestResponse, LatestLogPage, LogPage, NewLogEntry,
};
use std::convert::Infallible;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::repository::blob::JSONL_CONTENT_TYPE;
use crate::service::validate_run_id;

/// POST /runs/{id}/logs
/// Buffer a batch of log entries for a run
pub async fn add_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(entries): Json<Vec<NewLogEntry>>,
) -> ApiResult<Json<IngestResponse>> {
    let accepted = state.logs.add_log_entries(&id, entries).await?;

    Ok(Json(IngestResponse { accepted }))
}

/// POST /runs/{id}/logs/flush
/// Force buffered entries of a run to durable storage
pub async fn flush_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FlushResponse>> {
    let flushed = state.logs.flush(&id).await?;

    tracing::debug!("Flushed {} entries for run: {}", flushed, id);

    Ok(Json(FlushResponse { flushed }))
}

/// GET /runs/{id}/logs?cursor=N
pub async fn get_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CursorQuery>,
) -> ApiResult<Json<LogPage>> {
    tracing::debug!("Getting logs for run: {} from cursor {}", id, query.cursor);

    Ok(Json(state.logs.get_logs(&id, query.cursor).await?))
}

/// GET /logs/latest?cursor=N
/// Logs of the newest run; an empty page when there is none
pub async fn get_latest_logs(
    State(state): State<AppState>,
    Query(query): Query<CursorQuery>,
) -> Json<LatestLogPage> {
    Json(state.logs.get_latest_logs(query.cursor).await)
}

/// GET /runs/{id}/logs/export
/// Entire run log as JSON Lines
pub async fn export_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let body = state.logs.export_jsonl(&id).await?;

    Ok(([(header::CONTENT_TYPE, JSONL_CONTENT_TYPE)], body))
}

/// GET /runs/{id}/logs/stream?cursor=N
/// Server-sent events, one `log` frame per entry, then a single `end` frame
///
/// Each `log` frame's id is the cursor to resume from after it; a
/// `Last-Event-ID` header takes precedence over the query cursor.
pub async fn stream_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CursorQuery>,
    headers: HeaderMap,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    validate_run_id(&id).map_err(ApiError::BadRequest)?;

    let start_cursor = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(query.cursor);

    tracing::debug!("Streaming logs for run: {} from cursor {}", id, start_cursor);

    let events = state
        .logs
        .stream_logs(id, start_cursor)
        .enumerate()
        .map(move |(k, entry)| {
            let frame = Event::default()
                .event("log")
                .id((start_cursor + k + 1).to_string())
                .json_data(&entry);

            Ok::<_, Infallible>(
                frame.unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            )
        })
        .chain(stream::once(async {
            Ok::<_, Infallible>(Event::default().event("end").data(""))
        }));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::state_with;
    use crate::repository::MemoryBlobStore;
    use axum::http::HeaderValue;
    use runlog_core::domain::log::{LogEntry, LogLevel};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Frame {
        event: String,
        id: Option<String>,
        data: String,
    }

    impl Frame {
        fn message(&self) -> String {
            serde_json::from_str::<LogEntry>(&self.data).unwrap().message
        }
    }

    async fn seeded_state(messages: &[&str]) -> AppState {
        let state = state_with(Arc::new(MemoryBlobStore::new()));
        for m in messages {
            state
                .logs
                .append(LogEntry::new("r1", LogLevel::Info, *m))
                .await
                .unwrap();
        }
        state
    }

    /// Run the stream handler to completion and split the body into frames
    async fn stream_frames(
        state: AppState,
        cursor: usize,
        last_event_id: Option<&str>,
    ) -> Vec<Frame> {
        let mut headers = HeaderMap::new();
        if let Some(id) = last_event_id {
            headers.insert("last-event-id", HeaderValue::from_str(id).unwrap());
        }

        let response = stream_logs(
            State(state),
            Path("r1".to_string()),
            Query(CursorQuery { cursor }),
            headers,
        )
        .await
        .into_response();

        let body = tokio::time::timeout(
            Duration::from_secs(2),
            axum::body::to_bytes(response.into_body(), usize::MAX),
        )
        .await
        .expect("stream did not end")
        .unwrap();

        String::from_utf8(body.to_vec())
            .unwrap()
            .split("\n\n")
            .map(|block| {
                let mut frame = Frame::default();
                for line in block.lines() {
                    if let Some(v) = line.strip_prefix("event: ") {
                        frame.event = v.to_string();
                    } else if let Some(v) = line.strip_prefix("id: ") {
                        frame.id = Some(v.to_string());
                    } else if let Some(v) = line.strip_prefix("data: ") {
                        frame.data = v.to_string();
                    }
                }
                frame
            })
            .filter(|frame| !frame.event.is_empty())
            .collect()
    }

    #[tokio::test]
    async fn test_stream_frame_ids_are_resume_cursors() {
        let state = seeded_state(&["a", "b", "c"]).await;

        let frames = stream_frames(state, 1, None).await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].event, "log");
        assert_eq!(frames[0].id.as_deref(), Some("2"));
        assert_eq!(frames[0].message(), "b");
        assert_eq!(frames[1].id.as_deref(), Some("3"));
        assert_eq!(frames[1].message(), "c");
        assert_eq!(frames[2].event, "end");
        assert_eq!(frames[2].id, None);
    }

    #[tokio::test]
    async fn test_last_event_id_overrides_query_cursor() {
        let state = seeded_state(&["a", "b", "c"]).await;

        let frames = stream_frames(state, 0, Some("2")).await;

        let ids: Vec<_> = frames.iter().map(|f| f.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("3"), None]);
        assert_eq!(frames[0].message(), "c");
        assert_eq!(frames[1].event, "end");
    }

    #[tokio::test]
    async fn test_unparsable_last_event_id_falls_back_to_query() {
        let state = seeded_state(&["a", "b", "c"]).await;

        let frames = stream_frames(state, 2, Some("not-a-number")).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].id.as_deref(), Some("3"));
        assert_eq!(frames[1].event, "end");
    }

    #[tokio::test]
    async fn test_stream_of_unknown_run_sends_only_end() {
        let state = state_with(Arc::new(MemoryBlobStore::new()));

        let frames = stream_frames(state, 0, None).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "end");
    }
}
