use doc_ingest::config::ClientConfig;
use doc_ingest::state::{ALL_PROCESSED_MESSAGE, STREAM_ENDED_MESSAGE};
use doc_ingest::{Banner, Batch, RecordStatus, SelectedFile, StateHandle, UploadClient, UploadError, UploadState};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse(events: &[Value]) -> String {
    events.iter().map(|e| format!("data: {}\n\n", e)).collect()
}

fn files(names: &[&str]) -> Vec<SelectedFile> {
    names
        .iter()
        .map(|n| SelectedFile::new(*n, format!("contents of {}", n)))
        .collect()
}

fn client_for(server: &MockServer, state: StateHandle) -> UploadClient {
    UploadClient::new(ClientConfig::new(format!("{}/upload", server.uri())), state)
}

#[tokio::test]
async fn streamed_results_fill_records() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"kind": "file_result", "fileName": "a.txt", "processedData": "```json\n{\"total\": 10}\n```", "prompt": "Find totals"}),
        json!({"kind": "file_error", "fileName": "b.txt", "error": "Could not extract text from document"}),
        json!({"kind": "complete", "message": "Processing complete"}),
    ]);
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let state = StateHandle::new();
    let client = client_for(&server, state.clone());
    client.upload(files(&["a.txt", "b.txt"]), None).await.expect("upload ok");

    let snapshot = state.snapshot();
    assert_eq!(snapshot.records.len(), 2);
    assert_eq!(snapshot.records[0].json_data(), Some(&json!({"total": 10})));
    assert_eq!(snapshot.records[0].prompt_text.as_deref(), Some("Find totals"));
    assert_eq!(
        snapshot.records[1].error(),
        Some("Could not extract text from document")
    );
    assert_eq!(snapshot.selected.as_deref(), Some(snapshot.records[0].id.as_str()));
    assert_eq!(
        snapshot.banner,
        Some(Banner::Success(ALL_PROCESSED_MESSAGE.to_string()))
    );
    assert!(!snapshot.uploading);
}

#[tokio::test]
async fn too_many_files_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let state = StateHandle::new();
    let client = client_for(&server, state.clone());
    let names: Vec<String> = (0..11).map(|i| format!("{}.txt", i)).collect();
    let selection = names
        .iter()
        .map(|n| SelectedFile::new(n.as_str(), "x"))
        .collect();

    let err = client.upload(selection, None).await.unwrap_err();

    assert!(matches!(err, UploadError::TooManyFiles { max: 10 }));
    let snapshot = state.snapshot();
    assert!(snapshot.records.is_empty());
    assert_eq!(
        snapshot.banner,
        Some(Banner::Error(
            "You can upload a maximum of 10 files at a time.".to_string()
        ))
    );
}

#[tokio::test]
async fn empty_selection_is_a_no_op() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let state = StateHandle::new();
    let client = client_for(&server, state.clone());
    client.upload(Vec::new(), None).await.unwrap();
    assert_eq!(*state.snapshot(), UploadState::new());
}

#[tokio::test]
async fn server_error_fails_every_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let state = StateHandle::new();
    let client = client_for(&server, state.clone());
    let err = client
        .upload(files(&["a.txt", "b.txt"]), None)
        .await
        .unwrap_err();

    let expected = "Initial request failed: 500 Internal Server Error";
    assert_eq!(err.to_string(), expected);
    let snapshot = state.snapshot();
    for record in &snapshot.records {
        assert!(!record.is_loading());
        assert_eq!(record.error(), Some(expected));
    }
    assert_eq!(snapshot.banner, Some(Banner::Error(expected.to_string())));
}

#[tokio::test]
async fn server_error_message_from_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "No files uploaded"})))
        .mount(&server)
        .await;

    let state = StateHandle::new();
    let client = client_for(&server, state.clone());
    let err = client.upload(files(&["a.txt"]), None).await.unwrap_err();

    assert!(matches!(err, UploadError::Status { ref message } if message == "No files uploaded"));
    assert_eq!(state.snapshot().records[0].error(), Some("No files uploaded"));
}

#[tokio::test]
async fn empty_body_fails_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let state = StateHandle::new();
    let client = client_for(&server, state.clone());
    let err = client.upload(files(&["a.txt"]), None).await.unwrap_err();

    assert!(matches!(err, UploadError::EmptyBody));
    assert_eq!(
        state.snapshot().records[0].error(),
        Some("Response body is empty, cannot read SSE stream.")
    );
}

#[tokio::test]
async fn unreachable_server_fails_batch() {
    // Bind and release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/upload", listener.local_addr().unwrap());
    drop(listener);

    let state = StateHandle::new();
    let client = UploadClient::new(ClientConfig::new(endpoint), state.clone());
    let err = client.upload(files(&["a.txt"]), None).await.unwrap_err();

    assert!(matches!(err, UploadError::Transport(_)));
    let snapshot = state.snapshot();
    assert!(!snapshot.records[0].is_loading());
    assert!(snapshot.records[0].error().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn stream_without_completion_settles_records() {
    let server = MockServer::start().await;
    let body = sse(&[json!({"fileName": "a.txt", "processedData": "{\"ok\": true}"})]);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let state = StateHandle::new();
    let client = client_for(&server, state.clone());
    client
        .upload(files(&["a.txt", "b.txt"]), Some("  Only totals  "))
        .await
        .unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.records[0].json_data(), Some(&json!({"ok": true})));
    assert_eq!(snapshot.records[1].status, RecordStatus::Done { data: None });
    assert_eq!(snapshot.records[1].prompt_text.as_deref(), Some("Only totals"));
    assert_eq!(
        snapshot.banner,
        Some(Banner::Success(STREAM_ENDED_MESSAGE.to_string()))
    );
}

#[tokio::test]
async fn reupload_supersedes_loading_record() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"fileName": "a.txt", "processedData": "{\"v\": 2}"}),
        json!({"kind": "complete", "message": "Processing complete"}),
    ]);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    // An earlier upload of a.txt is still waiting for its result.
    let (batch, placeholders) = Batch::from_selection(["a.txt", "keep.txt"], None);
    let stale_id = placeholders[0].id.clone();
    let state = StateHandle::from_state(UploadState::new().seed_batch(&batch, &placeholders, 30));

    let client = client_for(&server, state.clone());
    client.upload(files(&["a.txt"]), None).await.unwrap();

    let snapshot = state.snapshot();
    let names: Vec<&str> = snapshot.records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["keep.txt", "a.txt"]);
    assert!(snapshot.record(&stale_id).is_none());
    assert_eq!(snapshot.records[1].json_data(), Some(&json!({"v": 2})));
    // The other batch's record is untouched by this stream.
    assert!(snapshot.records[0].is_loading());
}
