use std::time::Duration;

use audio_intake::config::InferenceConfig;
use audio_intake::inference::{HttpTranscriber, InferenceError, Transcriber};
use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{json, Value};

async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/transcribe")
}

/// Replies with a transcript describing what it received.
async fn describe_upload(mut multipart: Multipart) -> Json<Value> {
    let mut size = 0;
    let mut filename = String::new();
    let mut model = String::new();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                filename = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.unwrap().len();
            }
            Some("model") => model = field.text().await.unwrap(),
            _ => {}
        }
    }

    Json(json!({ "text": format!("  {size} bytes of {filename} for {model}  ") }))
}

fn config(url: String) -> InferenceConfig {
    let mut config = InferenceConfig::new(url);
    config.model = Some("whisper-1".to_string());
    config.timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn test_transcript_is_extracted() {
    let url = spawn_stub(Router::new().route("/transcribe", post(describe_upload))).await;
    let transcriber = HttpTranscriber::new(config(url)).unwrap();

    let transcript = transcriber
        .transcribe("1700000000_clip.wav", Bytes::from_static(b"0123456789"))
        .await
        .unwrap();

    assert_eq!(transcript, "10 bytes of 1700000000_clip.wav for whisper-1");
}

#[tokio::test]
async fn test_large_clip_is_sent_whole() {
    let app = Router::new()
        .route("/transcribe", post(describe_upload))
        .layer(DefaultBodyLimit::disable());
    let url = spawn_stub(app).await;
    let transcriber = HttpTranscriber::new(config(url)).unwrap();

    let audio = Bytes::from(vec![7u8; 3 * 1024 * 1024]);
    let transcript = transcriber.transcribe("long.wav", audio).await.unwrap();

    assert_eq!(transcript, "3145728 bytes of long.wav for whisper-1");
}

#[tokio::test]
async fn test_custom_transcript_field() {
    let app = Router::new().route(
        "/transcribe",
        post(|| async { Json(json!({ "transcription": "hi", "text": 3 })) }),
    );
    let url = spawn_stub(app).await;

    let mut cfg = config(url);
    cfg.transcript_field = "transcription".to_string();
    let transcriber = HttpTranscriber::new(cfg).unwrap();

    let transcript = transcriber.transcribe("a.wav", Bytes::from_static(b"x")).await.unwrap();
    assert_eq!(transcript, "hi");
}

#[tokio::test]
async fn test_missing_field_is_protocol_error() {
    let app = Router::new().route(
        "/transcribe",
        post(|| async { Json(json!({ "result": "no text here" })) }),
    );
    let url = spawn_stub(app).await;
    let transcriber = HttpTranscriber::new(config(url)).unwrap();

    let err = transcriber
        .transcribe("a.wav", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::UpstreamProtocolError(_)));
    assert_eq!(err.code(), "upstream_protocol_error");
}

#[tokio::test]
async fn test_non_json_body_is_protocol_error() {
    let app = Router::new().route("/transcribe", post(|| async { "plain text" }));
    let url = spawn_stub(app).await;
    let transcriber = HttpTranscriber::new(config(url)).unwrap();

    let err = transcriber
        .transcribe("a.wav", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::UpstreamProtocolError(_)));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let app = Router::new().route(
        "/transcribe",
        post(|| async { (StatusCode::BAD_GATEWAY, "model not loaded") }),
    );
    let url = spawn_stub(app).await;
    let transcriber = HttpTranscriber::new(config(url)).unwrap();

    let err = transcriber
        .transcribe("a.wav", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_unavailable() {
    // Reserve a port, then close it so nothing is listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transcriber = HttpTranscriber::new(config(format!("http://{addr}/transcribe"))).unwrap();
    let err = transcriber
        .transcribe("a.wav", Bytes::from_static(b"x"))
        .await
        .unwrap_err();

    assert!(matches!(err, InferenceError::UpstreamUnavailable(_)));
    assert_eq!(err.code(), "upstream_unavailable");
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let app = Router::new().route(
        "/transcribe",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(json!({ "text": "too late" }))
        }),
    );
    let url = spawn_stub(app).await;

    let mut cfg = config(url);
    cfg.timeout = Duration::from_millis(200);
    let transcriber = HttpTranscriber::new(cfg).unwrap();

    let started = std::time::Instant::now();
    let err = transcriber
        .transcribe("a.wav", Bytes::from_static(b"x"))
        .await
        .unwrap_err();

    assert!(matches!(err, InferenceError::UpstreamUnavailable(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
