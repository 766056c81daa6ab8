mod common;

use axum::http::{Method, StatusCode};
use common::MockBackend;
use podcraft_client::protocol::{ScriptRequest, VoiceAssignment};
use podcraft_client::ApiError;

#[tokio::test]
async fn lists_podcasts() {
    let backend = MockBackend::start().await;
    let podcasts = backend.api().list_podcasts().await.unwrap();
    assert_eq!(podcasts.len(), 2);
    assert_eq!(podcasts[0].id, "p-1");
    assert_eq!(podcasts[1].description, None);
}

#[tokio::test]
async fn creates_and_deletes_podcast() {
    let backend = MockBackend::start().await;
    let api = backend.api();

    let created = api.create_podcast("Weekly").await.unwrap();
    assert_eq!(created.id, "p-new");
    assert_eq!(created.title, "Weekly");

    api.delete_podcast("p-new").await.unwrap();
    let requests = backend.requests();
    let delete = requests.iter().find(|r| r.method == Method::DELETE).unwrap();
    assert_eq!(delete.path, "/api/podcasts");
    assert_eq!(delete.body_text(), r#"{"uuid":"p-new"}"#);
}

#[tokio::test]
async fn generate_script_sends_multipart_chapters() {
    let backend = MockBackend::start().await;
    let request = ScriptRequest::from_chapter_list("p-1", "Intro, Chapter 2,,");
    backend.api().generate_script(&request).await.unwrap();

    let requests = backend.requests();
    let sent = &requests[0];
    assert_eq!(sent.path, "/api/generate_podcast_script");
    assert!(sent.content_type.starts_with("multipart/form-data"));
    let body = sent.body_text();
    assert!(body.contains(r#"name="podcast_uuid""#));
    assert_eq!(body.matches(r#"name="chapters""#).count(), 2);
    assert!(body.contains("Chapter 2"));
}

#[tokio::test]
async fn transcript_and_generate_post_plain_uuid() {
    let backend = MockBackend::start().await;
    let api = backend.api();
    api.save_transcript("p-1").await.unwrap();
    api.generate_podcast("p-1").await.unwrap();

    let requests = backend.requests();
    assert_eq!(requests[0].path, "/api/podcasts/save-transcript");
    assert_eq!(requests[1].path, "/api/generate_podcast");
    for r in &requests {
        assert_eq!(r.method, Method::POST);
        assert_eq!(r.content_type, "text/plain");
        assert_eq!(r.body_text(), "p-1");
    }
}

#[tokio::test]
async fn upload_voice_sends_wav_part() {
    let backend = MockBackend::start().await;
    backend
        .api()
        .upload_voice("narrator", b"RIFF....WAVE".to_vec())
        .await
        .unwrap();

    let sent = &backend.requests()[0];
    assert_eq!(sent.path, "/api/voices/upload");
    let body = sent.body_text();
    assert!(body.contains(r#"name="file"; filename="recording.wav""#));
    assert!(body.to_lowercase().contains("content-type: audio/wav"));
    assert!(body.contains(r#"name="voiceName""#));
    assert!(body.contains("narrator"));
}

#[tokio::test]
async fn voice_info_and_assignment() {
    let backend = MockBackend::start().await;
    let api = backend.api();
    let info = api.voice_info().await.unwrap();
    assert_eq!(info.voices[0].filename, "alice.wav");
    assert!(info.custom_voices.is_empty());

    api.assign_voice(&VoiceAssignment {
        podcast_uuid: "p-1".into(),
        speaker_id: 2,
        voice_name: "alice".into(),
    })
    .await
    .unwrap();
    let sent = &backend.requests()[0];
    assert_eq!(sent.path, "/api/voices/assign");
    assert!(sent.body_text().contains(r#""speaker_id":2"#));
}

#[tokio::test]
async fn error_detail_is_surfaced() {
    let backend = MockBackend::start().await;
    backend.set_form_reply(StatusCode::NOT_FOUND, r#"{"detail":"Voice not found"}"#);

    let err = backend
        .api()
        .delete_voice("voices/ghost.wav")
        .await
        .unwrap_err();
    match &err {
        ApiError::Status { status, detail } => {
            assert_eq!(*status, StatusCode::NOT_FOUND);
            assert_eq!(detail.as_deref(), Some("Voice not found"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(err.user_message("Error deleting voice."), "Voice not found");

    let sent = &backend.requests()[0];
    assert_eq!(sent.method, Method::DELETE);
    assert_eq!(sent.body_text(), r#"{"filepath":"voices/ghost.wav"}"#);
}

#[tokio::test]
async fn plain_error_body_used_as_detail() {
    let backend = MockBackend::start().await;
    backend.set_form_reply(StatusCode::INTERNAL_SERVER_ERROR, "generation queue full");
    let err = backend.api().generate_podcast("p-1").await.unwrap_err();
    assert_eq!(err.user_message("Error generating podcast."), "generation queue full");
}

#[tokio::test]
async fn undecodable_body_is_decode_error() {
    let backend = MockBackend::start().await;
    backend.set_audio(serde_json::json!("not an object"));
    let err = backend.api().podcast_audio_url().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_http_error() {
    let api = podcraft_client::PodcraftApi::new(&podcraft_client::config::ServerConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: Some(2),
    })
    .unwrap();
    let err = api.list_podcasts().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}
