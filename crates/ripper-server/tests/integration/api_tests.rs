use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::integration::common::setup_test_app;

async fn post_convert(router: &Router, body: serde_json::Value) -> Response {
    router
        .clone()
        .oneshot(
            Request::post("/api/convert")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(router: &Router, uri: &str) -> Response {
    router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn submit(router: &Router, body: serde_json::Value) -> String {
    let response = post_convert(router, body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    json_body(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn wait_terminal(router: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(router, &format!("/api/status/{job_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        if json["status"] == "complete" || json["status"] == "error" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} never finished");
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let response = get(&app.router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["jobs"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let response = get(&app.router, "/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert!(json["paths"]["/api/convert"].is_object());
    assert!(json["paths"]["/api/download/{job_id}/{filename}"].is_object());
}

#[tokio::test]
async fn too_many_urls_returns_400_without_creating_a_job() {
    let app = setup_test_app().await;
    let urls: Vec<String> = (0..21).map(|i| format!("https://youtu.be/v{i}")).collect();

    let response = post_convert(&app.router, serde_json::json!({ "urls": urls })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["error"], "Maximum 20 links at a time");
    assert_eq!(json["kind"], "validation_error");
    assert!(app.state.service.store().is_empty());
}

#[tokio::test]
async fn invalid_lines_are_reported() {
    let app = setup_test_app().await;

    let response = post_convert(
        &app.router,
        serde_json::json!({
            "urls": ["https://youtu.be/a", "https://evil.com/watch"],
            "source": "youtube",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid YouTube URL(s) at line(s): 2"
    );
}

#[tokio::test]
async fn malformed_bodies_return_400_with_error_body() {
    let app = setup_test_app().await;

    let wrong_type = post_convert(
        &app.router,
        serde_json::json!({ "urls": "https://youtu.be/a" }),
    )
    .await;

    let not_json = app
        .router
        .clone()
        .oneshot(
            Request::post("/api/convert")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    let no_content_type = app
        .router
        .clone()
        .oneshot(
            Request::post("/api/convert")
                .body(Body::from(r#"{"url":"https://youtu.be/a"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    for response in [wrong_type, not_json, no_content_type] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["kind"], "validation_error");
        assert!(!json["error"].as_str().unwrap().is_empty());
    }
    assert!(app.state.service.store().is_empty());
}

#[tokio::test]
async fn missing_url_returns_400() {
    let app = setup_test_app().await;

    let response = post_convert(&app.router, serde_json::json!({ "url": "  " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Please provide at least one URL"
    );
}

#[tokio::test]
async fn unknown_job_returns_404() {
    let app = setup_test_app().await;

    let response = get(&app.router, "/api/status/doesnotexist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = json_body(response).await;
    assert_eq!(json["error"], "Job not found");
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn convert_poll_and_download() {
    let app = setup_test_app().await;

    let job_id = submit(
        &app.router,
        serde_json::json!({ "url": "https://www.youtube.com/watch/song", "browser": "lynx" }),
    )
    .await;
    assert_eq!(job_id.len(), 12);

    let job = wait_terminal(&app.router, &job_id).await;
    assert_eq!(job["status"], "complete");
    assert_eq!(job["total"], 1);
    let filename = format!("{job_id}_song.mp3");
    assert_eq!(job["files"], serde_json::json!([filename]));
    assert!(job["error"].is_null());

    let response = get(&app.router, &format!("/api/download/{job_id}/{filename}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{filename}\"").as_str()
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ID3");
    assert!(app.output_dir.path().join(&filename).exists());
}

#[tokio::test]
async fn download_works_for_dotted_titles() {
    let app = setup_test_app().await;

    let job_id = submit(
        &app.router,
        serde_json::json!({ "url": "https://youtu.be/Wait..." }),
    )
    .await;

    let job = wait_terminal(&app.router, &job_id).await;
    assert_eq!(job["status"], "complete");
    let filename = format!("{job_id}_Wait....mp3");
    assert_eq!(job["files"], serde_json::json!([filename]));

    let response = get(&app.router, &format!("/api/download/{job_id}/{filename}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ID3");
}

#[tokio::test]
async fn single_failure_surfaces_extractor_stderr() {
    let app = setup_test_app().await;

    let job_id = submit(
        &app.router,
        serde_json::json!({ "url": "https://youtu.be/fail" }),
    )
    .await;

    let job = wait_terminal(&app.router, &job_id).await;
    assert_eq!(job["status"], "error");
    assert!(
        job["error"]
            .as_str()
            .unwrap()
            .starts_with("ERROR: Unsupported URL")
    );
    assert_eq!(job["files"], serde_json::json!([]));
}

#[tokio::test]
async fn batch_keeps_partial_results() {
    let app = setup_test_app().await;

    let job_id = submit(
        &app.router,
        serde_json::json!({
            "urls": [
                "https://soundcloud.com/artist/one",
                "https://soundcloud.com/artist/fail",
                "https://soundcloud.com/artist/empty",
            ],
            "source": "soundcloud",
        }),
    )
    .await;

    let job = wait_terminal(&app.router, &job_id).await;
    assert_eq!(job["status"], "complete");
    assert_eq!(job["completed_count"], 3);
    assert_eq!(job["files"], serde_json::json!([format!("{job_id}_0_one.mp3")]));

    let errors = job["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].as_str().unwrap().starts_with("Link 2: "));
    assert!(errors[1].as_str().unwrap().starts_with("Link 3: "));
}

#[tokio::test]
async fn download_of_unlisted_file_returns_404() {
    let app = setup_test_app().await;

    let job_id = submit(
        &app.router,
        serde_json::json!({ "url": "https://youtu.be/track" }),
    )
    .await;
    wait_terminal(&app.router, &job_id).await;

    // present on disk but never recorded on the job
    std::fs::write(app.output_dir.path().join("other.mp3"), b"ID3").unwrap();

    let response = get(&app.router, &format!("/api/download/{job_id}/other.mp3")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["error"],
        "File not found for this job"
    );

    let response = get(
        &app.router,
        &format!("/api/download/{job_id}/..%2F{job_id}_track.mp3"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
