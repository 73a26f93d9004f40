use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;

use ripper_core::{
    ConvertService, ConverterConfig, RetentionConfig, TokioProcessRunner, TracingJobReporter,
};
use ripper_server::routes;
use ripper_server::state::AppState;

/// Stand-in for yt-dlp. URLs containing `fail` exit 1, URLs containing
/// `empty` exit 0 without output, anything else writes one mp3 titled after
/// the last path segment.
const FAKE_EXTRACTOR: &str = r#"#!/bin/sh
out=""
url=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    *) url="$1"; shift ;;
  esac
done
case "$url" in
  *fail*) echo "ERROR: Unsupported URL: $url" >&2; exit 1 ;;
  *empty*) exit 0 ;;
esac
title=$(basename "$url")
file=$(printf '%s' "$out" | sed -e "s/%(title)s/$title/" -e "s/%(ext)s/mp3/")
printf 'ID3' > "$file"
"#;

// Written once, before any test spawns a child, so no fork can inherit an
// open write handle to the script.
static EXTRACTOR: OnceLock<(TempDir, PathBuf)> = OnceLock::new();

fn extractor_path() -> PathBuf {
    let (_, path) = EXTRACTOR.get_or_init(|| {
        let dir = TempDir::new().expect("Failed to create extractor dir");
        let path = dir.path().join("fake-yt-dlp");
        std::fs::write(&path, FAKE_EXTRACTOR).expect("Failed to write extractor");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod extractor");
        (dir, path)
    });
    path.clone()
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub output_dir: TempDir,
}

/// Build the router over a real service that shells out to the fake extractor.
pub async fn setup_test_app() -> TestApp {
    let output_dir = TempDir::new().expect("Failed to create output dir");
    let config = ConverterConfig::default()
        .with_output_dir(output_dir.path())
        .with_extractor_bin(extractor_path().to_string_lossy())
        .with_process_timeout(Duration::from_secs(10))
        .with_retention(RetentionConfig::default().with_purge_on_shutdown(false));

    let service = ConvertService::new(config, TokioProcessRunner, Arc::new(TracingJobReporter))
        .expect("Failed to start service");
    let state = Arc::new(AppState { service });

    TestApp {
        router: routes::router(Arc::clone(&state)),
        state,
        output_dir,
    }
}
