//! Export on one installation, serve the publish directory over HTTP, import
//! on another. Archive commands run the real `tar`.

mod common;

use common::{database, gnu_tar_available, install, RecordingRunner};
use sitesync::{Exporter, ImportOptions, Importer, RemoteFetcher, Secret, Toolchain};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn publish(server: &MockServer, web: &Path, file: &str) {
    let body = fs::read(web.join(file)).unwrap();
    Mock::given(method("GET"))
        .and(path(format!("/{}", file)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_export_then_import_merges_assets() {
    if !gnu_tar_available() {
        eprintln!("skipping: GNU tar not available");
        return;
    }

    let secret = Secret::new("abc123").unwrap();

    // Exporting side
    let live = TempDir::new().unwrap();
    fs::create_dir_all(live.path().join("var/uploads/media/1")).unwrap();
    fs::write(live.path().join("var/uploads/media/1/logo.png"), b"PNG-live").unwrap();

    let export_runner = Arc::new(RecordingRunner::with_real_archive());
    Exporter::new(export_runner.clone(), Toolchain::default())
        .export(&secret, &database(None), &install(live.path()))
        .await
        .unwrap();

    let web = live.path().join("web");
    let server = MockServer::start().await;
    for file in ["abc123.phpcr", "abc123.sql", "abc123.tar.gz"] {
        publish(&server, &web, file).await;
    }

    // Importing side, with a local directory the archive does not know about
    let local = TempDir::new().unwrap();
    fs::create_dir_all(local.path().join("var/uploads/local-only")).unwrap();
    fs::write(local.path().join("var/uploads/local-only/keep.txt"), b"keep").unwrap();

    let work = TempDir::new().unwrap();
    let import_runner = Arc::new(RecordingRunner::with_real_archive());
    let fetcher = RemoteFetcher::new(reqwest::Client::new(), work.path());
    Importer::new(fetcher, import_runner.clone(), Toolchain::default())
        .import(
            &secret,
            &database(None),
            &server.uri(),
            &install(local.path()),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        fs::read(local.path().join("var/uploads/media/1/logo.png")).unwrap(),
        b"PNG-live"
    );
    assert_eq!(
        fs::read(local.path().join("var/uploads/local-only/keep.txt")).unwrap(),
        b"keep"
    );

    // The staged dumps are byte-identical to what was published.
    assert_eq!(
        fs::read(work.path().join("abc123.sql")).unwrap(),
        fs::read(web.join("abc123.sql")).unwrap()
    );
    assert_eq!(
        import_runner.operations(),
        vec![
            "doctrine:phpcr:workspace:purge",
            "doctrine:phpcr:workspace:import",
            "mysql",
            "tar",
        ]
    );
}
