use std::time::Duration;

use grant_align::PipelineError;
use grant_align::app::Secrets;
use grant_align::dropbox::{DropboxClient, DropboxConfig};
use grant_align::storage::{RemoteStore, download_folder};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn secrets() -> Secrets {
    Secrets {
        app_key: "key".to_string(),
        app_secret: "secret".to_string(),
        refresh_token: "refresh".to_string(),
    }
}

fn conf(server: &MockServer) -> DropboxConfig {
    DropboxConfig {
        token_url: format!("{}/oauth2/token", server.uri()),
        api_base_url: server.uri(),
        content_base_url: server.uri(),
        timeout: Duration::from_secs(5),
    }
}

fn file_entry(name: &str, folder: &str) -> Value {
    json!({
        ".tag": "file",
        "name": name,
        "path_lower": format!("{}/{}", folder, name.to_lowercase()),
        "path_display": format!("{}/{}", folder, name),
    })
}

#[tokio::test]
async fn connect_exchanges_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh"))
        .and(body_string_contains("client_id=key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "token_type": "bearer",
            "expires_in": 14400
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(header("Authorization", "Bearer tok"))
        .and(body_json(json!({ "path": "/GrantAlignTool" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [],
            "cursor": "c0",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::connect(conf(&server), &secrets()).await.unwrap();
    assert!(client.list("/GrantAlignTool").await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_refresh_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let err = DropboxClient::connect(conf(&server), &secrets()).await.err().unwrap();
    match err {
        PipelineError::Auth(msg) => assert!(msg.contains("invalid_grant")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn list_follows_cursor_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry("A.pdf", "/grantaligntool")],
            "cursor": "c1",
            "has_more": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_json(json!({ "cursor": "c1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                { ".tag": "folder", "name": "Projects", "path_lower": "/grantaligntool/projects" },
                file_entry("B.pdf", "/grantaligntool")
            ],
            "cursor": "c2",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let client = DropboxClient::new(conf(&server), "tok".to_string()).unwrap();
    let entries = client.list("/GrantAlignTool").await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["A.pdf", "Projects", "B.pdf"]);
    assert_eq!(entries.iter().filter(|e| e.is_file()).count(), 2);
}

#[tokio::test]
async fn list_failure_is_a_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(409).set_body_string("path/not_found"))
        .mount(&server)
        .await;

    let client = DropboxClient::new(conf(&server), "tok".to_string()).unwrap();
    let err = client.list("/Missing").await.unwrap_err();
    assert!(matches!(err, PipelineError::Remote { status: Some(409), .. }));
}

#[tokio::test]
async fn download_folder_skips_failed_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                file_entry("good.pdf", "/grantaligntool/projects"),
                file_entry("bad.pdf", "/grantaligntool/projects")
            ],
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header(
            "Dropbox-API-Arg",
            r#"{"path":"/grantaligntool/projects/good.pdf"}"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-good".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header(
            "Dropbox-API-Arg",
            r#"{"path":"/grantaligntool/projects/bad.pdf"}"#,
        ))
        .respond_with(ResponseTemplate::new(409).set_body_string("restricted_content"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let list_path = dir.path().join("file_list.txt");
    let client = DropboxClient::new(conf(&server), "tok".to_string()).unwrap();
    let names = download_folder(&client, "/GrantAlignTool/Projects", dir.path(), Some(&list_path))
        .await
        .unwrap();

    assert_eq!(names, vec!["good.pdf"]);
    assert_eq!(std::fs::read(dir.path().join("good.pdf")).unwrap(), b"%PDF-good");
    assert!(!dir.path().join("bad.pdf").exists());
    assert_eq!(std::fs::read_to_string(list_path).unwrap(), "good.pdf\n");
}

#[tokio::test]
async fn upload_uses_overwrite_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .and(header("Content-Type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "result_Alpha.txt",
            "path_display": "/GrantAlignTool/result_Alpha.txt"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("result_Alpha.txt");
    std::fs::write(&local, "Summary:\nA1").unwrap();

    let client = DropboxClient::new(conf(&server), "tok".to_string()).unwrap();
    for _ in 0..2 {
        let remote = client.upload(&local, "/GrantAlignTool/").await.unwrap();
        assert_eq!(remote, "/GrantAlignTool/result_Alpha.txt");
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests {
        let arg = request.headers.get("Dropbox-API-Arg").unwrap().to_str().unwrap();
        let arg: Value = serde_json::from_str(arg).unwrap();
        assert_eq!(arg["path"], "/GrantAlignTool/result_Alpha.txt");
        assert_eq!(arg["mode"], "overwrite");
        assert_eq!(request.body, b"Summary:\nA1");
    }
}

#[tokio::test]
async fn rejected_upload_is_a_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/upload"))
        .respond_with(ResponseTemplate::new(507).set_body_string("insufficient_space"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("result_Alpha.txt");
    std::fs::write(&local, "x").unwrap();

    let client = DropboxClient::new(conf(&server), "tok".to_string()).unwrap();
    let err = client.upload(&local, "/GrantAlignTool").await.unwrap_err();
    assert!(matches!(err, PipelineError::Remote { status: Some(507), .. }));
}
