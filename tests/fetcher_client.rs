use pagechat::extractor::Extractor;
use pagechat::fetcher::{FetchError, HttpFetcher};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5)).unwrap()
}

async fn serve_html(server: &MockServer, route: &str, body: impl Into<Vec<u8>>, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.into())
                .insert_header("Content-Type", content_type),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/page",
        "<html><head><title>Test</title></head><body>Hello World</body></html>",
        "text/html; charset=utf-8",
    )
    .await;

    let url = format!("{}/page", server.uri());
    let page = fetcher().fetch(&url).await.unwrap();

    assert!(page.status.is_success());
    assert!(page.body_utf8.contains("Hello World"));
    assert_eq!(page.url_final.as_str(), url);
}

#[tokio::test]
async fn test_fetch_decodes_declared_charset() {
    let server = MockServer::start().await;
    // "Café" in windows-1252
    let body = b"<html><body><p>Caf\xe9</p></body></html>".to_vec();
    serve_html(&server, "/latin", body, "text/html; charset=windows-1252").await;

    let page = fetcher()
        .fetch(&format!("{}/latin", server.uri()))
        .await
        .unwrap();

    assert!(page.body_utf8.contains("Café"));
    assert_eq!(page.encoding.name(), "windows-1252");
}

#[tokio::test]
async fn test_fetch_status_errors_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    match fetcher().fetch(&format!("{}/missing", server.uri())).await {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(!retriable);
        }
        other => panic!("expected HTTP 404 error, got {other:?}"),
    }

    let err = fetcher()
        .fetch(&format!("{}/broken", server.uri()))
        .await
        .unwrap_err();
    assert!(err.should_retry());
}

#[tokio::test]
async fn test_fetch_follows_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    serve_html(&server, "/new", "<html><body>Moved here</body></html>", "text/html").await;

    let page = fetcher()
        .fetch(&format!("{}/old", server.uri()))
        .await
        .unwrap();

    assert!(page.body_utf8.contains("Moved here"));
    assert!(page.url_final.as_str().ends_with("/new"));
}

#[tokio::test]
async fn test_fetch_gzip_body() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(b"<html><body><main>Compressed article</main></body></html>")
        .unwrap();
    let compressed = encoder.finish().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(compressed)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .insert_header("Content-Encoding", "gzip"),
        )
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch(&format!("{}/gz", server.uri()))
        .await
        .unwrap();
    assert!(page.body_utf8.contains("Compressed article"));
}

#[tokio::test]
async fn test_fetch_rejects_non_html() {
    let server = MockServer::start().await;
    serve_html(&server, "/doc.pdf", b"%PDF-1.7".to_vec(), "application/pdf").await;

    match fetcher().fetch(&format!("{}/doc.pdf", server.uri())).await {
        Err(FetchError::UnsupportedContentType(ct)) => assert_eq!(ct, "application/pdf"),
        other => panic!("expected UnsupportedContentType, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_body_too_large() {
    let server = MockServer::start().await;
    let size = 6 * 1024 * 1024;
    serve_html(&server, "/huge", "x".repeat(size), "text/html").await;

    match fetcher().fetch(&format!("{}/huge", server.uri())).await {
        Err(FetchError::BodyTooLarge(n)) => assert_eq!(n, size as u64),
        other => panic!("expected BodyTooLarge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_chunked_body_stops_at_cap() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const CAP: u64 = 5 * 1024 * 1024;
    const CHUNK: usize = 64 * 1024;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;

        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        // 8 MB in total, streamed without a Content-Length
        let data = vec![b'x'; CHUNK];
        for _ in 0..128 {
            let size_line = format!("{CHUNK:x}\r\n");
            let frame = [size_line.as_bytes(), data.as_slice(), &b"\r\n"[..]].concat();
            if socket.write_all(&frame).await.is_err() {
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });

    match fetcher().fetch(&format!("http://{addr}/stream")).await {
        Err(FetchError::BodyTooLarge(n)) => {
            assert!(n > CAP);
            assert!(n < 8 * 1024 * 1024, "read {n} bytes before giving up");
        }
        other => panic!("expected BodyTooLarge, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_invalid_url() {
    assert!(matches!(
        fetcher().fetch("not a url").await,
        Err(FetchError::InvalidUrl(_))
    ));
}

#[tokio::test]
async fn test_extractor_over_http_backend() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/article",
        r#"<html><head><title>Release Notes</title><script>var x = 1;</script></head>
        <body><nav>Home | Blog</nav>
        <main><h1>Version 2</h1><h2>What changed</h2><p>Faster   startup.</p></main>
        <footer>Copyright</footer></body></html>"#,
        "text/html; charset=utf-8",
    )
    .await;

    let extractor = Extractor::new(Arc::new(fetcher()), true);
    let result = extractor
        .extract(&format!("{}/article", server.uri()))
        .await;

    assert!(result.succeeded(), "{:?}", result.error);
    assert_eq!(result.title, "Release Notes");
    assert_eq!(result.headings.h1, "Version 2");
    assert_eq!(result.headings.h2, "What changed");
    assert!(result.content.starts_with("Release Notes Version 2 What changed"));
    assert!(result.content.contains("Faster startup."));
    assert!(!result.content.contains("Home | Blog"));
    assert!(!result.content.contains("Copyright"));
    assert!(!result.content.contains("var x"));
}

#[tokio::test]
async fn test_extractor_blocks_loopback_without_opt_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let extractor = Extractor::new(Arc::new(fetcher()), false);
    let result = extractor.extract(&format!("{}/internal", server.uri())).await;

    assert!(!result.succeeded());
    assert!(result.error.unwrap().contains("blocked"));
    assert!(result.content.is_empty());
}
