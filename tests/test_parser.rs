mod common;

use common::ChunkReader;
use rawhttp::config::ParserConfig;
use rawhttp::http::error::{BufferError, ParseError};
use rawhttp::http::parser::{BodyFraming, ParserState, read_request};
use rawhttp::http::request::{Method, Request};

async fn parse_in_chunks(data: &str, per_read: usize) -> Result<Request, ParseError> {
    let mut reader = ChunkReader::new(data, per_read);
    read_request(&mut reader, &ParserConfig::default()).await
}

fn strict() -> ParserConfig {
    ParserConfig {
        body_framing: BodyFraming::Strict,
        ..ParserConfig::default()
    }
}

#[tokio::test]
async fn test_parse_simple_get_request() {
    let req = "GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n";
    let parsed = parse_in_chunks(req, 3).await.unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.target, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.header("host"), Some("localhost:42069"));
    assert_eq!(parsed.header("user-agent"), Some("curl/7.81.0"));
    assert_eq!(parsed.header("accept"), Some("*/*"));
}

#[tokio::test]
async fn test_parse_request_one_byte_at_a_time() {
    let req = "GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n";
    let parsed = parse_in_chunks(req, 1).await.unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.target, "/coffee");
}

#[tokio::test]
async fn test_parse_post_request_with_body() {
    let req = "POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let parsed = parse_in_chunks(req, 5).await.unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.target, "/api");
    assert_eq!(parsed.body, b"hello".to_vec());
}

#[tokio::test]
async fn test_parse_request_with_path_and_query_string() {
    let req = "GET /search?q=rust HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let parsed = parse_in_chunks(req, 10).await.unwrap();

    assert_eq!(parsed.target, "/search?q=rust");
}

#[tokio::test]
async fn test_chunk_size_independence() {
    let req = "PUT /resource HTTP/1.1\r\nContent-Type: text/plain\r\nAccept: a\r\naccept: b\r\nContent-Length: 13\r\n\r\n{\"data\":\"x\"}\n";
    let whole = parse_in_chunks(req, req.len()).await.unwrap();

    for per_read in 1..=req.len() {
        let parsed = parse_in_chunks(req, per_read).await.unwrap();
        assert_eq!(parsed, whole, "mismatch with {per_read} bytes per read");
    }
    assert_eq!(whole.body, b"{\"data\":\"x\"}\n".to_vec());
    assert_eq!(whole.header("accept"), Some("a,b"));
}

#[tokio::test]
async fn test_chunk_size_independence_with_tiny_buffer() {
    let req = "DELETE /items/42 HTTP/1.1\r\nAuthorization: Bearer token123\r\n\r\n";
    let config = ParserConfig {
        initial_buffer_size: 8,
        ..ParserConfig::default()
    };

    for per_read in [1, 3, 7, 8, 22, req.len()] {
        let mut reader = ChunkReader::new(req, per_read);
        let parsed = read_request(&mut reader, &config).await.unwrap();
        assert_eq!(parsed.method, Method::DELETE);
        assert_eq!(parsed.target, "/items/42");
        assert_eq!(parsed.header("authorization"), Some("Bearer token123"));
    }
}

#[tokio::test]
async fn test_duplicate_headers_are_merged() {
    let req = "GET / HTTP/1.1\r\nAccept: text/html\r\nAccept: application/json\r\n\r\n";
    let parsed = parse_in_chunks(req, 4).await.unwrap();

    assert_eq!(parsed.header("accept"), Some("text/html,application/json"));
    assert_eq!(parsed.headers.len(), 1);
}

#[tokio::test]
async fn test_case_insensitive_headers_are_merged() {
    let req = "GET / HTTP/1.1\r\nHost: example.com\r\nHOST: example2.com\r\n\r\n";
    let parsed = parse_in_chunks(req, 6).await.unwrap();

    assert_eq!(parsed.header("host"), Some("example.com,example2.com"));
    assert_eq!(parsed.header("Host"), Some("example.com,example2.com"));
}

#[tokio::test]
async fn test_header_value_whitespace_is_trimmed() {
    let req = "GET / HTTP/1.1\r\n       Content-Type:   application/json; charset=utf-8   \r\n\r\n";
    let parsed = parse_in_chunks(req, 7).await.unwrap();

    assert_eq!(parsed.header("content-type"), Some("application/json; charset=utf-8"));
}

#[tokio::test]
async fn test_no_body_completion() {
    let parsed = parse_in_chunks("GET / HTTP/1.1\r\n\r\n", 5).await.unwrap();

    assert!(parsed.headers.is_empty());
    assert!(parsed.body.is_empty());
}

#[tokio::test]
async fn test_no_content_length_ignores_trailing_bytes() {
    let req = "POST /submit HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"data\":\"test\"}";
    let parsed = parse_in_chunks(req, req.len()).await.unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert!(parsed.body.is_empty());
}

#[tokio::test]
async fn test_extension_method() {
    let parsed = parse_in_chunks("BREW /pot HTTP/1.1\r\n\r\n", 4).await.unwrap();
    assert_eq!(parsed.method, Method::Extension("BREW".to_string()));
}

#[tokio::test]
async fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
    ];

    for (method_str, expected_method) in methods {
        let req = format!("{} / HTTP/1.1\r\n\r\n", method_str);
        let parsed = parse_in_chunks(&req, 2).await.unwrap();
        assert_eq!(parsed.method, expected_method);
    }
}

#[tokio::test]
async fn test_parse_request_with_empty_body() {
    let req = "POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n";
    let parsed = parse_in_chunks(req, 3).await.unwrap();

    assert_eq!(parsed.body.len(), 0);
}

#[tokio::test]
async fn test_parse_request_with_binary_body() {
    let req = b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\xff\x03";
    let mut reader = ChunkReader::new(req, 2);
    let parsed = read_request(&mut reader, &ParserConfig::default()).await.unwrap();

    assert_eq!(parsed.body, vec![0, 1, 255, 3]);
}

#[tokio::test]
async fn test_reject_wrong_field_count() {
    let result = parse_in_chunks("/coffee HTTP/1.1\r\nHost: localhost\r\n\r\n", 4).await;
    assert!(matches!(result, Err(ParseError::InvalidRequestLine(_))));

    let result = parse_in_chunks("GET /index HTTP\r\nHost: localhost\r\n\r\n", 4).await;
    assert!(matches!(result, Err(ParseError::UnsupportedVersion(_)) | Err(ParseError::InvalidRequestLine(_))));
}

#[tokio::test]
async fn test_reject_lowercase_method() {
    let result = parse_in_chunks("get / HTTP/1.1\r\nHost: localhost\r\n\r\n", 2).await;
    assert!(matches!(result, Err(ParseError::InvalidMethod(m)) if m == "get"));
}

#[tokio::test]
async fn test_reject_wrong_version() {
    let result = parse_in_chunks("GET / HTTP/2.0\r\nHost: localhost\r\n\r\n", 7).await;
    assert!(matches!(result, Err(ParseError::UnsupportedVersion(v)) if v == "HTTP/2.0"));
}

#[tokio::test]
async fn test_reject_empty_request_line() {
    let result = parse_in_chunks("\r\nGET / HTTP/1.1\r\n\r\n", 4).await;
    assert!(matches!(result, Err(ParseError::EmptyRequestLine)));
}

#[tokio::test]
async fn test_reject_malformed_header() {
    let result = parse_in_chunks("GET / HTTP/1.1\r\nHost localhost:42069\r\n\r\n", 3).await;
    assert!(matches!(result, Err(ParseError::MalformedHeader(_))));
}

#[tokio::test]
async fn test_reject_space_before_colon() {
    let result = parse_in_chunks("GET / HTTP/1.1\r\n       Host : localhost:42069       \r\n\r\n", 3).await;
    assert!(matches!(result, Err(ParseError::InvalidHeaderName(_))));
}

#[tokio::test]
async fn test_reject_invalid_header_characters() {
    let result = parse_in_chunks("GET / HTTP/1.1\r\nH©st: localhost:42069\r\n\r\n", 3).await;
    assert!(matches!(result, Err(ParseError::InvalidHeaderName(_))));
}

#[tokio::test]
async fn test_reject_invalid_content_length() {
    for value in ["abc", "-1", "+5", ""] {
        let req = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\nhello", value);
        let result = parse_in_chunks(&req, 8).await;
        assert!(
            matches!(result, Err(ParseError::InvalidContentLength(_))),
            "accepted Content-Length {value:?}"
        );
    }
}

#[tokio::test]
async fn test_reject_body_longer_than_content_length() {
    let req = "POST /api HTTP/1.1\r\nContent-Length: 3\r\n\r\nhello";
    let result = parse_in_chunks(req, req.len()).await;

    assert!(matches!(
        result,
        Err(ParseError::ContentLengthExceeded { declared: 3, received: 5 })
    ));
}

#[tokio::test]
async fn test_short_body_accepted_at_end_of_stream() {
    // End-of-stream before the declared length completes the request in
    // lenient mode; this is the documented framing ambiguity.
    let req = "POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhell";
    let parsed = parse_in_chunks(req, 3).await.unwrap();

    assert_eq!(parsed.body, b"hell".to_vec());
}

#[tokio::test]
async fn test_short_body_rejected_in_strict_mode() {
    let req = "POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhell";
    let mut reader = ChunkReader::new(req, 3);
    let result = read_request(&mut reader, &strict()).await;

    assert!(matches!(
        result,
        Err(ParseError::IncompleteRequest {
            state: ParserState::ParsingBody,
            declared: Some(5),
            received: 4,
        })
    ));
}

#[tokio::test]
async fn test_missing_end_of_headers_accepted_at_end_of_stream() {
    let parsed = parse_in_chunks("GET / HTTP/1.1\r\nHost: example.com\r\n", 8).await.unwrap();
    assert_eq!(parsed.header("host"), Some("example.com"));

    let mut reader = ChunkReader::new("GET / HTTP/1.1\r\nHost: example.com\r\n", 8);
    let result = read_request(&mut reader, &strict()).await;
    assert!(matches!(
        result,
        Err(ParseError::IncompleteRequest { state: ParserState::ParsingHeaders, .. })
    ));
}

#[tokio::test]
async fn test_complete_request_passes_strict_mode() {
    let req = "POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
    let mut reader = ChunkReader::new(req, 1);
    let parsed = read_request(&mut reader, &strict()).await.unwrap();

    assert_eq!(parsed.body, b"hello".to_vec());
}

#[tokio::test]
async fn test_end_of_stream_without_request_line() {
    assert!(matches!(parse_in_chunks("", 1).await, Err(ParseError::NoRequest)));
    assert!(matches!(parse_in_chunks("GET / HTT", 2).await, Err(ParseError::NoRequest)));
}

#[tokio::test]
async fn test_line_longer_than_buffer_limit() {
    let config = ParserConfig {
        initial_buffer_size: 8,
        max_buffer_size: Some(32),
        body_framing: BodyFraming::Lenient,
    };
    let req = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(64));
    let mut reader = ChunkReader::new(req, 4);
    let result = read_request(&mut reader, &config).await;

    assert!(matches!(
        result,
        Err(ParseError::Buffer(BufferError::LimitExceeded { limit: 32 }))
    ));
}

#[tokio::test]
async fn test_large_body_streams_through_small_buffer() {
    let body = "x".repeat(10_000);
    let req = format!("POST /big HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
    let config = ParserConfig {
        initial_buffer_size: 16,
        max_buffer_size: Some(64),
        body_framing: BodyFraming::Strict,
    };
    let mut reader = ChunkReader::new(&req, 100);
    let parsed = read_request(&mut reader, &config).await.unwrap();

    assert_eq!(parsed.body.len(), 10_000);
}
