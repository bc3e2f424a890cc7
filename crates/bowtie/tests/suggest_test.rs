use bowtie::SuggestionPrompt;
use bowtie::suggest::{SuggestConfig, SuggestError, SuggestionClient};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

/// Serves exactly one HTTP response and hands back the raw request it received.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
            head.push_str(&line);
            if line == "\r\n" {
                break;
            }
        }
        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        stream.flush().unwrap();
        head + &String::from_utf8(request_body).unwrap()
    });
    (format!("http://{addr}/v1/chat/completions"), handle)
}

fn client(endpoint: String) -> SuggestionClient {
    SuggestionClient::new(SuggestConfig {
        endpoint,
        api_key: Some("sk-test".to_string()),
        ..SuggestConfig::default()
    })
    .unwrap()
}

fn prompt() -> SuggestionPrompt {
    SuggestionPrompt::from_blocks("Loss of\nContainment", "Valve Failure", "Fire")
}

#[test]
fn returns_completion_text_verbatim() {
    let (endpoint, server) = serve_once(
        "200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"1. Overpressure\n2. Erosion"}}]}"#,
    );
    let text = client(endpoint).suggest(&prompt()).unwrap();
    assert_eq!(text, "1. Overpressure\n2. Erosion");

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["model"], "gpt-4o-mini");
    assert_eq!(json["messages"][0]["role"], "system");
    let user = json["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("Top event: Loss of Containment"));
    assert!(user.contains("Valve Failure"));
}

#[test]
fn unauthorized_maps_to_authentication_error() {
    let (endpoint, server) = serve_once(
        "401 Unauthorized",
        r#"{"error":{"message":"Incorrect API key provided"}}"#,
    );
    let err = client(endpoint).suggest(&prompt()).unwrap_err();
    server.join().unwrap();
    match err {
        SuggestError::Authentication { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn too_many_requests_maps_to_rate_limited() {
    let (endpoint, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"message":"Rate limit reached"}}"#,
    );
    let err = client(endpoint).suggest(&prompt()).unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, SuggestError::RateLimited { ref body } if body.contains("Rate limit")));
}

#[test]
fn other_statuses_keep_the_raw_body() {
    let (endpoint, server) = serve_once("503 Service Unavailable", r#"{"error":"overloaded"}"#);
    let err = client(endpoint).suggest(&prompt()).unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, SuggestError::Status { status: 503, .. }));
    assert!(err.to_string().contains("overloaded"));
}

#[test]
fn unexpected_envelope_is_malformed() {
    let (endpoint, server) = serve_once("200 OK", r#"{"result":"not a chat completion"}"#);
    let err = client(endpoint).suggest(&prompt()).unwrap_err();
    server.join().unwrap();
    assert!(matches!(err, SuggestError::MalformedResponse(_)));
}

#[test]
fn refused_connection_is_a_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = client(format!("http://{addr}/v1/chat/completions"))
        .suggest(&prompt())
        .unwrap_err();
    assert!(matches!(err, SuggestError::Transport(_)));
}
