use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use shoplite_cli::api::{ApiClient, ApiError, Ask, NO_ANSWER, TIMEOUT_MESSAGE};
use shoplite_cli::chat_log::{ChatLog, LogRecord};
use shoplite_cli::confidence::Confidence;
use shoplite_cli::session::{ReaderLines, Session};
use std::collections::VecDeque;
use std::io::Cursor;
use std::net::{SocketAddr, TcpListener};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// How the stub backend answers one `/chat` call.
enum Behaviour {
    Reply(Value),
    Status(StatusCode),
    Text(&'static str),
    Hang(Duration),
}

#[derive(Clone)]
struct StubState {
    script: Arc<Mutex<VecDeque<Behaviour>>>,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn chat(State(stub): State<StubState>, Json(body): Json<Value>) -> Response {
    stub.received.lock().unwrap().push(body);
    let next = stub.script.lock().unwrap().pop_front();
    match next {
        Some(Behaviour::Reply(value)) => Json(value).into_response(),
        Some(Behaviour::Status(code)) => (code, Json(json!({ "error": "stub" }))).into_response(),
        Some(Behaviour::Text(text)) => ([(header::CONTENT_TYPE, "text/html")], text).into_response(),
        Some(Behaviour::Hang(duration)) => {
            tokio::time::sleep(duration).await;
            Json(json!({ "answer": "too late" })).into_response()
        }
        None => StatusCode::GONE.into_response(),
    }
}

/// `/chat` backend on a random local port, served from its own runtime
/// thread. Calls consume `script` in order; request bodies are recorded.
fn stub_backend(script: Vec<Behaviour>) -> (String, Arc<Mutex<Vec<Value>>>) {
    let state = StubState {
        script: Arc::new(Mutex::new(script.into())),
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let received = state.received.clone();
    let app = Router::new().route("/chat", post(chat)).with_state(state);

    let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    let addr = addr_rx.recv().unwrap();
    (format!("http://{}", addr), received)
}

fn answer(body: Value) -> Behaviour {
    Behaviour::Reply(body)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_millis(500)).unwrap()
}

fn read_log(path: &std::path::Path) -> Vec<LogRecord> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn posts_query_and_reads_answer() {
    let (base_url, received) = stub_backend(vec![answer(
        json!({ "answer": "30-day returns", "sources": ["policy.pdf"] }),
    )]);

    let reply = client(&base_url).ask("What is the return policy?").unwrap();
    assert_eq!(reply.answer, "30-day returns");
    assert_eq!(reply.sources, vec!["policy.pdf"]);

    assert_eq!(
        *received.lock().unwrap(),
        vec![json!({ "query": "What is the return policy?" })]
    );
}

#[test]
fn missing_fields_use_defaults() {
    let (base_url, _received) = stub_backend(vec![answer(json!({}))]);
    let reply = client(&base_url).ask("hello").unwrap();
    assert_eq!(reply.answer, NO_ANSWER);
    assert!(reply.sources.is_empty());
}

#[test]
fn slow_backend_times_out() {
    let (base_url, _received) = stub_backend(vec![Behaviour::Hang(Duration::from_secs(3))]);
    let err = client(&base_url).ask("slow").unwrap_err();
    assert!(matches!(err, ApiError::Timeout), "{:?}", err);
}

#[test]
fn error_status_is_transport_failure() {
    let (base_url, _received) =
        stub_backend(vec![Behaviour::Status(StatusCode::INTERNAL_SERVER_ERROR)]);
    let err = client(&base_url).ask("q").unwrap_err();
    match err {
        ApiError::Transport { detail } => assert!(detail.contains("500"), "{}", detail),
        other => panic!("expected transport failure, got {:?}", other),
    }
}

#[test]
fn non_json_body_is_transport_failure() {
    let (base_url, _received) = stub_backend(vec![Behaviour::Text("<html>oops</html>")]);
    let err = client(&base_url).ask("q").unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "{:?}", err);
    assert!(err.into_answer().starts_with("Error calling API: "));
}

#[test]
fn refused_connection_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&base_url).ask("anyone there?").unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "{:?}", err);
    let answer = err.into_answer();
    assert!(!answer.contains('\n'));
}

#[test]
fn every_exchange_appends_exactly_one_line() {
    let (base_url, _received) = stub_backend(vec![
        answer(json!({ "answer": "30-day returns", "sources": ["policy.pdf"] })),
        Behaviour::Hang(Duration::from_secs(3)),
        Behaviour::Status(StatusCode::NOT_FOUND),
        answer(json!({ "answer": "30-day returns", "sources": ["policy.pdf"] })),
    ]);
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("chat_log.jsonl");

    let mut session = Session::new(client(&base_url), ChatLog::open(&log_path).unwrap());
    let mut input = ReaderLines(Cursor::new(
        "What is the return policy?\nslow one\nmissing\nWhat is the return policy?\n  EXIT \nignored\n"
            .as_bytes()
            .to_vec(),
    ));
    let mut out = Vec::new();
    session.run(&mut input, &mut out).unwrap();

    let records = read_log(&log_path);
    assert_eq!(records.len(), 4);

    assert_eq!(records[0].question, "What is the return policy?");
    assert_eq!(records[0].answer, "30-day returns");
    assert_eq!(records[0].sources, vec!["policy.pdf"]);
    assert_eq!(records[0].confidence, Confidence::High);

    assert_eq!(records[1].answer, TIMEOUT_MESSAGE);
    assert!(records[1].sources.is_empty());
    assert_eq!(records[1].confidence, Confidence::Low);

    assert!(records[2].answer.starts_with("Error calling API: "));
    assert_eq!(records[2].confidence, Confidence::Low);

    // Same question, same reply: two independent records.
    assert_eq!(records[3].question, records[0].question);
    assert_eq!(records[3].answer, records[0].answer);
    assert!(records[3].timestamp > records[0].timestamp);

    let transcript = String::from_utf8(out).unwrap();
    assert_eq!(transcript.matches("[Retrieving context...]").count(), 4);
    assert!(transcript.contains("Answer: 30-day returns"));
    assert!(transcript.contains("Sources: [\"policy.pdf\"]"));
    assert!(transcript.trim_end().ends_with("Bye!"));
}

#[test]
fn sources_are_logged_as_sent() {
    let (base_url, _received) = stub_backend(vec![
        answer(json!({ "answer": "see policy", "sources": "policy.pdf" })),
        answer(json!({ "answer": "see faq", "sources": [{ "doc": "faq.md", "page": 3 }] })),
    ]);
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("chat_log.jsonl");

    let mut session = Session::new(client(&base_url), ChatLog::open(&log_path).unwrap());
    let mut input = ReaderLines(Cursor::new(b"returns?\nfaq?\nquit\n".to_vec()));
    session.run(&mut input, &mut Vec::new()).unwrap();

    let records = read_log(&log_path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].sources, vec![json!("policy.pdf")]);
    assert_eq!(records[0].confidence, Confidence::High);
    assert_eq!(records[1].sources, vec![json!({ "doc": "faq.md", "page": 3 })]);
    assert_eq!(records[1].confidence, Confidence::High);
}
