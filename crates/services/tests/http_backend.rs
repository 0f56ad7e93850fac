use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use exam_core::model::{MaterialId, Phase, SubmitTrigger};
use services::{ApiConfig, ApiError, ControllerError, ExamService, HttpExamApi, SessionConfig};

/// One-connection-per-request HTTP server answering with canned responses in order.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { base_url, requests }
    }

    fn service(&self) -> ExamService {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let api = Arc::new(HttpExamApi::with_client(
            client,
            ApiConfig::new(&self.base_url).with_token("secret"),
        ));
        ExamService::new(api.clone(), api).with_config(SessionConfig::default().manual_ticks())
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Error",
    }
}

/// Read the head and, if announced, the body of one request.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let mut expected_len = None;

    loop {
        if expected_len.is_none() {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                expected_len = Some(end + 4 + body_len);
            }
        }
        if expected_len.is_some_and(|len| buf.len() >= len) {
            break;
        }

        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn test_body() -> String {
    json!({
        "title": "Chapter 1",
        "content": "Warm-up",
        "time": 1,
        "submit": false,
        "questions": [
            {
                "testId": 31, "probno": 1, "question": "Pick one",
                "type": "TES001", "choice1": "a", "choice2": "b"
            },
            { "testId": 32, "probno": 2, "question": "Explain", "type": "TES002" }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn unauthorized_statuses_fail_the_load() {
    for status in [401, 403] {
        let server = StubServer::start(vec![(status, String::new())]).await;
        let err = server
            .service()
            .load(MaterialId::new("9"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Unauthorized), "{status}: {err:?}");
    }
}

#[tokio::test]
async fn missing_test_data_loads_as_not_found() {
    let bodies = [
        String::new(),
        "null".to_owned(),
        r#"{"title":"T","time":5,"submit":false,"questions":null}"#.to_owned(),
        r#"{"title":null,"content":null,"time":null,"submit":null,"questions":null}"#.to_owned(),
    ];
    for body in bodies {
        let server = StubServer::start(vec![(200, body.clone())]).await;
        let err = server
            .service()
            .load(MaterialId::new("9"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::NotFound), "{body:?}: {err:?}");
    }

    let server = StubServer::start(vec![(404, String::new())]).await;
    let err = server.service().load(MaterialId::new("9")).await.unwrap_err();
    assert!(matches!(err, ControllerError::NotFound));
}

#[tokio::test]
async fn malformed_body_is_a_load_failure() {
    let server = StubServer::start(vec![(200, "{\"title\":".to_owned())]).await;
    let err = server.service().load(MaterialId::new("9")).await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::LoadFailed(ApiError::Decode(_))
    ));
}

#[tokio::test]
async fn rejected_post_reverts_to_in_progress() {
    let server = StubServer::start(vec![
        (200, test_body()),
        (500, String::new()),
        (200, String::new()),
    ])
    .await;
    let controller = server.service().load(MaterialId::new("m-9")).await.unwrap();
    controller.start().unwrap();
    controller.set_answer(0, "b").unwrap();

    let err = controller.submit(SubmitTrigger::Manual).await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::SubmissionFailed(ApiError::HttpStatus(status)) if status.as_u16() == 500
    ));
    assert_eq!(controller.phase(), Phase::InProgress);
    assert_eq!(controller.answer(0).as_deref(), Some("b"));

    controller.submit(SubmitTrigger::Manual).await.unwrap();
    assert_eq!(controller.phase(), Phase::Submitted);

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].starts_with("GET /api/test/m-9 HTTP/1.1"));
    assert!(requests[1].starts_with("POST /api/test/m-9/submit HTTP/1.1"));
    let lowered = requests[1].to_ascii_lowercase();
    assert!(lowered.contains("authorization: bearer secret"));
    assert!(requests[1].contains(r#""testnum":31"#));
    assert!(requests[1].contains(r#""submit":"b""#));
    assert!(requests[1].contains(r#""testnum":32"#));
}
