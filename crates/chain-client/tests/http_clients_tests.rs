use chrono::NaiveDate;
use poolwatch_chain_client::crypto::{
    ValidatorIdentity, request_digest, verify_signature, verify_vote_signature,
};
use poolwatch_chain_client::error::ValidatorError;
use poolwatch_chain_client::types::{
    JobDescription, MinerAnswer, TimeWindow, TokenPair, WeightVote, WorkerRecord,
};
use poolwatch_chain_client::{
    FetchRequest, GroundTruthOracle, HEADER_SIGNATURE, HEADER_TIMESTAMP, HEADER_VALIDATOR_KEY,
    HttpLedgerClient, HttpMinerClient, HttpOracleClient, LedgerClient, MinerClient, SignedVote,
};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone)]
struct Route {
    request_line_prefix: &'static str,
    status: u16,
    body: String,
    delay: Duration,
}

fn route(prefix: &'static str, status: u16, body: impl Into<String>) -> Route {
    Route {
        request_line_prefix: prefix,
        status,
        body: body.into(),
        delay: Duration::ZERO,
    }
}

#[derive(Debug, Clone)]
struct Captured {
    request_line: String,
    headers: BTreeMap<String, String>,
    body: String,
}

struct StubServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    captured: Arc<Mutex<Vec<Captured>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StubServer {
    fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        listener
            .set_nonblocking(true)
            .expect("set nonblocking listener");
        let addr = listener.local_addr().expect("listener local addr");
        let stop = Arc::new(AtomicBool::new(false));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let stop_flag = Arc::clone(&stop);
        let sink = Arc::clone(&captured);
        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let routes = routes.clone();
                        let sink = Arc::clone(&sink);
                        thread::spawn(move || handle_conn(stream, &routes, &sink));
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });
        Self {
            addr,
            stop,
            captured,
            handle: Some(handle),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn captured(&self) -> Vec<Captured> {
        self.captured.lock().expect("captured lock").clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Captured> {
    stream.set_nonblocking(false).ok()?;
    let mut raw = Vec::new();
    let mut buf = [0_u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default().to_owned();
    let headers: BTreeMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_owned()))
        .collect();
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while raw.len() < header_end + content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }
    let body = String::from_utf8_lossy(&raw[header_end..]).to_string();
    Some(Captured {
        request_line,
        headers,
        body,
    })
}

fn write_response(mut stream: TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn handle_conn(mut stream: TcpStream, routes: &[Route], sink: &Mutex<Vec<Captured>>) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let matched = routes
        .iter()
        .find(|r| request.request_line.starts_with(r.request_line_prefix))
        .cloned();
    if let Ok(mut captured) = sink.lock() {
        captured.push(request);
    }
    match matched {
        Some(route) => {
            thread::sleep(route.delay);
            write_response(stream, route.status, &route.body);
        }
        None => write_response(stream, 404, r#"{"error":"no route"}"#),
    }
}

fn window() -> TimeWindow {
    TimeWindow::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("start"),
        NaiveDate::from_ymd_opt(2024, 1, 2).expect("end"),
    )
}

fn worker_at(addr: SocketAddr) -> WorkerRecord {
    WorkerRecord {
        id: 3,
        address: addr,
        identity_key: "worker-key-3".into(),
    }
}

#[tokio::test]
async fn ledger_resolves_subnet_and_worker_tables() {
    let server = StubServer::start(vec![
        route("GET /subnets/by-name/pools ", 200, r#"{"netuid": 12}"#),
        route(
            "GET /subnets/12/addresses ",
            200,
            r#"{"addresses": {"1": "10.0.0.1:9000", "2": "junk"}}"#,
        ),
        route(
            "GET /subnets/12/identities ",
            200,
            r#"{"identities": {"1": "key-1", "2": "key-2"}}"#,
        ),
    ]);
    let client = HttpLedgerClient::new(format!("{}/", server.base_url()));

    assert_eq!(client.resolve_subnet_id("pools").await.expect("subnet"), 12);
    let addresses = client.resolve_worker_addresses(12).await.expect("addresses");
    assert_eq!(addresses.get(&1).map(String::as_str), Some("10.0.0.1:9000"));
    assert_eq!(addresses.len(), 2);
    let identities = client.resolve_worker_identities(12).await.expect("identities");
    assert_eq!(identities.get(&2).map(String::as_str), Some("key-2"));
}

#[tokio::test]
async fn ledger_unknown_subnet_is_not_found() {
    let server = StubServer::start(vec![route(
        "GET /subnets/by-name/missing ",
        404,
        r#"{"error":"unknown"}"#,
    )]);
    let client = HttpLedgerClient::new(server.base_url());
    let err = client.resolve_subnet_id("missing").await.expect_err("not found");
    assert!(matches!(
        err.downcast_ref::<ValidatorError>(),
        Some(ValidatorError::NotFound(_))
    ));
}

#[tokio::test]
async fn ledger_vote_is_signed_by_validator_identity() {
    let server = StubServer::start(vec![route("POST /subnets/5/weights ", 200, "{}")]);
    let client = HttpLedgerClient::new(server.base_url());
    let identity = ValidatorIdentity::from_seed([9_u8; 32]);
    let vote = WeightVote {
        uids: vec![1, 2, 3, 4],
        weights: vec![250, 250, 250, 250],
    };
    client.submit_vote(&identity, &vote, 5).await.expect("submit vote");

    let captured = server.captured();
    assert_eq!(captured.len(), 1);
    let signed: SignedVote = serde_json::from_str(&captured[0].body).expect("signed vote body");
    assert_eq!(signed.netuid, 5);
    assert_eq!(signed.vote(), vote);
    assert_eq!(signed.validator_key, identity.identity_key());
    verify_vote_signature(&signed.validator_key, 5, &vote, &signed.signature)
        .expect("vote signature verifies");
}

#[tokio::test]
async fn ledger_rejected_vote_surfaces_error() {
    let server = StubServer::start(vec![route("POST /subnets/5/weights ", 500, "{}")]);
    let client = HttpLedgerClient::new(server.base_url());
    let identity = ValidatorIdentity::from_seed([9_u8; 32]);
    let vote = WeightVote {
        uids: vec![1],
        weights: vec![1000],
    };
    let err = client.submit_vote(&identity, &vote, 5).await.expect_err("rejected");
    assert!(format!("{err:#}").contains("/weights status"));
}

#[tokio::test]
async fn miner_fetch_sends_signed_job_and_returns_raw_payload() {
    let answer = r#"{"overall_hash":"abc","data":[]}"#;
    let server = StubServer::start(vec![route(
        "POST /method/fetch ",
        200,
        serde_json::to_string(answer).expect("string payload"),
    )]);
    let identity = ValidatorIdentity::from_seed([4_u8; 32]);
    let client = HttpMinerClient::new(identity.clone());
    let job = JobDescription::new(&TokenPair::new("T0", "T1", 3000), &window());

    let raw = client
        .fetch(&worker_at(server.addr), &job, Duration::from_secs(5))
        .await
        .expect("fetch");
    let decoded = MinerAnswer::from_value(raw).expect("string payload unwraps");
    assert_eq!(decoded.overall_hash, "abc");

    let captured = server.captured();
    let request = &captured[0];
    let body: FetchRequest = serde_json::from_str(&request.body).expect("fetch body");
    assert_eq!(body.target_key, "worker-key-3");
    assert_eq!(body.params.query, job);
    assert_eq!(body.params.query.start_datetime, "2024-01-01 00:00:00");

    let key = &request.headers[HEADER_VALIDATOR_KEY];
    assert_eq!(key, &identity.identity_key());
    let timestamp: i64 = request.headers[HEADER_TIMESTAMP].parse().expect("timestamp");
    let digest = request_digest("worker-key-3", &job, timestamp).expect("digest");
    verify_signature(key, digest.as_bytes(), &request.headers[HEADER_SIGNATURE])
        .expect("request signature verifies");
}

#[tokio::test]
async fn miner_fetch_respects_call_timeout() {
    let mut slow = route("POST /method/fetch ", 200, r#"{"overall_hash":"x","data":[]}"#);
    slow.delay = Duration::from_millis(800);
    let server = StubServer::start(vec![slow]);
    let client = HttpMinerClient::new(ValidatorIdentity::from_seed([4_u8; 32]));
    let job = JobDescription::new(&TokenPair::new("T0", "T1", 3000), &window());

    let result = client
        .fetch(&worker_at(server.addr), &job, Duration::from_millis(100))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn oracle_decodes_ranges_blocks_and_pairs() {
    let server = StubServer::start(vec![
        route("GET /block-range?", 200, r#"{"start": 100, "end": 199}"#),
        route(
            "GET /blocks/150 ",
            200,
            r#"{"hash": "0xblock150", "timestamp": 1704067200}"#,
        ),
        route(
            "GET /token-pairs?",
            200,
            r#"{"pairs": [{"token0": "T0", "token1": "T1", "fee": 3000}]}"#,
        ),
    ]);
    let oracle = HttpOracleClient::new(server.base_url());
    let w = window();

    let range = oracle
        .fetch_block_range("T0", "T1", w.start_datetime(), w.end_datetime())
        .await
        .expect("range");
    assert!(range.contains(100) && range.contains(199) && !range.contains(200));

    let block = oracle
        .fetch_block_data_by_block_number(150)
        .await
        .expect("block");
    assert_eq!(block.hash, "0xblock150");
    assert!(block.extra.contains_key("timestamp"));

    let pairs = oracle
        .fetch_token_pairs(w.start_datetime(), w.end_datetime())
        .await
        .expect("pairs");
    assert_eq!(pairs, vec![TokenPair::new("T0", "T1", 3000)]);

    let captured = server.captured();
    let range_line = &captured[0].request_line;
    assert!(range_line.contains("token_a=T0"));
    assert!(range_line.contains("start_datetime=2024-01-01+00%3A00%3A00"));
}
