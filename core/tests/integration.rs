//! Full record lifecycle against the live mock backend.
//!
//! # Design
//! Starts the mock server on a random port, then drives every blocking
//! client operation over real HTTP through the default ureq transport.

use std::net::{SocketAddr, TcpListener};
use std::time::{Duration, Instant};

use record_core::{ApiError, ChangeSet, ClientConfig, Record, RecordClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameScore {
    player_name: String,
    score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_id: Option<String>,
}

impl Record for GameScore {
    const CLASS_NAME: &'static str = "GameScore";
}

impl GameScore {
    fn new(player_name: &str, score: i64) -> Self {
        Self {
            player_name: player_name.to_string(),
            score,
            object_id: None,
        }
    }
}

fn start_mock_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client_for(addr: SocketAddr) -> RecordClient {
    let config = ClientConfig::new(mock_server::APPLICATION_ID, mock_server::REST_API_KEY)
        .with_base_url(format!("http://{addr}"));
    RecordClient::new(config)
}

#[test]
fn record_lifecycle() {
    let mut client = client_for(start_mock_server());

    // Step 1: query: nothing stored yet.
    let scores: Vec<GameScore> = client.query("{}").unwrap();
    assert!(scores.is_empty(), "expected no records");

    // Step 2: store two records.
    let sean = client.store(&GameScore::new("Sean", 60)).unwrap();
    let jo = client.store(&GameScore::new("Jo", 40)).unwrap();
    assert_eq!(sean.len(), 10);
    assert_ne!(sean, jo);

    // Step 3: filtered query.
    let high: Vec<GameScore> = client.query(r#"{"score":{"$gt":50}}"#).unwrap();
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].player_name, "Sean");
    assert_eq!(high[0].object_id.as_deref(), Some(sean.as_str()));

    // Step 4: update Jo.
    let changes = ChangeSet::new().set("score", 95);
    assert!(client.update::<GameScore>(&jo, &changes).unwrap());
    let jo_now: Vec<GameScore> = client.query(r#"{"playerName":"Jo"}"#).unwrap();
    assert_eq!(jo_now[0].score, 95);

    // Step 5: update unknown id: soft failure.
    assert!(!client.update::<GameScore>("missing123", &changes).unwrap());

    // Step 6: non-JSON filter is rejected by the backend, no `results`.
    let err = client.query::<GameScore>("score>50").unwrap_err();
    assert!(matches!(err, ApiError::ProtocolError(_)));

    // Step 7: unknown API version: backend answers 404 without a body.
    client.set_version("2");
    let err = client.query::<GameScore>("{}").unwrap_err();
    assert!(matches!(err, ApiError::EmptyResponseError));
    client.set_version("1");

    // Step 8: delete both, then delete again.
    assert!(client.delete::<GameScore>(&sean).unwrap());
    assert!(client.delete::<GameScore>(&jo).unwrap());
    assert!(!client.delete::<GameScore>(&jo).unwrap());

    // Step 9: query: empty again.
    let scores: Vec<GameScore> = client.query("{}").unwrap();
    assert!(scores.is_empty(), "expected no records after delete");
}

#[test]
fn wrong_credentials_fail_store_and_pass_delete() {
    let addr = start_mock_server();
    let config = ClientConfig::new("wrong", "wrong").with_base_url(format!("http://{addr}"));
    let client = RecordClient::new(config);

    // 401 body is {"error":"unauthorized"}: no objectId and no `code`.
    let err = client.store(&GameScore::new("Eve", 1)).unwrap_err();
    assert!(matches!(err, ApiError::MissingFieldError(_)));
    assert!(client.delete::<GameScore>("anything").unwrap());
}

#[test]
fn reserved_characters_in_id_reach_the_backend() {
    let client = client_for(start_mock_server());
    let id = client.store(&GameScore::new("Sean", 60)).unwrap();

    // Encoded ids stay inside the record path: the backend reports "not found"
    // instead of the request being rejected or rerouted.
    assert!(!client.delete::<GameScore>("a b").unwrap());
    assert!(!client
        .delete::<GameScore>(&format!("{id}/../../GameScore/{id}"))
        .unwrap());
    assert!(!client.delete::<GameScore>("..").unwrap());

    let scores: Vec<GameScore> = client.query("{}").unwrap();
    assert_eq!(scores.len(), 1, "record must survive the lookalike deletes");
}

#[test]
fn configured_timeout_fires() {
    // Accepts connections (via the listen backlog) but never answers.
    let silent = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = silent.local_addr().unwrap();

    let config = ClientConfig::new("A1", "K1")
        .with_base_url(format!("http://{addr}"))
        .with_timeout(Some(Duration::from_millis(300)));
    let client = RecordClient::new(config);

    let started = Instant::now();
    let err = client.query::<GameScore>("{}").unwrap_err();
    assert!(matches!(err, ApiError::TransportError(_)), "got {err:?}");
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "timeout took {:?}",
        started.elapsed()
    );
    drop(silent);
}

#[test]
fn response_body_limit_is_enforced() {
    let addr = start_mock_server();
    let client = client_for(addr);
    for score in 0..20 {
        client.store(&GameScore::new("Filler", score)).unwrap();
    }

    let scores: Vec<GameScore> = client.query("{}").unwrap();
    assert_eq!(scores.len(), 20);

    let config = ClientConfig::new(mock_server::APPLICATION_ID, mock_server::REST_API_KEY)
        .with_base_url(format!("http://{addr}"))
        .with_max_response_bytes(64);
    let small = RecordClient::new(config);
    let err = small.query::<GameScore>("{}").unwrap_err();
    assert!(matches!(err, ApiError::TransportError(_)), "got {err:?}");
}
