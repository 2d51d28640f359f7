//! End-to-end flow over a real socket: announce, relay, disconnect.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use pulse_gateway::{app_state::AppState, config, router};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TRUST_CLIENT: &str = "version: 1\n";

const VERIFIED: &str = r#"
version: 1
auth:
  mode: verified
  tokens:
    - { token: "t-alice", user: "alice" }
    - { token: "t-bob", user: "bob" }
"#;

const SHORT_IDLE: &str = r#"
version: 1
gateway:
  ping_interval_ms: 5000
  idle_timeout_ms: 10000
"#;

async fn start(yaml: &str) -> SocketAddr {
    let cfg = config::load_from_str(yaml).unwrap();
    let state = AppState::new(cfg).unwrap();
    let app = router::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, query: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/v1/ws{query}")).await.unwrap();
    ws
}

/// Next JSON text frame of the given type, skipping everything else.
async fn next_of_type(ws: &mut Client, ty: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = ws.next().await.expect("stream ended").expect("ws error");
            if let Message::Text(t) = msg {
                let v: Value = serde_json::from_str(t.as_str()).unwrap();
                if v["type"] == ty {
                    return v;
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {ty}"))
}

async fn emit(ws: &mut Client, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

fn user_ids(frame: &Value) -> Vec<&str> {
    frame["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["userId"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn announce_relay_and_leave() {
    let addr = start(TRUST_CLIENT).await;

    let mut a = connect(addr, "").await;
    let ready = next_of_type(&mut a, "sys.ready").await;
    assert!(ready["data"]["socketId"].is_string());
    assert!(ready["data"].get("user").is_none());

    let mut b = connect(addr, "").await;
    next_of_type(&mut b, "sys.ready").await;

    emit(&mut a, json!({ "v": 1, "type": "addUser", "data": "alice" })).await;
    assert_eq!(user_ids(&next_of_type(&mut a, "getUsers").await), vec!["alice"]);
    // b has not announced but still sees presence
    assert_eq!(user_ids(&next_of_type(&mut b, "getUsers").await), vec!["alice"]);

    emit(&mut b, json!({ "v": 1, "type": "addUser", "data": "bob" })).await;
    assert_eq!(user_ids(&next_of_type(&mut a, "getUsers").await), vec!["alice", "bob"]);
    assert_eq!(user_ids(&next_of_type(&mut b, "getUsers").await), vec!["alice", "bob"]);

    emit(
        &mut a,
        json!({ "v": 1, "type": "sendMessage", "data": { "senderId": "alice", "receiverId": "bob", "text": "hi" } }),
    )
    .await;
    let got = next_of_type(&mut b, "receiveMessage").await;
    assert_eq!(got["data"], json!({ "senderId": "alice", "text": "hi" }));

    a.close(None).await.unwrap();
    assert_eq!(user_ids(&next_of_type(&mut b, "getUsers").await), vec!["bob"]);
}

#[tokio::test]
async fn malformed_frame_gets_error_and_connection_survives() {
    let addr = start(TRUST_CLIENT).await;
    let mut a = connect(addr, "").await;
    next_of_type(&mut a, "sys.ready").await;

    a.send(Message::text("not json")).await.unwrap();
    let err = next_of_type(&mut a, "sys.error").await;
    assert_eq!(err["data"]["code"], "BAD_REQUEST");

    emit(&mut a, json!({ "v": 1, "type": "addUser", "data": "alice" })).await;
    assert_eq!(user_ids(&next_of_type(&mut a, "getUsers").await), vec!["alice"]);
}

#[tokio::test]
async fn verified_mode_refuses_missing_token() {
    let addr = start(VERIFIED).await;
    let mut ws = connect(addr, "").await;
    let err = next_of_type(&mut ws, "sys.error").await;
    assert_eq!(err["data"]["code"], "AUTH_FAILED");
}

#[tokio::test]
async fn verified_mode_binds_principal() {
    let addr = start(VERIFIED).await;

    let mut a = connect(addr, "?token=t-alice").await;
    let ready = next_of_type(&mut a, "sys.ready").await;
    assert_eq!(ready["data"]["user"], "alice");

    let mut b = connect(addr, "?token=t-bob").await;
    next_of_type(&mut b, "sys.ready").await;

    // impersonation attempt is not registered
    emit(&mut a, json!({ "v": 1, "type": "addUser", "data": "bob" })).await;
    assert!(user_ids(&next_of_type(&mut a, "getUsers").await).is_empty());

    emit(&mut a, json!({ "v": 1, "type": "addUser", "data": "alice" })).await;
    assert_eq!(user_ids(&next_of_type(&mut a, "getUsers").await), vec!["alice"]);

    emit(&mut b, json!({ "v": 1, "type": "addUser", "data": null })).await;
    assert_eq!(user_ids(&next_of_type(&mut a, "getUsers").await), vec!["alice", "bob"]);

    // spoofed senderId is rewritten to the token principal
    emit(
        &mut b,
        json!({ "v": 1, "type": "sendMessage", "data": { "senderId": "mallory", "receiverId": "alice", "text": "yo" } }),
    )
    .await;
    let got = next_of_type(&mut a, "receiveMessage").await;
    assert_eq!(got["data"]["senderId"], "bob");
}

#[tokio::test]
async fn binary_frame_gets_bad_request() {
    let addr = start(TRUST_CLIENT).await;
    let mut a = connect(addr, "").await;
    next_of_type(&mut a, "sys.ready").await;

    a.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    let err = next_of_type(&mut a, "sys.error").await;
    assert_eq!(err["data"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn silent_connection_times_out_despite_outbound_traffic() {
    let addr = start(SHORT_IDLE).await;

    // a announces, then never reads or writes again (so it never answers pings)
    let mut a = connect(addr, "").await;
    emit(&mut a, json!({ "v": 1, "type": "addUser", "data": "alice" })).await;

    let mut b = connect(addr, "").await;
    next_of_type(&mut b, "sys.ready").await;

    // b keeps announcing, so a receives a broadcast every 100ms
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    let mut last: Vec<String> = Vec::new();
    let deadline = tokio::time::sleep(Duration::from_secs(20));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                emit(&mut b, json!({ "v": 1, "type": "addUser", "data": "bob" })).await;
            }
            msg = b.next() => {
                let msg = msg.expect("stream ended").expect("ws error");
                if let Message::Text(t) = msg {
                    let v: Value = serde_json::from_str(t.as_str()).unwrap();
                    if v["type"] == "getUsers" {
                        last = user_ids(&v).into_iter().map(str::to_string).collect();
                        if last == vec!["bob"] {
                            break;
                        }
                    }
                }
            }
            _ = &mut deadline => panic!("silent connection never timed out: {last:?}"),
        }
    }
    drop(a);
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let res = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn ops_endpoints_report_health_and_draining() {
    let state = AppState::new(config::load_from_str(TRUST_CLIENT).unwrap()).unwrap();
    let app = router::build_router(state.clone());

    assert_eq!(get(app.clone(), "/healthz").await, (StatusCode::OK, "ok".to_string()));
    assert_eq!(get(app.clone(), "/readyz").await, (StatusCode::OK, "ready".to_string()));

    state.set_draining();
    assert_eq!(
        get(app.clone(), "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "draining".to_string())
    );

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("pulse_draining 1"));
}

#[tokio::test]
async fn ready_is_the_first_frame_under_broadcast_load() {
    let addr = start(TRUST_CLIENT).await;
    let mut b = connect(addr, "").await;
    next_of_type(&mut b, "sys.ready").await;
    for _ in 0..50 {
        emit(&mut b, json!({ "v": 1, "type": "addUser", "data": "bob" })).await;
    }

    let mut a = connect(addr, "").await;
    let first = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Message::Text(t) = a.next().await.expect("stream ended").expect("ws error") {
                return serde_json::from_str::<Value>(t.as_str()).unwrap();
            }
        }
    })
    .await
    .expect("no frame");
    assert_eq!(first["type"], "sys.ready");
}
