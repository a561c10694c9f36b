//! HTTP server for the gateway.
//!
//! Routes:
//!   GET  /                -> grammar overview (JSON)
//!   GET  /cmd/{command}   -> encode query options + execute
//!   POST /webhook         -> gate (IP + Basic auth), translate event, execute
//!   *                     -> 404 {"error":"not found"}

pub mod error;
pub mod gate;
pub mod webhook;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::patlite::{CommandName, Options, OptionValue, allowed_commands, encode, rules_for};
use crate::transport::PatliteClient;
use error::GatewayError;
use gate::IpRange;

/// Shared, read-only state for handlers.
pub struct AppState {
    pub client: PatliteClient,
    pub allowed_hosts: Vec<IpRange>,
    pub webhook_credentials: Option<(String, String)>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/cmd/{command}", get(cmd_handler))
        .route("/webhook", post(webhook_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listen_addr: &str, state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {listen_addr:?}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, device = %state.client.target(), "starting patlite gateway");

    serve_on(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {e}");
        }
        info!("shutting down");
    })
    .await
}

/// Serve on an already bound listener until `shutdown` resolves.
/// Peer addresses are attached so `/webhook` can gate on them.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("HTTP server error")
}

/* ---- Handlers ---- */

async fn index_handler() -> Json<Value> {
    let commands: Vec<Value> = allowed_commands()
        .iter()
        .map(|&command| {
            let options: Vec<Value> = rules_for(command)
                .iter()
                .map(|r| json!({ "key": r.key, "pattern": r.pattern(), "default": r.default }))
                .collect();
            json!({ "command": command, "path": format!("/cmd/{command}"), "options": options })
        })
        .collect();
    Json(json!({ "commands": commands }))
}

async fn cmd_handler(
    State(state): State<Arc<AppState>>,
    Path(command): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, GatewayError> {
    let command: CommandName = command.parse().map_err(|_| GatewayError::NotFound)?;
    let options: Options = params
        .into_iter()
        .map(|(k, v)| (k, OptionValue::Str(v)))
        .collect();
    dispatch(&state, command, options).await.map(Json)
}

async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, GatewayError> {
    if !gate::ip_allowed(&state.allowed_hosts, peer.ip()) {
        warn!(source_ip = %peer, "webhook request from disallowed address");
        return Err(GatewayError::Forbidden);
    }

    let expected = state
        .webhook_credentials
        .as_ref()
        .map(|(u, p)| (u.as_str(), p.as_str()));
    if !gate::authorized(&headers, expected) {
        warn!(source_ip = %peer, "webhook request failed authentication");
        return Err(GatewayError::Unauthorized);
    }

    let payload: Value =
        serde_json::from_str(&body).map_err(|e| GatewayError::BadPayload(e.to_string()))?;
    info!(payload = %payload, "received webhook");

    match webhook::translate(&payload) {
        Some((command, options)) => dispatch(&state, command, options).await.map(Json),
        None => Ok(Json(json!({ "status": "ignored" }))),
    }
}

async fn not_found_handler() -> GatewayError {
    GatewayError::NotFound
}

/// Encode, then execute. Validation failures never reach the device.
async fn dispatch(
    state: &AppState,
    command: CommandName,
    options: Options,
) -> Result<Value, GatewayError> {
    let encoded = match encode(command, &options) {
        Ok(e) => e,
        Err(source) => {
            error!(command = %command, parameter = ?options, reason = %source, "rejected");
            return Err(GatewayError::Invalid {
                command,
                parameter: options,
                source,
            });
        }
    };

    info!(command = %command, options = ?options, "execute");
    let output = state.client.run(&encoded).await.map_err(|source| {
        error!(command = %command, "transport failure: {source}");
        GatewayError::Transport { command, source }
    })?;

    let result = json!({ "status": "success", "command": command, "patlite_result": output });
    info!(result = %result, "done");
    Ok(result)
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Executor, RemoteTarget, TransportError};
    use async_trait::async_trait;
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Executor for Recorder {
        async fn execute(&self, argv: &[String]) -> Result<String, TransportError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            if self.fail {
                return Err(TransportError::Failed {
                    status: "exit status: 1".into(),
                    stderr: "no route to host".into(),
                });
            }
            Ok("OK\n".into())
        }
    }

    fn state_with(recorder: Arc<Recorder>) -> Arc<AppState> {
        let target = RemoteTarget::new("rsh", "patlite", "device").unwrap();
        Arc::new(AppState {
            client: PatliteClient::new(target, recorder),
            allowed_hosts: vec!["127.0.0.0/8".parse().unwrap()],
            webhook_credentials: Some(("user".into(), "password".into())),
        })
    }

    fn query(pairs: &[(&str, &str)]) -> Query<BTreeMap<String, String>> {
        Query(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    fn local() -> ConnectInfo<SocketAddr> {
        ConnectInfo("127.0.0.1:50000".parse().unwrap())
    }

    fn basic(user: &str, pass: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        let v = format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")));
        h.insert(AUTHORIZATION, HeaderValue::from_str(&v).unwrap());
        h
    }

    #[tokio::test]
    async fn cmd_executes_encoded_alert() {
        let rec = Arc::new(Recorder::default());
        let state = state_with(rec.clone());
        let Json(body) = cmd_handler(
            State(state),
            Path("alert".into()),
            query(&[("r", "1"), ("sec", "5"), ("bogus", "x")]),
        )
        .await
        .unwrap();

        assert_eq!(body["status"], "success");
        assert_eq!(body["command"], "alert");
        assert_eq!(body["patlite_result"], "OK\n");
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec!["rsh", "-l", "patlite", "device", "alert", "1", "9", "9", "00", "9", "5"]
        );
    }

    #[tokio::test]
    async fn cmd_clear_passes_flags() {
        let rec = Arc::new(Recorder::default());
        let Json(body) = cmd_handler(
            State(state_with(rec.clone())),
            Path("clear".into()),
            query(&[("p", "1"), ("z", "1")]),
        )
        .await
        .unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["command"], "clear");
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls[0][4..], ["clear", "-p", "-z"]);
    }

    #[tokio::test]
    async fn cmd_unknown_command_is_404() {
        let rec = Arc::new(Recorder::default());
        let err = cmd_handler(State(state_with(rec.clone())), Path("reboot".into()), query(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cmd_invalid_options_never_execute() {
        let rec = Arc::new(Recorder::default());
        let err = cmd_handler(
            State(state_with(rec.clone())),
            Path("alert".into()),
            query(&[("r", "x"), ("z", "x")]),
        )
        .await
        .unwrap_err();
        match &err {
            GatewayError::Invalid {
                command,
                parameter,
                source,
            } => {
                assert_eq!(*command, CommandName::Alert);
                assert_eq!(parameter.len(), 2);
                assert_eq!(source.message(), "r z are invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::PRECONDITION_FAILED);
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_502() {
        let rec = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let err = cmd_handler(State(state_with(rec)), Path("status".into()), query(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn webhook_critical_alert() {
        let rec = Arc::new(Recorder::default());
        let Json(body) = webhook_handler(
            State(state_with(rec.clone())),
            local(),
            basic("user", "password"),
            r#"{"event":"alert","alert":{"status":"critical"}}"#.into(),
        )
        .await
        .unwrap();
        assert_eq!(body["status"], "success");
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls[0][4..], ["alert", "1", "9", "9", "00", "1", "2"]);
    }

    #[tokio::test]
    async fn webhook_sample_runs_test() {
        let rec = Arc::new(Recorder::default());
        let Json(body) = webhook_handler(
            State(state_with(rec.clone())),
            local(),
            basic("user", "password"),
            r#"{"event":"sample"}"#.into(),
        )
        .await
        .unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["command"], "test");
        assert_eq!(rec.calls.lock().unwrap()[0][4..], ["test"]);
    }

    #[tokio::test]
    async fn webhook_unknown_status_is_ignored() {
        let rec = Arc::new(Recorder::default());
        let Json(body) = webhook_handler(
            State(state_with(rec.clone())),
            local(),
            basic("user", "password"),
            r#"{"event":"alert","alert":{"status":"pending"}}"#.into(),
        )
        .await
        .unwrap();
        assert_eq!(body["status"], "ignored");
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_gate_rejects_foreign_ip_before_auth() {
        let rec = Arc::new(Recorder::default());
        let err = webhook_handler(
            State(state_with(rec.clone())),
            ConnectInfo("8.8.8.8:443".parse().unwrap()),
            basic("user", "password"),
            r#"{"event":"sample"}"#.into(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden));
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_rejects_bad_credentials() {
        let rec = Arc::new(Recorder::default());
        let err = webhook_handler(
            State(state_with(rec.clone())),
            local(),
            basic("user", "nope"),
            r#"{"event":"sample"}"#.into(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthorized));
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_rejects_malformed_json() {
        let rec = Arc::new(Recorder::default());
        let err = webhook_handler(
            State(state_with(rec)),
            local(),
            basic("user", "password"),
            "{not json".into(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn index_lists_all_commands() {
        let Json(body) = index_handler().await;
        let names: Vec<&str> = body["commands"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["command"].as_str())
            .collect();
        assert_eq!(names, vec!["alert", "clear", "status", "test"]);
        assert_eq!(body["commands"][0]["options"][4]["key"], "sec");
        assert_eq!(body["commands"][0]["options"][4]["default"], 0);
    }

    #[tokio::test]
    async fn fallback_is_json_404() {
        let resp = not_found_handler().await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    /// Bind the real router on an ephemeral port and return its base URL.
    async fn spawn_router(
        state: Arc<AppState>,
    ) -> (String, tokio::sync::oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(serve_on(listener, state, async move {
            let _ = stop_rx.await;
        }));
        (format!("http://{addr}"), stop_tx, handle)
    }

    #[tokio::test]
    async fn router_wires_routes_and_fallback() {
        let rec = Arc::new(Recorder::default());
        let (base, stop, handle) = spawn_router(state_with(rec.clone())).await;
        let http = reqwest::Client::new();

        let resp = http.get(format!("{base}/cmd/reboot")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "error": "not found" }));

        let resp = http.get(format!("{base}/nope")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "not found");

        let resp = http.get(format!("{base}/cmd/alert?r=x")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::PRECONDITION_FAILED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["invalid"], json!(["r"]));
        assert_eq!(body["parameter"], json!({ "r": "x" }));

        let resp = http
            .get(format!("{base}/cmd/clear?p=1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let resp = http.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        assert_eq!(rec.calls.lock().unwrap().len(), 1, "only the valid clear executed");

        drop(http);
        let _ = stop.send(());
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn router_webhook_sees_peer_address() {
        let rec = Arc::new(Recorder::default());
        let (base, stop, handle) = spawn_router(state_with(rec.clone())).await;
        let http = reqwest::Client::new();

        let resp = http
            .post(format!("{base}/webhook"))
            .basic_auth("user", Some("password"))
            .body(r#"{"event":"alert","alert":{"status":"warning"}}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "success");

        let resp = http
            .post(format!("{base}/webhook"))
            .body(r#"{"event":"sample"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key(reqwest::header::WWW_AUTHENTICATE));

        let calls = rec.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][4..], ["alert", "9", "1", "9", "00", "1", "2"]);

        drop(http);
        let _ = stop.send(());
        handle.await.unwrap().unwrap();
    }
}
