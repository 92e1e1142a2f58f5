// src/test_utils/mock_action_container.rs
use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::core_types::EnvironmentSet;
use crate::logs::{LogCapture, ACTIVATION_LOG_SENTINEL};

pub const MISSING_CODE: &str = "Missing main/no code to execute.";
pub const INIT_TWICE: &str = "Cannot initialize the action more than once.";
pub const NOT_A_DICTIONARY: &str = "The action did not return a dictionary.";
pub const HANG_DURATION: Duration = Duration::from_secs(5);

/// Actions the mock runtime knows how to "execute", selected by the init code.
///
/// - `identity`: returns its arguments
/// - `echo`: prints `hello stdout` / `hello stderr`, returns its arguments
/// - `not-a-dictionary`: returns a string
/// - `unicode`: returns `{"winter": "<d> ☃ <d>"}` for argument `delimiter`
/// - `env-parameters`: returns the environment sent with init
/// - `activation-context`: returns the `__OW_*` activation context
/// - `silent-echo`: returns its arguments but never writes sentinels
/// - `hang`: answers only after [`HANG_DURATION`], then behaves like `identity`
#[derive(Debug, Clone)]
pub struct InitializedAction {
    pub code: String,
    pub main: String,
    pub env: Map<String, Value>,
}

/// Everything one simulated container remembers; reset on every launch.
#[derive(Debug, Default)]
pub struct ActionState {
    pub initialized: Option<InitializedAction>,
    pub logs: LogCapture,
    pub container_env: EnvironmentSet,
    pub launches: usize,
}

impl ActionState {
    pub fn reset(&mut self, container_env: EnvironmentSet) {
        self.initialized = None;
        self.logs = LogCapture::default();
        self.container_env = container_env;
        self.launches += 1;
    }

    fn end_activation(&mut self) {
        self.logs.stdout.push_str(&format!("{}\n", ACTIVATION_LOG_SENTINEL));
        self.logs.stderr.push_str(&format!("{}\n", ACTIVATION_LOG_SENTINEL));
    }
}

type SharedState = Arc<Mutex<ActionState>>;

async fn init_handler(
    State(state): State<SharedState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    let value = payload.get("value");
    let field = |name: &str| {
        value
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };

    if state.initialized.is_some() {
        state.logs.stderr.push_str(&format!("{}\n", INIT_TWICE));
        return (StatusCode::FORBIDDEN, Json(json!({ "error": INIT_TWICE })));
    }

    let (code, main) = (field("code"), field("main"));
    if code.is_empty() || main.is_empty() {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": MISSING_CODE })));
    }

    let env = value
        .and_then(|v| v.get("env"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    log::debug!("Mock action container initialised with '{}' ({})", code, main);
    state.initialized = Some(InitializedAction { code, main, env });

    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn run_handler(
    State(state): State<SharedState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let hangs = state
        .lock()
        .unwrap()
        .initialized
        .as_ref()
        .is_some_and(|action| action.code == "hang");
    if hangs {
        tokio::time::sleep(HANG_DURATION).await;
    }

    let mut state = state.lock().unwrap();
    let Some(action) = state.initialized.clone() else {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Cannot invoke an uninitialized action." })),
        );
    };
    let args = payload.get("value").cloned().unwrap_or_else(|| json!({}));

    let result = match action.code.as_str() {
        "identity" | "hang" => Ok(args),
        "silent-echo" => return (StatusCode::OK, Json(args)),
        "echo" => {
            state.logs.stdout.push_str("hello stdout\n");
            state.logs.stderr.push_str("hello stderr\n");
            Ok(args)
        }
        "not-a-dictionary" => Ok(json!("not a json object")),
        "unicode" => {
            let delimiter = args.get("delimiter").and_then(Value::as_str).unwrap_or("");
            let winter = format!("{0} ☃ {0}", delimiter);
            state.logs.stdout.push_str(&format!("{}\n", winter));
            Ok(json!({ "winter": winter }))
        }
        "env-parameters" => Ok(Value::Object(action.env.clone())),
        "activation-context" => {
            let prop = |name: &str| payload.get(name).cloned().unwrap_or(Value::Null);
            Ok(json!({
                "api_host": state.container_env.get("__OW_API_HOST"),
                "api_key": prop("api_key"),
                "namespace": prop("namespace"),
                "action_name": prop("action_name"),
                "action_version": prop("action_version"),
                "activation_id": prop("activation_id"),
                "deadline": prop("deadline"),
            }))
        }
        other => Err(format!("Unknown mock action '{}'", other)),
    };
    state.end_activation();

    match result {
        Ok(value) if value.is_object() => (StatusCode::OK, Json(value)),
        Ok(_) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": NOT_A_DICTIONARY }))),
        Err(message) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))),
    }
}

/// An in-process stand-in for an action container speaking `/init` and `/run`.
pub struct MockActionContainer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockActionContainer {
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(ActionState::default()));

        let app = Router::new()
            .route("/init", post(init_handler))
            .route("/run", post(run_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock action container to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();
        log::info!("Mock action container listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| log::error!("Mock action container error: {}", e));
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock action container already shut down.");
        }
    }
}
