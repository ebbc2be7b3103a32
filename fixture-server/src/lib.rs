use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// Body sent by `/status/{code}`. Not valid JSON.
pub const GARBAGE_BODY: &str = "{{{}{}{{[][}";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub text: String,
}

#[derive(Deserialize)]
pub struct CreateNote {
    pub text: String,
}

/// What `/echo` saw of the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct Store {
    notes: RwLock<BTreeMap<u64, Note>>,
    next_id: AtomicU64,
}

pub type Db = Arc<Store>;

pub fn app() -> Router {
    let db: Db = Arc::default();
    Router::new()
        .route("/hello-world", get(ok))
        .route("/other-path", get(ok))
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/{id}", get(get_note).delete(delete_note))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

/// Serve any router, so tests can attach layers to [`app`] first.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "fixture server listening");
    }
    axum::serve(listener, router).await
}

/// Serve `router` on a random local port from a background thread.
///
/// The thread owns its own single-threaded runtime and lives until the
/// process exits.
pub fn spawn(router: Router) -> Result<SocketAddr, std::io::Error> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(error) => {
                tracing::error!(%error, "failed to start fixture runtime");
                return;
            }
        };
        let result = rt.block_on(async {
            let listener = TcpListener::from_std(std_listener)?;
            serve(listener, router).await
        });
        if let Err(error) = result {
            tracing::error!(%error, "fixture server stopped");
        }
    });

    Ok(addr)
}

async fn ok() -> StatusCode {
    StatusCode::OK
}

async fn list_notes(State(db): State<Db>) -> Json<Vec<Note>> {
    let notes = db.notes.read().await;
    Json(notes.values().cloned().collect())
}

async fn create_note(
    State(db): State<Db>,
    Json(input): Json<CreateNote>,
) -> (StatusCode, Json<Note>) {
    let note = Note {
        id: db.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        text: input.text,
    };
    db.notes.write().await.insert(note.id, note.clone());
    (StatusCode::CREATED, Json(note))
}

async fn get_note(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Note>, StatusCode> {
    let notes = db.notes.read().await;
    notes.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn delete_note(State(db): State<Db>, Path(id): Path<u64>) -> StatusCode {
    let mut notes = db.notes.write().await;
    notes
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .unwrap_or(StatusCode::NOT_FOUND)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Responds with the requested status and [`GARBAGE_BODY`].
async fn status(Path(code): Path<u16>) -> (StatusCode, &'static str) {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, GARBAGE_BODY),
        Err(_) => (StatusCode::BAD_REQUEST, GARBAGE_BODY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_serializes_to_json() {
        let note = Note {
            id: 7,
            text: "Test".to_string(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["text"], "Test");
    }

    #[test]
    fn create_note_rejects_missing_text() {
        let result: Result<CreateNote, _> = serde_json::from_str(r#"{"id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn garbage_body_is_not_json() {
        assert!(serde_json::from_str::<serde_json::Value>(GARBAGE_BODY).is_err());
    }
}
