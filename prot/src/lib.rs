use std::fmt::Display;

use tokio_tungstenite::tungstenite;

pub mod codec;
pub mod driver;
pub mod guard;
pub mod key;
pub mod launcher;
pub mod request;
pub mod router;
pub mod session;
pub mod state;

pub use launcher::{Launcher, SessionHandle, Updates};
pub use request::{ChangeForm, Environment, GenerateForm, Theme, Validation};
pub use session::{Notice, Update};
pub use state::{QuestionBook, SessionState};

/// Shown when the service reports a failure without a message of its own,
/// and for transport failures.
pub const FALLBACK_ERROR: &str =
    "Aconteceu um erro durante a geração. Revise as entradas passadas e tente novamente.";

/// Shown when the connection drops before the operation finished.
pub const INTERRUPTED_ERROR: &str = "Conexão interrompida antes da conclusão. Tente novamente.";

pub const NORMAL_CLOSURE: u16 = 1000;
pub const ABNORMAL_CLOSURE: u16 = 1006;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Ws(tungstenite::Error),
    Json(serde_json::Error),
    Malformed(String),
    Validation(Validation),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Ws(err) => write!(f, "WebSocket error: {}", err),
            Error::Json(err) => write!(f, "(de)serializing error: {}", err),
            Error::Malformed(what) => write!(f, "Malformed message: {}", what),
            Error::Validation(err) => write!(f, "Invalid request: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Error::Ws(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::Validation(err)
    }
}
