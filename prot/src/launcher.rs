use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};

use message::Request;

use crate::driver;
use crate::key::CorrelationKey;
use crate::request::{ChangeForm, Environment, GenerateForm};
use crate::session::{Session, Update};
use crate::Result;

pub type Updates = mpsc::UnboundedReceiver<Update>;

/// Starts sessions against one service address. At most one session is
/// live at a time: starting a new one closes the previous.
pub struct Launcher {
    url: String,
    env: Environment,
    current: Option<SessionHandle>,
}

impl Launcher {
    pub fn new(url: impl Into<String>, env: Environment) -> Self {
        Self {
            url: url.into(),
            env,
            current: None,
        }
    }

    /// Validation failures are returned before anything is opened.
    pub fn generate(&mut self, form: &GenerateForm) -> Result<Updates> {
        form.validate()?;
        let key = CorrelationKey::generate();
        let req = form.build(&key, &self.env)?;
        self.launch(key, Request::GenerateQuestionnaire(req))
    }

    pub fn change(&mut self, form: &ChangeForm) -> Result<Updates> {
        form.validate()?;
        let key = CorrelationKey::generate();
        let req = form.build(&key)?;
        self.launch(key, Request::ChangeQuestion(req))
    }

    pub fn current(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }

    /// Closes the live session, if any, and waits for its task to end.
    pub async fn shutdown(&mut self) {
        if let Some(mut handle) = self.current.take() {
            handle.close();
            handle.join().await;
        }
    }

    fn launch(&mut self, key: CorrelationKey, req: Request) -> Result<Updates> {
        if let Some(mut prev) = self.current.take() {
            info!(key = %prev.key(), "Closing previous session");
            prev.close();
        }

        let session = Session::new(key.clone(), &req)?;
        let url = session_url(&self.url, &key);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        info!(%key, action = req.action(), "Starting session");

        let task = tokio::spawn(
            driver::run(url, session, updates_tx, cancel_rx)
                .instrument(info_span!("session", %key)),
        );

        self.current = Some(SessionHandle {
            key,
            cancel: Some(cancel_tx),
            task: Some(task),
        });

        Ok(updates_rx)
    }
}

/// Owns one running session. Dropping it closes the session.
pub struct SessionHandle {
    key: CorrelationKey,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Requests a normal close. Has no effect once the session finished.
    pub fn close(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!(%err, "Session task failed");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

pub fn session_url(base: &str, key: &CorrelationKey) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", base, sep, key)
}
