use std::fmt::Display;

use tracing::{debug, warn};

use message::{Question, QuestionnaireDetails, Request};

use crate::codec;
use crate::guard::{Lifecycle, Termination};
use crate::key::CorrelationKey;
use crate::router::{self, Routed, Terminal};
use crate::state::SessionState;
use crate::{Result, ABNORMAL_CLOSURE, FALLBACK_ERROR};

/// Everything that can happen to a session's channel, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingress {
    Opened,
    Frame(String),
    TransportError(String),
    Closed(Option<u16>),
    Cancel,
}

/// What the transport should do in response to an ingress item.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send(String),
    Close,
    Emit(Update),
}

/// User-facing notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Connected,
    QuestionGenerated(usize),
    DetailsReceived,
    Generated,
    Changed,
    Failed(String),
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Connected => f.write_str("WebSocket conectado com sucesso!"),
            Notice::QuestionGenerated(n) => write!(f, "Questão {} gerada", n),
            Notice::DetailsReceived => f.write_str("Detalhes do questionário recebidos"),
            Notice::Generated => f.write_str("Questionário completo gerado!"),
            Notice::Changed => f.write_str("Questão modificada com sucesso!"),
            Notice::Failed(message) => f.write_str(message),
        }
    }
}

/// State changes handed to whoever presents the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Notice(Notice),
    Questions(Vec<Question>),
    Details(QuestionnaireDetails),
    QuestionnaireId(String),
    QuestionChanged(Question),
    Acknowledged,
    /// Final state; sent exactly once per session.
    Finished(SessionState),
}

/// One operation's protocol state machine. It performs no I/O: the driver
/// feeds it ingress items and carries out the returned actions.
#[derive(Debug)]
pub struct Session {
    key: CorrelationKey,
    request: Option<String>,
    state: SessionState,
    guard: Lifecycle,
}

impl Session {
    pub fn new(key: CorrelationKey, req: &Request) -> Result<Self> {
        let request = codec::encode(req)?;
        let mut guard = Lifecycle::new();
        guard.begin();

        Ok(Self {
            key,
            request: Some(request),
            state: SessionState::started(),
            guard,
        })
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        !self.guard.in_flight()
    }

    pub fn handle(&mut self, ingress: Ingress) -> Vec<Action> {
        let mut actions = Vec::new();

        match ingress {
            Ingress::Opened => {
                if !self.guard.in_flight() {
                    return actions;
                }
                // The request is taken, so a second open can never resend it.
                if let Some(req) = self.request.take() {
                    actions.push(Action::Send(req));
                    actions.push(Action::Emit(Update::Notice(Notice::Connected)));
                }
            }
            Ingress::Frame(text) => {
                if !self.guard.in_flight() {
                    debug!(%text, "Frame after session finished");
                    return actions;
                }
                match codec::decode(&text) {
                    Ok(event) => {
                        let routed = router::route(&mut self.state, event);
                        self.apply(routed, &mut actions);
                    }
                    Err(err) => {
                        warn!(%err, "Undecodable message");
                        self.fail(FALLBACK_ERROR, &mut actions);
                        actions.push(Action::Close);
                        self.finish(Termination::Event, &mut actions);
                    }
                }
            }
            Ingress::TransportError(err) => {
                if self.guard.in_flight() {
                    warn!(%err, "Transport error");
                    self.fail(FALLBACK_ERROR, &mut actions);
                    self.finish(Termination::TransportError, &mut actions);
                } else {
                    debug!(%err, "Transport error after session finished");
                }
            }
            Ingress::Closed(code) => {
                let code = code.unwrap_or(ABNORMAL_CLOSURE);
                if let Some(message) = self.guard.abnormal_close(code) {
                    warn!(code, "Channel closed before the operation finished");
                    self.fail(message, &mut actions);
                }
                self.finish(Termination::Closed(code), &mut actions);
            }
            Ingress::Cancel => {
                if self.guard.in_flight() {
                    actions.push(Action::Close);
                    self.finish(Termination::Cancelled, &mut actions);
                }
            }
        }

        actions
    }

    fn apply(&mut self, routed: Routed, actions: &mut Vec<Action>) {
        match routed {
            Routed::Ignored => {}
            Routed::QuestionAppended { count } => {
                actions.push(Action::Emit(Update::Questions(self.state.questions.clone())));
                actions.push(Action::Emit(Update::Notice(Notice::QuestionGenerated(count))));
            }
            Routed::DetailsReplaced { questionnaire_id } => {
                if let Some(details) = &self.state.details {
                    actions.push(Action::Emit(Update::Details(details.clone())));
                }
                if let Some(id) = questionnaire_id {
                    actions.push(Action::Emit(Update::QuestionnaireId(id)));
                }
                actions.push(Action::Emit(Update::Notice(Notice::DetailsReceived)));
            }
            Routed::Acknowledged => actions.push(Action::Emit(Update::Acknowledged)),
            Routed::Terminal(Terminal::Generated) => {
                actions.push(Action::Emit(Update::Notice(Notice::Generated)));
                actions.push(Action::Close);
                self.finish(Termination::Event, actions);
            }
            Routed::Terminal(Terminal::Changed(question)) => {
                actions.push(Action::Emit(Update::QuestionChanged(question)));
                actions.push(Action::Emit(Update::Notice(Notice::Changed)));
                actions.push(Action::Close);
                self.finish(Termination::Event, actions);
            }
            Routed::Terminal(Terminal::Failed(message)) => {
                actions.push(Action::Emit(Update::Notice(Notice::Failed(message))));
                actions.push(Action::Close);
                self.finish(Termination::Event, actions);
            }
        }
    }

    fn fail(&mut self, message: &str, actions: &mut Vec<Action>) {
        if self.state.fail(message) {
            actions.push(Action::Emit(Update::Notice(Notice::Failed(message.to_owned()))));
        }
    }

    fn finish(&mut self, by: Termination, actions: &mut Vec<Action>) {
        if self.guard.finish(by) {
            self.state.in_flight = false;
            actions.push(Action::Emit(Update::Finished(self.state.clone())));
        }
    }
}
