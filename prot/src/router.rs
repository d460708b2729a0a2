use tracing::debug;

use message::{Event, Question};

use crate::state::SessionState;
use crate::FALLBACK_ERROR;

/// What a single inbound event did to the session state.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Ignored,
    QuestionAppended { count: usize },
    DetailsReplaced { questionnaire_id: Option<String> },
    Acknowledged,
    Terminal(Terminal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Generated,
    Changed(Question),
    Failed(String),
}

pub fn route(state: &mut SessionState, event: Event) -> Routed {
    match event {
        Event::PartialQuestion(question) => {
            let count = state.push_question(question);
            debug!(count, "Partial question accumulated");
            Routed::QuestionAppended { count }
        }
        Event::QuestionnaireDetails(details) => {
            let questionnaire_id = state.set_details(details);
            debug!(?questionnaire_id, "Questionnaire details replaced");
            Routed::DetailsReplaced { questionnaire_id }
        }
        Event::QuestionnaireGenerated => {
            state.succeed();
            Routed::Terminal(Terminal::Generated)
        }
        Event::QuestionChanged(question) => {
            state.succeed();
            Routed::Terminal(Terminal::Changed(question))
        }
        // Secondary confirmation; the operation is finished by
        // `questionChanged` or by the channel closing.
        Event::QuestionChangedSuccess => Routed::Acknowledged,
        Event::Error { message } => {
            let message = message.unwrap_or_else(|| FALLBACK_ERROR.to_owned());
            state.fail(message.clone());
            Routed::Terminal(Terminal::Failed(message))
        }
        Event::Unknown(action) => {
            debug!(?action, "Ignoring message");
            Routed::Ignored
        }
    }
}
