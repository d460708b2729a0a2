use serde_json::{Map, Value};
use tracing::trace;

use message::{Event, Question, QuestionnaireDetails, Request};

use crate::{Error, Result};

pub fn encode(req: &Request) -> Result<String> {
    let text = serde_json::to_string(req)?;

    trace!(%text, "Encoded request");

    Ok(text)
}

/// Classifies one text frame. Known actions take precedence over a stray
/// `error` field; anything unrecognised without one decodes to
/// `Event::Unknown`.
pub fn decode(text: &str) -> Result<Event> {
    trace!(%text, "Received frame");

    let value: Value = serde_json::from_str(text)?;
    let Value::Object(obj) = value else {
        return Err(Error::Malformed(format!("expected a JSON object, got {}", text)));
    };

    let action = obj.get("action").and_then(Value::as_str);

    let event = match action {
        Some("partialQuestionGenerated") => {
            let question = pointer(&obj, &["partialResponse", "response"])
                .ok_or_else(|| missing("partialQuestionGenerated", "partialResponse.response"))?;
            Event::PartialQuestion(Question::new(question.clone()))
        }
        Some("questionnaireDetails") => {
            let details = obj
                .get("questionnaireDetails")
                .filter(|v| v.is_object())
                .ok_or_else(|| missing("questionnaireDetails", "questionnaireDetails"))?;
            Event::QuestionnaireDetails(QuestionnaireDetails::new(details.clone()))
        }
        Some("questionnaireGenerated") => Event::QuestionnaireGenerated,
        Some("questionChanged") => {
            let question = obj
                .get("question")
                .filter(|v| v.is_object())
                .or_else(|| pointer(&obj, &["partialResponse", "response"]))
                .ok_or_else(|| missing("questionChanged", "question"))?;
            Event::QuestionChanged(Question::new(question.clone()))
        }
        Some("questionChangedSuccess") => Event::QuestionChangedSuccess,
        Some("error") => Event::Error {
            message: error_message(&obj),
        },
        _ if obj.get("error").is_some_and(truthy) => Event::Error {
            message: error_message(&obj),
        },
        other => Event::Unknown(other.map(str::to_owned)),
    };

    Ok(event)
}

fn pointer<'a>(obj: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut cur = obj.get(*first)?;
    for seg in rest {
        cur = cur.get(*seg)?;
    }
    cur.is_object().then_some(cur)
}

fn error_message(obj: &Map<String, Value>) -> Option<String> {
    obj.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_owned)
}

fn missing(action: &str, field: &str) -> Error {
    Error::Malformed(format!("{} without {}", action, field))
}

// Mirrors what the service's own clients treat as a set flag.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
