use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "generateQuestionnaire")]
    GenerateQuestionnaire(GenerateQuestionnaire),
    #[serde(rename = "changeQuestion")]
    ChangeQuestion(ChangeQuestion),
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::GenerateQuestionnaire(_) => "generateQuestionnaire",
            Request::ChangeQuestion(_) => "changeQuestion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionnaire {
    pub key: String,
    pub send_just_status: bool,
    pub number_of_questions: u8,
    pub number_of_alternatives: u8,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    pub professor_input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_input: Option<String>,
    pub modules_list: Vec<Module>,
    pub context_id: String,
    pub application_id: u32,
    pub tenant_id: u32,
    pub institution_id: u32,
    pub user_id: u32,
    pub language_id: Language,
}

/// Wire form of a question modification. Exactly one of the four change
/// fields carries a value, the others are empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeQuestion {
    pub key: String,
    pub question_id: String,
    pub questionnaire_id: String,
    pub level_change: String,
    pub instruction_change: String,
    pub direct_level_change: String,
    pub type_change: String,
}

impl ChangeQuestion {
    pub fn new(key: String, question_id: String, questionnaire_id: String, change: Change) -> Self {
        let mut req = ChangeQuestion {
            key,
            question_id,
            questionnaire_id,
            level_change: String::new(),
            instruction_change: String::new(),
            direct_level_change: String::new(),
            type_change: String::new(),
        };

        match change {
            Change::Level(level) => req.level_change = level.as_str().to_owned(),
            Change::Instruction(text) => req.instruction_change = text,
            Change::Direct(direct) => req.direct_level_change = direct.as_str().to_owned(),
            Change::Type(ty) => req.type_change = ty.as_str().to_owned(),
        }

        req
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Level(Difficulty),
    Instruction(String),
    Direct(DirectLevelChange),
    Type(QuestionType),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub module_name: String,
    pub content_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestionType {
    #[default]
    #[serde(rename = "multiple choice")]
    MultipleChoice,
    #[serde(rename = "assertion-reason")]
    AssertionReason,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple choice",
            QuestionType::AssertionReason => "assertion-reason",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectLevelChange {
    Easier,
    Harder,
}

impl DirectLevelChange {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectLevelChange::Easier => "easier",
            DirectLevelChange::Harder => "harder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "pt-br")]
    PtBr,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "es")]
    Es,
}

/// Inbound message from the generation service, classified by its `action`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PartialQuestion(Question),
    QuestionnaireDetails(QuestionnaireDetails),
    QuestionnaireGenerated,
    QuestionChanged(Question),
    QuestionChangedSuccess,
    Error { message: Option<String> },
    Unknown(Option<String>),
}

/// A generated question. The payload is kept as received; only the handful
/// of fields needed for identification and display are looked at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Question(Value);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionOption<'a> {
    pub text: &'a str,
    pub correct: bool,
    pub feedback: Option<&'a str>,
}

impl Question {
    pub fn new(value: Value) -> Self {
        Question(value)
    }

    pub fn id(&self) -> Option<String> {
        id_field(&self.0, "questionId")
    }

    pub fn content(&self) -> Option<&str> {
        self.0.get("content").and_then(Value::as_str)
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.0.get("difficulty").and_then(Value::as_str)
    }

    pub fn feedback(&self) -> Option<&str> {
        self.0.get("feedback").and_then(Value::as_str)
    }

    pub fn options(&self) -> Vec<QuestionOption<'_>> {
        let Some(options) = self.0.get("options").and_then(Value::as_array) else {
            return Vec::new();
        };

        options
            .iter()
            .map(|opt| QuestionOption {
                text: opt.get("text").and_then(Value::as_str).unwrap_or_default(),
                correct: opt.get("correct").and_then(Value::as_bool).unwrap_or(false),
                feedback: opt.get("feedback").and_then(Value::as_str),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionnaireDetails(Value);

impl QuestionnaireDetails {
    pub fn new(value: Value) -> Self {
        QuestionnaireDetails(value)
    }

    pub fn questionnaire_id(&self) -> Option<String> {
        id_field(&self.0, "questionnaireId")
    }

    pub fn statement(&self) -> Option<&str> {
        self.0.get("questionnaireStatement").and_then(Value::as_str)
    }
}

// Identifiers come back either as strings or as bare numbers.
fn id_field(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
