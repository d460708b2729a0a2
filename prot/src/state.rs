use message::{Question, QuestionnaireDetails};

/// Per-operation client state. Replaced, not reset, when the next operation
/// starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub in_flight: bool,
    pub questions: Vec<Question>,
    pub details: Option<QuestionnaireDetails>,
    pub questionnaire_id: Option<String>,
    pub error: Option<String>,
    succeeded: bool,
}

impl SessionState {
    pub fn started() -> Self {
        Self {
            in_flight: true,
            ..Default::default()
        }
    }

    /// Returns the new number of accumulated questions.
    pub fn push_question(&mut self, question: Question) -> usize {
        self.questions.push(question);
        self.questions.len()
    }

    pub fn set_details(&mut self, details: QuestionnaireDetails) -> Option<String> {
        let id = details.questionnaire_id();
        if id.is_some() {
            self.questionnaire_id = id.clone();
        }
        self.details = Some(details);
        id
    }

    pub fn succeed(&mut self) {
        self.succeeded = true;
        self.error = None;
    }

    /// Records a failure unless a success already landed. Returns whether
    /// the error was kept.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.succeeded {
            return false;
        }
        self.error = Some(message.into());
        true
    }
}

/// The questions shown to the user, outliving individual sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionBook {
    questions: Vec<Question>,
}

impl QuestionBook {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn replace_all(&mut self, questions: Vec<Question>) {
        self.questions = questions;
    }

    /// Replaces the question with the same id in place. Questions without a
    /// match are left alone; returns whether anything was replaced.
    pub fn merge(&mut self, updated: &Question) -> bool {
        let Some(id) = updated.id() else {
            return false;
        };

        let mut replaced = false;
        for q in self.questions.iter_mut() {
            if q.id().as_deref() == Some(id.as_str()) {
                *q = updated.clone();
                replaced = true;
            }
        }
        replaced
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id().as_deref() == Some(id))
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}
