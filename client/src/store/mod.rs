use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use message::Question;
use prot::QuestionBook;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Saved {
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    modified: BTreeMap<String, Question>,
    #[serde(default)]
    last_questionnaire_id: Option<String>,
}

/// Local copy of the last questionnaire and of every modified question.
/// Best-effort only: the service stays the source of truth.
pub struct Store {
    path: PathBuf,
    book: QuestionBook,
    modified: BTreeMap<String, Question>,
    last_questionnaire_id: Option<String>,
}

impl Store {
    /// Never fails; an unreadable file is logged and treated as empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let saved = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Saved>(&bytes) {
                Ok(saved) => saved,
                Err(err) => {
                    warn!(?path, %err, "Ignoring unreadable store");
                    Saved::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Saved::default(),
            Err(err) => {
                warn!(?path, %err, "Ignoring unreadable store");
                Saved::default()
            }
        };

        debug!(?path, questions = saved.questions.len(), "Store opened");

        let mut book = QuestionBook::new(saved.questions);
        // Modifications win over whatever the questionnaire held when saved.
        for q in saved.modified.values() {
            book.merge(q);
        }

        Self {
            path,
            book,
            modified: saved.modified,
            last_questionnaire_id: saved.last_questionnaire_id,
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let saved = Saved {
            questions: self.book.questions().to_vec(),
            modified: self.modified.clone(),
            last_questionnaire_id: self.last_questionnaire_id.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&saved)?;

        fs::write(&self.path, bytes)
            .with_context(|| format!("Writing store to {}", self.path.display()))
    }

    /// Saves and logs instead of failing.
    pub fn persist(&self) {
        if let Err(err) = self.save() {
            warn!(?err, "Could not persist questions");
        }
    }

    pub fn set_questions(&mut self, questions: Vec<Question>) {
        self.book.replace_all(questions);
    }

    /// Records the latest form of a modified question. Returns whether it
    /// replaced one of the stored questionnaire's questions.
    pub fn record_change(&mut self, question: &Question) -> bool {
        let Some(id) = question.id() else {
            warn!("Modified question without an id");
            return false;
        };

        self.modified.insert(id, question.clone());
        self.book.merge(question)
    }

    pub fn set_last_questionnaire_id(&mut self, id: String) {
        self.last_questionnaire_id = Some(id);
    }

    pub fn last_questionnaire_id(&self) -> Option<&str> {
        self.last_questionnaire_id.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        self.book.questions()
    }

    /// Where a question with the same id sits in the stored questionnaire.
    pub fn position(&self, question: &Question) -> Option<usize> {
        let id = question.id()?;
        self.book
            .questions()
            .iter()
            .position(|q| q.id().as_deref() == Some(id.as_str()))
    }

    pub fn modified(&self, id: &str) -> Option<&Question> {
        self.modified.get(id)
    }
}
