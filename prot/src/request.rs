use std::fmt::Display;

use message::{
    Change, ChangeQuestion, Difficulty, GenerateQuestionnaire, Language, Module, QuestionType,
};

use crate::key::CorrelationKey;

pub const QUESTIONS_RANGE: std::ops::RangeInclusive<u8> = 1..=30;
pub const ALTERNATIVES_RANGE: std::ops::RangeInclusive<u8> = 2..=6;

/// Context used for requests built from free text, where no theme supplies one.
pub const DEFAULT_CONTEXT_ID: &str = "37960";

/// Fixed identifiers merged into every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub application_id: u32,
    pub tenant_id: u32,
    pub institution_id: u32,
    pub user_id: u32,
    pub language: Language,
    pub default_context_id: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            application_id: 1,
            tenant_id: 1,
            institution_id: 1,
            user_id: 1,
            language: Language::PtBr,
            default_context_id: DEFAULT_CONTEXT_ID.to_owned(),
        }
    }
}

/// A content module the questionnaire is generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub module_name: String,
    pub content_code: String,
    pub context_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateForm {
    pub theme: Option<Theme>,
    pub custom_input: Option<String>,
    pub professor_input: String,
    pub number_of_questions: u8,
    pub number_of_alternatives: u8,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
}

impl Default for GenerateForm {
    fn default() -> Self {
        Self {
            theme: None,
            custom_input: None,
            professor_input: String::new(),
            number_of_questions: 3,
            number_of_alternatives: 5,
            difficulty: Difficulty::Medium,
            question_type: QuestionType::MultipleChoice,
        }
    }
}

impl GenerateForm {
    pub fn validate(&self) -> Result<(), Validation> {
        if self.theme.is_none() && self.text().is_none() {
            return Err(Validation::MissingContent);
        }
        if !QUESTIONS_RANGE.contains(&self.number_of_questions) {
            return Err(Validation::QuestionCount(self.number_of_questions));
        }
        if !ALTERNATIVES_RANGE.contains(&self.number_of_alternatives) {
            return Err(Validation::AlternativeCount(self.number_of_alternatives));
        }
        Ok(())
    }

    /// Builds the wire request. A selected theme wins over free text.
    pub fn build(
        &self,
        key: &CorrelationKey,
        env: &Environment,
    ) -> Result<GenerateQuestionnaire, Validation> {
        self.validate()?;

        let (modules_list, custom_input, context_id) = match &self.theme {
            Some(theme) => (
                vec![Module {
                    module_name: theme.module_name.clone(),
                    content_code: theme.content_code.clone(),
                }],
                None,
                theme.context_id.clone(),
            ),
            None => (
                Vec::new(),
                self.text().map(str::to_owned),
                env.default_context_id.clone(),
            ),
        };

        Ok(GenerateQuestionnaire {
            key: key.as_str().to_owned(),
            send_just_status: false,
            number_of_questions: self.number_of_questions,
            number_of_alternatives: self.number_of_alternatives,
            difficulty: self.difficulty,
            question_type: self.question_type,
            professor_input: self.professor_input.clone(),
            custom_input,
            modules_list,
            context_id,
            application_id: env.application_id,
            tenant_id: env.tenant_id,
            institution_id: env.institution_id,
            user_id: env.user_id,
            language_id: env.language,
        })
    }

    fn text(&self) -> Option<&str> {
        self.custom_input
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeForm {
    pub question_id: String,
    pub questionnaire_id: String,
    pub change: Change,
}

impl ChangeForm {
    pub fn validate(&self) -> Result<(), Validation> {
        if self.question_id.trim().is_empty() {
            return Err(Validation::MissingQuestionId);
        }
        if self.questionnaire_id.trim().is_empty() {
            return Err(Validation::MissingQuestionnaireId);
        }
        if let Change::Instruction(text) = &self.change {
            if text.trim().is_empty() {
                return Err(Validation::EmptyInstruction);
            }
        }
        Ok(())
    }

    pub fn build(&self, key: &CorrelationKey) -> Result<ChangeQuestion, Validation> {
        self.validate()?;

        Ok(ChangeQuestion::new(
            key.as_str().to_owned(),
            self.question_id.trim().to_owned(),
            self.questionnaire_id.trim().to_owned(),
            self.change.clone(),
        ))
    }
}

/// Problems caught before any connection is opened.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    MissingContent,
    QuestionCount(u8),
    AlternativeCount(u8),
    MissingQuestionId,
    MissingQuestionnaireId,
    EmptyInstruction,
}

impl Display for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validation::MissingContent => {
                f.write_str("Por favor, selecione um tema ou insira o conteúdo para o questionário")
            }
            Validation::QuestionCount(n) => write!(
                f,
                "Número de questões deve estar entre {} e {} (recebido {})",
                QUESTIONS_RANGE.start(),
                QUESTIONS_RANGE.end(),
                n
            ),
            Validation::AlternativeCount(n) => write!(
                f,
                "Alternativas por questão deve estar entre {} e {} (recebido {})",
                ALTERNATIVES_RANGE.start(),
                ALTERNATIVES_RANGE.end(),
                n
            ),
            Validation::MissingQuestionId => f.write_str("Por favor, informe o ID da questão"),
            Validation::MissingQuestionnaireId => {
                f.write_str("Por favor, informe o ID do questionário")
            }
            Validation::EmptyInstruction => {
                f.write_str("Por favor, insira as instruções de modificação")
            }
        }
    }
}

impl std::error::Error for Validation {}
