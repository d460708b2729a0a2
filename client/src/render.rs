use std::io::{self, Write};

use message::{Question, QuestionnaireDetails};

pub fn difficulty_label(difficulty: Option<&str>) -> &'static str {
    match difficulty.map(str::to_lowercase).as_deref() {
        Some("easy") => "Fácil",
        Some("hard") => "Difícil",
        _ => "Médio",
    }
}

pub fn details(out: &mut impl Write, details: &QuestionnaireDetails) -> io::Result<()> {
    writeln!(out, "Questionário Gerado")?;
    if let Some(id) = details.questionnaire_id() {
        writeln!(out, "ID do Questionário: {}", id)?;
    }
    if let Some(statement) = details.statement() {
        writeln!(out, "{}", statement)?;
    }
    writeln!(out)
}

/// `index` is the question's position in its questionnaire, when known.
pub fn question(out: &mut impl Write, index: Option<usize>, q: &Question) -> io::Result<()> {
    match index {
        Some(i) => write!(out, "Questão {}", i + 1)?,
        None => write!(out, "Questão")?,
    }
    if let Some(id) = q.id() {
        write!(out, "  [ID: {}]", id)?;
    }
    writeln!(out, "  ({})", difficulty_label(q.difficulty()))?;

    if let Some(content) = q.content() {
        writeln!(out, "{}", content)?;
    }

    for (i, opt) in q.options().iter().enumerate() {
        let letter = char::from(b'A' + (i % 26) as u8);
        let mark = if opt.correct { " ✓" } else { "" };
        writeln!(out, "  {}{} {}", letter, mark, opt.text)?;
    }

    if let Some(feedback) = q.feedback() {
        writeln!(out, "Feedback: {}", feedback)?;
    }
    writeln!(out)
}

pub fn questions(out: &mut impl Write, qs: &[Question]) -> io::Result<()> {
    for (i, q) in qs.iter().enumerate() {
        question(out, Some(i), q)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_marks_correct_option() {
        let q = Question::new(json!({
            "questionId": "q-7",
            "difficulty": "HARD",
            "content": "Qual protocolo é orientado a conexão?",
            "options": [
                { "text": "UDP", "correct": false },
                { "text": "TCP", "correct": true }
            ],
            "feedback": "TCP estabelece conexão antes da troca de dados."
        }));

        let mut out = Vec::new();
        question(&mut out, Some(1), &q).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Questão 2  [ID: q-7]  (Difícil)"));
        assert!(text.contains("  A UDP\n"));
        assert!(text.contains("  B ✓ TCP\n"));
        assert!(text.contains("Feedback: TCP estabelece"));
    }

    #[test]
    fn test_question_without_position() {
        let q = Question::new(json!({ "questionId": "q-9", "content": "Avulsa" }));

        let mut out = Vec::new();
        question(&mut out, None, &q).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Questão  [ID: q-9]  (Médio)\n"));
    }

    #[test]
    fn test_unknown_difficulty_is_medium() {
        assert_eq!(difficulty_label(None), "Médio");
        assert_eq!(difficulty_label(Some("weird")), "Médio");
        assert_eq!(difficulty_label(Some("easy")), "Fácil");
    }
}
