use std::io::Write;

use tracing::{debug, error, info, warn};

use prot::{Notice, Update, Updates};

use crate::render;
use crate::store::Store;

/// Applies session updates to the store and prints results to `out` until
/// the session finishes. Returns whether the operation succeeded.
///
/// `out` must not be a held `StdoutLock`: the session task logs while this
/// awaits, and the log writer may need the same handle.
pub async fn follow(
    mut updates: Updates,
    store: &mut Store,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    while let Some(update) = updates.recv().await {
        match update {
            Update::Notice(Notice::Failed(message)) => warn!("{}", message),
            Update::Notice(notice) => info!("{}", notice),
            Update::Questions(questions) => {
                store.set_questions(questions);
                store.persist();
            }
            Update::Details(details) => render::details(out, &details)?,
            Update::QuestionnaireId(id) => {
                store.set_last_questionnaire_id(id);
                store.persist();
            }
            Update::QuestionChanged(question) => {
                if !store.record_change(&question) {
                    debug!(id = ?question.id(), "Changed question is not in the stored questionnaire");
                }
                store.persist();
                render::question(out, store.position(&question), &question)?;
            }
            Update::Acknowledged => debug!("Service acknowledged the change"),
            Update::Finished(state) => {
                render::questions(out, &state.questions)?;
                out.flush()?;
                return match state.error {
                    Some(err) => {
                        error!(%err, "Operation failed");
                        Ok(false)
                    }
                    None => Ok(true),
                };
            }
        }
    }

    error!("Session ended without a result");
    Ok(false)
}
