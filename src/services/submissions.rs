use crate::domain::models::{
    ActionReply, LogEntry, LogType, Question, Submission, SubmissionAnswer, SyncState, User,
};
use crate::domain::questionnaire::CompletedQuestionnaire;
use crate::domain::scoring::{aggregate_for_admin, submissions_for_company};
use crate::error::GatewayError;
use crate::services::catalog;
use crate::services::webhook::{DetailedAnswer, QuestionnaireData, SubmissionPayload, SubmitterData};
use crate::state::AppState;
use chrono::Utc;
use uuid::Uuid;

const NOT_FOUND: &str = "Não encontrado";

/// Rebuilds the session's submissions from the score sheet. Needs the
/// catalog first; without it nothing changes.
pub async fn fetch_submissions(state: &AppState, session_id: Uuid) -> Result<(), GatewayError> {
    let Some((user, categories, questions, ready)) = state
        .sessions
        .read(session_id, |store| {
            (
                store.current_user.clone(),
                store.categories.clone(),
                store.questions.clone(),
                store.has_catalog(),
            )
        })
        .await
    else {
        return Ok(());
    };
    let Some(user) = user else {
        return Ok(());
    };
    if !ready {
        tracing::warn!("Submissions requested before categories and questions were loaded");
        return Ok(());
    }

    let records = match state.webhook.scores().await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Failed to fetch scores: {}", e);
            state
                .sessions
                .update(session_id, |store| {
                    store.replace_submissions(Vec::new());
                    if user.is_admin() {
                        store.drop_company_users();
                    }
                })
                .await;
            return Err(e);
        }
    };

    let now = Utc::now();
    if user.is_admin() {
        let aggregate = aggregate_for_admin(&records, &categories, &questions, now);
        tracing::debug!(
            "Aggregated {} score rows into {} submissions",
            records.len(),
            aggregate.submissions.len()
        );
        state
            .sessions
            .update(session_id, |store| {
                store.replace_company_users(aggregate.companies);
                store.replace_submissions(aggregate.submissions);
            })
            .await;
    } else {
        let own = submissions_for_company(&user, &records, &categories, &questions, now);
        state
            .sessions
            .update(session_id, |store| store.replace_submissions(own))
            .await;
    }
    Ok(())
}

/// Catalog first, then scores: the order the score aggregation depends on.
pub async fn load_session_data(state: &AppState, session_id: Uuid) {
    if catalog::fetch_questionnaire_data(state, session_id).await.is_ok() {
        let _ = fetch_submissions(state, session_id).await;
    }
}

fn detailed_answers(answers: &[SubmissionAnswer], questions: &[Question]) -> Vec<DetailedAnswer> {
    answers
        .iter()
        .map(|answer| {
            let question = questions.iter().find(|q| q.id == answer.question_id);
            let selected = question
                .and_then(|q| q.answers.iter().find(|a| a.score == answer.score))
                .map(|a| a.text.clone());
            DetailedAnswer {
                question_id: answer.question_id.clone(),
                question_text: question
                    .map(|q| q.text.clone())
                    .unwrap_or_else(|| NOT_FOUND.to_string()),
                selected_answer_text: selected.unwrap_or_else(|| NOT_FOUND.to_string()),
                score: answer.score,
            }
        })
        .collect()
}

fn payload(user: &User, submission: &Submission, questions: &[Question]) -> SubmissionPayload {
    SubmissionPayload {
        user_data: SubmitterData {
            id: user.id.clone(),
            name: user.name.clone(),
            company_name: user.company_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        },
        questionnaire_data: QuestionnaireData {
            category_id: submission.category_id.clone(),
            category_name: submission.category_name.clone(),
            total_score: submission.total_score,
            max_score: submission.max_score,
            submission_date: submission.date.to_rfc3339(),
            answers: detailed_answers(&submission.answers, questions),
        },
    }
}

/// Inserts the submission as pending, sends it, then records the verdict.
/// The local entry stays even when the webhook refuses it.
pub async fn add_submission(
    state: &AppState,
    session_id: Uuid,
    completed: CompletedQuestionnaire,
) -> ActionReply {
    let submission = Submission {
        id: format!("sub-{}", Uuid::new_v4()),
        user_id: completed.user_id,
        company_name: completed.company_name,
        category_id: completed.category_id,
        category_name: completed.category_name,
        answers: completed.answers,
        total_score: completed.total_score,
        max_score: completed.max_score,
        date: Utc::now(),
        sync: SyncState::Pending,
    };

    let inserted = state
        .sessions
        .update(session_id, |store| {
            let user = store.current_user.clone()?;
            store.insert_submission(submission.clone());
            store.push_log(LogEntry {
                id: format!("log-{}", Uuid::new_v4()),
                timestamp: submission.date,
                kind: LogType::QuestionnaireSubmission,
                message: format!(
                    "Questionário \"{}\" foi enviado por {}.",
                    submission.category_name, submission.company_name
                ),
                admin_id: None,
                admin_name: None,
            });
            Some((user, store.questions.clone()))
        })
        .await
        .flatten();

    let Some((user, questions)) = inserted else {
        tracing::error!("Submission attempted without a signed-in user");
        return ActionReply::failed("Usuário não autenticado.");
    };

    let body = payload(&user, &submission, &questions);
    let (sync, reply) = match state.webhook.submit_answers(&body).await {
        Ok(message) => {
            tracing::info!("{} submitted '{}'", user.id, submission.category_name);
            (SyncState::Confirmed, ActionReply::ok(message))
        }
        Err(err) => {
            tracing::error!("Submission {} was not accepted: {}", submission.id, err);
            let message = err.user_message(
                "Falha ao enviar as respostas.",
                "Ocorreu um erro de comunicação ao enviar as respostas.",
            );
            (
                SyncState::Failed {
                    reason: message.clone(),
                },
                ActionReply::failed(message),
            )
        }
    };

    state
        .sessions
        .update(session_id, |store| store.settle_submission(&submission.id, sync))
        .await;
    reply
}
