use crate::domain::models::{Category, Question};
use crate::domain::questionnaire::{available_categories, questions_for, DraftError, QuestionnaireDraft};
use crate::error::AppError;
use crate::services::submissions;
use crate::state::SharedState;
use crate::web::action;
use crate::web::session::UserSession;
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCategory {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

#[derive(Serialize)]
pub struct QuestionnaireView {
    pub category: Category,
    pub questions: Vec<Question>,
}

/// Chosen answer id per question id.
#[derive(Deserialize)]
pub struct AnswerSheet {
    pub answers: HashMap<String, String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_available))
        .route("/:category_id", get(open).post(submit))
        .with_state(state)
}

async fn ensure_catalog(state: &SharedState, session_id: Uuid) {
    let loaded = state
        .sessions
        .read(session_id, |store| store.has_catalog())
        .await
        .unwrap_or(false);
    if !loaded {
        submissions::load_session_data(state, session_id).await;
    }
}

async fn list_available(
    State(state): State<SharedState>,
    current: UserSession,
) -> Json<Vec<AvailableCategory>> {
    ensure_catalog(&state, current.id).await;
    let categories: Vec<AvailableCategory> = state
        .sessions
        .read(current.id, |store| {
            available_categories(&current.user, &store.categories, &store.questions, &store.submissions)
                .into_iter()
                .map(|c| AvailableCategory {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    question_count: questions_for(&store.questions, &c.id).len(),
                })
                .collect()
        })
        .await
        .unwrap_or_default();
    Json(categories)
}

/// Category and questions, provided the user has not answered it yet.
async fn load_open(
    state: &SharedState,
    current: &UserSession,
    category_id: &str,
) -> Result<(Category, Vec<Question>), AppError> {
    ensure_catalog(state, current.id).await;
    state
        .sessions
        .read(current.id, |store| {
            let category = store
                .category(category_id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Categoria não encontrada.".to_string()))?;
            let available = available_categories(
                &current.user,
                &store.categories,
                &store.questions,
                &store.submissions,
            )
            .iter()
            .any(|c| c.id == category.id);
            if !available {
                return Err(AppError::Conflict(
                    "Este questionário já foi respondido ou não possui perguntas.".to_string(),
                ));
            }
            let questions: Vec<Question> = questions_for(&store.questions, &category.id)
                .into_iter()
                .cloned()
                .collect();
            Ok((category, questions))
        })
        .await
        .ok_or(AppError::Unauthorized)?
}

async fn open(
    State(state): State<SharedState>,
    current: UserSession,
    Path(category_id): Path<String>,
) -> Result<Json<QuestionnaireView>, AppError> {
    let (category, questions) = load_open(&state, &current, &category_id).await?;
    Ok(Json(QuestionnaireView { category, questions }))
}

async fn submit(
    State(state): State<SharedState>,
    current: UserSession,
    Path(category_id): Path<String>,
    Json(sheet): Json<AnswerSheet>,
) -> Result<Response, AppError> {
    if current.user.is_admin() {
        return Err(AppError::Forbidden(
            "Questionários são respondidos pelas empresas.".to_string(),
        ));
    }
    let (category, questions) = load_open(&state, &current, &category_id).await?;

    let mut draft = QuestionnaireDraft::new(&category, &questions);
    for (question_id, answer_id) in &sheet.answers {
        draft
            .select(question_id, answer_id)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    tracing::debug!(
        "{} answered {} of {} questions in '{}'",
        current.user.id,
        draft.answered(),
        draft.questions().len(),
        category.name
    );
    let completed = draft.finish(&current.user).map_err(|e| match e {
        DraftError::Incomplete { .. } => {
            AppError::BadRequest("Responda todas as perguntas antes de enviar.".to_string())
        }
        other => AppError::BadRequest(other.to_string()),
    })?;

    Ok(action(submissions::add_submission(&state, current.id, completed).await))
}
