use crate::domain::models::{ActionReply, AnswerOption, Category, Question};
use crate::domain::scoring::dash_whitespace;
use crate::error::GatewayError;
use crate::services::webhook::{NewAnswer, RemoteQuestion};
use crate::state::AppState;
use uuid::Uuid;

const COMMUNICATION: &str = "Ocorreu um erro de comunicação.";

pub fn derived_category_id(name: &str) -> String {
    format!("cat-derived-{}", dash_whitespace(&name.to_lowercase()))
}

/// Categories are derived from the question list so both collections come
/// from a single source.
pub fn catalog_from_remote(remote: Vec<RemoteQuestion>) -> (Vec<Category>, Vec<Question>) {
    let mut categories: Vec<Category> = Vec::new();
    for question in &remote {
        let Some(name) = question.category.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        if !categories.iter().any(|c| c.name == name) {
            categories.push(Category {
                id: derived_category_id(name),
                name: name.to_string(),
            });
        }
    }

    let questions = remote
        .into_iter()
        .filter_map(|question| {
            let name = question.category.as_deref()?;
            let category = categories.iter().find(|c| c.name == name)?;
            let answers = question
                .answers
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(index, answer)| AnswerOption {
                    id: format!("ans-api-{}-{}", question.id, index),
                    text: answer.text,
                    score: answer.points,
                })
                .collect();
            Some(Question {
                id: format!("q-api-{}", question.id),
                category_id: category.id.clone(),
                text: question.text,
                answers,
            })
        })
        .collect();

    (categories, questions)
}

/// Replaces categories and questions with the remote catalog. On any
/// failure both collections are cleared.
pub async fn fetch_questionnaire_data(state: &AppState, session_id: Uuid) -> Result<(), GatewayError> {
    match state.webhook.questions().await {
        Ok(remote) => {
            let (categories, questions) = catalog_from_remote(remote);
            tracing::debug!(
                "Catalog refreshed: {} categories, {} questions",
                categories.len(),
                questions.len()
            );
            state
                .sessions
                .update(session_id, |store| store.replace_catalog(categories, questions))
                .await;
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to fetch questions: {}", e);
            state
                .sessions
                .update(session_id, |store| store.replace_catalog(Vec::new(), Vec::new()))
                .await;
            Err(e)
        }
    }
}

pub async fn add_category(state: &AppState, session_id: Uuid, name: &str) -> ActionReply {
    let name = name.trim();
    if name.is_empty() {
        return ActionReply::failed("Informe o nome da categoria.");
    }

    match state.webhook.add_category(name).await {
        Ok(message) => {
            let category = Category {
                id: format!("cat-{}", Uuid::new_v4()),
                name: name.to_string(),
            };
            state
                .sessions
                .update(session_id, |store| store.add_category(category))
                .await;
            ActionReply::ok(message)
        }
        Err(err) => ActionReply::failed(err.user_message("Falha ao adicionar categoria.", COMMUNICATION)),
    }
}

pub async fn update_category(
    state: &AppState,
    session_id: Uuid,
    category_id: &str,
    new_name: &str,
) -> ActionReply {
    let Some(category) = state
        .sessions
        .read(session_id, |store| store.category(category_id).cloned())
        .await
        .flatten()
    else {
        return ActionReply::failed("Categoria não encontrada.");
    };

    match state.webhook.rename_category(&category, new_name).await {
        Ok(message) => {
            state
                .sessions
                .update(session_id, |store| store.rename_category(&category.id, new_name))
                .await;
            ActionReply::ok(message)
        }
        Err(err) => ActionReply::failed(err.user_message("Falha ao atualizar categoria.", COMMUNICATION)),
    }
}

/// Questions of the deleted category are left alone.
pub async fn delete_category(state: &AppState, session_id: Uuid, category_id: &str) -> ActionReply {
    let Some(category) = state
        .sessions
        .read(session_id, |store| store.category(category_id).cloned())
        .await
        .flatten()
    else {
        return ActionReply::failed("Categoria não encontrada.");
    };

    match state.webhook.delete_category(&category).await {
        Ok(message) => {
            state
                .sessions
                .update(session_id, |store| store.remove_category(&category.id))
                .await;
            ActionReply::ok(message)
        }
        Err(err) => ActionReply::failed(err.user_message("Falha ao excluir categoria.", COMMUNICATION)),
    }
}

pub async fn add_question(
    state: &AppState,
    session_id: Uuid,
    category_id: &str,
    text: &str,
    answers: Vec<NewAnswer>,
) -> ActionReply {
    let Some(category) = state
        .sessions
        .read(session_id, |store| store.category(category_id).cloned())
        .await
        .flatten()
    else {
        tracing::error!("Category {} not found for new question", category_id);
        return ActionReply::failed("Categoria não encontrada para adicionar a pergunta.");
    };

    match state.webhook.add_question(&category, text, &answers).await {
        Ok(message) => {
            let stamp = Uuid::new_v4();
            let question = Question {
                id: format!("q-{stamp}"),
                category_id: category.id.clone(),
                text: text.to_string(),
                answers: answers
                    .into_iter()
                    .enumerate()
                    .map(|(i, a)| AnswerOption {
                        id: format!("ans-{stamp}-{i}"),
                        text: a.text,
                        score: a.score,
                    })
                    .collect(),
            };
            state
                .sessions
                .update(session_id, |store| store.add_question(question))
                .await;
            ActionReply::ok(message)
        }
        Err(err) => ActionReply::failed(err.user_message("Falha ao adicionar pergunta.", COMMUNICATION)),
    }
}

pub async fn update_question(state: &AppState, session_id: Uuid, question: Question) -> ActionReply {
    let Some(category) = state
        .sessions
        .read(session_id, |store| store.category(&question.category_id).cloned())
        .await
        .flatten()
    else {
        return ActionReply::failed("Categoria da pergunta não encontrada.");
    };

    match state.webhook.update_question(&question, &category.name).await {
        Ok(message) => {
            state
                .sessions
                .update(session_id, |store| store.replace_question(question))
                .await;
            ActionReply::ok(message)
        }
        Err(err) => ActionReply::failed(err.user_message("Falha ao atualizar pergunta.", COMMUNICATION)),
    }
}

pub async fn delete_question(state: &AppState, session_id: Uuid, question_id: &str) -> ActionReply {
    let Some(question) = state
        .sessions
        .read(session_id, |store| store.question(question_id).cloned())
        .await
        .flatten()
    else {
        return ActionReply::failed("Pergunta não encontrada.");
    };

    match state.webhook.delete_question(&question).await {
        Ok(message) => {
            state
                .sessions
                .update(session_id, |store| store.remove_question(&question.id))
                .await;
            ActionReply::ok(message)
        }
        Err(err) => ActionReply::failed(err.user_message("Falha ao excluir pergunta.", COMMUNICATION)),
    }
}
