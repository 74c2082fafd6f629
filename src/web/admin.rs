use crate::domain::models::{ActionReply, AnswerOption, Category, Question, User, UserRole, UserStatus};
use crate::error::AppError;
use crate::services::accounts::{self, AdminUpdate};
use crate::services::webhook::NewAnswer;
use crate::services::{audit, catalog, submissions};
use crate::state::SharedState;
use crate::web::action;
use crate::web::session::AdminSession;
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
}

/// Current details of an administrator record.
#[derive(Deserialize)]
pub struct AdminRecord {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl AdminRecord {
    fn into_user(self, id: String) -> User {
        User {
            id,
            name: self.name,
            company_name: "Triad3".to_string(),
            email: self.email,
            phone: self.phone,
            password_hash: None,
            role: UserRole::Admin,
            status: UserStatus::Approved,
        }
    }
}

#[derive(Deserialize)]
pub struct AdminEdit {
    pub current: AdminRecord,
    #[serde(flatten)]
    pub update: AdminUpdate,
}

#[derive(Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionForm {
    pub category_id: String,
    pub text: String,
    pub answers: Vec<NewAnswer>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/users/pending", get(pending_users))
        .route("/users/:id/approve", post(approve_user))
        .route("/admins", post(add_admin))
        .route("/admins/:id", put(update_admin).delete(delete_admin))
        .route("/categories", get(list_categories).post(add_category))
        .route("/categories/:id", put(update_category).delete(delete_category))
        .route("/questions", get(list_questions).post(add_question))
        .route("/questions/:id", put(update_question).delete(delete_question))
        .route("/refresh", post(refresh))
        .with_state(state)
}

async fn pending_users(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
) -> Json<Vec<User>> {
    accounts::fetch_pending_users(&state, current.id).await;
    let pending = state
        .sessions
        .read(current.id, |store| {
            store.pending_users().into_iter().cloned().collect::<Vec<_>>()
        })
        .await
        .unwrap_or_default();
    Json(pending)
}

async fn approve_user(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Path(user_id): Path<String>,
) -> Response {
    action(accounts::approve_user(&state, current.id, &user_id).await)
}

async fn add_admin(
    State(state): State<SharedState>,
    AdminSession(_): AdminSession,
    Json(form): Json<NewAdmin>,
) -> Response {
    if form.name.trim().is_empty() || form.email.trim().is_empty() || form.password.is_empty() {
        return action(ActionReply::failed("Nome, e-mail e senha são obrigatórios."));
    }
    action(accounts::add_admin(&state, &form.name, &form.email, &form.password, &form.phone).await)
}

async fn update_admin(
    State(state): State<SharedState>,
    AdminSession(_): AdminSession,
    Path(admin_id): Path<String>,
    Json(edit): Json<AdminEdit>,
) -> Response {
    let original = edit.current.into_user(admin_id);
    action(accounts::update_admin(&state, &original, &edit.update).await)
}

async fn delete_admin(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Path(admin_id): Path<String>,
    Json(record): Json<AdminRecord>,
) -> Result<Response, AppError> {
    if admin_id == current.user.id {
        return Err(AppError::Conflict(
            "Não é possível excluir o próprio usuário.".to_string(),
        ));
    }
    let admin = record.into_user(admin_id);
    Ok(action(accounts::delete_admin(&state, &admin).await))
}

/// Loads the catalog for a session that has none at all, e.g. after a restart.
async fn ensure_catalog(state: &SharedState, session_id: Uuid) {
    let empty = state
        .sessions
        .read(session_id, |store| store.categories.is_empty() && store.questions.is_empty())
        .await
        .unwrap_or(true);
    if empty {
        let _ = catalog::fetch_questionnaire_data(state, session_id).await;
    }
}

async fn list_categories(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
) -> Json<Vec<Category>> {
    ensure_catalog(&state, current.id).await;
    let categories = state
        .sessions
        .read(current.id, |store| store.categories.clone())
        .await
        .unwrap_or_default();
    Json(categories)
}

async fn add_category(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Json(form): Json<CategoryForm>,
) -> Response {
    action(catalog::add_category(&state, current.id, &form.name).await)
}

async fn update_category(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Path(category_id): Path<String>,
    Json(form): Json<CategoryForm>,
) -> Response {
    if form.name.trim().is_empty() {
        return action(ActionReply::failed("Informe o nome da categoria."));
    }
    action(catalog::update_category(&state, current.id, &category_id, form.name.trim()).await)
}

async fn delete_category(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Path(category_id): Path<String>,
) -> Response {
    action(catalog::delete_category(&state, current.id, &category_id).await)
}

async fn list_questions(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
) -> Json<Vec<Question>> {
    ensure_catalog(&state, current.id).await;
    let questions = state
        .sessions
        .read(current.id, |store| store.questions.clone())
        .await
        .unwrap_or_default();
    Json(questions)
}

fn validate_question(form: &QuestionForm) -> Option<ActionReply> {
    if form.text.trim().is_empty() {
        return Some(ActionReply::failed("Informe o texto da pergunta."));
    }
    if form.answers.is_empty() || form.answers.iter().any(|a| a.text.trim().is_empty()) {
        return Some(ActionReply::failed("Informe ao menos uma resposta com texto."));
    }
    None
}

async fn add_question(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Json(form): Json<QuestionForm>,
) -> Response {
    if let Some(invalid) = validate_question(&form) {
        return action(invalid);
    }
    action(catalog::add_question(&state, current.id, &form.category_id, &form.text, form.answers).await)
}

async fn update_question(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Path(question_id): Path<String>,
    Json(form): Json<QuestionForm>,
) -> Response {
    if let Some(invalid) = validate_question(&form) {
        return action(invalid);
    }
    let stamp = Uuid::new_v4();
    let question = Question {
        answers: form
            .answers
            .into_iter()
            .enumerate()
            .map(|(i, a)| AnswerOption {
                id: format!("ans-{stamp}-{i}"),
                text: a.text,
                score: a.score,
            })
            .collect(),
        id: question_id,
        category_id: form.category_id,
        text: form.text,
    };
    action(catalog::update_question(&state, current.id, question).await)
}

async fn delete_question(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Path(question_id): Path<String>,
) -> Response {
    action(catalog::delete_question(&state, current.id, &question_id).await)
}

/// Reloads everything an administrator sees, as the background job does.
async fn refresh(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
) -> Json<ActionReply> {
    submissions::load_session_data(&state, current.id).await;
    audit::refresh_admin_session(&state, current.id).await;
    Json(ActionReply::ok_silent())
}

#[cfg(test)]
mod tests {
    use crate::domain::models::{User, UserRole, UserStatus};
    use crate::services::webhook::{Endpoint, ADMIN_DELETED, CATEGORY_ADDED, CATEGORY_UPDATED};
    use crate::state::testing::scripted_state;
    use crate::web::testing::{send, signed_in};
    use axum::http::StatusCode;
    use serde_json::json;

    fn admin() -> User {
        User {
            id: "admin-root@triad3.io".into(),
            name: "Root".into(),
            company_name: "Triad3".into(),
            email: "root@triad3.io".into(),
            phone: String::new(),
            password_hash: None,
            role: UserRole::Admin,
            status: UserStatus::Approved,
        }
    }

    #[tokio::test]
    async fn test_admin_routes_reject_companies() {
        let (state, _) = scripted_state();
        let mut company = admin();
        company.role = UserRole::Company;
        let (_, cookie) = signed_in(&state, company).await;

        let (status, body) = send(&state, "GET", "/admin/categories", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, _) = send(&state, "GET", "/admin/categories", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_category_lifecycle() {
        let (state, transport) = scripted_state();
        transport
            .reply(Endpoint::AddCategory, 200, json!({ "resposta": CATEGORY_ADDED }))
            .reply(Endpoint::EditCategory, 200, json!({ "resposta": CATEGORY_UPDATED }));
        let (_, cookie) = signed_in(&state, admin()).await;

        let (status, body) = send(&state, "POST", "/admin/categories", Some(&cookie), Some(json!({ "name": "Vendas" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], CATEGORY_ADDED);

        let (_, listed) = send(&state, "GET", "/admin/categories", Some(&cookie), None).await;
        let id = listed[0]["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("cat-"));

        let (status, _) = send(
            &state,
            "PUT",
            &format!("/admin/categories/{id}"),
            Some(&cookie),
            Some(json!({ "name": "Comercial" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let sent = transport.calls_to(Endpoint::EditCategory).remove(0).unwrap();
        assert_eq!(sent["nome_antigo"], "Vendas");
        assert_eq!(sent["nome_novo"], "Comercial");
    }

    #[tokio::test]
    async fn test_failed_gateway_call_is_unprocessable() {
        let (state, transport) = scripted_state();
        transport.raw(Endpoint::AddCategory, 500, "");
        let (_, cookie) = signed_in(&state, admin()).await;

        let (status, body) = send(&state, "POST", "/admin/categories", Some(&cookie), Some(json!({ "name": "Vendas" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Ocorreu um erro de comunicação.");
    }

    #[tokio::test]
    async fn test_delete_other_admin_sends_record() {
        let (state, transport) = scripted_state();
        transport.reply(Endpoint::DeleteAdmin, 200, json!({ "resposta": ADMIN_DELETED }));
        let (_, cookie) = signed_in(&state, admin()).await;

        let (status, _) = send(
            &state,
            "DELETE",
            "/admin/admins/admin-bia@triad3.io",
            Some(&cookie),
            Some(json!({ "name": "Bia", "email": "bia@triad3.io" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let sent = transport.calls_to(Endpoint::DeleteAdmin).remove(0).unwrap();
        assert_eq!(sent["email"], "bia@triad3.io");
        assert_eq!(sent["role"], "admin");

        let (status, _) = send(
            &state,
            "DELETE",
            "/admin/admins/admin-root@triad3.io",
            Some(&cookie),
            Some(json!({ "name": "Root", "email": "root@triad3.io" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_pending_users_listed() {
        let (state, transport) = scripted_state();
        transport.reply(
            Endpoint::PendingUsers,
            200,
            json!([{ "id": 4, "nome": "Ana", "empresa": "Acme", "email": "ana@acme.com", "telefone": "1" }]),
        );
        let (_, cookie) = signed_in(&state, admin()).await;

        let (status, body) = send(&state, "GET", "/admin/users/pending", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "api-user-4");
        assert_eq!(body[0]["status"], "pending");
    }
}
