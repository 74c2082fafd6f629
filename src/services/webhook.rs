//! Typed calls to the remote webhook service, the system of record.
//!
//! Each call issues exactly one request. A call succeeds only when the HTTP
//! status is 2xx and the `resposta` field equals the sentinel string the
//! remote service uses for that operation. The sentinels are an external
//! contract and must match byte for byte.

use crate::domain::models::{Category, Question, User};
use crate::domain::scoring::ScoreRecord;
use crate::error::GatewayError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub const LOGIN_OK: &str = "Sejá bem-vind@";
pub const APPROVE_OK: &str = "Usuário cadastrado com sucesso!";
pub const CATEGORY_ADDED: &str = "Categoria adicionada com sucesso!";
pub const CATEGORY_UPDATED: &str = "Categoria atualizada com sucesso!";
pub const CATEGORY_DELETED: &str = "Categoria excluida com sucesso!";
pub const QUESTION_ADDED: &str = "Pergunta adicionada com sucesso!";
pub const QUESTION_UPDATED: &str = "Pergunta editada com sucesso!";
pub const QUESTION_DELETED: &str = "Pergunta excluida com sucesso!";
pub const ANSWERS_RECEIVED: &str = "Respostas recebidas com sucesso!";
pub const ADMIN_ADDED: &str = "ADM adicionado com sucesso!";
pub const ADMIN_UPDATED: &str = "Dados atualizados com sucesso!";
pub const ADMIN_DELETED: &str = "Excluído com sucesso!";
pub const PASSWORD_CHANGED: &str = "Aatualizado com sucesso!";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AdminLogin,
    CompanyLogin,
    Register,
    ApproveUser,
    PendingUsers,
    ApprovalLogs,
    LoginLogs,
    Scores,
    Questions,
    AddCategory,
    EditCategory,
    AddQuestion,
    EditQuestion,
    DeleteQuestion,
    SubmitAnswers,
    AddAdmin,
    EditAdmin,
    DeleteAdmin,
    CompanyPassword,
    AdminPassword,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::AdminLogin => "loginadmscoretriad3",
            Endpoint::CompanyLogin => "loginusuarioscoretriad3",
            Endpoint::Register => "criacaocontascoreuser",
            Endpoint::ApproveUser => "aceitarnovouserscore",
            Endpoint::PendingUsers => "puxarnovosuserscore",
            Endpoint::ApprovalLogs => "puxaruseraprovadoscore",
            Endpoint::LoginLogs => "puxarlogscore",
            Endpoint::Scores => "buscarnotasuserscore",
            Endpoint::Questions => "buscarperguntasscore",
            Endpoint::AddCategory => "addcategoriascore",
            Endpoint::EditCategory => "editarcategoriascore",
            Endpoint::AddQuestion => "addperguntasscore",
            Endpoint::EditQuestion => "editarperguntascore",
            Endpoint::DeleteQuestion => "excluirperguntascore",
            Endpoint::SubmitAnswers => "receberrespostasscore",
            Endpoint::AddAdmin => "addadmscore",
            Endpoint::EditAdmin => "editaradmscore",
            Endpoint::DeleteAdmin => "excluiradmscore",
            Endpoint::CompanyPassword => "novasenhauserscore",
            Endpoint::AdminPassword => "novasenhaadmscore",
        }
    }
}

/// Status and raw body of one webhook exchange.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<RawReply, GatewayError>;
    async fn get(&self, endpoint: Endpoint) -> Result<RawReply, GatewayError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    async fn read(resp: reqwest::Response) -> Result<RawReply, GatewayError> {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(RawReply { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<RawReply, GatewayError> {
        tracing::debug!("POST {}", endpoint.path());
        let resp = self
            .client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::read(resp).await
    }

    async fn get(&self, endpoint: Endpoint) -> Result<RawReply, GatewayError> {
        tracing::debug!("GET {}", endpoint.path());
        let resp = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::read(resp).await
    }
}

/// Remote ids arrive as numbers or strings depending on the endpoint.
pub fn remote_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

/// Optional text fields may arrive as `null`; they read as empty.
pub fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Greeting {
    #[serde(rename = "nome", default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(rename = "empresa", default, deserialize_with = "nullable_string")]
    pub company: String,
    #[serde(rename = "telefone", default, deserialize_with = "nullable_string")]
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePendingUser {
    #[serde(deserialize_with = "remote_id")]
    pub id: String,
    #[serde(rename = "nome", default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(rename = "empresa", default, deserialize_with = "nullable_string")]
    pub company: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub email: String,
    #[serde(rename = "telefone", default, deserialize_with = "nullable_string")]
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteApprovalLog {
    #[serde(deserialize_with = "remote_id")]
    pub id: String,
    #[serde(rename = "nome", default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(rename = "empresa", default, deserialize_with = "nullable_string")]
    pub company: String,
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "horario")]
    pub time: String,
    #[serde(default)]
    pub aprovado_por: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteLoginLog {
    #[serde(deserialize_with = "remote_id")]
    pub id: String,
    #[serde(rename = "nome", default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(rename = "empresa", default, deserialize_with = "nullable_string")]
    pub company: String,
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "horario")]
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAnswer {
    #[serde(rename = "texto", default, deserialize_with = "nullable_string")]
    pub text: String,
    #[serde(rename = "pontos")]
    pub points: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteQuestion {
    #[serde(deserialize_with = "remote_id")]
    pub id: String,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
    #[serde(rename = "pergunta", default, deserialize_with = "nullable_string")]
    pub text: String,
    #[serde(rename = "respostas", default)]
    pub answers: Option<Vec<RemoteAnswer>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAnswer {
    pub text: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitterData {
    pub id: String,
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnswer {
    pub question_id: String,
    pub question_text: String,
    pub selected_answer_text: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireData {
    pub category_id: String,
    pub category_name: String,
    pub total_score: i64,
    pub max_score: i64,
    pub submission_date: String,
    pub answers: Vec<DetailedAnswer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub user_data: SubmitterData,
    pub questionnaire_data: QuestionnaireData,
}

/// One field of an administrator record, changed through its own request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminField {
    Name { current: String, new: String },
    Email { current: String, new: String },
    Phone { current: String, new: String },
    Password { new: String },
}

impl AdminField {
    fn body(&self, admin_id: &str) -> Value {
        match self {
            AdminField::Name { current, new } => json!({
                "id": admin_id, "tipo_dado": "Nome", "nome_atual": current, "atualizacao": new,
            }),
            AdminField::Email { current, new } => json!({
                "id": admin_id, "tipo_dado": "E-mail", "email_atual": current, "atualizacao": new,
            }),
            AdminField::Phone { current, new } => json!({
                "id": admin_id, "tipo_dado": "Telefone", "telefone_atual": current, "atualizacao": new,
            }),
            AdminField::Password { new } => json!({
                "id": admin_id, "tipo_dado": "Senha", "atualizacao": new,
            }),
        }
    }
}

fn wire_user(user: &User) -> Value {
    json!({
        "id": user.id,
        "name": user.name,
        "companyName": user.company_name,
        "email": user.email,
        "phone": user.phone,
        "passwordHash": "",
        "role": user.role,
        "status": user.status,
    })
}

fn resposta(body: &Value) -> Option<String> {
    body.get("resposta")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// Checks status, body and sentinel of a command reply.
fn confirm(reply: RawReply, sentinel: Option<&str>) -> Result<Value, GatewayError> {
    let body: Value = serde_json::from_str(&reply.body)
        .map_err(|e| GatewayError::Malformed(e.to_string()))?;
    let said = resposta(&body);

    if !reply.is_ok() {
        return Err(GatewayError::Status {
            status: reply.status,
            reply: said,
        });
    }

    match sentinel {
        Some(expected) if said.as_deref() != Some(expected) => {
            Err(GatewayError::Rejected { reply: said })
        }
        _ => Ok(body),
    }
}

/// Decodes a list reply; an empty body means an empty list.
fn list<T: DeserializeOwned>(reply: RawReply) -> Result<Vec<T>, GatewayError> {
    if !reply.is_ok() {
        return Err(GatewayError::Status {
            status: reply.status,
            reply: None,
        });
    }
    if reply.body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let body: Value = serde_json::from_str(&reply.body)
        .map_err(|e| GatewayError::Malformed(e.to_string()))?;
    if !body.is_array() {
        return Err(GatewayError::Malformed(format!("expected a list, got: {body}")));
    }
    serde_json::from_value(body).map_err(|e| GatewayError::Malformed(e.to_string()))
}

#[derive(Clone)]
pub struct WebhookClient {
    transport: Arc<dyn Transport>,
}

impl WebhookClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn command(
        &self,
        endpoint: Endpoint,
        body: Value,
        sentinel: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let reply = self.transport.post(endpoint, body).await?;
        confirm(reply, sentinel).map_err(|e| {
            tracing::warn!("{} failed: {}", endpoint.path(), e);
            e
        })
    }

    async fn sentinel(
        &self,
        endpoint: Endpoint,
        body: Value,
        expected: &str,
    ) -> Result<String, GatewayError> {
        self.command(endpoint, body, Some(expected)).await?;
        Ok(expected.to_string())
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<Vec<T>, GatewayError> {
        let reply = self.transport.get(endpoint).await?;
        list(reply)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        admin: bool,
    ) -> Result<Greeting, GatewayError> {
        let endpoint = if admin {
            Endpoint::AdminLogin
        } else {
            Endpoint::CompanyLogin
        };
        let body = self
            .command(
                endpoint,
                json!({ "email": email, "password": password }),
                Some(LOGIN_OK),
            )
            .await?;
        serde_json::from_value(body).map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    /// Registration has no sentinel: any 2xx is a success and `resposta`
    /// is the message to show.
    pub async fn register(
        &self,
        name: &str,
        company: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<Option<String>, GatewayError> {
        let body = self
            .command(
                Endpoint::Register,
                json!({
                    "nome": name,
                    "nome_empresa": company,
                    "email": email,
                    "senha": password,
                    "telefone": phone,
                }),
                None,
            )
            .await?;
        Ok(resposta(&body))
    }

    pub async fn approve_user(
        &self,
        user: &User,
        password: &str,
        admin: &User,
    ) -> Result<String, GatewayError> {
        let mut body = json!({
            "nome": user.name,
            "empresa": user.company_name,
            "email": user.email,
            "telefone": user.phone,
            "senha": password,
            "nome_adm": admin.name,
            "email_adm": admin.email,
        });
        if let Some(remote) = remote_user_number(&user.id) {
            body["id"] = Value::String(remote.to_string());
        }
        self.sentinel(Endpoint::ApproveUser, body, APPROVE_OK).await
    }

    pub async fn pending_users(&self) -> Result<Vec<RemotePendingUser>, GatewayError> {
        self.fetch(Endpoint::PendingUsers).await
    }

    pub async fn approval_logs(&self) -> Result<Vec<RemoteApprovalLog>, GatewayError> {
        self.fetch(Endpoint::ApprovalLogs).await
    }

    pub async fn login_logs(&self) -> Result<Vec<RemoteLoginLog>, GatewayError> {
        self.fetch(Endpoint::LoginLogs).await
    }

    pub async fn scores(&self) -> Result<Vec<ScoreRecord>, GatewayError> {
        self.fetch(Endpoint::Scores).await
    }

    pub async fn questions(&self) -> Result<Vec<RemoteQuestion>, GatewayError> {
        self.fetch(Endpoint::Questions).await
    }

    pub async fn add_category(&self, name: &str) -> Result<String, GatewayError> {
        self.sentinel(Endpoint::AddCategory, json!({ "name": name }), CATEGORY_ADDED)
            .await
    }

    pub async fn rename_category(
        &self,
        category: &Category,
        new_name: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "action": "editar-categoria",
            "id": category.id,
            "nome_antigo": category.name,
            "nome_novo": new_name,
        });
        self.sentinel(Endpoint::EditCategory, body, CATEGORY_UPDATED)
            .await
    }

    pub async fn delete_category(&self, category: &Category) -> Result<String, GatewayError> {
        let body = json!({
            "action": "excluir-categoria",
            "id": category.id,
            "nome": category.name,
        });
        self.sentinel(Endpoint::EditCategory, body, CATEGORY_DELETED)
            .await
    }

    pub async fn add_question(
        &self,
        category: &Category,
        text: &str,
        answers: &[NewAnswer],
    ) -> Result<String, GatewayError> {
        let body = json!({
            "categoryId": category.id,
            "categoria": category.name,
            "text": text,
            "answers": answers,
        });
        self.sentinel(Endpoint::AddQuestion, body, QUESTION_ADDED)
            .await
    }

    pub async fn update_question(
        &self,
        question: &Question,
        category_name: &str,
    ) -> Result<String, GatewayError> {
        let respostas: Vec<Value> = question
            .answers
            .iter()
            .map(|a| json!({ "texto": a.text, "pontos": a.score }))
            .collect();
        let body = json!({
            "id": question.id,
            "pergunta": question.text,
            "categoria_id": question.category_id,
            "categoria_nome": category_name,
            "respostas": respostas,
        });
        self.sentinel(Endpoint::EditQuestion, body, QUESTION_UPDATED)
            .await
    }

    pub async fn delete_question(&self, question: &Question) -> Result<String, GatewayError> {
        let body = serde_json::to_value(question)
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        self.sentinel(Endpoint::DeleteQuestion, body, QUESTION_DELETED)
            .await
    }

    pub async fn submit_answers(&self, payload: &SubmissionPayload) -> Result<String, GatewayError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        self.sentinel(Endpoint::SubmitAnswers, body, ANSWERS_RECEIVED)
            .await
    }

    pub async fn add_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({ "nome": name, "email": email, "senha": password, "telefone": phone });
        self.sentinel(Endpoint::AddAdmin, body, ADMIN_ADDED).await
    }

    pub async fn update_admin_field(
        &self,
        admin_id: &str,
        field: &AdminField,
    ) -> Result<String, GatewayError> {
        self.sentinel(Endpoint::EditAdmin, field.body(admin_id), ADMIN_UPDATED)
            .await
    }

    pub async fn delete_admin(&self, admin: &User) -> Result<String, GatewayError> {
        self.sentinel(Endpoint::DeleteAdmin, wire_user(admin), ADMIN_DELETED)
            .await
    }

    pub async fn change_company_password(
        &self,
        user: &User,
        current: &str,
        new: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "id": user.id,
            "nome": user.name,
            "empresa": user.company_name,
            "email": user.email,
            "telefone": user.phone,
            "senha_atual": current,
            "senha_nova": new,
        });
        self.sentinel(Endpoint::CompanyPassword, body, PASSWORD_CHANGED)
            .await
    }

    pub async fn change_admin_password(
        &self,
        admin_id: &str,
        email: &str,
        current: &str,
        new: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "id": admin_id,
            "email": email,
            "senha_atual": current,
            "senha_nova": new,
        });
        self.sentinel(Endpoint::AdminPassword, body, PASSWORD_CHANGED)
            .await
    }
}

/// `api-user-17` -> `17`; locally registered users have no remote number.
pub fn remote_user_number(local_id: &str) -> Option<&str> {
    let digits = local_id.strip_prefix("api-user-")?;
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use axum::{routing::post, Json, Router};

    fn client(transport: &Arc<ScriptedTransport>) -> WebhookClient {
        WebhookClient::new(transport.clone())
    }

    #[tokio::test]
    async fn test_sentinel_must_match_exactly() {
        let transport = Arc::new(ScriptedTransport::default());
        transport
            .reply(Endpoint::AddCategory, 200, json!({ "resposta": CATEGORY_ADDED }))
            .reply(Endpoint::AddCategory, 200, json!({ "resposta": "Categoria adicionada com sucesso" }));
        let client = client(&transport);

        assert_eq!(client.add_category("Vendas").await.unwrap(), CATEGORY_ADDED);
        let err = client.add_category("Vendas").await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert_eq!(err.server_reply(), Some("Categoria adicionada com sucesso"));

        let sent = transport.calls_to(Endpoint::AddCategory);
        assert_eq!(sent[0], Some(json!({ "name": "Vendas" })));
    }

    #[tokio::test]
    async fn test_failure_kinds() {
        let transport = Arc::new(ScriptedTransport::default());
        transport
            .reply(Endpoint::AddAdmin, 500, json!({ "resposta": "E-mail já existe" }))
            .raw(Endpoint::AddAdmin, 200, "<html>oops</html>")
            .down(Endpoint::AddAdmin);
        let client = client(&transport);

        let status = client.add_admin("Rui", "rui@x.com", "pw", "1").await.unwrap_err();
        assert!(matches!(status, GatewayError::Status { status: 500, .. }));
        assert_eq!(status.server_reply(), Some("E-mail já existe"));

        let malformed = client.add_admin("Rui", "rui@x.com", "pw", "1").await.unwrap_err();
        assert!(matches!(malformed, GatewayError::Malformed(_)));

        let down = client.add_admin("Rui", "rui@x.com", "pw", "1").await.unwrap_err();
        assert!(matches!(down, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_register_has_no_sentinel() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.reply(
            Endpoint::Register,
            200,
            json!({ "resposta": "Cadastro recebido, aguarde aprovação." }),
        );
        let message = client(&transport)
            .register("Ana", "Acme", "ana@acme.com", "pw", "111")
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some("Cadastro recebido, aguarde aprovação."));

        let sent = transport.calls_to(Endpoint::Register).remove(0).unwrap();
        assert_eq!(sent["nome_empresa"], "Acme");
        assert_eq!(sent["senha"], "pw");
    }

    #[tokio::test]
    async fn test_lists_accept_empty_body_and_mixed_ids() {
        let transport = Arc::new(ScriptedTransport::default());
        transport
            .raw(Endpoint::PendingUsers, 200, "")
            .reply(
                Endpoint::Questions,
                200,
                json!([
                    { "id": 3, "categoria": "Vendas", "pergunta": "Tem CRM?",
                      "respostas": [{ "texto": "Sim", "pontos": 10 }, { "texto": "Não", "pontos": 0 }] },
                    { "id": "q9", "categoria": "Vendas", "pergunta": "Sem respostas" }
                ]),
            )
            .reply(Endpoint::Scores, 200, json!({ "erro": "not a list" }));
        let client = client(&transport);

        assert!(client.pending_users().await.unwrap().is_empty());

        let questions = client.questions().await.unwrap();
        assert_eq!(questions[0].id, "3");
        assert_eq!(questions[0].answers.as_ref().unwrap().len(), 2);
        assert_eq!(questions[1].id, "q9");
        assert!(questions[1].answers.is_none());

        assert!(matches!(client.scores().await, Err(GatewayError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_null_text_fields_read_as_empty() {
        let transport = Arc::new(ScriptedTransport::default());
        transport
            .reply(
                Endpoint::Scores,
                200,
                json!([
                    { "id": 1, "nome": null, "empresa": "Acme", "telefone": null, "categoria": "Vendas", "pontos": 7 },
                    { "id": 2, "nome": "Bia", "empresa": "Beta", "telefone": "222", "categoria": "Vendas", "pontos": 3 }
                ]),
            )
            .reply(
                Endpoint::PendingUsers,
                200,
                json!([{ "id": 5, "nome": "Caio", "empresa": null, "email": "caio@x.com", "telefone": null }]),
            )
            .reply(
                Endpoint::Questions,
                200,
                json!([{ "id": 8, "categoria": "Vendas", "pergunta": null,
                         "respostas": [{ "texto": null, "pontos": 1 }] }]),
            );
        let client = client(&transport);

        let scores = client.scores().await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].name, "");
        assert_eq!(scores[0].phone, "");
        assert_eq!(scores[1].phone, "222");

        let pending = client.pending_users().await.unwrap();
        assert_eq!(pending[0].company, "");
        assert_eq!(pending[0].email, "caio@x.com");

        let questions = client.questions().await.unwrap();
        assert_eq!(questions[0].text, "");
        assert_eq!(questions[0].answers.as_ref().unwrap()[0].text, "");
    }

    #[tokio::test]
    async fn test_approval_forwards_remote_id() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.reply(Endpoint::ApproveUser, 200, json!({ "resposta": APPROVE_OK }));
        let user = User {
            id: "api-user-17".into(),
            name: "Ana".into(),
            company_name: "Acme".into(),
            email: "ana@acme.com".into(),
            phone: "111".into(),
            password_hash: None,
            role: crate::domain::models::UserRole::Company,
            status: crate::domain::models::UserStatus::Pending,
        };
        let admin = User {
            id: "admin-root@triad3.io".into(),
            name: "Root".into(),
            company_name: "Triad3".into(),
            email: "root@triad3.io".into(),
            phone: String::new(),
            password_hash: None,
            role: crate::domain::models::UserRole::Admin,
            status: crate::domain::models::UserStatus::Approved,
        };
        client(&transport).approve_user(&user, "pw", &admin).await.unwrap();
        let sent = transport.calls_to(Endpoint::ApproveUser).remove(0).unwrap();
        assert_eq!(sent["id"], "17");
        assert_eq!(sent["email_adm"], "root@triad3.io");
        assert_eq!(sent["senha"], "pw");
    }

    #[test]
    fn test_remote_user_number() {
        assert_eq!(remote_user_number("api-user-42"), Some("42"));
        assert_eq!(remote_user_number("api-user-"), None);
        assert_eq!(remote_user_number("user-1700000"), None);
        assert_eq!(remote_user_number("api-user-4a"), None);
    }

    #[tokio::test]
    async fn test_http_transport_round_trip() {
        let app = Router::new()
            .route(
                "/addcategoriascore",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "resposta": CATEGORY_ADDED, "echo": body["name"] }))
                }),
            )
            .route(
                "/addadmscore",
                post(|| async {
                    (
                        axum::http::StatusCode::BAD_GATEWAY,
                        Json(json!({ "resposta": "Serviço indisponível" })),
                    )
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = WebhookClient::new(Arc::new(HttpTransport::new(format!("http://{addr}/"))));
        assert_eq!(client.add_category("Vendas").await.unwrap(), CATEGORY_ADDED);

        let err = client.add_admin("Rui", "r@x.com", "pw", "1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 502, .. }));
        assert_eq!(err.server_reply(), Some("Serviço indisponível"));
    }
}
