use crate::domain::models::{ActionReply, User, UserRole, UserStatus};
use crate::services::webhook::AdminField;
use crate::state::AppState;
use serde::Deserialize;
use uuid::Uuid;

const LOGIN_COMMUNICATION: &str = "Ocorreu um erro de comunicação ao tentar fazer login.";
const PASSWORD_CHANGED: &str = "Senha alterada com sucesso!";
const PASSWORD_FAILED: &str = "Falha ao alterar a senha.";
const PASSWORD_COMMUNICATION: &str = "Ocorreu um erro de comunicação ao tentar alterar a senha.";

/// Authenticates against the webhook and builds the session user.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    admin: bool,
) -> Result<User, String> {
    let greeting = state
        .webhook
        .login(email, password, admin)
        .await
        .map_err(|err| {
            let fallback = if admin {
                "Usuário ou senha incorretos."
            } else {
                "Credenciais inválidas ou conta não aprovada."
            };
            err.user_message(fallback, LOGIN_COMMUNICATION)
        })?;

    let user = if admin {
        User {
            id: format!("admin-{email}"),
            name: greeting.name,
            company_name: "Triad3".to_string(),
            email: email.to_string(),
            phone: String::new(),
            password_hash: None,
            role: UserRole::Admin,
            status: UserStatus::Approved,
        }
    } else {
        User {
            id: format!("user-{email}"),
            name: greeting.name,
            company_name: greeting.company,
            email: email.to_string(),
            phone: greeting.phone,
            password_hash: None,
            role: UserRole::Company,
            status: UserStatus::Approved,
        }
    };
    tracing::info!("{} signed in ({:?})", user.id, user.role);
    Ok(user)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Registers a company account. The password is kept sealed until an
/// administrator forwards the approval.
pub async fn register(state: &AppState, form: &Registration) -> ActionReply {
    let fields = [
        &form.name,
        &form.company_name,
        &form.email,
        &form.password,
        &form.phone,
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return ActionReply::failed("Todos os campos são obrigatórios para o cadastro.");
    }

    let reply = state
        .webhook
        .register(
            &form.name,
            &form.company_name,
            &form.email,
            &form.password,
            &form.phone,
        )
        .await;

    match reply {
        Ok(message) => {
            let sealed = match state.crypto.seal_str(&form.password) {
                Ok(sealed) => Some(sealed),
                Err(e) => {
                    tracing::error!("Could not seal registration password: {}", e);
                    None
                }
            };
            let pending = User {
                id: format!("user-{}", Uuid::new_v4()),
                name: form.name.clone(),
                company_name: form.company_name.clone(),
                email: form.email.clone(),
                phone: form.phone.clone(),
                password_hash: sealed,
                role: UserRole::Company,
                status: UserStatus::Pending,
            };
            state.sessions.hold_registration(pending).await;
            ActionReply::ok(message.unwrap_or_else(|| {
                "Cadastro realizado! Aguarde a aprovação do administrador para acessar."
                    .to_string()
            }))
        }
        Err(err) => ActionReply::failed(err.user_message(
            "Ocorreu um erro durante o cadastro.",
            "Ocorreu um erro de comunicação. Tente novamente.",
        )),
    }
}

/// Replaces the session's pending users with the remote list. Errors are
/// logged and the stale list kept.
pub async fn fetch_pending_users(state: &AppState, session_id: Uuid) {
    let remote = match state.webhook.pending_users().await {
        Ok(remote) => remote,
        Err(e) => {
            tracing::error!("Failed to fetch pending users: {}", e);
            return;
        }
    };

    let pending: Vec<User> = remote
        .into_iter()
        .map(|r| User {
            id: format!("api-user-{}", r.id),
            name: r.name,
            company_name: r.company,
            email: r.email,
            phone: r.phone,
            password_hash: None,
            role: UserRole::Company,
            status: UserStatus::Pending,
        })
        .collect();

    let emails: Vec<String> = pending.iter().map(|u| u.email.clone()).collect();
    let dropped = state.sessions.retain_registrations(&emails).await;
    if dropped > 0 {
        tracing::info!("Released {} held registrations no longer pending", dropped);
    }

    let held = state.sessions.registrations().await;
    state
        .sessions
        .update(session_id, |store| {
            for registration in held {
                if !store.users.iter().any(|u| u.email == registration.email) {
                    store.add_user(registration);
                }
            }
            store.merge_pending_users(pending);
        })
        .await;
}

pub async fn approve_user(state: &AppState, session_id: Uuid, user_id: &str) -> ActionReply {
    let found = state
        .sessions
        .read(session_id, |store| {
            let admin = store.current_user.clone().filter(User::is_admin);
            let target = store.users.iter().find(|u| u.id == user_id).cloned();
            (admin, target)
        })
        .await;

    let Some((Some(admin), target)) = found else {
        return ActionReply::failed("Apenas administradores podem aprovar usuários.");
    };
    let Some(target) = target else {
        return ActionReply::failed("Usuário não encontrado.");
    };

    let password = match target.password_hash.as_deref() {
        Some(sealed) => state.crypto.open_str(sealed).unwrap_or_else(|e| {
            tracing::warn!("Could not open sealed password for {}: {}", target.email, e);
            String::new()
        }),
        None => String::new(),
    };

    match state.webhook.approve_user(&target, &password, &admin).await {
        Ok(message) => {
            state
                .sessions
                .update(session_id, |store| {
                    store.set_user_status(&target.id, UserStatus::Approved);
                })
                .await;
            state.sessions.release_registration(&target.email).await;
            tracing::info!("{} approved {}", admin.id, target.email);
            ActionReply::ok(message)
        }
        Err(err) => ActionReply::failed(err.user_message(
            "A API retornou uma resposta inesperada.",
            "Ocorreu um erro de comunicação ao tentar aprovar o usuário.",
        )),
    }
}

pub async fn add_admin(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    phone: &str,
) -> ActionReply {
    match state.webhook.add_admin(name, email, password, phone).await {
        Ok(message) => ActionReply::ok(message),
        Err(err) => ActionReply::failed(err.user_message(
            "Falha ao adicionar administrador.",
            "Ocorreu um erro de comunicação ao tentar adicionar o administrador.",
        )),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

impl AdminUpdate {
    /// Fields that actually change, in the order the webhook expects them.
    pub fn changes(&self, original: &User) -> Vec<AdminField> {
        let changed = |new: &Option<String>, current: &str| {
            new.as_deref()
                .filter(|n| !n.is_empty() && *n != current)
                .map(|n| n.to_string())
        };

        let mut fields = Vec::new();
        if let Some(new) = changed(&self.name, &original.name) {
            fields.push(AdminField::Name {
                current: original.name.clone(),
                new,
            });
        }
        if let Some(new) = changed(&self.email, &original.email) {
            fields.push(AdminField::Email {
                current: original.email.clone(),
                new,
            });
        }
        if let Some(new) = changed(&self.phone, &original.phone) {
            fields.push(AdminField::Phone {
                current: original.phone.clone(),
                new,
            });
        }
        if let Some(new) = self.password.as_deref().filter(|p| !p.is_empty()) {
            fields.push(AdminField::Password {
                new: new.to_string(),
            });
        }
        fields
    }
}

/// Sends one request per changed field and stops at the first failure.
pub async fn update_admin(state: &AppState, original: &User, update: &AdminUpdate) -> ActionReply {
    let changes = update.changes(original);
    if changes.is_empty() {
        return ActionReply::ok("Nenhuma alteração para salvar.");
    }

    for field in &changes {
        if let Err(err) = state.webhook.update_admin_field(&original.id, field).await {
            return ActionReply::failed(
                err.user_message("Falha ao atualizar dados.", "Ocorreu um erro de comunicação."),
            );
        }
    }
    ActionReply::ok("Dados atualizados com sucesso!")
}

pub async fn delete_admin(state: &AppState, admin: &User) -> ActionReply {
    match state.webhook.delete_admin(admin).await {
        Ok(message) => ActionReply::ok(message),
        Err(err) => ActionReply::failed(err.user_message(
            "A API retornou uma resposta inesperada.",
            "Ocorreu um erro de comunicação ao tentar excluir o administrador.",
        )),
    }
}

/// Password change for whoever is signed in; admins and companies use
/// different webhooks.
pub async fn change_password(
    state: &AppState,
    user: &User,
    current: &str,
    new: &str,
) -> ActionReply {
    let result = if user.is_admin() {
        state
            .webhook
            .change_admin_password(&user.id, &user.email, current, new)
            .await
    } else {
        state
            .webhook
            .change_company_password(user, current, new)
            .await
    };

    match result {
        Ok(_) => ActionReply::ok(PASSWORD_CHANGED),
        Err(err) => ActionReply::failed(err.user_message(PASSWORD_FAILED, PASSWORD_COMMUNICATION)),
    }
}
