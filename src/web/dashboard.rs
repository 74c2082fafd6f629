use crate::domain::models::{Submission, SyncState, User};
use crate::domain::scoring::{overall, percentage, MaturityLevel};
use crate::error::AppError;
use crate::services::{catalog, submissions};
use crate::state::SharedState;
use crate::store::Store;
use crate::web::session::UserSession;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub const ALL_CATEGORIES: &str = "all-categories";
pub const COMPARE_ALL: &str = "compare-all";
const OVERALL_TITLE: &str = "Resultado Geral";
const REMAINING_COLOR: &str = "#E5E7EB";

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub company: Option<String>,
    pub view: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ChartSlice {
    pub label: &'static str,
    pub value: i64,
    pub color: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub total_score: i64,
    pub max_score: i64,
    pub percentage: i64,
    pub level: MaturityLevel,
    pub level_label: &'static str,
    pub slices: [ChartSlice; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncState>,
}

impl ScoreCard {
    fn new(title: String, category_id: Option<String>, total: i64, max: i64) -> Self {
        let level = MaturityLevel::from_scores(total, max);
        Self {
            title,
            category_id,
            total_score: total,
            max_score: max,
            percentage: percentage(total, max).round() as i64,
            level,
            level_label: level.label(),
            slices: [
                ChartSlice {
                    label: "Obtido",
                    value: total,
                    color: level.chart_color(),
                },
                ChartSlice {
                    label: "Restante",
                    value: (max - total).max(0),
                    color: REMAINING_COLOR,
                },
            ],
            sync: None,
        }
    }

    fn for_submission(submission: &Submission) -> Self {
        let mut card = Self::new(
            submission.category_name.clone(),
            Some(submission.category_id.clone()),
            submission.total_score,
            submission.max_score,
        );
        card.sync = Some(submission.sync.clone());
        card
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ViewOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LegendEntry {
    pub level: MaturityLevel,
    pub label: &'static str,
    pub range: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Approved companies an administrator can pick from; empty for companies.
    pub companies: Vec<User>,
    pub company: Option<User>,
    pub options: Vec<ViewOption>,
    pub selected: Option<String>,
    pub cards: Vec<ScoreCard>,
    pub legend: Vec<LegendEntry>,
}

fn legend() -> Vec<LegendEntry> {
    MaturityLevel::ALL
        .iter()
        .map(|level| LegendEntry {
            level: *level,
            label: level.label(),
            range: level.range(),
            color: level.chart_color(),
        })
        .collect()
}

/// Builds the dashboard for `viewer`. Administrators look at one approved
/// company at a time, the first one unless `query.company` names another.
pub fn build_dashboard(viewer: &User, store: &Store, query: &DashboardQuery) -> DashboardView {
    let (companies, target) = if viewer.is_admin() {
        let companies: Vec<User> = store.approved_companies().into_iter().cloned().collect();
        let target = query
            .company
            .as_deref()
            .and_then(|wanted| {
                companies
                    .iter()
                    .find(|c| c.id == wanted || c.company_name == wanted)
            })
            .or_else(|| companies.first())
            .cloned();
        (companies, target)
    } else {
        (Vec::new(), Some(viewer.clone()))
    };

    let completed: Vec<Submission> = target
        .as_ref()
        .map(|t| store.submissions_of(&t.id).into_iter().cloned().collect())
        .unwrap_or_default();

    let mut options: Vec<ViewOption> = completed
        .iter()
        .map(|s| ViewOption {
            value: s.category_id.clone(),
            label: s.category_name.clone(),
        })
        .collect();
    if !completed.is_empty() {
        options.push(ViewOption {
            value: ALL_CATEGORIES.to_string(),
            label: OVERALL_TITLE.to_string(),
        });
    }
    if completed.len() > 1 {
        options.push(ViewOption {
            value: COMPARE_ALL.to_string(),
            label: "Comparar todas".to_string(),
        });
    }

    let selected = query
        .view
        .clone()
        .filter(|v| options.iter().any(|o| &o.value == v))
        .or_else(|| match completed.len() {
            0 => None,
            1 => Some(completed[0].category_id.clone()),
            _ => Some(COMPARE_ALL.to_string()),
        });

    let cards = match selected.as_deref() {
        None => Vec::new(),
        Some(ALL_CATEGORIES) => {
            let (total, max) = overall(&completed);
            vec![ScoreCard::new(OVERALL_TITLE.to_string(), None, total, max)]
        }
        Some(COMPARE_ALL) => completed.iter().map(ScoreCard::for_submission).collect(),
        Some(category_id) => completed
            .iter()
            .filter(|s| s.category_id == category_id)
            .map(ScoreCard::for_submission)
            .collect(),
    };

    DashboardView {
        companies,
        company: target,
        options,
        selected,
        cards,
        legend: legend(),
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .with_state(state)
}

async fn dashboard(
    State(state): State<SharedState>,
    current: UserSession,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardView>, AppError> {
    let loaded = state
        .sessions
        .read(current.id, |store| store.has_catalog())
        .await
        .unwrap_or(false);
    if !loaded {
        let _ = catalog::fetch_questionnaire_data(&state, current.id).await;
    }
    // Scores are rebuilt on every visit so new submissions show up.
    let _ = submissions::fetch_submissions(&state, current.id).await;

    let view = state
        .sessions
        .read(current.id, |store| build_dashboard(&current.user, store, &query))
        .await
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{UserRole, UserStatus};
    use chrono::Utc;

    fn user(id: &str, company: &str, role: UserRole) -> User {
        User {
            id: id.into(),
            name: company.into(),
            company_name: company.into(),
            email: format!("{id}@x.com"),
            phone: "1".into(),
            password_hash: None,
            role,
            status: UserStatus::Approved,
        }
    }

    fn submission(user_id: &str, category: &str, total: i64, max: i64) -> Submission {
        Submission {
            id: format!("sub-{user_id}-{category}"),
            user_id: user_id.into(),
            company_name: "Acme".into(),
            category_id: format!("cat-{category}"),
            category_name: category.into(),
            answers: vec![],
            total_score: total,
            max_score: max,
            date: Utc::now(),
            sync: SyncState::Confirmed,
        }
    }

    #[test]
    fn test_default_view_follows_completed_count() {
        let ana = user("user-ana", "Acme", UserRole::Company);
        let mut store = Store::for_user(ana.clone());

        let empty = build_dashboard(&ana, &store, &DashboardQuery::default());
        assert!(empty.selected.is_none());
        assert!(empty.cards.is_empty());
        assert_eq!(empty.legend.len(), 4);

        store.insert_submission(submission("user-ana", "Vendas", 12, 15));
        let single = build_dashboard(&ana, &store, &DashboardQuery::default());
        assert_eq!(single.selected.as_deref(), Some("cat-Vendas"));
        assert_eq!(single.cards[0].percentage, 80);
        assert_eq!(single.cards[0].level, MaturityLevel::Advanced);

        store.insert_submission(submission("user-ana", "Pessoas", 3, 10));
        let many = build_dashboard(&ana, &store, &DashboardQuery::default());
        assert_eq!(many.selected.as_deref(), Some(COMPARE_ALL));
        assert_eq!(many.cards.len(), 2);
    }

    #[test]
    fn test_overall_card_sums_scores() {
        let ana = user("user-ana", "Acme", UserRole::Company);
        let mut store = Store::for_user(ana.clone());
        store.insert_submission(submission("user-ana", "Vendas", 12, 15));
        store.insert_submission(submission("user-ana", "Pessoas", 3, 10));

        let query = DashboardQuery {
            company: None,
            view: Some(ALL_CATEGORIES.into()),
        };
        let view = build_dashboard(&ana, &store, &query);
        assert_eq!(view.cards.len(), 1);
        let card = &view.cards[0];
        assert_eq!(card.title, "Resultado Geral");
        assert_eq!((card.total_score, card.max_score, card.percentage), (15, 25, 60));
        assert_eq!(card.level_label, "Mediano");
        assert_eq!(card.slices[1].value, 10);
    }

    #[test]
    fn test_zero_max_card_is_critical_without_remaining() {
        let card = ScoreCard::new("Vazia".into(), None, 4, 0);
        assert_eq!(card.level, MaturityLevel::Critical);
        assert_eq!(card.percentage, 0);
        assert_eq!(card.slices[1].value, 0);
    }

    #[test]
    fn test_admin_picks_company() {
        let admin = user("admin-root", "Triad3", UserRole::Admin);
        let mut store = Store::for_user(admin.clone());
        store.replace_company_users(vec![
            user("company-api-Acme-0", "Acme", UserRole::Company),
            user("company-api-Beta-1", "Beta", UserRole::Company),
        ]);
        store.insert_submission(submission("company-api-Beta-1", "Vendas", 2, 10));

        let first = build_dashboard(&admin, &store, &DashboardQuery::default());
        assert_eq!(first.companies.len(), 2);
        assert_eq!(first.company.as_ref().unwrap().company_name, "Acme");
        assert!(first.cards.is_empty());

        let query = DashboardQuery {
            company: Some("Beta".into()),
            view: Some("unknown".into()),
        };
        let beta = build_dashboard(&admin, &store, &query);
        assert_eq!(beta.selected.as_deref(), Some("cat-Vendas"));
        assert_eq!(beta.cards[0].level_label, "Crítico");
    }

    #[tokio::test]
    async fn test_every_visit_rebuilds_scores() {
        use crate::services::webhook::Endpoint;
        use crate::state::testing::scripted_state;
        use crate::web::testing::{send, signed_in};
        use axum::http::StatusCode;
        use serde_json::json;

        let (state, transport) = scripted_state();
        transport
            .reply(
                Endpoint::Questions,
                200,
                json!([{ "id": 1, "categoria": "Vendas", "pergunta": "Usa CRM?",
                         "respostas": [{ "texto": "Sim", "pontos": 10 }, { "texto": "Não", "pontos": 0 }] }]),
            )
            .reply(Endpoint::Scores, 200, json!([]))
            .reply(
                Endpoint::Scores,
                200,
                json!([{ "id": 7, "nome": "Ana", "empresa": "Acme", "telefone": "111", "categoria": "Vendas", "pontos": 4 }]),
            );
        let admin = user("admin-root@triad3.io", "Triad3", UserRole::Admin);
        let (_, cookie) = signed_in(&state, admin).await;

        let (status, first) = send(&state, "GET", "/dashboard", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["companies"], json!([]));

        let (_, second) = send(&state, "GET", "/dashboard", Some(&cookie), None).await;
        assert_eq!(second["companies"][0]["companyName"], "Acme");
        assert_eq!(second["cards"][0]["percentage"], 40);
        assert_eq!(transport.calls_to(Endpoint::Questions).len(), 1);
        assert_eq!(transport.calls_to(Endpoint::Scores).len(), 2);
    }
}
