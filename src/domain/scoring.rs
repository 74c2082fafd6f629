use crate::domain::models::{
    Category, Question, Submission, SyncState, User, UserRole, UserStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the remote score sheet: a single finished questionnaire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    #[serde(deserialize_with = "crate::services::webhook::remote_id")]
    pub id: String,
    #[serde(
        rename = "nome",
        default,
        deserialize_with = "crate::services::webhook::nullable_string"
    )]
    pub name: String,
    #[serde(rename = "empresa")]
    pub company: String,
    #[serde(
        rename = "telefone",
        default,
        deserialize_with = "crate::services::webhook::nullable_string"
    )]
    pub phone: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "pontos")]
    pub points: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MaturityLevel {
    Critical,
    Poor,
    Average,
    Advanced,
}

impl MaturityLevel {
    pub const ALL: [MaturityLevel; 4] = [
        MaturityLevel::Critical,
        MaturityLevel::Poor,
        MaturityLevel::Average,
        MaturityLevel::Advanced,
    ];

    /// Band boundaries are inclusive on the lower band: 30% is still Critical.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage <= 30.0 {
            MaturityLevel::Critical
        } else if percentage <= 50.0 {
            MaturityLevel::Poor
        } else if percentage <= 70.0 {
            MaturityLevel::Average
        } else {
            MaturityLevel::Advanced
        }
    }

    pub fn from_scores(total: i64, max: i64) -> Self {
        if max <= 0 {
            return MaturityLevel::Critical;
        }
        Self::from_percentage(percentage(total, max))
    }

    pub fn label(&self) -> &'static str {
        match self {
            MaturityLevel::Critical => "Crítico",
            MaturityLevel::Poor => "Precário",
            MaturityLevel::Average => "Mediano",
            MaturityLevel::Advanced => "Avançado",
        }
    }

    pub fn range(&self) -> &'static str {
        match self {
            MaturityLevel::Critical => "0 - 30%",
            MaturityLevel::Poor => "31 - 50%",
            MaturityLevel::Average => "51 - 70%",
            MaturityLevel::Advanced => "71 - 100%",
        }
    }

    pub fn chart_color(&self) -> &'static str {
        match self {
            MaturityLevel::Critical => "#EF4444",
            MaturityLevel::Poor => "#F97316",
            MaturityLevel::Average => "#EAB308",
            MaturityLevel::Advanced => "#22C55E",
        }
    }
}

pub fn percentage(total: i64, max: i64) -> f64 {
    if max <= 0 {
        return 0.0;
    }
    total as f64 / max as f64 * 100.0
}

pub fn question_max_score(question: &Question) -> i64 {
    question.answers.iter().map(|a| a.score).max().unwrap_or(0)
}

pub fn category_max_score(questions: &[Question], category_id: &str) -> i64 {
    questions
        .iter()
        .filter(|q| q.category_id == category_id)
        .map(question_max_score)
        .sum()
}

/// Collapses every whitespace run into a single dash, the way remote names
/// are folded into local ids.
pub fn dash_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push('-');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct AdminAggregate {
    pub companies: Vec<User>,
    pub submissions: Vec<Submission>,
}

struct ScoreGroup<'a> {
    company: &'a str,
    category: &'a str,
    total: i64,
    count: i64,
}

/// Folds the raw score sheet into one submission per (company, category).
pub fn aggregate_for_admin(
    records: &[ScoreRecord],
    categories: &[Category],
    questions: &[Question],
    now: DateTime<Utc>,
) -> AdminAggregate {
    let mut companies: Vec<User> = Vec::new();
    for record in records {
        if companies.iter().any(|u| u.company_name == record.company) {
            continue;
        }
        let index = companies.len();
        companies.push(User {
            id: format!("company-api-{}-{}", dash_whitespace(&record.company), index),
            name: record.name.clone(),
            company_name: record.company.clone(),
            email: format!(
                "{}@placeholder.com",
                record
                    .company
                    .to_lowercase()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
            ),
            phone: record.phone.clone(),
            password_hash: None,
            role: UserRole::Company,
            status: UserStatus::Approved,
        });
    }

    let mut groups: Vec<ScoreGroup> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    for record in records {
        let key = (record.company.as_str(), record.category.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(ScoreGroup {
                company: key.0,
                category: key.1,
                total: 0,
                count: 0,
            });
            groups.len() - 1
        });
        groups[slot].total += record.points;
        groups[slot].count += 1;
    }

    let mut submissions = Vec::with_capacity(groups.len());
    for group in groups {
        let user = companies.iter().find(|u| u.company_name == group.company);
        let category = categories.iter().find(|c| c.name == group.category);
        let (Some(user), Some(category)) = (user, category) else {
            tracing::warn!(
                "No company user or category for '{}' / '{}', skipping aggregated score",
                group.company,
                group.category
            );
            continue;
        };

        let category_max = category_max_score(questions, &category.id);
        let group_max = if category_max > 0 {
            category_max * group.count
        } else {
            0
        };
        if group_max == 0 && group.total > 0 {
            tracing::warn!(
                "Category '{}' has zero max score but total score {}; check its questions",
                group.category,
                group.total
            );
        }

        submissions.push(Submission {
            id: format!("sub-agg-{}-{}", dash_whitespace(group.company), category.id),
            user_id: user.id.clone(),
            company_name: group.company.to_string(),
            category_id: category.id.clone(),
            category_name: group.category.to_string(),
            answers: Vec::new(),
            total_score: group.total,
            max_score: group_max,
            date: now,
            sync: SyncState::Confirmed,
        });
    }

    AdminAggregate {
        companies,
        submissions,
    }
}

/// A company only sees its own rows, matched on phone and company name.
pub fn submissions_for_company(
    user: &User,
    records: &[ScoreRecord],
    categories: &[Category],
    questions: &[Question],
    now: DateTime<Utc>,
) -> Vec<Submission> {
    records
        .iter()
        .filter(|r| r.phone == user.phone && r.company == user.company_name)
        .filter_map(|record| {
            let Some(category) = categories.iter().find(|c| c.name == record.category) else {
                tracing::warn!("Category '{}' not found for company score", record.category);
                return None;
            };
            Some(Submission {
                id: format!("sub-user-{}-{}-{}", user.id, category.id, record.id),
                user_id: user.id.clone(),
                company_name: user.company_name.clone(),
                category_id: category.id.clone(),
                category_name: category.name.clone(),
                answers: Vec::new(),
                total_score: record.points,
                max_score: category_max_score(questions, &category.id),
                date: now,
                sync: SyncState::Confirmed,
            })
        })
        .collect()
}

/// Sum of totals and maxes across submissions, for the overall result.
pub fn overall(submissions: &[Submission]) -> (i64, i64) {
    submissions.iter().fold((0, 0), |(total, max), s| {
        (total + s.total_score, max + s.max_score)
    })
}
