use crate::domain::models::{Category, Question, Submission, SubmissionAnswer, User};
use crate::domain::scoring::question_max_score;
use serde::Serialize;
use std::collections::HashMap;

/// Categories the user can still answer: at least one question and no
/// submission from this user yet.
pub fn available_categories<'a>(
    user: &User,
    categories: &'a [Category],
    questions: &[Question],
    submissions: &[Submission],
) -> Vec<&'a Category> {
    categories
        .iter()
        .filter(|category| {
            let completed = submissions
                .iter()
                .any(|s| s.user_id == user.id && s.category_id == category.id);
            let has_questions = questions.iter().any(|q| q.category_id == category.id);
            !completed && has_questions
        })
        .collect()
}

pub fn questions_for<'a>(questions: &'a [Question], category_id: &str) -> Vec<&'a Question> {
    questions
        .iter()
        .filter(|q| q.category_id == category_id)
        .collect()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("question {0} is not part of this questionnaire")]
    UnknownQuestion(String),
    #[error("answer {answer} does not belong to question {question}")]
    UnknownAnswer { question: String, answer: String },
    #[error("{answered} of {expected} questions answered")]
    Incomplete { answered: usize, expected: usize },
}

/// Computed result of a finished questionnaire, ready to become a submission.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedQuestionnaire {
    pub user_id: String,
    pub company_name: String,
    pub category_id: String,
    pub category_name: String,
    pub answers: Vec<SubmissionAnswer>,
    pub total_score: i64,
    pub max_score: i64,
}

/// Single-choice answers for one category, held only while the user fills it in.
#[derive(Debug, Clone)]
pub struct QuestionnaireDraft<'a> {
    category: &'a Category,
    questions: Vec<&'a Question>,
    chosen: HashMap<String, String>,
}

impl<'a> QuestionnaireDraft<'a> {
    pub fn new(category: &'a Category, questions: &'a [Question]) -> Self {
        Self {
            category,
            questions: questions_for(questions, &category.id),
            chosen: HashMap::new(),
        }
    }

    pub fn questions(&self) -> &[&'a Question] {
        &self.questions
    }

    /// Picking again for the same question replaces the previous choice.
    pub fn select(&mut self, question_id: &str, answer_id: &str) -> Result<(), DraftError> {
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| DraftError::UnknownQuestion(question_id.to_string()))?;
        if !question.answers.iter().any(|a| a.id == answer_id) {
            return Err(DraftError::UnknownAnswer {
                question: question_id.to_string(),
                answer: answer_id.to_string(),
            });
        }
        self.chosen
            .insert(question_id.to_string(), answer_id.to_string());
        Ok(())
    }

    pub fn answered(&self) -> usize {
        self.chosen.len()
    }

    pub fn can_submit(&self) -> bool {
        self.chosen.len() == self.questions.len()
    }

    pub fn finish(self, user: &User) -> Result<CompletedQuestionnaire, DraftError> {
        if !self.can_submit() {
            return Err(DraftError::Incomplete {
                answered: self.chosen.len(),
                expected: self.questions.len(),
            });
        }

        let mut answers = Vec::with_capacity(self.questions.len());
        let mut total_score = 0;
        for question in &self.questions {
            let Some(answer_id) = self.chosen.get(&question.id) else {
                continue;
            };
            if let Some(answer) = question.answers.iter().find(|a| &a.id == answer_id) {
                answers.push(SubmissionAnswer {
                    question_id: question.id.clone(),
                    score: answer.score,
                });
                total_score += answer.score;
            }
        }

        let max_score = self.questions.iter().map(|q| question_max_score(q)).sum();

        Ok(CompletedQuestionnaire {
            user_id: user.id.clone(),
            company_name: user.company_name.clone(),
            category_id: self.category.id.clone(),
            category_name: self.category.name.clone(),
            answers,
            total_score,
            max_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AnswerOption, SyncState, UserRole, UserStatus};
    use chrono::Utc;

    fn user() -> User {
        User {
            id: "user-ana@acme.com".to_string(),
            name: "Ana".to_string(),
            company_name: "Acme".to_string(),
            email: "ana@acme.com".to_string(),
            phone: "111".to_string(),
            password_hash: None,
            role: UserRole::Company,
            status: UserStatus::Approved,
        }
    }

    fn q(id: &str, category_id: &str, scores: &[i64]) -> Question {
        Question {
            id: id.to_string(),
            category_id: category_id.to_string(),
            text: id.to_string(),
            answers: scores
                .iter()
                .enumerate()
                .map(|(i, s)| AnswerOption {
                    id: format!("{id}-{i}"),
                    text: format!("opção {i}"),
                    score: *s,
                })
                .collect(),
        }
    }

    fn categories() -> Vec<Category> {
        vec![
            Category { id: "c1".into(), name: "Vendas".into() },
            Category { id: "c2".into(), name: "RH".into() },
            Category { id: "c3".into(), name: "Vazia".into() },
        ]
    }

    #[test]
    fn test_available_skips_completed_and_empty() {
        let cats = categories();
        let questions = vec![q("q1", "c1", &[1]), q("q2", "c2", &[1])];
        let submissions = vec![Submission {
            id: "sub-1".into(),
            user_id: user().id,
            company_name: "Acme".into(),
            category_id: "c2".into(),
            category_name: "RH".into(),
            answers: vec![],
            total_score: 1,
            max_score: 1,
            date: Utc::now(),
            sync: SyncState::Pending,
        }];

        let available = available_categories(&user(), &cats, &questions, &submissions);
        let ids: Vec<&str> = available.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);
    }

    #[test]
    fn test_submit_needs_every_question() {
        let cats = categories();
        let questions = vec![q("q1", "c1", &[0, 7, 10]), q("q2", "c1", &[1, 5]), q("q3", "c2", &[9])];
        let mut draft = QuestionnaireDraft::new(&cats[0], &questions);
        assert_eq!(draft.questions().len(), 2);
        assert!(!draft.can_submit());

        draft.select("q1", "q1-1").unwrap();
        assert!(!draft.can_submit());
        assert_eq!(
            draft.clone().finish(&user()),
            Err(DraftError::Incomplete { answered: 1, expected: 2 })
        );

        draft.select("q2", "q2-1").unwrap();
        assert!(draft.can_submit());

        let done = draft.finish(&user()).unwrap();
        assert_eq!(done.total_score, 12);
        assert_eq!(done.max_score, 15);
        assert_eq!(done.answers.len(), 2);
        assert_eq!(done.category_name, "Vendas");
    }

    #[test]
    fn test_reselect_replaces_choice() {
        let cats = categories();
        let questions = vec![q("q1", "c1", &[2, 8])];
        let mut draft = QuestionnaireDraft::new(&cats[0], &questions);
        draft.select("q1", "q1-0").unwrap();
        draft.select("q1", "q1-1").unwrap();
        assert_eq!(draft.answered(), 1);
        assert_eq!(draft.finish(&user()).unwrap().total_score, 8);
    }

    #[test]
    fn test_rejects_foreign_question_and_answer() {
        let cats = categories();
        let questions = vec![q("q1", "c1", &[2]), q("q3", "c2", &[9])];
        let mut draft = QuestionnaireDraft::new(&cats[0], &questions);
        assert_eq!(
            draft.select("q3", "q3-0"),
            Err(DraftError::UnknownQuestion("q3".into()))
        );
        assert!(matches!(
            draft.select("q1", "q3-0"),
            Err(DraftError::UnknownAnswer { .. })
        ));
    }
}
