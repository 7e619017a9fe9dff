use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::exam::catalog::{Catalog, Part, PartBody, PartId, Question, QuestionId, QuestionLayout};

/// Candidate responses. Every write replaces the previous value for its key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerStore {
    objective: BTreeMap<QuestionId, String>,
    texts: BTreeMap<PartId, String>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_objective(&mut self, question: QuestionId, label: impl Into<String>) {
        self.objective.insert(question, label.into());
    }

    pub fn record_text(&mut self, part: PartId, text: impl Into<String>) {
        self.texts.insert(part, text.into());
    }

    pub fn objective(&self, question: QuestionId) -> Option<&str> {
        self.objective
            .get(&question)
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    }

    pub fn text(&self, part: &PartId) -> &str {
        self.texts.get(part).map(String::as_str).unwrap_or("")
    }

    pub fn objective_answers(&self) -> &BTreeMap<QuestionId, String> {
        &self.objective
    }

    fn count_answered<'q>(&self, questions: impl Iterator<Item = &'q Question>) -> usize {
        questions.filter(|q| self.objective(q.id).is_some()).count()
    }

    /// Answered questions in `part`. Sectioned parts sum across sections.
    /// Writing and Speaking parts are not question-counted and report zero.
    pub fn answered_count(&self, part: &Part) -> usize {
        match &part.body {
            PartBody::Objective(QuestionLayout::Flat(questions)) => {
                self.count_answered(questions.iter())
            }
            PartBody::Objective(QuestionLayout::Sectioned(sections)) => sections
                .iter()
                .map(|section| self.count_answered(section.questions.iter()))
                .sum(),
            PartBody::Writing(_) | PartBody::Speaking(_) => 0,
        }
    }

    pub fn required_count(&self, part: &Part) -> usize {
        part.required_question_count()
    }

    /// Answered objective questions plus Writing parts with any text.
    pub fn answered_total(&self, catalog: &Catalog) -> usize {
        catalog
            .parts()
            .iter()
            .map(|part| match &part.body {
                PartBody::Objective(_) => self.answered_count(part),
                PartBody::Writing(_) => usize::from(!self.text(&part.id).trim().is_empty()),
                PartBody::Speaking(_) => 0,
            })
            .sum()
    }

    pub fn word_count(&self, part: &PartId) -> usize {
        word_count(self.text(part))
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
