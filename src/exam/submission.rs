use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exam::answers::AnswerStore;
use crate::exam::catalog::{Catalog, PartBody, PartId, QuestionId};
use crate::exam::gate::CompletedSkills;
use crate::exam::skill::Skill;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    /// Candidate chose to submit.
    Explicit,
    /// Candidate advanced past the last part.
    EndOfExam,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingResponse {
    pub text: String,
    pub word_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub exam_title: String,
    pub candidate: String,
    pub submitted_at: DateTime<Utc>,
    pub trigger: SubmitTrigger,
    pub answers: BTreeMap<QuestionId, String>,
    pub writing: BTreeMap<PartId, WritingResponse>,
    pub elapsed_secs: BTreeMap<Skill, u32>,
    pub remaining_secs: BTreeMap<Skill, u32>,
    pub completed_skills: CompletedSkills,
    pub answered_total: usize,
    pub total_answerable: usize,
}

impl Submission {
    pub fn new(
        catalog: &Catalog,
        candidate: &str,
        trigger: SubmitTrigger,
        answers: &AnswerStore,
        elapsed_secs: BTreeMap<Skill, u32>,
        remaining_secs: BTreeMap<Skill, u32>,
        completed: &CompletedSkills,
    ) -> Self {
        let objective = answers
            .objective_answers()
            .iter()
            .filter(|(_, label)| !label.is_empty())
            .map(|(id, label)| (*id, label.clone()))
            .collect();

        // Every writing part appears, even when left blank.
        let writing = catalog
            .parts()
            .iter()
            .filter(|p| matches!(p.body, PartBody::Writing(_)))
            .map(|p| {
                let text = answers.text(&p.id).to_string();
                let word_count = answers.word_count(&p.id);
                (p.id.clone(), WritingResponse { text, word_count })
            })
            .collect();

        Self {
            exam_title: catalog.title.clone(),
            candidate: candidate.to_string(),
            submitted_at: Utc::now(),
            trigger,
            answers: objective,
            writing,
            elapsed_secs,
            remaining_secs,
            completed_skills: completed.clone(),
            answered_total: answers.answered_total(catalog),
            total_answerable: catalog.total_answerable(),
        }
    }

    pub fn total_elapsed_secs(&self) -> u32 {
        self.elapsed_secs.values().sum()
    }

    /// File name used by the results store: `<timestamp>-<candidate>.json`,
    /// timestamp down to the millisecond.
    pub fn file_name(&self) -> String {
        let candidate: String = self
            .candidate
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let candidate = candidate.trim_matches('-');
        let candidate = if candidate.is_empty() { "candidate" } else { candidate };
        format!(
            "{}-{}.json",
            self.submitted_at.format("%Y%m%dT%H%M%S%3f"),
            candidate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::catalog::tests::small_catalog;

    fn sample() -> Submission {
        let catalog = small_catalog();
        let mut answers = AnswerStore::new();
        answers.record_objective(1, "A");
        answers.record_objective(2, "");
        answers.record_text("W2".into(), "An essay about cities");
        let mut completed = CompletedSkills::default();
        completed.lock(Skill::Listening);
        let elapsed = [(Skill::Listening, 120), (Skill::Reading, 30)].into();
        Submission::new(
            &catalog,
            "Nguyen Van A",
            SubmitTrigger::EndOfExam,
            &answers,
            elapsed,
            BTreeMap::new(),
            &completed,
        )
    }

    #[test]
    fn blank_objective_answers_are_dropped() {
        let submission = sample();
        assert_eq!(submission.answers.len(), 1);
        assert_eq!(submission.answered_total, 2);
        assert_eq!(submission.total_answerable, 17);
    }

    #[test]
    fn every_writing_part_is_listed() {
        let submission = sample();
        assert_eq!(submission.writing.len(), 2);
        assert_eq!(submission.writing[&PartId::from("W1")].word_count, 0);
        assert_eq!(submission.writing[&PartId::from("W2")].word_count, 4);
    }

    #[test]
    fn file_name_is_filesystem_safe() {
        let submission = sample();
        let name = submission.file_name();
        assert!(name.ends_with("-nguyen-van-a.json"));
        let stamp = name.split('-').next().unwrap();
        assert_eq!(stamp.len(), "20260101T000000000".len());
        assert_eq!(stamp, submission.submitted_at.format("%Y%m%dT%H%M%S%3f").to_string());
        assert!(!name.contains(' '));
        assert_eq!(submission.total_elapsed_secs(), 150);
    }

    #[test]
    fn serializes_to_json_and_back() {
        let submission = sample();
        let json = serde_json::to_string_pretty(&submission).unwrap();
        assert!(json.contains("\"trigger\": \"end_of_exam\""));
        assert!(json.contains("\"listening\""));
        let back: Submission = serde_json::from_str(&json).unwrap();
        assert_eq!(back.answers, submission.answers);
        assert_eq!(back.completed_skills, submission.completed_skills);
        assert_eq!(back.elapsed_secs, submission.elapsed_secs);
    }
}
