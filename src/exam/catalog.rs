use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exam::skill::Skill;

#[derive(Embed)]
#[folder = "assets/catalogs/"]
struct CatalogAssets;

pub const BUNDLED_CATALOG: &str = "vstep-sample.json";

pub type QuestionId = u32;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(String);

impl PartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
}

impl Question {
    /// Option labels run A, B, C, ... by position.
    pub fn label_for(index: usize) -> Option<char> {
        u8::try_from(index)
            .ok()
            .filter(|i| *i < 26)
            .map(|i| (b'A' + i) as char)
    }

    pub fn index_of_label(&self, label: &str) -> Option<usize> {
        let mut chars = label.chars();
        let ch = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() || !ch.is_ascii_uppercase() {
            return None;
        }
        let idx = (ch as u8 - b'A') as usize;
        (idx < self.options.len()).then_some(idx)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub audio_ref: Option<String>,
    #[serde(default)]
    pub passage: Option<String>,
    pub questions: Vec<Question>,
}

/// How an objective part holds its questions.
#[derive(Clone, Debug)]
pub enum QuestionLayout {
    Flat(Vec<Question>),
    Sectioned(Vec<Section>),
}

impl QuestionLayout {
    pub fn question_count(&self) -> usize {
        match self {
            QuestionLayout::Flat(questions) => questions.len(),
            QuestionLayout::Sectioned(sections) => {
                sections.iter().map(|s| s.questions.len()).sum()
            }
        }
    }

    pub fn questions(&self) -> Box<dyn Iterator<Item = &Question> + '_> {
        match self {
            QuestionLayout::Flat(questions) => Box::new(questions.iter()),
            QuestionLayout::Sectioned(sections) => {
                Box::new(sections.iter().flat_map(|s| s.questions.iter()))
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct WritingTask {
    pub prompt: String,
    pub min_words: u32,
    pub max_words: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct SpeakingTask {
    pub prompt: String,
    pub lines: Vec<String>,
    pub instruction_audio: Option<String>,
}

#[derive(Clone, Debug)]
pub enum PartBody {
    Objective(QuestionLayout),
    Writing(WritingTask),
    Speaking(SpeakingTask),
}

#[derive(Clone, Debug)]
pub struct Part {
    pub id: PartId,
    pub skill: Skill,
    /// 1-based position within the skill.
    pub ordinal: usize,
    pub title: String,
    pub instruction: Option<String>,
    pub body: PartBody,
}

impl Part {
    /// Questions that must be answered before the part counts as complete.
    /// Always zero for Writing and Speaking.
    pub fn required_question_count(&self) -> usize {
        match &self.body {
            PartBody::Objective(layout) => layout.question_count(),
            PartBody::Writing(_) | PartBody::Speaking(_) => 0,
        }
    }

    pub fn questions(&self) -> Box<dyn Iterator<Item = &Question> + '_> {
        match &self.body {
            PartBody::Objective(layout) => layout.questions(),
            PartBody::Writing(_) | PartBody::Speaking(_) => Box::new(std::iter::empty()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bundled catalog {0} not found")]
    MissingBundled(String),
    #[error("catalog has no parts")]
    Empty,
    #[error("skill {0} listed more than once")]
    DuplicateSkill(Skill),
    #[error("skill {0} is out of exam order")]
    SkillOutOfOrder(Skill),
    #[error("skill {0} has no parts")]
    EmptySkill(Skill),
    #[error("part {part} does not belong to {skill}")]
    PartPrefix { part: String, skill: Skill },
    #[error("part {part} is out of order (expected ordinal {expected})")]
    PartOrdinal { part: String, expected: usize },
    #[error("part {part} needs {expected}")]
    MissingBody { part: String, expected: &'static str },
    #[error("part {0} lists both questions and sections")]
    AmbiguousLayout(String),
    #[error("part {0} has no questions")]
    EmptyPart(String),
    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
    #[error("question {0} has no options")]
    NoOptions(QuestionId),
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    title: String,
    #[serde(default)]
    directions: Option<String>,
    skills: Vec<RawSkillGroup>,
}

#[derive(Debug, Deserialize)]
struct RawSkillGroup {
    skill: Skill,
    parts: Vec<RawPart>,
}

#[derive(Debug, Deserialize)]
struct RawPart {
    id: String,
    title: String,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    questions: Option<Vec<Question>>,
    #[serde(default)]
    sections: Option<Vec<Section>>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    min_words: Option<u32>,
    #[serde(default)]
    max_words: Option<u32>,
    #[serde(default)]
    lines: Vec<String>,
    #[serde(default)]
    instruction_audio: Option<String>,
}

/// The ordered set of parts making up one exam.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub title: String,
    pub directions: Option<String>,
    parts: Vec<Part>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn bundled(name: &str) -> Result<Self, CatalogError> {
        let file = CatalogAssets::get(name)
            .ok_or_else(|| CatalogError::MissingBundled(name.to_string()))?;
        let content = String::from_utf8_lossy(file.data.as_ref());
        Self::from_json(&content)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, id: &PartId) -> Option<&Part> {
        self.parts.iter().find(|p| &p.id == id)
    }

    pub fn parts_of(&self, skill: Skill) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(move |p| p.skill == skill)
    }

    pub fn skills(&self) -> Vec<Skill> {
        let mut skills: Vec<Skill> = self.parts.iter().map(|p| p.skill).collect();
        skills.dedup();
        skills
    }

    /// Objective questions plus one slot per Writing part.
    pub fn total_answerable(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match &p.body {
                PartBody::Objective(layout) => layout.question_count(),
                PartBody::Writing(_) => 1,
                PartBody::Speaking(_) => 0,
            })
            .sum()
    }

    fn from_raw(raw: RawCatalog) -> Result<Self, CatalogError> {
        let mut parts = Vec::new();
        let mut last_skill: Option<Skill> = None;
        let mut question_ids = HashSet::new();

        for group in raw.skills {
            if let Some(prev) = last_skill {
                if prev == group.skill {
                    return Err(CatalogError::DuplicateSkill(group.skill));
                }
                if prev > group.skill {
                    return Err(CatalogError::SkillOutOfOrder(group.skill));
                }
            }
            last_skill = Some(group.skill);

            if group.parts.is_empty() {
                return Err(CatalogError::EmptySkill(group.skill));
            }

            for (idx, raw_part) in group.parts.into_iter().enumerate() {
                let part = build_part(group.skill, idx + 1, raw_part)?;
                for question in part.questions() {
                    if question.options.is_empty() {
                        return Err(CatalogError::NoOptions(question.id));
                    }
                    if !question_ids.insert(question.id) {
                        return Err(CatalogError::DuplicateQuestion(question.id));
                    }
                }
                parts.push(part);
            }
        }

        if parts.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self {
            title: raw.title,
            directions: raw.directions,
            parts,
        })
    }
}

fn build_part(skill: Skill, ordinal: usize, raw: RawPart) -> Result<Part, CatalogError> {
    let mut chars = raw.id.chars();
    if chars.next() != Some(skill.part_prefix()) {
        return Err(CatalogError::PartPrefix {
            part: raw.id,
            skill,
        });
    }
    if chars.as_str().parse::<usize>().ok() != Some(ordinal) {
        return Err(CatalogError::PartOrdinal {
            part: raw.id,
            expected: ordinal,
        });
    }

    let body = match skill {
        Skill::Listening | Skill::Reading => {
            let layout = match (raw.questions, raw.sections) {
                (Some(_), Some(_)) => return Err(CatalogError::AmbiguousLayout(raw.id)),
                (Some(questions), None) => QuestionLayout::Flat(questions),
                (None, Some(sections)) => QuestionLayout::Sectioned(sections),
                (None, None) => {
                    return Err(CatalogError::MissingBody {
                        part: raw.id,
                        expected: "questions or sections",
                    });
                }
            };
            if layout.question_count() == 0 {
                return Err(CatalogError::EmptyPart(raw.id));
            }
            PartBody::Objective(layout)
        }
        Skill::Writing => {
            let Some(prompt) = raw.prompt else {
                return Err(CatalogError::MissingBody {
                    part: raw.id,
                    expected: "a writing prompt",
                });
            };
            PartBody::Writing(WritingTask {
                prompt,
                min_words: raw.min_words.unwrap_or(0),
                max_words: raw.max_words,
            })
        }
        Skill::Speaking => {
            let Some(prompt) = raw.prompt else {
                return Err(CatalogError::MissingBody {
                    part: raw.id,
                    expected: "a speaking prompt",
                });
            };
            PartBody::Speaking(SpeakingTask {
                prompt,
                lines: raw.lines,
                instruction_audio: raw.instruction_audio,
            })
        }
    };

    Ok(Part {
        id: PartId::new(raw.id),
        skill,
        ordinal,
        title: raw.title,
        instruction: raw.instruction,
        body,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small exam: L1 flat (8 questions), L2 sectioned (2x2), R1 sectioned,
    /// R2 flat, W1, W2, S1, S2, S3.
    pub(crate) const SMALL_CATALOG: &str = r#"{
        "title": "Practice Test",
        "skills": [
            { "skill": "listening", "parts": [
                { "id": "L1", "title": "PART 1", "questions": [
                    { "id": 1, "prompt": "q1", "options": ["a", "b", "c", "d"] },
                    { "id": 2, "prompt": "q2", "options": ["a", "b", "c", "d"] },
                    { "id": 3, "prompt": "q3", "options": ["a", "b", "c", "d"] },
                    { "id": 4, "prompt": "q4", "options": ["a", "b", "c", "d"] },
                    { "id": 5, "prompt": "q5", "options": ["a", "b", "c", "d"] },
                    { "id": 6, "prompt": "q6", "options": ["a", "b", "c", "d"] },
                    { "id": 7, "prompt": "q7", "options": ["a", "b", "c", "d"] },
                    { "id": 8, "prompt": "q8", "options": ["a", "b", "c", "d"] }
                ]},
                { "id": "L2", "title": "PART 2", "sections": [
                    { "title": "Conversation 1", "audio_ref": "l2-1.mp3", "questions": [
                        { "id": 9, "prompt": "q9", "options": ["a", "b"] },
                        { "id": 10, "prompt": "q10", "options": ["a", "b"] }
                    ]},
                    { "title": "Conversation 2", "audio_ref": "l2-2.mp3", "questions": [
                        { "id": 11, "prompt": "q11", "options": ["a", "b"] },
                        { "id": 12, "prompt": "q12", "options": ["a", "b"] }
                    ]}
                ]}
            ]},
            { "skill": "reading", "parts": [
                { "id": "R1", "title": "PART 1", "sections": [
                    { "title": "Passage", "passage": "Text.", "questions": [
                        { "id": 13, "prompt": "q13", "options": ["a", "b", "c"] },
                        { "id": 14, "prompt": "q14", "options": ["a", "b", "c"] }
                    ]}
                ]},
                { "id": "R2", "title": "PART 2", "questions": [
                    { "id": 15, "prompt": "q15", "options": ["a", "b", "c"] }
                ]}
            ]},
            { "skill": "writing", "parts": [
                { "id": "W1", "title": "PART 1", "prompt": "Write an email.", "min_words": 120, "max_words": 140 },
                { "id": "W2", "title": "PART 2", "prompt": "Write an essay.", "min_words": 250 }
            ]},
            { "skill": "speaking", "parts": [
                { "id": "S1", "title": "PART 1", "prompt": "Social interaction" },
                { "id": "S2", "title": "PART 2", "prompt": "Solution discussion" },
                { "id": "S3", "title": "PART 3", "prompt": "Topic development" }
            ]}
        ]
    }"#;

    pub(crate) fn small_catalog() -> Catalog {
        Catalog::from_json(SMALL_CATALOG).unwrap()
    }

    #[test]
    fn parses_parts_in_exam_order() {
        let catalog = small_catalog();
        let ids: Vec<&str> = catalog.parts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            ["L1", "L2", "R1", "R2", "W1", "W2", "S1", "S2", "S3"]
        );
        assert_eq!(catalog.skills(), Skill::all());
    }

    #[test]
    fn required_count_sums_across_sections() {
        let catalog = small_catalog();
        let l1 = catalog.part(&"L1".into()).unwrap();
        let l2 = catalog.part(&"L2".into()).unwrap();
        let w1 = catalog.part(&"W1".into()).unwrap();
        assert!(matches!(l1.body, PartBody::Objective(QuestionLayout::Flat(_))));
        assert!(matches!(l2.body, PartBody::Objective(QuestionLayout::Sectioned(_))));
        assert_eq!(l1.required_question_count(), 8);
        assert_eq!(l2.required_question_count(), 4);
        assert_eq!(w1.required_question_count(), 0);
    }

    #[test]
    fn total_answerable_counts_writing_parts_once() {
        let catalog = small_catalog();
        // 15 objective questions + 2 writing parts
        assert_eq!(catalog.total_answerable(), 17);
    }

    #[test]
    fn option_labels_follow_position() {
        assert_eq!(Question::label_for(0), Some('A'));
        assert_eq!(Question::label_for(3), Some('D'));
        assert_eq!(Question::label_for(26), None);

        let catalog = small_catalog();
        let l1 = catalog.part(&"L1".into()).unwrap();
        let q = l1.questions().find(|q| q.id == 1).unwrap();
        assert_eq!(q.index_of_label("c"), Some(2));
        assert_eq!(q.index_of_label("E"), None);
        assert_eq!(q.index_of_label("AB"), None);
    }

    #[test]
    fn rejects_part_with_wrong_prefix() {
        let json = r#"{ "title": "t", "skills": [
            { "skill": "reading", "parts": [
                { "id": "L1", "title": "x", "questions": [
                    { "id": 1, "prompt": "p", "options": ["a"] }
                ]}
            ]}
        ]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::PartPrefix { .. }));
    }

    #[test]
    fn rejects_skills_out_of_order() {
        let json = r#"{ "title": "t", "skills": [
            { "skill": "writing", "parts": [ { "id": "W1", "title": "x", "prompt": "p" } ]},
            { "skill": "listening", "parts": [
                { "id": "L1", "title": "x", "questions": [
                    { "id": 1, "prompt": "p", "options": ["a"] }
                ]}
            ]}
        ]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::SkillOutOfOrder(Skill::Listening)));
    }

    #[test]
    fn rejects_both_layouts_on_one_part() {
        let json = r#"{ "title": "t", "skills": [
            { "skill": "listening", "parts": [
                { "id": "L1", "title": "x",
                  "questions": [ { "id": 1, "prompt": "p", "options": ["a"] } ],
                  "sections": [ { "questions": [ { "id": 2, "prompt": "p", "options": ["a"] } ] } ]
                }
            ]}
        ]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::AmbiguousLayout(_)));
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let json = r#"{ "title": "t", "skills": [
            { "skill": "listening", "parts": [
                { "id": "L1", "title": "x", "questions": [ { "id": 1, "prompt": "p", "options": ["a"] } ] },
                { "id": "L2", "title": "y", "questions": [ { "id": 1, "prompt": "p", "options": ["a"] } ] }
            ]}
        ]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateQuestion(1)));
    }

    #[test]
    fn rejects_out_of_order_ordinals() {
        let json = r#"{ "title": "t", "skills": [
            { "skill": "writing", "parts": [ { "id": "W2", "title": "x", "prompt": "p" } ]}
        ]}"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::PartOrdinal { expected: 1, .. }));
    }

    #[test]
    fn bundled_catalog_loads() {
        let catalog = Catalog::bundled(BUNDLED_CATALOG).unwrap();
        assert_eq!(catalog.skills(), Skill::all());
        assert_eq!(catalog.parts_of(Skill::Speaking).count(), 3);
    }
}
