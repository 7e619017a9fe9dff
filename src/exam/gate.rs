use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::exam::answers::AnswerStore;
use crate::exam::catalog::Part;
use crate::exam::skill::Skill;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionCheck {
    Ok,
    Blocked { answered: usize, required: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionCheck {
    SameSkill,
    CrossSkill { from: Skill, to: Skill },
}

/// Listening and Reading parts must be fully answered to pass; the candidate
/// may still override a block. Writing and Speaking always pass.
pub fn check_completion(current: &Part, answers: &AnswerStore) -> CompletionCheck {
    if !current.skill.is_gated() {
        return CompletionCheck::Ok;
    }
    let answered = answers.answered_count(current);
    let required = answers.required_count(current);
    if answered < required {
        CompletionCheck::Blocked { answered, required }
    } else {
        CompletionCheck::Ok
    }
}

pub fn check_transition(current: &Part, next: &Part) -> TransitionCheck {
    if current.skill == next.skill {
        TransitionCheck::SameSkill
    } else {
        TransitionCheck::CrossSkill {
            from: current.skill,
            to: next.skill,
        }
    }
}

/// Skills the candidate has left. Grows only; there is no way to unlock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedSkills(BTreeSet<Skill>);

impl CompletedSkills {
    pub fn lock(&mut self, skill: Skill) -> bool {
        self.0.insert(skill)
    }

    pub fn contains(&self, skill: Skill) -> bool {
        self.0.contains(&skill)
    }

    pub fn as_set(&self) -> &BTreeSet<Skill> {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Skill> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
