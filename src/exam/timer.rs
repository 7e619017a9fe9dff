use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::exam::skill::Skill;

/// A one-shot countdown measured in whole ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    total: u32,
}

impl Countdown {
    pub fn new(secs: u32) -> Self {
        Self {
            remaining: secs,
            total: secs,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn elapsed(&self) -> u32 {
        self.total - self.remaining
    }

    /// Returns true exactly once: on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

/// Per-skill time allowance in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBudgets {
    pub listening: u32,
    pub reading: u32,
    pub writing: u32,
    pub speaking: u32,
}

impl SkillBudgets {
    pub fn from_minutes(listening: u32, reading: u32, writing: u32, speaking: u32) -> Self {
        Self {
            listening: listening * 60,
            reading: reading * 60,
            writing: writing * 60,
            speaking: speaking * 60,
        }
    }

    pub fn budget(&self, skill: Skill) -> u32 {
        match skill {
            Skill::Listening => self.listening,
            Skill::Reading => self.reading,
            Skill::Writing => self.writing,
            Skill::Speaking => self.speaking,
        }
    }
}

impl Default for SkillBudgets {
    fn default() -> Self {
        Self::from_minutes(45, 60, 60, 12)
    }
}

/// One countdown per skill. Only the skill passed to `advance` moves.
///
/// Reaching zero is informational: the counter clamps and nothing else
/// happens. Elapsed time keeps counting past zero so the submission records
/// how long the candidate actually spent in each skill.
#[derive(Clone, Debug)]
pub struct SkillTimerBank {
    remaining: BTreeMap<Skill, u32>,
    elapsed: BTreeMap<Skill, u32>,
}

impl SkillTimerBank {
    pub fn new(budgets: SkillBudgets) -> Self {
        let remaining = Skill::all()
            .iter()
            .map(|&s| (s, budgets.budget(s)))
            .collect();
        let elapsed = Skill::all().iter().map(|&s| (s, 0)).collect();
        Self { remaining, elapsed }
    }

    pub fn advance(&mut self, current: Skill) {
        if let Some(secs) = self.remaining.get_mut(&current) {
            *secs = secs.saturating_sub(1);
        }
        *self.elapsed.entry(current).or_insert(0) += 1;
    }

    pub fn remaining(&self, skill: Skill) -> u32 {
        self.remaining.get(&skill).copied().unwrap_or(0)
    }

    pub fn elapsed(&self, skill: Skill) -> u32 {
        self.elapsed.get(&skill).copied().unwrap_or(0)
    }

    pub fn remaining_all(&self) -> BTreeMap<Skill, u32> {
        self.remaining.clone()
    }

    pub fn elapsed_all(&self) -> BTreeMap<Skill, u32> {
        self.elapsed.clone()
    }
}

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
