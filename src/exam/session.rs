use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::exam::answers::AnswerStore;
use crate::exam::catalog::{Catalog, Part, PartId, QuestionId};
use crate::exam::devices::{AudioPlayer, CaptureDevice, NoCapture, SilentPlayer};
use crate::exam::gate::{
    CompletedSkills, CompletionCheck, TransitionCheck, check_completion, check_transition,
};
use crate::exam::navigator::PartNavigator;
use crate::exam::skill::Skill;
use crate::exam::speaking::{SpeakingChoreographer, SpeakingEvent, SpeakingPhase};
use crate::exam::submission::{SubmitTrigger, Submission};
use crate::exam::timer::{SkillBudgets, SkillTimerBank};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("unknown part {0}")]
    UnknownPart(PartId),
    #[error("{0} is already completed")]
    SkillLocked(Skill),
    #[error("speaking parts advance automatically")]
    SpeakingAutomated,
    #[error("a confirmation prompt is waiting for an answer")]
    PromptPending,
    #[error("cannot jump from {from} to {to}; finish the current skill first")]
    CrossSkillJump { from: Skill, to: Skill },
    #[error("no confirmation prompt is open")]
    NoPrompt,
}

/// Confirmation the candidate must answer before navigation continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingPrompt {
    Incomplete { answered: usize, required: usize },
    CrossSkill { from: Skill, to: Skill, target: PartId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Moved(PartId),
    Incomplete { answered: usize, required: usize },
    CrossSkill { from: Skill, to: Skill },
    /// No part follows; the caller should submit.
    EndOfExam,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SpeakingPhase),
    PartChanged(PartId),
    SpeakingFinished,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartProgress {
    pub id: PartId,
    pub skill: Skill,
    pub answered: usize,
    pub required: usize,
    pub reachable: bool,
}

/// Read-only view handed to the presentation layer each tick.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub current_part: PartId,
    pub current_skill: Skill,
    pub remaining: BTreeMap<Skill, u32>,
    pub speaking_phase: SpeakingPhase,
    pub parts: Vec<PartProgress>,
    pub completed: CompletedSkills,
    pub pending: Option<PendingPrompt>,
    pub answered_total: usize,
    pub total_answerable: usize,
    pub input_level: f64,
}

/// One candidate's sitting. Owns the current part, the skill clocks, the
/// answers and the speaking sequence; everything else reads snapshots.
pub struct ExamSession {
    catalog: Catalog,
    current: PartId,
    bank: SkillTimerBank,
    answers: AnswerStore,
    completed: CompletedSkills,
    speaking: SpeakingChoreographer,
    pending: Option<PendingPrompt>,
}

impl ExamSession {
    pub fn new(
        catalog: Catalog,
        budgets: SkillBudgets,
        player: Box<dyn AudioPlayer>,
        capture: Box<dyn CaptureDevice>,
    ) -> Self {
        let first = PartNavigator::new(&catalog).first_part().id.clone();
        let mut session = Self {
            catalog,
            current: first.clone(),
            bank: SkillTimerBank::new(budgets),
            answers: AnswerStore::new(),
            completed: CompletedSkills::default(),
            speaking: SpeakingChoreographer::new(player, capture),
            pending: None,
        };
        info!(exam = %session.catalog.title, part = %first, "session started");
        session.enter(first);
        session
    }

    /// Session without audio hardware: timed playback, synthetic input level.
    pub fn headless(catalog: Catalog, budgets: SkillBudgets) -> Self {
        Self::new(catalog, budgets, Box::new(SilentPlayer), Box::new(NoCapture))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current_part_id(&self) -> &PartId {
        &self.current
    }

    pub fn current_part(&self) -> &Part {
        // `current` only ever holds ids taken from the catalog.
        self.catalog
            .part(&self.current)
            .unwrap_or_else(|| PartNavigator::new(&self.catalog).first_part())
    }

    pub fn current_skill(&self) -> Skill {
        self.current_part().skill
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn completed(&self) -> &CompletedSkills {
        &self.completed
    }

    pub fn remaining(&self, skill: Skill) -> u32 {
        self.bank.remaining(skill)
    }

    pub fn elapsed(&self, skill: Skill) -> u32 {
        self.bank.elapsed(skill)
    }

    pub fn speaking(&self) -> &SpeakingChoreographer {
        &self.speaking
    }

    pub fn pending(&self) -> Option<&PendingPrompt> {
        self.pending.as_ref()
    }

    pub fn is_last_part(&self) -> bool {
        PartNavigator::new(&self.catalog)
            .next_part(&self.current)
            .is_none()
    }

    /// One controller second: the current skill's clock, then the speaking
    /// sequence when the current part is a speaking part.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        let skill = self.current_skill();
        let before = self.bank.remaining(skill);
        self.bank.advance(skill);
        if before == 1 {
            info!(%skill, "skill time exhausted");
        }

        if skill != Skill::Speaking {
            return None;
        }
        match self.speaking.tick()? {
            SpeakingEvent::PhaseChanged(phase) => Some(SessionEvent::PhaseChanged(phase)),
            SpeakingEvent::AdvanceTo(next) => {
                self.enter(next.clone());
                Some(SessionEvent::PartChanged(next))
            }
            SpeakingEvent::Completed => {
                info!(part = %self.current, "speaking finished, awaiting submission");
                Some(SessionEvent::SpeakingFinished)
            }
        }
    }

    /// Candidate pressed "next". Runs the completion gate, then the skill
    /// transition gate.
    pub fn request_advance(&mut self) -> Result<AdvanceOutcome, NavigationError> {
        if self.pending.is_some() {
            return Err(NavigationError::PromptPending);
        }
        // The last part only hands over once its recording has finished.
        if self.current_skill() == Skill::Speaking
            && !(self.is_last_part() && self.speaking.phase() == SpeakingPhase::Done)
        {
            return Err(NavigationError::SpeakingAutomated);
        }

        match check_completion(self.current_part(), &self.answers) {
            CompletionCheck::Ok => {
                debug!(part = %self.current, "completion gate passed");
                Ok(self.past_completion_gate())
            }
            CompletionCheck::Blocked { answered, required } => {
                debug!(part = %self.current, answered, required, "completion gate blocked");
                self.pending = Some(PendingPrompt::Incomplete { answered, required });
                Ok(AdvanceOutcome::Incomplete { answered, required })
            }
        }
    }

    /// "Continue anyway" on the incomplete-part prompt.
    pub fn continue_anyway(&mut self) -> Result<AdvanceOutcome, NavigationError> {
        match self.pending {
            Some(PendingPrompt::Incomplete { .. }) => {
                self.pending = None;
                debug!(part = %self.current, "completion gate overridden");
                Ok(self.past_completion_gate())
            }
            _ => Err(NavigationError::NoPrompt),
        }
    }

    /// "Stay" on the incomplete-part prompt.
    pub fn stay(&mut self) -> Result<(), NavigationError> {
        match self.pending {
            Some(PendingPrompt::Incomplete { .. }) => {
                self.pending = None;
                Ok(())
            }
            _ => Err(NavigationError::NoPrompt),
        }
    }

    /// Confirm leaving the current skill. The departed skill is locked for
    /// the rest of the session.
    pub fn confirm_transition(&mut self) -> Result<PartId, NavigationError> {
        let Some(PendingPrompt::CrossSkill { from, target, .. }) = self.pending.clone() else {
            return Err(NavigationError::NoPrompt);
        };
        self.pending = None;
        if self.completed.lock(from) {
            info!(skill = %from, "skill locked");
        }
        self.enter(target.clone());
        Ok(target)
    }

    pub fn cancel_transition(&mut self) -> Result<(), NavigationError> {
        match self.pending {
            Some(PendingPrompt::CrossSkill { .. }) => {
                self.pending = None;
                Ok(())
            }
            _ => Err(NavigationError::NoPrompt),
        }
    }

    /// Select a part directly. Only parts of the current skill qualify, and
    /// never during Speaking.
    pub fn jump_to(&mut self, id: &PartId) -> Result<(), NavigationError> {
        if self.pending.is_some() {
            return Err(NavigationError::PromptPending);
        }
        let target = self
            .catalog
            .part(id)
            .ok_or_else(|| NavigationError::UnknownPart(id.clone()))?;
        if self.completed.contains(target.skill) {
            return Err(NavigationError::SkillLocked(target.skill));
        }
        let from = self.current_skill();
        if target.skill == Skill::Speaking || from == Skill::Speaking {
            return Err(NavigationError::SpeakingAutomated);
        }
        if target.skill != from {
            return Err(NavigationError::CrossSkillJump {
                from,
                to: target.skill,
            });
        }
        if *id != self.current {
            self.enter(id.clone());
        }
        Ok(())
    }

    pub fn record_objective(&mut self, question: QuestionId, label: impl Into<String>) {
        self.answers.record_objective(question, label);
    }

    pub fn record_text(&mut self, part: PartId, text: impl Into<String>) {
        self.answers.record_text(part, text);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let nav = PartNavigator::new(&self.catalog);
        let parts = nav
            .all_parts()
            .iter()
            .map(|part| PartProgress {
                id: part.id.clone(),
                skill: part.skill,
                answered: self.answers.answered_count(part),
                required: self.answers.required_count(part),
                reachable: nav.is_reachable(&part.id, self.completed.as_set()),
            })
            .collect();

        SessionSnapshot {
            current_part: self.current.clone(),
            current_skill: self.current_skill(),
            remaining: self.bank.remaining_all(),
            speaking_phase: self.speaking.phase(),
            parts,
            completed: self.completed.clone(),
            pending: self.pending.clone(),
            answered_total: self.answers.answered_total(&self.catalog),
            total_answerable: self.catalog.total_answerable(),
            input_level: self.speaking.input_level(),
        }
    }

    /// End the session and produce the payload for the results store.
    pub fn submit(mut self, candidate: &str, trigger: SubmitTrigger) -> Submission {
        self.speaking.cancel();
        let submission = Submission::new(
            &self.catalog,
            candidate,
            trigger,
            &self.answers,
            self.bank.elapsed_all(),
            self.bank.remaining_all(),
            &self.completed,
        );
        info!(
            candidate,
            ?trigger,
            answered = submission.answered_total,
            "exam submitted"
        );
        submission
    }

    /// Leave without submitting. Clocks stop and capture is released.
    pub fn abandon(mut self) {
        self.speaking.cancel();
        info!(part = %self.current, "session abandoned");
    }

    fn past_completion_gate(&mut self) -> AdvanceOutcome {
        let nav = PartNavigator::new(&self.catalog);
        let Some(next) = nav.next_reachable(&self.current, self.completed.as_set()) else {
            debug!(part = %self.current, "no further part, end of exam");
            return AdvanceOutcome::EndOfExam;
        };
        let current = self.current_part();
        match check_transition(current, next) {
            TransitionCheck::SameSkill => {
                let id = next.id.clone();
                self.enter(id.clone());
                AdvanceOutcome::Moved(id)
            }
            TransitionCheck::CrossSkill { from, to } => {
                debug!(%from, %to, "skill transition needs confirmation");
                self.pending = Some(PendingPrompt::CrossSkill {
                    from,
                    to,
                    target: next.id.clone(),
                });
                AdvanceOutcome::CrossSkill { from, to }
            }
        }
    }

    /// Make `id` current. Any clock belonging to the previous part is
    /// cleared before the new part's sequence starts.
    fn enter(&mut self, id: PartId) {
        self.speaking.cancel();
        let nav = PartNavigator::new(&self.catalog);
        let Some(part) = nav.part(&id) else {
            return;
        };
        if self.completed.contains(part.skill) {
            return;
        }
        if id != self.current {
            info!(from = %self.current, to = %id, "part changed");
        }
        if part.skill == Skill::Speaking {
            let next = nav
                .next_part(&id)
                .filter(|p| p.skill == Skill::Speaking)
                .map(|p| p.id.clone());
            self.speaking.enter_part(part, next);
        }
        self.current = id;
    }
}
