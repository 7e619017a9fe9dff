use tracing::info;

use crate::exam::catalog::{Part, PartBody, PartId};
use crate::exam::devices::{AudioPlayer, CaptureDevice, InputLevel};
use crate::exam::timer::Countdown;

/// Headset check shown once, on first entry into Speaking.
pub const PREPARATION_SECS: u32 = 60;
/// Length of the recorded instruction played before each part.
pub const INSTRUCTION_SECS: u32 = 12;
pub const FIRST_PART_COUNTDOWN_SECS: u32 = 3;
pub const LATER_PART_COUNTDOWN_SECS: u32 = 60;
/// Every speaking part records for the same length of time.
pub const RECORDING_SECS: u32 = 180;
/// "Moving to the next part" notice after the first part.
pub const ADVANCE_NOTICE_SECS: u32 = 3;
/// Silent hand-off between later parts.
pub const HANDOFF_DELAY_SECS: u32 = 1;

const SYNTHETIC_LEVEL_SEED: u64 = 0x5eed_0f_5a;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeakingPhase {
    Idle,
    Preparing(Countdown),
    /// Countdown's elapsed value is the playback position.
    PlayingInstruction(Countdown),
    PreRecordCountdown(Countdown),
    Recording(Countdown),
    PostRecordTransition { clock: Countdown, notice: bool },
    Done,
}

impl SpeakingPhase {
    /// Position in the per-part sequence. Never decreases within a part.
    pub fn rank(&self) -> u8 {
        match self {
            SpeakingPhase::Idle => 0,
            SpeakingPhase::Preparing(_) => 1,
            SpeakingPhase::PlayingInstruction(_) => 2,
            SpeakingPhase::PreRecordCountdown(_) => 3,
            SpeakingPhase::Recording(_) => 4,
            SpeakingPhase::PostRecordTransition { .. } => 5,
            SpeakingPhase::Done => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpeakingPhase::Idle => "idle",
            SpeakingPhase::Preparing(_) => "preparing",
            SpeakingPhase::PlayingInstruction(_) => "playing_instruction",
            SpeakingPhase::PreRecordCountdown(_) => "pre_record_countdown",
            SpeakingPhase::Recording(_) => "recording",
            SpeakingPhase::PostRecordTransition { .. } => "post_record_transition",
            SpeakingPhase::Done => "done",
        }
    }

    pub fn countdown(&self) -> Option<Countdown> {
        match *self {
            SpeakingPhase::Preparing(cd)
            | SpeakingPhase::PlayingInstruction(cd)
            | SpeakingPhase::PreRecordCountdown(cd)
            | SpeakingPhase::Recording(cd) => Some(cd),
            SpeakingPhase::PostRecordTransition { clock, .. } => Some(clock),
            SpeakingPhase::Idle | SpeakingPhase::Done => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeakingEvent {
    PhaseChanged(SpeakingPhase),
    /// Hand the session over to the next speaking part.
    AdvanceTo(PartId),
    /// The last part finished recording.
    Completed,
}

/// Drives the automated prepare, listen, count down, record sequence for
/// each speaking part.
pub struct SpeakingChoreographer {
    part: Option<PartId>,
    is_first: bool,
    next_part: Option<PartId>,
    instruction_audio: Option<String>,
    phase: SpeakingPhase,
    preparation_shown: bool,
    playback_finished: bool,
    recording_completed: bool,
    input: Option<InputLevel>,
    level: f64,
    player: Box<dyn AudioPlayer>,
    capture: Box<dyn CaptureDevice>,
}

impl SpeakingChoreographer {
    pub fn new(player: Box<dyn AudioPlayer>, capture: Box<dyn CaptureDevice>) -> Self {
        Self {
            part: None,
            is_first: false,
            next_part: None,
            instruction_audio: None,
            phase: SpeakingPhase::Idle,
            preparation_shown: false,
            playback_finished: false,
            recording_completed: false,
            input: None,
            level: 0.0,
            player,
            capture,
        }
    }

    /// Reset per-part state and start the sequence for `part`.
    /// `next` is the following speaking part, if any.
    pub fn enter_part(&mut self, part: &Part, next: Option<PartId>) {
        self.reset_transient();
        self.part = Some(part.id.clone());
        self.is_first = part.ordinal == 1;
        self.next_part = next;
        self.instruction_audio = match &part.body {
            PartBody::Speaking(task) => task.instruction_audio.clone(),
            PartBody::Objective(_) | PartBody::Writing(_) => None,
        };

        if self.preparation_shown {
            self.start_instruction();
        } else {
            self.preparation_shown = true;
            self.set_phase(SpeakingPhase::Preparing(Countdown::new(PREPARATION_SECS)));
        }
    }

    /// Stop everything for the current part. Used when leaving Speaking and
    /// when the session ends.
    pub fn cancel(&mut self) {
        self.reset_transient();
        self.part = None;
        self.next_part = None;
        self.phase = SpeakingPhase::Idle;
    }

    fn reset_transient(&mut self) {
        if matches!(self.phase, SpeakingPhase::PlayingInstruction(_)) {
            self.player.stop();
        }
        self.input = None;
        self.level = 0.0;
        self.playback_finished = false;
        self.recording_completed = false;
    }

    pub fn tick(&mut self) -> Option<SpeakingEvent> {
        if matches!(self.phase, SpeakingPhase::Recording(_)) {
            if let Some(input) = self.input.as_mut() {
                self.level = input.sample();
            }
        }

        let fired = match &mut self.phase {
            SpeakingPhase::Preparing(cd)
            | SpeakingPhase::PlayingInstruction(cd)
            | SpeakingPhase::PreRecordCountdown(cd)
            | SpeakingPhase::Recording(cd) => cd.tick(),
            SpeakingPhase::PostRecordTransition { clock, .. } => clock.tick(),
            SpeakingPhase::Idle | SpeakingPhase::Done => return None,
        };

        if fired { Some(self.finish_phase()) } else { None }
    }

    fn finish_phase(&mut self) -> SpeakingEvent {
        match self.phase {
            SpeakingPhase::Preparing(_) => {
                self.start_instruction();
            }
            SpeakingPhase::PlayingInstruction(_) => {
                self.player.stop();
                self.playback_finished = true;
                let secs = if self.is_first {
                    FIRST_PART_COUNTDOWN_SECS
                } else {
                    LATER_PART_COUNTDOWN_SECS
                };
                self.set_phase(SpeakingPhase::PreRecordCountdown(Countdown::new(secs)));
            }
            SpeakingPhase::PreRecordCountdown(_) => {
                let seed = SYNTHETIC_LEVEL_SEED ^ self.part_seed();
                self.input = Some(InputLevel::acquire(self.capture.as_mut(), seed));
                self.set_phase(SpeakingPhase::Recording(Countdown::new(RECORDING_SECS)));
            }
            SpeakingPhase::Recording(_) => {
                self.input = None;
                self.level = 0.0;
                self.recording_completed = true;
                if self.next_part.is_none() {
                    self.set_phase(SpeakingPhase::Done);
                    return SpeakingEvent::Completed;
                }
                let (secs, notice) = if self.is_first {
                    (ADVANCE_NOTICE_SECS, true)
                } else {
                    (HANDOFF_DELAY_SECS, false)
                };
                self.set_phase(SpeakingPhase::PostRecordTransition {
                    clock: Countdown::new(secs),
                    notice,
                });
            }
            SpeakingPhase::PostRecordTransition { .. } => {
                if let Some(next) = self.next_part.clone() {
                    return SpeakingEvent::AdvanceTo(next);
                }
            }
            SpeakingPhase::Idle | SpeakingPhase::Done => {}
        }
        SpeakingEvent::PhaseChanged(self.phase)
    }

    fn start_instruction(&mut self) {
        self.player
            .play(self.instruction_audio.as_deref(), INSTRUCTION_SECS);
        self.set_phase(SpeakingPhase::PlayingInstruction(Countdown::new(
            INSTRUCTION_SECS,
        )));
    }

    fn set_phase(&mut self, phase: SpeakingPhase) {
        info!(
            part = self.part.as_ref().map(PartId::as_str).unwrap_or("-"),
            from = self.phase.name(),
            to = phase.name(),
            "speaking phase"
        );
        self.phase = phase;
    }

    fn part_seed(&self) -> u64 {
        self.part
            .as_ref()
            .map(|id| id.as_str().bytes().fold(0u64, |acc, b| acc.rotate_left(8) ^ b as u64))
            .unwrap_or(0)
    }

    pub fn phase(&self) -> SpeakingPhase {
        self.phase
    }

    pub fn part(&self) -> Option<&PartId> {
        self.part.as_ref()
    }

    pub fn preparation_shown(&self) -> bool {
        self.preparation_shown
    }

    pub fn playback_finished(&self) -> bool {
        self.playback_finished
    }

    pub fn recording_completed(&self) -> bool {
        self.recording_completed
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, SpeakingPhase::Recording(_))
    }

    /// Latest input level while recording, 0.0 otherwise.
    pub fn input_level(&self) -> f64 {
        self.level
    }

    pub fn using_synthetic_input(&self) -> bool {
        self.input.as_ref().is_some_and(InputLevel::is_synthetic)
    }

    /// Full-screen countdown before the first part's recording.
    pub fn shows_countdown_modal(&self) -> bool {
        self.is_first && matches!(self.phase, SpeakingPhase::PreRecordCountdown(_))
    }

    /// Small corner timer for later parts' preparation.
    pub fn shows_corner_timer(&self) -> bool {
        !self.is_first && matches!(self.phase, SpeakingPhase::PreRecordCountdown(_))
    }

    pub fn shows_advance_notice(&self) -> bool {
        matches!(
            self.phase,
            SpeakingPhase::PostRecordTransition { notice: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::catalog::Catalog;
    use crate::exam::catalog::tests::small_catalog;
    use crate::exam::devices::tests::CountingCapture;
    use crate::exam::devices::{NoCapture, SilentPlayer};

    fn choreographer() -> SpeakingChoreographer {
        SpeakingChoreographer::new(Box::new(SilentPlayer), Box::new(NoCapture))
    }

    fn enter(ch: &mut SpeakingChoreographer, catalog: &Catalog, id: &str, next: Option<&str>) {
        let part = catalog.part(&id.into()).unwrap();
        ch.enter_part(part, next.map(PartId::from));
    }

    /// Tick until the phase rank changes; returns ticks spent and the last event.
    fn run_phase(ch: &mut SpeakingChoreographer) -> (u32, Option<SpeakingEvent>) {
        let start = ch.phase().rank();
        let mut ticks = 0;
        loop {
            ticks += 1;
            let event = ch.tick();
            if event.is_some() || ch.phase().rank() != start {
                return (ticks, event);
            }
            assert!(ticks < 10_000, "phase never finished");
        }
    }

    #[test]
    fn first_part_runs_full_sequence() {
        let catalog = small_catalog();
        let mut ch = choreographer();
        enter(&mut ch, &catalog, "S1", Some("S2"));

        assert_eq!(ch.phase(), SpeakingPhase::Preparing(Countdown::new(60)));
        assert!(ch.preparation_shown());

        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, 60);
        assert_eq!(ch.phase(), SpeakingPhase::PlayingInstruction(Countdown::new(12)));

        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, 12);
        assert!(ch.playback_finished());
        assert_eq!(ch.phase(), SpeakingPhase::PreRecordCountdown(Countdown::new(3)));
        assert!(ch.shows_countdown_modal());

        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, 3);
        assert_eq!(ch.phase(), SpeakingPhase::Recording(Countdown::new(180)));
        assert!(ch.using_synthetic_input());

        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, 180);
        assert!(ch.recording_completed());
        assert!(ch.shows_advance_notice());

        let (ticks, event) = run_phase(&mut ch);
        assert_eq!(ticks, 3);
        assert_eq!(event, Some(SpeakingEvent::AdvanceTo("S2".into())));
    }

    #[test]
    fn later_parts_skip_preparation_and_wait_sixty_seconds() {
        let catalog = small_catalog();
        let mut ch = choreographer();
        enter(&mut ch, &catalog, "S1", Some("S2"));
        enter(&mut ch, &catalog, "S2", Some("S3"));

        assert!(matches!(ch.phase(), SpeakingPhase::PlayingInstruction(_)));
        run_phase(&mut ch);
        assert_eq!(ch.phase(), SpeakingPhase::PreRecordCountdown(Countdown::new(60)));
        assert!(ch.shows_corner_timer());
        assert!(!ch.shows_countdown_modal());

        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, 60);
        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, 180);
        assert!(!ch.shows_advance_notice());

        let (ticks, event) = run_phase(&mut ch);
        assert_eq!(ticks, HANDOFF_DELAY_SECS);
        assert_eq!(event, Some(SpeakingEvent::AdvanceTo("S3".into())));
    }

    #[test]
    fn last_part_ends_in_done() {
        let catalog = small_catalog();
        let mut ch = choreographer();
        enter(&mut ch, &catalog, "S1", Some("S2"));
        enter(&mut ch, &catalog, "S3", None);

        run_phase(&mut ch);
        run_phase(&mut ch);
        let (ticks, event) = run_phase(&mut ch);
        assert_eq!(ticks, 180);
        assert_eq!(event, Some(SpeakingEvent::Completed));
        assert_eq!(ch.phase(), SpeakingPhase::Done);

        for _ in 0..100 {
            assert_eq!(ch.tick(), None);
        }
        assert_eq!(ch.phase(), SpeakingPhase::Done);
    }

    #[test]
    fn only_the_first_part_gets_the_short_countdown() {
        let catalog = small_catalog();
        for (id, next, secs) in [
            ("S1", Some("S2"), FIRST_PART_COUNTDOWN_SECS),
            ("S2", Some("S3"), LATER_PART_COUNTDOWN_SECS),
            ("S3", None, LATER_PART_COUNTDOWN_SECS),
        ] {
            let mut ch = choreographer();
            enter(&mut ch, &catalog, id, next);
            while !matches!(ch.phase(), SpeakingPhase::PreRecordCountdown(_)) {
                run_phase(&mut ch);
            }
            assert_eq!(
                ch.phase(),
                SpeakingPhase::PreRecordCountdown(Countdown::new(secs)),
                "{id}"
            );
            assert_eq!(ch.shows_countdown_modal(), id == "S1", "{id}");
            assert_eq!(ch.shows_corner_timer(), id != "S1", "{id}");

            let (ticks, _) = run_phase(&mut ch);
            assert_eq!(ticks, secs, "{id}");
            assert!(matches!(ch.phase(), SpeakingPhase::Recording(_)));
        }
    }

    #[test]
    fn last_part_waits_sixty_seconds_before_recording() {
        let catalog = small_catalog();
        let mut ch = choreographer();
        enter(&mut ch, &catalog, "S1", Some("S2"));
        enter(&mut ch, &catalog, "S3", None);

        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, INSTRUCTION_SECS);
        assert_eq!(
            ch.phase(),
            SpeakingPhase::PreRecordCountdown(Countdown::new(LATER_PART_COUNTDOWN_SECS))
        );
        for _ in 0..LATER_PART_COUNTDOWN_SECS - 1 {
            assert_eq!(ch.tick(), None);
            assert!(!ch.is_recording());
        }
        ch.tick();
        assert!(ch.is_recording());
    }

    #[test]
    fn phases_never_go_backwards_within_a_part() {
        let catalog = small_catalog();
        let mut ch = choreographer();
        enter(&mut ch, &catalog, "S1", Some("S2"));
        let mut last_rank = ch.phase().rank();
        loop {
            match ch.tick() {
                Some(SpeakingEvent::AdvanceTo(_)) => break,
                _ => {
                    let rank = ch.phase().rank();
                    assert!(rank >= last_rank);
                    last_rank = rank;
                }
            }
        }
    }

    #[test]
    fn preparation_shown_once_even_when_reentering_first_part() {
        let catalog = small_catalog();
        let mut ch = choreographer();
        enter(&mut ch, &catalog, "S1", Some("S2"));
        enter(&mut ch, &catalog, "S1", Some("S2"));
        assert!(matches!(ch.phase(), SpeakingPhase::PlayingInstruction(_)));
    }

    #[test]
    fn part_change_releases_capture_and_clears_clocks() {
        let catalog = small_catalog();
        let (capture, open) = CountingCapture::new(false);
        let mut ch = SpeakingChoreographer::new(Box::new(SilentPlayer), Box::new(capture));
        enter(&mut ch, &catalog, "S1", Some("S2"));
        for _ in 0..(60 + 12 + 3 + 10) {
            ch.tick();
        }
        assert!(ch.is_recording());
        assert_eq!(open.get(), 1);
        assert!(!ch.using_synthetic_input());
        assert_eq!(ch.input_level(), 42.0);

        enter(&mut ch, &catalog, "S2", Some("S3"));
        assert_eq!(open.get(), 0);
        assert!(!ch.recording_completed());
        assert_eq!(ch.input_level(), 0.0);
        assert!(matches!(ch.phase(), SpeakingPhase::PlayingInstruction(cd) if cd.elapsed() == 0));
    }

    #[test]
    fn cancel_releases_capture() {
        let catalog = small_catalog();
        let (capture, open) = CountingCapture::new(false);
        let mut ch = SpeakingChoreographer::new(Box::new(SilentPlayer), Box::new(capture));
        enter(&mut ch, &catalog, "S1", Some("S2"));
        for _ in 0..(60 + 12 + 3 + 1) {
            ch.tick();
        }
        assert_eq!(open.get(), 1);
        ch.cancel();
        assert_eq!(open.get(), 0);
        assert_eq!(ch.phase(), SpeakingPhase::Idle);
        assert_eq!(ch.tick(), None);
    }

    #[test]
    fn dropping_choreographer_releases_capture() {
        let catalog = small_catalog();
        let (capture, open) = CountingCapture::new(false);
        let mut ch = SpeakingChoreographer::new(Box::new(SilentPlayer), Box::new(capture));
        enter(&mut ch, &catalog, "S1", Some("S2"));
        for _ in 0..(60 + 12 + 3 + 1) {
            ch.tick();
        }
        assert_eq!(open.get(), 1);
        drop(ch);
        assert_eq!(open.get(), 0);
    }

    #[test]
    fn denied_capture_does_not_stall_recording() {
        let catalog = small_catalog();
        let (capture, _open) = CountingCapture::new(true);
        let mut ch = SpeakingChoreographer::new(Box::new(SilentPlayer), Box::new(capture));
        enter(&mut ch, &catalog, "S1", Some("S2"));
        run_phase(&mut ch);
        run_phase(&mut ch);
        run_phase(&mut ch);
        assert!(ch.using_synthetic_input());
        ch.tick();
        assert!(ch.input_level() >= 10.0);
        let (ticks, _) = run_phase(&mut ch);
        assert_eq!(ticks, 179);
        assert!(ch.recording_completed());
    }
}
