use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::exam::catalog::{Catalog, PartBody, Question};
use crate::exam::navigator::PartNavigator;
use crate::exam::session::{AdvanceOutcome, ExamSession, NavigationError, SessionEvent};
use crate::exam::skill::Skill;
use crate::exam::submission::{SubmitTrigger, Submission};
use crate::store::json_store::JsonStore;
use crate::ui::text_editor::{EditResult, TextEditor};
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Lobby,
    Exam,
    Submitted,
}

/// App-level confirmations. Gate prompts live in the session itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Overlay {
    None,
    ConfirmSubmit(SubmitTrigger),
    ConfirmQuit,
}

pub struct App {
    pub screen: AppScreen,
    pub overlay: Overlay,
    pub config: Config,
    pub theme: &'static Theme,
    pub catalog: Catalog,
    pub session: Option<ExamSession>,
    pub question_cursor: usize,
    pub editor: Option<TextEditor>,
    pub editing: bool,
    pub last_submission: Option<Submission>,
    pub saved_path: Option<PathBuf>,
    pub history: Vec<Submission>,
    pub status: Option<String>,
    pub should_quit: bool,
    store: Option<JsonStore>,
}

impl App {
    pub fn new(config: Config, catalog: Catalog, theme: &'static Theme) -> Self {
        let store = match JsonStore::new(&config.results_dir) {
            Ok(store) => {
                info!(dir = %store.base_dir().display(), "results store ready");
                Some(store)
            }
            Err(err) => {
                warn!(%err, "results store unavailable, submissions will not be saved");
                None
            }
        };
        let history = store
            .as_ref()
            .map(JsonStore::load_submissions)
            .unwrap_or_default();

        Self {
            screen: AppScreen::Lobby,
            overlay: Overlay::None,
            config,
            theme,
            catalog,
            session: None,
            question_cursor: 0,
            editor: None,
            editing: false,
            last_submission: None,
            saved_path: None,
            history,
            status: None,
            should_quit: false,
            store,
        }
    }

    pub fn start_exam(&mut self) {
        let session = ExamSession::headless(self.catalog.clone(), self.config.skill_budgets());
        self.session = Some(session);
        self.screen = AppScreen::Exam;
        self.overlay = Overlay::None;
        self.status = None;
        self.sync_part();
    }

    /// Reset per-part view state after the current part changed.
    fn sync_part(&mut self) {
        self.question_cursor = 0;
        self.editing = false;
        self.editor = self.session.as_ref().and_then(|session| {
            let part = session.current_part();
            matches!(part.body, PartBody::Writing(_))
                .then(|| TextEditor::new(session.answers().text(&part.id)))
        });
    }

    pub fn on_tick(&mut self) {
        if self.screen != AppScreen::Exam {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.tick() {
            Some(SessionEvent::PartChanged(_)) => self.sync_part(),
            Some(SessionEvent::SpeakingFinished) => {
                self.status = Some("Speaking finished. Press Enter to submit.".to_string());
            }
            Some(SessionEvent::PhaseChanged(_)) | None => {}
        }
    }

    pub fn advance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let outcome = session.request_advance();
        self.apply_outcome(outcome);
    }

    pub fn continue_anyway(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let outcome = session.continue_anyway();
        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: Result<AdvanceOutcome, NavigationError>) {
        match outcome {
            Ok(AdvanceOutcome::Moved(_)) => {
                self.status = None;
                self.sync_part();
            }
            Ok(AdvanceOutcome::EndOfExam) => {
                self.overlay = Overlay::ConfirmSubmit(SubmitTrigger::EndOfExam);
            }
            Ok(AdvanceOutcome::Incomplete { .. } | AdvanceOutcome::CrossSkill { .. }) => {}
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    pub fn stay(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Err(err) = session.stay() {
            self.status = Some(err.to_string());
        }
    }

    pub fn confirm_transition(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.confirm_transition() {
            Ok(_) => {
                self.status = None;
                self.sync_part();
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    pub fn cancel_transition(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Err(err) = session.cancel_transition() {
            self.status = Some(err.to_string());
        }
    }

    /// Move to the neighbouring part of the current skill.
    pub fn jump_relative(&mut self, forward: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let nav = PartNavigator::new(session.catalog());
        let current = session.current_part();
        let target = if forward {
            if nav.is_last_of_skill(&current.id) {
                return;
            }
            nav.next_part(&current.id)
        } else {
            if nav.is_first_of_skill(&current.id) {
                return;
            }
            session
                .catalog()
                .parts_of(current.skill)
                .find(|p| p.ordinal + 1 == current.ordinal)
        };
        let Some(target) = target.map(|p| p.id.clone()) else {
            return;
        };
        match session.jump_to(&target) {
            Ok(()) => {
                self.status = None;
                self.sync_part();
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn question_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.current_part().required_question_count())
            .unwrap_or(0)
    }

    pub fn move_cursor(&mut self, down: bool) {
        let count = self.question_count();
        if count == 0 {
            return;
        }
        self.question_cursor = if down {
            (self.question_cursor + 1).min(count - 1)
        } else {
            self.question_cursor.saturating_sub(1)
        };
    }

    /// Answer the focused question with the option at `index`.
    pub fn select_option(&mut self, index: usize) {
        let cursor = self.question_cursor;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(question) = session.current_part().questions().nth(cursor) else {
            return;
        };
        if index >= question.options.len() {
            return;
        }
        let Some(label) = Question::label_for(index) else {
            return;
        };
        let id = question.id;
        session.record_objective(id, label.to_string());
        let count = session.current_part().required_question_count();
        if cursor + 1 < count {
            self.question_cursor += 1;
        }
    }

    pub fn focus_editor(&mut self) {
        if self.editor.is_some() {
            self.editing = true;
        }
    }

    pub fn edit(&mut self, key: crossterm::event::KeyEvent) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match editor.handle(key) {
            EditResult::Changed => {
                if let Some(session) = self.session.as_mut() {
                    let part = session.current_part_id().clone();
                    session.record_text(part, editor.value());
                }
            }
            EditResult::Release => self.editing = false,
            EditResult::Unchanged => {}
        }
    }

    pub fn in_speaking(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.current_skill() == Skill::Speaking)
    }

    pub fn submit(&mut self, trigger: SubmitTrigger) {
        let Some(session) = self.session.take() else {
            return;
        };
        let submission = session.submit(&self.config.candidate_name, trigger);
        self.saved_path = None;
        if let Some(store) = &self.store {
            match store.save_submission(&submission) {
                Ok(path) => self.saved_path = Some(path),
                Err(err) => {
                    error!(%err, "failed to save submission");
                    self.status = Some(format!("Could not save submission: {err}"));
                }
            }
            self.history = store.load_submissions();
        }
        self.last_submission = Some(submission);
        self.editor = None;
        self.editing = false;
        self.overlay = Overlay::None;
        self.screen = AppScreen::Submitted;
    }

    /// Leave the exam without submitting.
    pub fn abandon(&mut self) {
        if let Some(session) = self.session.take() {
            session.abandon();
        }
        info!("returned to lobby");
        self.editor = None;
        self.editing = false;
        self.overlay = Overlay::None;
        self.status = None;
        self.screen = AppScreen::Lobby;
    }

    pub fn go_to_lobby(&mut self) {
        self.screen = AppScreen::Lobby;
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::catalog::tests::small_catalog;
    use crate::exam::session::PendingPrompt;
    use crate::exam::speaking::SpeakingPhase;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tempfile::TempDir;

    fn test_app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.results_dir = dir.path().join("results").to_string_lossy().to_string();
        config.candidate_name = "Tester".to_string();
        let theme: &'static Theme = Box::leak(Box::new(Theme::default()));
        (dir, App::new(config, small_catalog(), theme))
    }

    fn current(app: &App) -> String {
        app.session
            .as_ref()
            .map(|s| s.current_part_id().to_string())
            .unwrap_or_default()
    }

    /// Advance once, accepting whichever prompt the gates raise.
    fn push_through(app: &mut App) {
        app.advance();
        let pending = app.session.as_ref().and_then(|s| s.pending().cloned());
        if let Some(PendingPrompt::Incomplete { .. }) = pending {
            app.continue_anyway();
        }
        if app.session.as_ref().is_some_and(|s| s.pending().is_some()) {
            app.confirm_transition();
        }
    }

    #[test]
    fn selecting_options_records_and_moves_cursor() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        app.select_option(2);
        assert_eq!(app.question_cursor, 1);
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.answers().objective(1), Some("C"));

        // Out-of-range option is ignored
        app.select_option(7);
        assert_eq!(app.session.as_ref().unwrap().answers().objective(2), None);
    }

    #[test]
    fn advancing_incomplete_part_opens_prompt() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        app.advance();
        assert!(app.session.as_ref().unwrap().pending().is_some());
        app.stay();
        assert!(app.session.as_ref().unwrap().pending().is_none());
        app.advance();
        app.continue_anyway();
        assert_eq!(current(&app), "L2");
    }

    #[test]
    fn jump_relative_stays_inside_skill() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        app.jump_relative(true);
        assert_eq!(current(&app), "L2");
        app.jump_relative(true);
        assert_eq!(current(&app), "L2");
        app.jump_relative(false);
        assert_eq!(current(&app), "L1");
        app.jump_relative(false);
        assert_eq!(current(&app), "L1");
        assert!(app.status.is_none());
    }

    #[test]
    fn editor_writes_through_to_answers() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        // Skip to writing
        for _ in 0..4 {
            push_through(&mut app);
        }
        assert_eq!(current(&app), "W1");
        assert!(app.editor.is_some());
        app.focus_editor();
        for ch in "Dear Jane".chars() {
            app.edit(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.answers().text(&"W1".into()), "Dear Jane");
        app.edit(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.editing);
    }

    #[test]
    fn submit_saves_and_shows_summary() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        app.select_option(0);
        app.submit(SubmitTrigger::Explicit);
        assert_eq!(app.screen, AppScreen::Submitted);
        assert!(app.session.is_none());
        assert!(app.saved_path.as_ref().is_some_and(|p| p.exists()));
        assert_eq!(app.history.len(), 1);
        assert_eq!(app.last_submission.as_ref().unwrap().candidate, "Tester");
    }

    #[test]
    fn abandon_returns_to_lobby_without_saving() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        app.abandon();
        assert_eq!(app.screen, AppScreen::Lobby);
        assert!(app.session.is_none());
        assert!(app.history.is_empty());
    }

    #[test]
    fn stay_without_prompt_reports_status() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        app.stay();
        assert!(app.status.is_some());

        app.status = None;
        app.cancel_transition();
        assert!(app.status.is_some());
        assert_eq!(current(&app), "L1");
    }

    #[test]
    fn end_of_exam_asks_before_submitting() {
        let (_dir, mut app) = test_app();
        app.start_exam();
        while !app.in_speaking() {
            push_through(&mut app);
        }

        // Enter during the last part's countdown does nothing but explain
        while current(&app) != "S3" {
            app.on_tick();
        }
        for _ in 0..20 {
            app.on_tick();
        }
        app.advance();
        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(app.screen, AppScreen::Exam);
        assert!(app.status.is_some());

        while app.session.as_ref().unwrap().speaking().phase() != SpeakingPhase::Done {
            app.on_tick();
        }
        app.advance();
        assert_eq!(app.overlay, Overlay::ConfirmSubmit(SubmitTrigger::EndOfExam));
        assert_eq!(app.screen, AppScreen::Exam);
        assert!(app.session.is_some());
        assert!(app.history.is_empty());

        app.submit(SubmitTrigger::EndOfExam);
        assert_eq!(app.screen, AppScreen::Submitted);
        assert_eq!(
            app.last_submission.as_ref().unwrap().trigger,
            SubmitTrigger::EndOfExam
        );
    }
}
