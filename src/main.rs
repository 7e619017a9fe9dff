mod app;
mod config;
mod event;
mod exam;
mod store;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use app::{App, AppScreen, Overlay};
use config::Config;
use event::{AppEvent, EventHandler};
use exam::catalog::{BUNDLED_CATALOG, Catalog, PartBody};
use exam::session::{ExamSession, PendingPrompt};
use exam::skill::Skill;
use exam::speaking::SpeakingPhase;
use exam::submission::SubmitTrigger;
use exam::timer::format_clock;
use ui::components::modal::Modal;
use ui::components::part_nav::PartNav;
use ui::components::question_list::QuestionList;
use ui::components::skill_header::SkillHeader;
use ui::components::speaking_panel::SpeakingPanel;
use ui::components::writing_panel::WritingPanel;
use ui::layout::{ExamLayout, centered_rect, corner_rect, pack_hint_lines};
use ui::theme::Theme;

#[derive(Parser)]
#[command(name = "examroom", version, about = "Timed four-skill language exam in the terminal")]
struct Cli {
    #[arg(short, long, help = "Path to an exam catalog (JSON)")]
    catalog: Option<String>,

    #[arg(long, help = "Candidate name recorded with the submission")]
    candidate: Option<String>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "Milliseconds per exam second")]
    tick_millis: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_err) = match Config::load() {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };
    if let Some(catalog) = cli.catalog {
        config.catalog_path = Some(catalog);
    }
    if let Some(candidate) = cli.candidate {
        config.candidate_name = candidate;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(tick_millis) = cli.tick_millis {
        config.tick_millis = tick_millis;
    }
    config.validate();

    init_logging(&config.log_file)?;
    if let Some(err) = config_err {
        warn!(%err, "config unreadable, using defaults");
    }

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(Path::new(path))
            .with_context(|| format!("failed to load catalog {path}"))?,
        None => Catalog::bundled(BUNDLED_CATALOG).context("bundled catalog is invalid")?,
    };
    info!(title = %catalog.title, parts = catalog.parts().len(), "catalog loaded");

    let theme = Theme::load(&config.theme).unwrap_or_else(|| {
        warn!(
            theme = %config.theme,
            available = ?Theme::available_themes(),
            "unknown theme, using default"
        );
        Theme::default()
    });
    let theme: &'static Theme = Box::leak(Box::new(theme));
    let tick_rate = Duration::from_millis(config.tick_millis);
    let mut app = App::new(config, catalog, theme);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(tick_rate);

    let result = run_app(&mut terminal, &mut app, &events);

    // Capture and clocks must not outlive the terminal session.
    if app.session.is_some() {
        app.abandon();
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn init_logging(log_file: &str) -> Result<()> {
    let path = Path::new(log_file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {log_file}"))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "examroom=info".into()))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize(_, _) => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        if app.session.is_some() {
            app.abandon();
        }
        app.should_quit = true;
        return;
    }

    match app.screen {
        AppScreen::Lobby => handle_lobby_key(app, key),
        AppScreen::Exam => handle_exam_key(app, key),
        AppScreen::Submitted => handle_submitted_key(app, key),
    }
}

fn handle_lobby_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char('s') => app.start_exam(),
        _ => {}
    }
}

fn handle_submitted_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Enter | KeyCode::Esc => app.go_to_lobby(),
        _ => {}
    }
}

fn handle_exam_key(app: &mut App, key: KeyEvent) {
    // Gate prompts take priority over everything else
    let pending = app.session.as_ref().and_then(|s| s.pending().cloned());
    match pending {
        Some(PendingPrompt::Incomplete { .. }) => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('c') | KeyCode::Enter => app.continue_anyway(),
                KeyCode::Char('n') | KeyCode::Char('s') | KeyCode::Esc => app.stay(),
                _ => {}
            }
            return;
        }
        Some(PendingPrompt::CrossSkill { .. }) => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => app.confirm_transition(),
                KeyCode::Char('n') | KeyCode::Esc => app.cancel_transition(),
                _ => {}
            }
            return;
        }
        None => {}
    }

    match app.overlay {
        Overlay::ConfirmSubmit(trigger) => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => app.submit(trigger),
                KeyCode::Char('n') | KeyCode::Esc => app.overlay = Overlay::None,
                _ => {}
            }
            return;
        }
        Overlay::ConfirmQuit => {
            match key.code {
                KeyCode::Char('y') => app.abandon(),
                KeyCode::Char('n') | KeyCode::Esc => app.overlay = Overlay::None,
                _ => {}
            }
            return;
        }
        Overlay::None => {}
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('s') {
        app.overlay = Overlay::ConfirmSubmit(SubmitTrigger::Explicit);
        return;
    }

    if app.editing {
        if ctrl && key.code == KeyCode::Char('n') {
            app.advance();
        } else {
            app.edit(key);
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.overlay = Overlay::ConfirmQuit;
            return;
        }
        KeyCode::Enter => {
            app.advance();
            return;
        }
        _ => {}
    }

    // The speaking sequence runs by itself
    if app.in_speaking() {
        return;
    }

    match key.code {
        KeyCode::Char('n') => app.advance(),
        KeyCode::Char(']') => app.jump_relative(true),
        KeyCode::Char('[') => app.jump_relative(false),
        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(true),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(false),
        KeyCode::Char('i') | KeyCode::Tab => app.focus_editor(),
        KeyCode::Char(ch @ 'a'..='h') => app.select_option(ch as usize - 'a' as usize),
        KeyCode::Char(ch @ '1'..='8') => app.select_option(ch as usize - '1' as usize),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::Lobby => render_lobby(frame, app),
        AppScreen::Exam => render_exam(frame, app),
        AppScreen::Submitted => render_submitted(frame, app),
    }
}

fn render_title_bar(frame: &mut ratatui::Frame, app: &App, area: Rect, info: &str) {
    let colors = &app.theme.colors;
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " examroom ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            info,
            Style::default().fg(colors.text_muted()).bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut ratatui::Frame, app: &App, area: Rect, hints: &[String]) {
    let colors = &app.theme.colors;
    let mut lines: Vec<Line> = Vec::new();
    if let Some(status) = &app.status {
        lines.push(Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(colors.warning()),
        )));
    }
    for hint in hints {
        lines.push(Line::from(Span::styled(
            hint.as_str(),
            Style::default().fg(colors.text_muted()),
        )));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_lobby(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_title_bar(
        frame,
        app,
        layout[0],
        &format!(" Candidate: {}", app.config.candidate_name),
    );

    let centered = centered_rect(60, 80, layout[1]);
    let block = Block::bordered()
        .title(" Exam room ")
        .border_style(Style::default().fg(colors.accent()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(centered);
    block.render(centered, frame.buffer_mut());

    let catalog = &app.catalog;
    let budgets = app.config.skill_budgets();
    let mut lines = vec![
        Line::from(Span::styled(
            catalog.title.as_str(),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(directions) = &catalog.directions {
        lines.push(Line::from(Span::styled(
            directions.as_str(),
            Style::default().fg(colors.fg()),
        )));
        lines.push(Line::from(""));
    }
    for skill in catalog.skills() {
        let parts = catalog.parts_of(skill).count();
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<10}", skill.display_name()),
                Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    "{parts} part{}  {}",
                    if parts == 1 { "" } else { "s" },
                    format_clock(budgets.budget(skill))
                ),
                Style::default().fg(colors.text_muted()),
            ),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Once you leave a skill you cannot return to it.",
        Style::default().fg(colors.warning()),
    )));

    if !app.history.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Previous submissions",
            Style::default().fg(colors.accent()),
        )));
        for submission in app.history.iter().take(5) {
            lines.push(Line::from(Span::styled(
                format!(
                    "  {}  {:<16} {}/{} answered",
                    submission.submitted_at.format("%Y-%m-%d %H:%M"),
                    submission.candidate,
                    submission.answered_total,
                    submission.total_answerable,
                ),
                Style::default().fg(colors.text_muted()),
            )));
        }
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(inner, frame.buffer_mut());

    let hints = ["[Enter] Start exam", "[q] Quit"];
    let footer = pack_hint_lines(&hints, layout[2].width as usize);
    render_footer(frame, app, layout[2], &footer);
}

fn exam_hints(app: &App, session: &ExamSession) -> Vec<&'static str> {
    if app.editing {
        return vec!["[Esc] Stop writing", "[Ctrl+N] Next part", "[Ctrl+S] Submit"];
    }
    let part = session.current_part();
    match &part.body {
        PartBody::Objective(_) => vec![
            "[j/k] Question",
            "[a-h] Answer",
            "[Enter] Next part",
            "[ [ ] ] Part",
            "[Ctrl+S] Submit",
            "[q] Quit",
        ],
        PartBody::Writing(_) => vec![
            "[i] Write",
            "[Enter] Next part",
            "[ [ ] ] Part",
            "[Ctrl+S] Submit",
            "[q] Quit",
        ],
        PartBody::Speaking(_)
            if session.is_last_part() && session.speaking().phase() == SpeakingPhase::Done =>
        {
            vec!["[Enter] Submit", "[Ctrl+S] Submit", "[q] Quit"]
        }
        PartBody::Speaking(_) => vec!["[Ctrl+S] Submit", "[q] Quit"],
    }
}

fn render_exam(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let Some(session) = app.session.as_ref() else {
        return;
    };
    let snapshot = session.snapshot();
    let part = session.current_part();

    let hints = exam_hints(app, session);
    let hint_lines = pack_hint_lines(&hints, area.width as usize);
    let footer_rows = hint_lines.len() as u16 + u16::from(app.status.is_some());
    let layout = ExamLayout::new(area, footer_rows);

    frame.render_widget(
        SkillHeader::new(&session.catalog().title, &snapshot, app.theme),
        layout.header,
    );

    match &part.body {
        PartBody::Objective(_) => frame.render_widget(
            QuestionList::new(part, session.answers(), app.question_cursor, app.theme),
            layout.main,
        ),
        PartBody::Writing(_) => {
            if let Some(editor) = &app.editor {
                frame.render_widget(
                    WritingPanel::new(part, editor, app.editing, app.theme),
                    layout.main,
                );
            }
        }
        PartBody::Speaking(_) => frame.render_widget(
            SpeakingPanel::new(part, session.speaking(), app.theme),
            layout.main,
        ),
    }

    frame.render_widget(PartNav::new(&snapshot, app.theme), layout.nav);
    render_footer(frame, app, layout.footer, &hint_lines);

    render_speaking_overlays(frame, app, session, &layout);

    if let Some(pending) = &snapshot.pending {
        render_prompt(frame, app, pending);
    }

    match app.overlay {
        Overlay::ConfirmSubmit(_) => {
            let modal = Modal::new("Submit exam", app.theme)
                .line(format!(
                    "{} of {} answered.",
                    snapshot.answered_total, snapshot.total_answerable
                ))
                .line("Submitting ends the exam for every skill.")
                .hints(&["[y] Submit", "[n] Keep working"]);
            frame.render_widget(modal, centered_rect(50, 30, area));
        }
        Overlay::ConfirmQuit => {
            let modal = Modal::new("Leave exam", app.theme)
                .line("Your answers will not be saved.")
                .hints(&["[y] Leave", "[n] Stay"])
                .accent(app.theme.colors.error());
            frame.render_widget(modal, centered_rect(50, 30, area));
        }
        Overlay::None => {}
    }
}

fn render_prompt(frame: &mut ratatui::Frame, app: &App, pending: &PendingPrompt) {
    let area = centered_rect(50, 30, frame.area());
    let modal = match pending {
        PendingPrompt::Incomplete { answered, required } => {
            Modal::new("Unanswered questions", app.theme)
                .line(format!(
                    "You have answered {answered} of {required} questions in this part."
                ))
                .hints(&["[y] Continue anyway", "[n] Stay"])
                .accent(app.theme.colors.warning())
        }
        PendingPrompt::CrossSkill { from, to, .. } => Modal::new("Next skill", app.theme)
            .line(format!("Finish {from} and start {to}?"))
            .line(format!("You cannot return to {from} afterwards."))
            .hints(&["[y] Continue", "[n] Stay"])
            .accent(app.theme.colors.warning()),
    };
    frame.render_widget(modal, area);
}

fn render_speaking_overlays(
    frame: &mut ratatui::Frame,
    app: &App,
    session: &ExamSession,
    layout: &ExamLayout,
) {
    if session.current_skill() != Skill::Speaking {
        return;
    }
    let colors = &app.theme.colors;
    let speaking = session.speaking();
    let phase = speaking.phase();
    let area = frame.area();

    if let SpeakingPhase::Preparing(cd) = phase {
        let modal = Modal::new("Speaking test", app.theme)
            .line("Put on your headset and check your microphone.")
            .line(format!("The first part starts in {}.", format_clock(cd.remaining())));
        frame.render_widget(modal, centered_rect(50, 30, area));
    } else if speaking.shows_countdown_modal() {
        let remaining = phase.countdown().map(|cd| cd.remaining()).unwrap_or(0);
        let modal = Modal::new("Get ready", app.theme)
            .line("Recording starts in")
            .line(remaining.to_string())
            .accent(colors.recording());
        frame.render_widget(modal, centered_rect(30, 25, area));
    } else if speaking.shows_corner_timer() {
        let remaining = phase.countdown().map(|cd| cd.remaining()).unwrap_or(0);
        let rect = corner_rect(24, 3, layout.main);
        let timer = Paragraph::new(Line::from(Span::styled(
            format_clock(remaining),
            Style::default()
                .fg(colors.warning())
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::bordered()
                .title(" Preparation ")
                .border_style(Style::default().fg(colors.warning()))
                .style(Style::default().bg(colors.bg())),
        );
        frame.render_widget(ratatui::widgets::Clear, rect);
        frame.render_widget(timer, rect);
    } else if speaking.shows_advance_notice() {
        let modal = Modal::new("Recording saved", app.theme)
            .line("Moving to the next part...")
            .accent(colors.success());
        frame.render_widget(modal, centered_rect(40, 25, area));
    }
}

fn render_submitted(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    render_title_bar(frame, app, layout[0], " Submitted");

    let Some(submission) = &app.last_submission else {
        return;
    };

    let centered = centered_rect(60, 80, layout[1]);
    let block = Block::bordered()
        .title(" Submission ")
        .border_style(Style::default().fg(colors.success()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(centered);
    block.render(centered, frame.buffer_mut());

    let label = Style::default().fg(colors.text_muted());
    let value = Style::default().fg(colors.fg());
    let trigger = match submission.trigger {
        SubmitTrigger::Explicit => "submitted by candidate",
        SubmitTrigger::EndOfExam => "end of exam",
    };
    let mut lines = vec![
        Line::from(Span::styled(
            submission.exam_title.as_str(),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Candidate   ", label),
            Span::styled(submission.candidate.as_str(), value),
        ]),
        Line::from(vec![
            Span::styled("  Submitted   ", label),
            Span::styled(
                format!(
                    "{} ({trigger})",
                    submission.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                value,
            ),
        ]),
        Line::from(vec![
            Span::styled("  Answered    ", label),
            Span::styled(
                format!(
                    "{} of {}",
                    submission.answered_total, submission.total_answerable
                ),
                value,
            ),
        ]),
        Line::from(vec![
            Span::styled("  Time used   ", label),
            Span::styled(format_clock(submission.total_elapsed_secs()), value),
        ]),
        Line::from(""),
    ];

    for (skill, elapsed) in &submission.elapsed_secs {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<12}", skill.display_name()), label),
            Span::styled(format_clock(*elapsed), value),
        ]));
    }
    if !submission.completed_skills.is_empty() {
        let closed: Vec<&str> = submission
            .completed_skills
            .iter()
            .map(Skill::display_name)
            .collect();
        lines.push(Line::from(vec![
            Span::styled("  Closed      ", label),
            Span::styled(closed.join(", "), value),
        ]));
    }

    if !submission.writing.is_empty() {
        lines.push(Line::from(""));
        for (part, response) in &submission.writing {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<12}", part.as_str()), label),
                Span::styled(format!("{} words", response.word_count), value),
            ]));
        }
    }

    lines.push(Line::from(""));
    match &app.saved_path {
        Some(path) => lines.push(Line::from(Span::styled(
            format!("  Saved to {}", path.display()),
            Style::default().fg(colors.success()),
        ))),
        None => lines.push(Line::from(Span::styled(
            "  Submission was not saved.",
            Style::default().fg(colors.error()),
        ))),
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(inner, frame.buffer_mut());

    let hints = ["[Enter] Back to lobby", "[q] Quit"];
    let footer = pack_hint_lines(&hints, layout[2].width as usize);
    render_footer(frame, app, layout[2], &footer);
}
