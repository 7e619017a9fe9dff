use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Exam screen regions: clock bar, part content, part navigation, key hints.
pub struct ExamLayout {
    pub header: Rect,
    pub main: Rect,
    pub nav: Rect,
    pub footer: Rect,
}

impl ExamLayout {
    pub fn new(area: Rect, footer_rows: u16) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(footer_rows.max(1)),
            ])
            .split(area);

        Self {
            header: vertical[0],
            main: vertical[1],
            nav: vertical[2],
            footer: vertical[3],
        }
    }
}

/// Corner box for the later parts' preparation timer.
pub fn corner_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + area.width.saturating_sub(w + 1),
        area.y + 1.min(area.height.saturating_sub(h)),
        w,
        h,
    )
}

pub fn wrapped_line_count(text: &str, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    let chars = text.chars().count().max(1);
    chars.div_ceil(width)
}

pub fn pack_hint_lines(hints: &[&str], width: usize) -> Vec<String> {
    if width == 0 || hints.is_empty() {
        return Vec::new();
    }

    let prefix = "  ";
    let separator = "  ";
    let mut out: Vec<String> = Vec::new();
    let mut current = prefix.to_string();
    let mut has_hint = false;

    for hint in hints {
        if hint.is_empty() {
            continue;
        }
        let candidate = if has_hint {
            format!("{current}{separator}{hint}")
        } else {
            format!("{current}{hint}")
        };
        if candidate.chars().count() <= width {
            current = candidate;
            has_hint = true;
        } else {
            if has_hint {
                out.push(current);
            }
            current = format!("{prefix}{hint}");
            has_hint = true;
        }
    }

    if has_hint {
        out.push(current);
    }
    out
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    const MIN_POPUP_WIDTH: u16 = 72;
    const MIN_POPUP_HEIGHT: u16 = 18;

    let requested_w = area.width.saturating_mul(percent_x.min(100)) / 100;
    let requested_h = area.height.saturating_mul(percent_y.min(100)) / 100;

    let target_w = requested_w.max(MIN_POPUP_WIDTH).min(area.width);
    let target_h = requested_h.max(MIN_POPUP_HEIGHT).min(area.height);

    let left = area
        .x
        .saturating_add((area.width.saturating_sub(target_w)) / 2);
    let top = area
        .y
        .saturating_add((area.height.saturating_sub(target_h)) / 2);

    Rect::new(left, top, target_w, target_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_hint_lines_wraps_at_width() {
        let lines = pack_hint_lines(&["[y] Yes", "[n] No", "[Esc] Back"], 20);
        assert_eq!(lines, vec!["  [y] Yes  [n] No", "  [Esc] Back"]);
        assert!(pack_hint_lines(&[], 20).is_empty());
        assert!(pack_hint_lines(&["x"], 0).is_empty());
    }

    #[test]
    fn wrapped_line_count_rounds_up() {
        assert_eq!(wrapped_line_count("", 10), 1);
        assert_eq!(wrapped_line_count("abcdefghij", 10), 1);
        assert_eq!(wrapped_line_count("abcdefghijk", 10), 2);
        assert_eq!(wrapped_line_count("abc", 0), 0);
    }

    #[test]
    fn centered_rect_stays_inside_small_areas() {
        let area = Rect::new(0, 0, 40, 10);
        let popup = centered_rect(50, 50, area);
        assert_eq!(popup, area);

        let big = Rect::new(0, 0, 200, 60);
        let popup = centered_rect(50, 50, big);
        assert_eq!(popup.width, 100);
        assert_eq!(popup.x, 50);
    }

    #[test]
    fn exam_layout_splits_rows() {
        let layout = ExamLayout::new(Rect::new(0, 0, 100, 40), 1);
        assert_eq!(layout.header.height, 1);
        assert_eq!(layout.nav.height, 3);
        assert_eq!(layout.footer.height, 1);
        assert_eq!(layout.main.height, 35);
    }

    #[test]
    fn corner_rect_hugs_top_right() {
        let rect = corner_rect(20, 5, Rect::new(0, 0, 100, 40));
        assert_eq!(rect, Rect::new(79, 1, 20, 5));
    }
}
