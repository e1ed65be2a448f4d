#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Tabs, Wrap,
};
use time::Date;

use crate::config::{Config, StartTab};
use crate::core::calendar;
use crate::core::status::{self, DayStatus, DayView};
use crate::store::{CompletionLog, CompletionStore};
use crate::tui::{self, TerminalGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabId {
    Day,
    Calendar,
}

impl TabId {
    const ALL: [TabId; 2] = [TabId::Day, TabId::Calendar];

    fn title(self) -> &'static str {
        match self {
            TabId::Day => "Day",
            TabId::Calendar => "Calendar",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

#[derive(Debug)]
struct Toast {
    text: String,
    until: Instant,
}

impl Toast {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            until: Instant::now() + Duration::from_secs(3),
        }
    }
}

#[derive(Debug)]
struct AppState {
    icons: bool,
    tab: TabId,
    today: Date,
    /// Date shown on the Day tab.
    selected: Date,
    /// Highlighted cell on the Calendar tab.
    cursor: Date,
    log: CompletionLog,
    list_state: ListState,
    show_help: bool,
    last_error: Option<String>,
    toast: Option<Toast>,
    should_quit: bool,
}

impl AppState {
    fn new(cfg: &Config, today: Date, log: CompletionLog) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            icons: cfg.ui.icons,
            tab: match cfg.ui.start_tab {
                StartTab::Day => TabId::Day,
                StartTab::Calendar => TabId::Calendar,
            },
            today,
            selected: today,
            cursor: today,
            log,
            list_state,
            show_help: false,
            last_error: None,
            toast: None,
            should_quit: false,
        }
    }

    fn day_view(&self) -> DayView {
        status::day_view(&self.log, self.selected, self.today)
    }

    fn selected_index(&self) -> usize {
        self.list_state.selected().unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        let len = self.day_view().tasks.len();
        let idx = self.selected_index().min(len.saturating_sub(1));
        self.list_state.select(Some(idx));
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.day_view().tasks.len();
        if len == 0 {
            return;
        }
        let cur = i64::try_from(self.selected_index()).unwrap_or(0);
        let max = i64::try_from(len - 1).unwrap_or(0);
        let next = usize::try_from((cur + delta).clamp(0, max)).unwrap_or(0);
        self.list_state.select(Some(next));
    }

    fn set_selected(&mut self, date: Date) {
        self.selected = date;
        self.clamp_selection();
    }

    fn switch_to(&mut self, tab: TabId) {
        if tab == TabId::Calendar && self.tab != TabId::Calendar {
            self.cursor = self.selected;
        }
        self.tab = tab;
    }
}

pub fn run(cfg: &Config, store: &mut dyn CompletionStore) -> anyhow::Result<()> {
    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);

    let mut app = AppState::new(cfg, calendar::today(), store.load());

    loop {
        if let Some(toast) = &app.toast
            && Instant::now() >= toast.until
        {
            app.toast = None;
        }

        {
            let Some(terminal) = guard.terminal() else {
                anyhow::bail!("terminal unavailable");
            };
            terminal.draw(|f| draw(f, &mut app))?;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(250))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            refresh(&mut app, store);
            handle_key(key, &mut app, store);
        }
    }

    Ok(())
}

/// Every interaction starts from the persisted log.
fn refresh(app: &mut AppState, store: &dyn CompletionStore) {
    app.log = store.load();
    app.today = calendar::today();
    app.clamp_selection();
}

fn handle_key(key: KeyEvent, app: &mut AppState, store: &mut dyn CompletionStore) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.should_quit = true;
        return;
    }

    if app.show_help {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?' | 'q')
        ) {
            app.show_help = false;
        }
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Tab | KeyCode::BackTab => app.switch_to(app.tab.next()),
        KeyCode::Char('1') => app.switch_to(TabId::Day),
        KeyCode::Char('2') => app.switch_to(TabId::Calendar),
        KeyCode::Char('t') => {
            app.cursor = app.today;
            app.set_selected(app.today);
        }
        _ => match app.tab {
            TabId::Day => handle_day_key(key, app, store),
            TabId::Calendar => handle_calendar_key(key, app),
        },
    }
}

fn handle_day_key(key: KeyEvent, app: &mut AppState, store: &mut dyn CompletionStore) {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => {
            if let Some(d) = app.selected.previous_day() {
                app.set_selected(d);
            }
        }
        KeyCode::Right | KeyCode::Char('l') => {
            if let Some(d) = app.selected.next_day() {
                app.set_selected(d);
            }
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Char(' ' | 'x') | KeyCode::Enter => toggle_selected(app, store),
        _ => {}
    }
}

fn handle_calendar_key(key: KeyEvent, app: &mut AppState) {
    let shifted = match key.code {
        KeyCode::Left | KeyCode::Char('h') => app.cursor.previous_day(),
        KeyCode::Right | KeyCode::Char('l') => app.cursor.next_day(),
        KeyCode::Up | KeyCode::Char('k') => app.cursor.checked_sub(time::Duration::days(7)),
        KeyCode::Down | KeyCode::Char('j') => app.cursor.checked_add(time::Duration::days(7)),
        KeyCode::Char('[') | KeyCode::PageUp => {
            Some(calendar::shift_date_by_months(app.cursor, -1))
        }
        KeyCode::Char(']') | KeyCode::PageDown => {
            Some(calendar::shift_date_by_months(app.cursor, 1))
        }
        KeyCode::Enter => {
            app.set_selected(app.cursor);
            app.tab = TabId::Day;
            None
        }
        _ => None,
    };
    if let Some(d) = shifted {
        app.cursor = d;
    }
}

fn toggle_selected(app: &mut AppState, store: &mut dyn CompletionStore) {
    let view = app.day_view();
    let Some(task) = view.tasks.get(app.selected_index()) else {
        return;
    };
    let done = !task.done;
    match store.upsert(app.selected, task.name, done) {
        Ok(_) => {
            app.last_error = None;
            app.toast = Some(Toast::new(format!(
                "{} marked {} for {}",
                task.name,
                if done { "done" } else { "not done" },
                calendar::format_date(app.selected)
            )));
        }
        Err(e) => app.last_error = Some(format!("{e:#}")),
    }
    app.log = store.load();
}

fn draw(f: &mut Frame<'_>, app: &mut AppState) {
    let area = f.area();
    let outer = Block::default().title("treatlog").borders(Borders::ALL);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(inner);

    draw_tabs(f, chunks[0], app);
    match app.tab {
        TabId::Day => draw_day_tab(f, chunks[1], app),
        TabId::Calendar => draw_calendar_tab(f, chunks[1], app),
    }
    draw_footer(f, chunks[2], app);

    if app.show_help {
        draw_help_popup(f);
    }
}

fn draw_tabs(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let titles: Vec<Line> = TabId::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| Line::from(format!("{} [{}]", t.title(), i + 1)))
        .collect();
    let selected = TabId::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" | ");
    f.render_widget(tabs, chunks[0]);

    let today = Paragraph::new(Line::from(format!(
        "Today: {}",
        calendar::format_date(app.today)
    )))
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Right);
    f.render_widget(today, chunks[1]);
}

fn status_style(s: DayStatus) -> Style {
    match s {
        DayStatus::Complete => Style::default().fg(Color::Green),
        DayStatus::Partial => Style::default().fg(Color::Yellow),
        DayStatus::NoneDonePast => Style::default().fg(Color::Red),
        DayStatus::NoneDoneUpcoming | DayStatus::Empty => Style::default().fg(Color::Gray),
    }
}

fn draw_day_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let view = app.day_view();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(area);

    let mut title = vec![Span::styled(
        format!("{} {}", view.date().weekday(), calendar::format_date(view.date())),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if view.date() == app.today {
        title.push(Span::styled(" (today)", Style::default().fg(Color::LightBlue)));
    }
    let header = vec![
        Line::from(title),
        Line::from(vec![
            Span::styled("Workout: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(view.workout()),
        ]),
        Line::from(vec![Span::styled(
            format!(
                "{} {} ({}/{})",
                view.status.symbol(app.icons),
                view.status.label(),
                view.done,
                view.tasks.len()
            ),
            status_style(view.status),
        )]),
    ];
    let header = Paragraph::new(header).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = view
        .tasks
        .iter()
        .map(|t| {
            let (mark, mark_style) = if t.done {
                ("[x] ", Style::default().fg(Color::Green))
            } else {
                ("[ ] ", Style::default())
            };
            ListItem::new(Line::from(vec![
                Span::styled(mark, mark_style),
                Span::styled(
                    format!("{:<10}", t.name),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(t.description, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Treatments"))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">");
    f.render_stateful_widget(list, chunks[1], &mut app.list_state);
}

fn draw_calendar_tab(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let (year, month) = (app.cursor.year(), app.cursor.month());
    let days = status::month_view(&app.log, year, month, app.today);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(4)])
        .split(area);

    let header = Row::new(calendar::WEEKDAY_HEADERS.to_vec())
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = calendar::month_grid(year, month).into_iter().map(|week| {
        Row::new(week.map(|cell| {
            let Some(date) = cell else {
                return Cell::from("");
            };
            let status = days
                .iter()
                .find(|d| d.date == date)
                .map_or(DayStatus::Empty, |d| d.status);
            let mut style = status_style(status);
            if date == app.today {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            if date == app.cursor {
                style = style.fg(Color::Black).bg(Color::Cyan);
            }
            Cell::from(format!("{:>2} {}", date.day(), status.symbol(app.icons))).style(style)
        }))
    });

    let table = Table::new(rows, [Constraint::Length(6); 7])
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{month} {year}")),
        );
    f.render_widget(table, chunks[0]);

    let mut lines = Vec::new();
    if let Some(d) = days.iter().find(|d| d.date == app.cursor) {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", calendar::format_date(d.date)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    "{} {} ({}/{})",
                    d.status.symbol(app.icons),
                    d.status.label(),
                    d.done,
                    d.theoretical
                ),
                status_style(d.status),
            ),
        ]));
    }
    let legend: Vec<String> = DayStatus::ALL
        .iter()
        .map(|s| format!("{} {}", s.symbol(app.icons), s.label()))
        .collect();
    lines.push(Line::from(Span::styled(
        legend.join("  "),
        Style::default().fg(Color::DarkGray),
    )));
    let detail = Paragraph::new(lines)
        .block(Block::default().borders(Borders::TOP))
        .wrap(Wrap { trim: true });
    f.render_widget(detail, chunks[1]);
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let line = if let Some(err) = &app.last_error {
        Line::from(Span::styled(
            format!("Error: {err}"),
            Style::default().fg(Color::Red),
        ))
    } else if let Some(toast) = &app.toast {
        Line::from(Span::styled(
            toast.text.as_str(),
            Style::default().fg(Color::Green),
        ))
    } else {
        let keys = match app.tab {
            TabId::Day => "←/→ day • j/k move • Space toggle • t today • Tab calendar • ? help • q quit",
            TabId::Calendar => "h/j/k/l move • [/] month • Enter open day • t today • Tab day • q quit",
        };
        Line::from(Span::styled(keys, Style::default().fg(Color::DarkGray)))
    };
    let p = Paragraph::new(line).wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn draw_help_popup(f: &mut Frame<'_>) {
    let popup_area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, popup_area);
    let lines = vec![
        Line::from("Keys:"),
        Line::from("  Tab, 1, 2      Switch tab"),
        Line::from("  t              Jump to today"),
        Line::from(""),
        Line::from("Day:"),
        Line::from("  ←/→, h/l       Previous / next day"),
        Line::from("  ↑/↓, j/k       Move"),
        Line::from("  Space, Enter   Toggle treatment"),
        Line::from(""),
        Line::from("Calendar:"),
        Line::from("  h/j/k/l        Move day / week"),
        Line::from("  [ ], PgUp/PgDn Previous / next month"),
        Line::from("  Enter          Open day"),
        Line::from(""),
        Line::from("  ?, Esc         Close help"),
    ];
    let popup = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use time::macros::date;

    use super::*;
    use crate::store::UpsertOutcome;

    const WED: Date = date!(2024 - 03 - 06);

    #[derive(Default)]
    struct MemStore {
        log: CompletionLog,
        fail: bool,
    }

    impl CompletionStore for MemStore {
        fn load(&self) -> CompletionLog {
            self.log.clone()
        }

        fn upsert(&mut self, date: Date, task: &str, done: bool) -> anyhow::Result<UpsertOutcome> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            Ok(self.log.upsert(date, task, done))
        }
    }

    fn app_on(date: Date) -> AppState {
        let mut cfg = Config::default();
        cfg.ui.icons = false;
        AppState::new(&cfg, date, CompletionLog::new())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen(app: &mut AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal.draw(|f| draw(f, app)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn space_toggles_highlighted_treatment() {
        let mut store = MemStore::default();
        let mut app = app_on(WED);

        handle_key(press(KeyCode::Down), &mut app, &mut store);
        handle_key(press(KeyCode::Char(' ')), &mut app, &mut store);
        assert!(store.log.is_done(WED, "Shoulder"));
        assert!(app.log.is_done(WED, "Shoulder"));
        assert!(app.toast.is_some());

        handle_key(press(KeyCode::Char(' ')), &mut app, &mut store);
        assert!(!store.log.is_done(WED, "Shoulder"));
        assert_eq!(store.log.len(), 1);
    }

    #[test]
    fn write_failure_is_reported_not_fatal() {
        let mut store = MemStore {
            fail: true,
            ..MemStore::default()
        };
        let mut app = app_on(WED);
        handle_key(press(KeyCode::Enter), &mut app, &mut store);
        assert!(app.last_error.as_deref().is_some_and(|e| e.contains("disk full")));
        assert!(!app.should_quit);
    }

    #[test]
    fn day_navigation_keeps_selection_in_range() {
        let mut store = MemStore::default();
        let mut app = app_on(date!(2024 - 03 - 08));
        // Friday has four treatments; move to the last one.
        for _ in 0..5 {
            handle_key(press(KeyCode::Down), &mut app, &mut store);
        }
        assert_eq!(app.selected_index(), 3);
        // Saturday has two.
        handle_key(press(KeyCode::Right), &mut app, &mut store);
        assert_eq!(app.selected, date!(2024 - 03 - 09));
        assert_eq!(app.selected_index(), 1);
    }

    #[test]
    fn calendar_enter_opens_the_day() {
        let mut store = MemStore::default();
        let mut app = app_on(WED);
        handle_key(press(KeyCode::Tab), &mut app, &mut store);
        assert_eq!(app.tab, TabId::Calendar);
        handle_key(press(KeyCode::Char('j')), &mut app, &mut store);
        handle_key(press(KeyCode::Char(']')), &mut app, &mut store);
        assert_eq!(app.cursor, date!(2024 - 04 - 13));
        handle_key(press(KeyCode::Enter), &mut app, &mut store);
        assert_eq!(app.tab, TabId::Day);
        assert_eq!(app.selected, date!(2024 - 04 - 13));
    }

    #[test]
    fn renders_day_and_calendar() {
        let mut app = app_on(WED);
        app.log.upsert(WED, "Elbows", true);
        app.log.upsert(WED, "Shoulder", true);

        let day = screen(&mut app);
        assert!(day.contains("Shoulder-prevention day"));
        assert!(day.contains("~ partial (2/3)"));
        assert!(day.contains("[x] Elbows"));

        app.switch_to(TabId::Calendar);
        let cal = screen(&mut app);
        assert!(cal.contains("March 2024"));
        assert!(cal.contains(" 6 ~"));
        assert!(cal.contains(" 5 x"));
    }

    #[test]
    fn q_quits_and_help_swallows_keys() {
        let mut store = MemStore::default();
        let mut app = app_on(WED);
        handle_key(press(KeyCode::Char('?')), &mut app, &mut store);
        assert!(app.show_help);
        handle_key(press(KeyCode::Char('q')), &mut app, &mut store);
        assert!(!app.should_quit);
        assert!(!app.show_help);
        handle_key(press(KeyCode::Char('q')), &mut app, &mut store);
        assert!(app.should_quit);
    }
}
