//! Kanban board over the displayed period.
//!
//! Tasks of the current day, week or month are laid out in three columns by
//! status and ordered by priority. Moving a card between columns changes its
//! status; the period can be stepped, switched and reset to today.

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tracing::debug;

use crate::cmd::schedule_for;
use crate::db::{format_date_relative, format_priority, format_status, truncate, TaskStore};
use crate::error::StoreError;
use crate::fields::{PlannerKind, Status, ViewMode};
use crate::period::{self, Period};
use crate::rollover::{has_overdue, roll_forward_week, rollover_overdue};
use crate::sort::order_by_priority;
use crate::storage::Storage;
use crate::task::{Task, TaskDraft, TaskId};
use crate::tui::colors::{priority_color, status_color, status_text_color};
use crate::tui::input::InputField;
use crate::view::{self, Progress};

const CARD_HEIGHT: usize = 5;

pub struct BoardApp<'a, S: Storage> {
    store: &'a mut TaskStore<S>,
    anchor: NaiveDate,
    mode: ViewMode,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; 3],
    status_message: String,
    show_task_detail: bool,
    quick_add: Option<InputField>,
    columns: [Vec<TaskId>; 3],
}

impl<'a, S: Storage> BoardApp<'a, S> {
    pub fn new(store: &'a mut TaskStore<S>, anchor: NaiveDate) -> Self {
        let mode = store.view_mode();
        let mut app = BoardApp {
            store,
            anchor,
            mode,
            selected_column: 0,
            selected_card: 0,
            column_scroll_offsets: [0; 3],
            status_message: String::new(),
            show_task_detail: false,
            quick_add: None,
            columns: Default::default(),
        };
        app.update_columns();
        app
    }

    fn today(&self) -> NaiveDate {
        self.store.now().with_timezone(&Local).date_naive()
    }

    fn period(&self) -> Period {
        Period::containing(self.anchor, self.mode)
    }

    /// Rebuild the columns from the store's projection of the current period.
    fn update_columns(&mut self) {
        let projected = view::project(self.store.list(), self.anchor, self.mode);
        let ordered = order_by_priority(&projected);
        let grouped = view::by_status(&ordered);
        self.columns = grouped.map(|column| column.iter().map(|t| t.id).collect());
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let column_len = self.columns[self.selected_column].len();
        if column_len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= column_len {
            self.selected_card = column_len - 1;
        }
    }

    fn select(&mut self, id: TaskId) {
        for (column, ids) in self.columns.iter().enumerate() {
            if let Some(card) = ids.iter().position(|&other| other == id) {
                self.selected_column = column;
                self.selected_card = card;
                return;
            }
        }
        self.clamp_selection();
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.columns[self.selected_column].get(self.selected_card).copied()
    }

    fn selected_task(&self) -> Option<&Task> {
        self.selected_id().and_then(|id| self.store.get(id))
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Show the outcome of a store call. A failed save keeps the in-memory
    /// change, so the board is refreshed either way.
    fn report(&mut self, result: Result<String, StoreError>) {
        match result {
            Ok(msg) => self.set_status_message(msg),
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
        self.update_columns();
    }

    /// Move the selected card one column left (`-1`) or right (`1`).
    fn move_card(&mut self, offset: isize) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let target = self.selected_column as isize + offset;
        if !(0..Status::ALL.len() as isize).contains(&target) {
            return;
        }
        let status = Status::ALL[target as usize];
        let result = self
            .store
            .move_to(id, status)
            .map(|_| format!("Moved task to {}", format_status(status)));
        self.report(result);
        self.select(id);
    }

    fn step_period(&mut self, direction: period::Direction) {
        self.anchor = period::step(self.anchor, self.mode, direction);
        self.selected_card = 0;
        self.update_columns();
        self.set_status_message(self.period().title());
    }

    fn cycle_mode(&mut self) {
        self.mode = self.mode.cycle();
        self.selected_card = 0;
        let mode = self.mode;
        let result = self
            .store
            .set_view_mode(mode)
            .map(|_| format!("{} view", self.period().label()));
        self.report(result);
    }

    fn jump_to_today(&mut self) {
        self.anchor = self.today();
        self.selected_card = 0;
        self.update_columns();
        self.set_status_message(self.period().title());
    }

    fn add_task(&mut self, title: String) {
        let kind = self.store.kind();
        let created = schedule_for(kind, self.anchor, None)
            .and_then(|schedule| self.store.create(TaskDraft::new(title, schedule)));
        match created {
            Ok(task) => {
                self.report(Ok(format!("Added '{}'", task.title)));
                self.select(task.id);
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let result = self.store.delete(id).map(|removed| match removed {
            Some(task) => format!("Deleted '{}'", task.title),
            None => "Task already gone".to_string(),
        });
        self.report(result);
    }

    fn rollover(&mut self) {
        let now = self.store.now().with_timezone(&Local);
        let rolled = match self.store.kind() {
            PlannerKind::Smart => rollover_overdue(self.store.list(), &now),
            PlannerKind::Weekly => {
                let (rolled, next) = roll_forward_week(self.store.list(), self.anchor, &now);
                if !rolled.is_empty() {
                    self.anchor = next;
                }
                rolled
            }
        };
        if rolled.is_empty() {
            self.set_status_message("Nothing to roll over");
            return;
        }
        debug!(count = rolled.len(), "board rollover");
        let result = self
            .store
            .append(rolled)
            .map(|count| format!("Rolled over {count} task(s)"));
        self.report(result);
    }

    /// Apply one key press. Returns true when the board should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let Some(input) = self.quick_add.as_mut() {
            match key.code {
                KeyCode::Esc => {
                    self.quick_add = None;
                    self.set_status_message("Add cancelled");
                }
                KeyCode::Enter => {
                    let title = input.take();
                    self.quick_add = None;
                    self.add_task(title);
                }
                KeyCode::Backspace => input.handle_backspace(),
                KeyCode::Delete => input.handle_delete(),
                KeyCode::Left => input.move_cursor_left(),
                KeyCode::Right => input.move_cursor_right(),
                KeyCode::Char(c) => input.handle_char(c),
                _ => {}
            }
            return false;
        }

        if self.show_task_detail {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                self.show_task_detail = false;
            }
            return false;
        }

        self.status_message.clear();

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,

            KeyCode::Enter => {
                self.show_task_detail = self.selected_id().is_some();
            }

            // Card movement between columns (before plain navigation)
            KeyCode::Left if key.modifiers.contains(KeyModifiers::CONTROL) => self.move_card(-1),
            KeyCode::Right if key.modifiers.contains(KeyModifiers::CONTROL) => self.move_card(1),

            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_column < self.columns.len() - 1 {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down => {
                let column_len = self.columns[self.selected_column].len();
                if self.selected_card + 1 < column_len {
                    self.selected_card += 1;
                }
            }

            KeyCode::Char('[') => self.step_period(period::Direction::Prev),
            KeyCode::Char(']') => self.step_period(period::Direction::Next),
            KeyCode::Char('v') => self.cycle_mode(),
            KeyCode::Char('.') => self.jump_to_today(),
            KeyCode::Char('a') => {
                self.quick_add = Some(InputField::new());
            }
            KeyCode::Char('x') => self.delete_selected(),
            KeyCode::Char('r') => self.rollover(),
            KeyCode::Char('h') => {
                self.set_status_message(
                    "Enter: Details | Ctrl+←/→: Move | [ ]: Period | v: View | .: Today \
                     | a: Add | x: Delete | r: Roll over | q: Quit",
                );
            }
            _ => {}
        }
        false
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        if self.show_task_detail {
            self.render_task_detail_popup(f);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let period = self.period();
        let projected = view::project(self.store.list(), self.anchor, self.mode);
        let progress = Progress::of(&projected);
        let planner = match self.store.kind() {
            PlannerKind::Smart => "SMART PLANNER",
            PlannerKind::Weekly => "WEEKLY PLANNER",
        };

        let header_text = vec![Line::from(vec![
            Span::styled(planner, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{} view: {}", period.label(), period.title()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
            Span::raw("  "),
            Span::raw(format!(
                "{}/{} done ({}%)",
                progress.completed,
                progress.total,
                progress.percent()
            )),
        ])];

        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let columns_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(area);

        for (i, &column_area) in columns_layout.iter().enumerate() {
            self.render_column(f, column_area, i);
        }
    }

    fn render_column(&mut self, f: &mut Frame, area: Rect, column_index: usize) {
        let status = Status::ALL[column_index];
        let is_selected = column_index == self.selected_column;
        let cards = self.columns[column_index].clone();

        let border_style = if is_selected {
            Style::default().fg(status_color(status)).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({})", format_status(status), cards.len()))
            .border_style(border_style);

        let inner = block.inner(area);
        f.render_widget(block, area);

        if cards.is_empty() {
            return;
        }

        let available_height = inner.height as usize;
        let visible_cards = available_height / CARD_HEIGHT;

        let scroll_offset = if is_selected {
            let start_visible = self.column_scroll_offsets[column_index];
            let end_visible = start_visible + visible_cards;
            if self.selected_card < start_visible {
                self.selected_card
            } else if self.selected_card >= end_visible && visible_cards > 0 {
                self.selected_card + 1 - visible_cards
            } else {
                start_visible
            }
        } else {
            self.column_scroll_offsets[column_index]
        };
        self.column_scroll_offsets[column_index] = scroll_offset;

        let mut current_y = 0;
        let mut rendered_cards = 0;
        for (card_index, &task_id) in cards.iter().enumerate().skip(scroll_offset) {
            if current_y + CARD_HEIGHT > available_height {
                break;
            }
            let Some(task) = self.store.get(task_id) else {
                continue;
            };
            let card_area = Rect {
                x: inner.x,
                y: inner.y + current_y as u16,
                width: inner.width,
                height: CARD_HEIGHT as u16,
            };
            let is_this_card_selected = is_selected && card_index == self.selected_card;
            self.render_card(f, card_area, task, is_this_card_selected);
            current_y += CARD_HEIGHT;
            rendered_cards += 1;
        }

        if scroll_offset > 0 {
            let indicator = Paragraph::new(format!("▲ +{} above", scroll_offset))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect { x: inner.x, y: inner.y, width: inner.width, height: 1 },
            );
        }
        let remaining = cards.len().saturating_sub(scroll_offset + rendered_cards);
        if remaining > 0 && inner.height > 0 {
            let indicator = Paragraph::new(format!("▼ +{} below", remaining))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect { x: inner.x, y: inner.y + inner.height - 1, width: inner.width, height: 1 },
            );
        }
    }

    fn render_card(&self, f: &mut Frame, area: Rect, task: &Task, is_selected: bool) {
        let style = if is_selected {
            Style::default()
                .bg(status_color(task.status))
                .fg(status_text_color(task.status))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray)
        };
        let width = area.width.saturating_sub(2) as usize;
        let tags = if task.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", task.tags.join(","))
        };

        let card_text = vec![
            Line::from(vec![
                Span::raw(format!("#{} ", task.id.short())),
                Span::styled(
                    format_priority(task.priority),
                    Style::default().fg(priority_color(task.priority)),
                ),
            ]),
            Line::from(truncate(&task.title, width)),
            Line::from(truncate(
                &format!("{}{}", format_date_relative(task.date(), self.today()), tags),
                width,
            )),
        ];

        let card_block = Paragraph::new(card_text)
            .block(Block::default().borders(Borders::ALL))
            .style(style);
        f.render_widget(card_block, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if let Some(input) = &self.quick_add {
            format!("New task on {}: {}█ | Enter: Add | Esc: Cancel", self.anchor, input.value)
        } else if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let total: usize = self.columns.iter().map(|c| c.len()).sum();
            let overdue = if self.store.kind() == PlannerKind::Smart
                && has_overdue(self.store.list(), self.today())
            {
                " [Overdue]"
            } else {
                ""
            };
            format!(
                "Tasks: {}{} | Ctrl+←/→: Move | [ ]: Period | v: View | a: Add | r: Roll over | h: Help",
                total, overdue
            )
        };

        let status = Status::ALL[self.selected_column];
        let bar = Paragraph::new(status_text)
            .style(Style::default().bg(status_color(status)).fg(status_text_color(status)))
            .alignment(Alignment::Left);
        f.render_widget(bar, area);
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task) = self.selected_task() else {
            return;
        };

        let popup_area = centered_rect(f.area(), 80);
        f.render_widget(Clear, popup_area);

        let deadline = task
            .deadline
            .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let detail_lines = vec![
            Line::from(vec![Span::styled(
                format!("Task #{}: {}", task.id.short(), task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(format!("Status:       {}", format_status(task.status))),
            Line::from(format!("Priority:     {}", format_priority(task.priority))),
            Line::from(format!(
                "Date:         {} ({})",
                task.date(),
                format_date_relative(task.date(), self.today())
            )),
            Line::from(format!("Deadline:     {}", deadline)),
            Line::from(format!(
                "Tags:         {}",
                if task.tags.is_empty() { "-".to_string() } else { task.tags.join(", ") }
            )),
            Line::from(""),
            Line::from("Description:"),
            Line::from(task.description.as_deref().unwrap_or("-")),
        ];

        let popup_block = Block::default()
            .borders(Borders::ALL)
            .title("Task Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(
                Style::default()
                    .fg(status_color(task.status))
                    .add_modifier(Modifier::BOLD),
            );
        let popup = Paragraph::new(detail_lines)
            .block(popup_block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, popup_area);
    }
}

/// A `percent`-sized rectangle centred in `area`.
fn centered_rect(area: Rect, percent: u16) -> Rect {
    let scale = |len: u16| (u32::from(len) * u32::from(percent.min(100)) / 100) as u16;
    let width = scale(area.width);
    let height = scale(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
