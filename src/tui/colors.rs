//! Color constants for the board.

use ratatui::style::Color;

use crate::fields::{Priority, Status};

pub const TODO_BLUE: Color = Color::Rgb(40, 90, 160);
pub const IN_PROGRESS_GOLD: Color = Color::Rgb(255, 215, 0);
pub const COMPLETED_GREEN: Color = Color::Rgb(0, 120, 60);
pub const HIGH_RED: Color = Color::Rgb(190, 40, 40);

/// Accent for a status column.
pub fn status_color(status: Status) -> Color {
    match status {
        Status::Todo => TODO_BLUE,
        Status::InProgress => IN_PROGRESS_GOLD,
        Status::Completed => COMPLETED_GREEN,
    }
}

/// Readable foreground on top of a status accent.
pub fn status_text_color(status: Status) -> Color {
    match status {
        Status::InProgress => Color::Rgb(20, 20, 20),
        _ => Color::White,
    }
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => HIGH_RED,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Gray,
    }
}
