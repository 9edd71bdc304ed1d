use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::policy::WindowRule;

/// Which day of the closing pair a decision run falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDay {
    Today,
    Tomorrow,
}

impl CloseDay {
    pub fn label(&self) -> &'static str {
        match self {
            CloseDay::Today => "Closing Today",
            CloseDay::Tomorrow => "Closing Tomorrow",
        }
    }
}

/// What a window-eligible run does with the IPO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// Record the reading, no decision yet.
    Accumulate,
    /// Record the reading and finalize the status.
    Decide(CloseDay),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Missing close date, or open date after close date.
    Invalid,
    BeforeWindow,
    InWindow(WindowPhase),
    /// Closed before `today`; must be pruned.
    Expired,
}

/// Classify an IPO relative to `today`. Pure: identical inputs always yield
/// the same state.
pub fn classify(
    rule: &WindowRule,
    today: NaiveDate,
    end_date: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
) -> WindowState {
    let Some(end) = end_date else {
        return WindowState::Invalid;
    };
    if matches!(start_date, Some(start) if start > end) {
        return WindowState::Invalid;
    }
    if end < today {
        return WindowState::Expired;
    }

    let close_day = if today == end {
        Some(CloseDay::Today)
    } else if today + Duration::days(1) == end {
        Some(CloseDay::Tomorrow)
    } else {
        None
    };

    match (rule, close_day) {
        (WindowRule::SingleDay, Some(CloseDay::Tomorrow)) => {
            WindowState::InWindow(WindowPhase::Decide(CloseDay::Tomorrow))
        }
        (WindowRule::SingleDay, Some(CloseDay::Today)) => WindowState::BeforeWindow,
        (WindowRule::DualDay | WindowRule::Accumulation { .. }, Some(day)) => {
            WindowState::InWindow(WindowPhase::Decide(day))
        }
        (
            WindowRule::Accumulation {
                max_days_ahead,
                min_working_days,
            },
            None,
        ) => {
            let days_ahead = (end - today).num_days();
            if days_ahead <= *max_days_ahead && working_days_between(today, end) >= *min_working_days {
                WindowState::InWindow(WindowPhase::Accumulate)
            } else {
                WindowState::BeforeWindow
            }
        }
        (_, None) => WindowState::BeforeWindow,
    }
}

/// Count Monday–Friday dates in `start..=end`. Zero when `start > end`.
pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32
}
