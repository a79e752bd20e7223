//! Next/previous decisions
//!
//! Pure functions over a queue snapshot `(entries, current, repeat)`. Nothing
//! here mutates the queue; the controller applies accepted steps.
//!
//! ```text
//! repeat  next at last entry   previous at first entry   either, Track
//! Off     Terminal             Terminal                  -
//! All     wrap to 0            wrap to len-1             -
//! Track   -                    -                         Restart(current)
//! ```

use crate::types::{QueueEntry, RepeatMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Elapsed time after which "previous" restarts the current entry instead of
/// moving back
pub const PREVIOUS_RESTART_THRESHOLD: Duration = Duration::from_secs(5);

/// Outcome of a navigation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Make the entry at this index current
    Move(usize),

    /// Seek the entry at this (current) index back to zero
    Restart(usize),

    /// Nothing more to play
    Terminal,
}

/// Navigation result handed to the UI / transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationResult {
    /// Index that is current after the step
    pub index: Option<usize>,

    /// Entry that is current after the step
    pub entry: Option<QueueEntry>,

    /// Same entry again: seek to zero rather than swapping media
    pub is_restart: bool,

    /// Nothing more to play
    pub is_terminal: bool,
}

impl NavigationResult {
    /// Result for a terminal step
    pub fn terminal() -> Self {
        Self {
            index: None,
            entry: None,
            is_restart: false,
            is_terminal: true,
        }
    }

    /// Resolve a step against the entries it was computed from
    pub fn from_step(step: Step, entries: &[QueueEntry]) -> Self {
        match step {
            Step::Move(index) => Self {
                index: Some(index),
                entry: entries.get(index).cloned(),
                is_restart: false,
                is_terminal: false,
            },
            Step::Restart(index) => Self {
                index: Some(index),
                entry: entries.get(index).cloned(),
                is_restart: true,
                is_terminal: false,
            },
            Step::Terminal => Self::terminal(),
        }
    }
}

/// Position "after" current; `None` counts as -1 so the first entry follows it
fn following(current: Option<usize>) -> usize {
    current.map_or(0, |index| index + 1)
}

/// Landing on the current index is a restart, not an advance
fn settle(current: Option<usize>, target: usize) -> Step {
    if current == Some(target) {
        Step::Restart(target)
    } else {
        Step::Move(target)
    }
}

/// Whether a "next" control should be enabled
///
/// `has_expandable_neighbor` means the queue may still grow through neighbor
/// expansion, so "next" is worth offering even at the end.
pub fn can_advance(
    entries: &[QueueEntry],
    current: Option<usize>,
    repeat: RepeatMode,
    has_expandable_neighbor: bool,
) -> bool {
    let len = entries.len();
    following(current) < len || (repeat == RepeatMode::All && len > 0) || has_expandable_neighbor
}

/// Whether a "previous" control should be enabled
pub fn can_retreat(
    entries: &[QueueEntry],
    current: Option<usize>,
    repeat: RepeatMode,
    has_expandable_neighbor: bool,
) -> bool {
    let len = entries.len();
    current.is_some_and(|index| index > 0 && index < len)
        || (repeat == RepeatMode::All && len > 0)
        || has_expandable_neighbor
}

/// Entry after the current one
pub fn get_next(entries: &[QueueEntry], current: Option<usize>, repeat: RepeatMode) -> Step {
    let len = entries.len();
    if len == 0 {
        return Step::Terminal;
    }

    if let (RepeatMode::Track, Some(index)) = (repeat, current) {
        return Step::Restart(index);
    }

    let next = following(current);
    if next < len {
        settle(current, next)
    } else if repeat == RepeatMode::All {
        settle(current, 0)
    } else {
        Step::Terminal
    }
}

/// Entry before the current one
pub fn get_previous(entries: &[QueueEntry], current: Option<usize>, repeat: RepeatMode) -> Step {
    let len = entries.len();
    if len == 0 {
        return Step::Terminal;
    }

    if let (RepeatMode::Track, Some(index)) = (repeat, current) {
        return Step::Restart(index);
    }

    match current {
        Some(index) if index > 0 => settle(current, index - 1),
        _ if repeat == RepeatMode::All => settle(current, len - 1),
        _ => Step::Terminal,
    }
}

/// Decide what plays when the current entry finishes unattended
pub fn handle_end_of_track(
    entries: &[QueueEntry],
    current: Option<usize>,
    repeat: RepeatMode,
) -> Step {
    if entries.is_empty() {
        return Step::Terminal;
    }

    match (repeat, current) {
        (RepeatMode::Track, Some(index)) => Step::Restart(index),
        _ => get_next(entries, current, repeat),
    }
}

/// Whether "previous" should restart the current entry rather than move back
pub fn should_restart_on_previous(elapsed: Duration, threshold: Duration) -> bool {
    elapsed > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(count: usize) -> Vec<QueueEntry> {
        (0..count)
            .map(|i| QueueEntry::from_path(format!("/media/{i}.mkv")))
            .collect()
    }

    const ALL_MODES: [RepeatMode; 3] = [RepeatMode::Off, RepeatMode::Track, RepeatMode::All];

    #[test]
    fn next_moves_forward() {
        let list = entries(3);
        assert_eq!(get_next(&list, Some(0), RepeatMode::Off), Step::Move(1));
        assert_eq!(get_next(&list, Some(1), RepeatMode::All), Step::Move(2));
    }

    #[test]
    fn next_without_current_starts_at_first() {
        let list = entries(3);
        assert_eq!(get_next(&list, None, RepeatMode::Off), Step::Move(0));
        assert_eq!(get_next(&list, None, RepeatMode::Track), Step::Move(0));
    }

    #[test]
    fn next_at_end_wraps_only_under_all() {
        let list = entries(3);
        assert_eq!(get_next(&list, Some(2), RepeatMode::All), Step::Move(0));
        assert_eq!(get_next(&list, Some(2), RepeatMode::Off), Step::Terminal);
    }

    #[test]
    fn previous_at_start_wraps_only_under_all() {
        let list = entries(3);
        assert_eq!(get_previous(&list, Some(0), RepeatMode::All), Step::Move(2));
        assert_eq!(get_previous(&list, Some(0), RepeatMode::Off), Step::Terminal);
        assert_eq!(get_previous(&list, Some(2), RepeatMode::Off), Step::Move(1));
    }

    #[test]
    fn track_repeat_restarts_in_both_directions() {
        let list = entries(4);
        for current in 0..4 {
            assert_eq!(
                get_next(&list, Some(current), RepeatMode::Track),
                Step::Restart(current)
            );
            assert_eq!(
                get_previous(&list, Some(current), RepeatMode::Track),
                Step::Restart(current)
            );
        }
    }

    #[test]
    fn track_repeat_without_current_behaves_like_off() {
        let list = entries(3);
        assert_eq!(handle_end_of_track(&list, None, RepeatMode::Track), Step::Move(0));
        assert_eq!(get_previous(&list, None, RepeatMode::Track), Step::Terminal);
    }

    #[test]
    fn single_entry_wrap_is_a_restart() {
        let list = entries(1);
        assert_eq!(get_next(&list, Some(0), RepeatMode::All), Step::Restart(0));
        assert_eq!(get_previous(&list, Some(0), RepeatMode::All), Step::Restart(0));
        assert_eq!(handle_end_of_track(&list, Some(0), RepeatMode::All), Step::Restart(0));
    }

    #[test]
    fn empty_queue_is_always_terminal() {
        let list = entries(0);
        for mode in ALL_MODES {
            assert_eq!(get_next(&list, None, mode), Step::Terminal);
            assert_eq!(get_previous(&list, None, mode), Step::Terminal);
            assert_eq!(handle_end_of_track(&list, None, mode), Step::Terminal);
        }
    }

    #[test]
    fn end_of_track_follows_repeat_mode() {
        let list = entries(3);
        assert_eq!(handle_end_of_track(&list, Some(1), RepeatMode::Track), Step::Restart(1));
        assert_eq!(handle_end_of_track(&list, Some(1), RepeatMode::Off), Step::Move(2));
        assert_eq!(handle_end_of_track(&list, Some(2), RepeatMode::Off), Step::Terminal);
        assert_eq!(handle_end_of_track(&list, Some(2), RepeatMode::All), Step::Move(0));
    }

    #[test]
    fn can_advance_and_retreat() {
        let list = entries(3);
        assert!(can_advance(&list, Some(1), RepeatMode::Off, false));
        assert!(!can_advance(&list, Some(2), RepeatMode::Off, false));
        assert!(can_advance(&list, Some(2), RepeatMode::All, false));
        assert!(can_advance(&list, Some(2), RepeatMode::Off, true));

        assert!(!can_retreat(&list, Some(0), RepeatMode::Off, false));
        assert!(can_retreat(&list, Some(1), RepeatMode::Off, false));
        assert!(can_retreat(&list, Some(0), RepeatMode::All, false));
        assert!(can_retreat(&list, Some(0), RepeatMode::Off, true));

        let empty = entries(0);
        assert!(!can_advance(&empty, None, RepeatMode::All, false));
        assert!(!can_retreat(&empty, None, RepeatMode::All, false));
    }

    #[test]
    fn result_from_step_carries_entry() {
        let list = entries(2);

        let moved = NavigationResult::from_step(Step::Move(1), &list);
        assert_eq!(moved.index, Some(1));
        assert_eq!(moved.entry.as_ref(), Some(&list[1]));
        assert!(!moved.is_restart && !moved.is_terminal);

        let restart = NavigationResult::from_step(Step::Restart(0), &list);
        assert!(restart.is_restart);
        assert_eq!(restart.entry.as_ref(), Some(&list[0]));

        let terminal = NavigationResult::from_step(Step::Terminal, &list);
        assert!(terminal.is_terminal);
        assert!(terminal.entry.is_none());
    }

    #[test]
    fn restart_threshold() {
        assert!(should_restart_on_previous(
            Duration::from_secs(6),
            PREVIOUS_RESTART_THRESHOLD
        ));
        assert!(!should_restart_on_previous(
            Duration::from_secs(5),
            PREVIOUS_RESTART_THRESHOLD
        ));
        assert!(!should_restart_on_previous(
            Duration::ZERO,
            PREVIOUS_RESTART_THRESHOLD
        ));
    }
}
