//! Continuity context for script generation.
//!
//! Builds a deterministic summary of prior episodes that gets embedded in
//! the script prompt, so new episodes stay consistent with what the user
//! already wrote. Pure show-state in, string out; no provider call.

use crate::storage::{Episode, Show};

const CURRENT_SEASON_PREFIX: &str = "Previous episodes in this season: ";
const PREV_SEASON_PREFIX: &str = "Previous Season Finale events: ";
const OPENING_EPISODE_CONTEXT: &str = "This is the first episode of the season.";

/// How many previous-season episodes carry across a season boundary.
const PREV_SEASON_EPISODES: usize = 3;

/// Build the continuity context for a new episode of `season_number`.
///
/// Episodes already in the target season win; an empty later season falls
/// back to the tail of the season before it; a blank slate gets the fixed
/// opening-episode sentinel.
pub fn continuity_context(show: &Show, season_number: u32) -> String {
    let mut current: Vec<&Episode> = show
        .episodes
        .iter()
        .filter(|e| e.season_number == season_number)
        .collect();
    current.sort_by_key(|e| e.order);

    if current.is_empty() && season_number > 1 {
        let mut previous: Vec<&Episode> = show
            .episodes
            .iter()
            .filter(|e| e.season_number == season_number - 1)
            .collect();
        previous.sort_by(|a, b| b.order.cmp(&a.order));
        previous.truncate(PREV_SEASON_EPISODES);
        if !previous.is_empty() {
            return format!("{}{}", PREV_SEASON_PREFIX, summarize(&previous));
        }
    }

    if !current.is_empty() {
        return format!("{}{}", CURRENT_SEASON_PREFIX, summarize(&current));
    }

    OPENING_EPISODE_CONTEXT.to_string()
}

fn summarize(episodes: &[&Episode]) -> String {
    episodes
        .iter()
        .map(|e| format!("{}: {}", e.title, e.premise))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ShowTheme;

    fn show_with_episodes(episodes: Vec<Episode>) -> Show {
        let mut show = Show::new("Tales of Paris", "test show", ShowTheme::Ladybug);
        show.max_season = 3;
        show.episodes = episodes;
        show
    }

    fn episode(season: u32, order: u32, title: &str, premise: &str) -> Episode {
        Episode::new(season, order, title, premise)
    }

    #[test]
    fn test_current_season_episodes_in_ascending_order() {
        // Inserted out of order to exercise the sort.
        let show = show_with_episodes(vec![
            episode(2, 2, "B", "pb"),
            episode(2, 1, "A", "pa"),
        ]);

        assert_eq!(
            continuity_context(&show, 2),
            "Previous episodes in this season: A: pa; B: pb"
        );
    }

    #[test]
    fn test_empty_season_falls_back_to_previous_season_tail() {
        let show = show_with_episodes(vec![
            episode(2, 1, "A", "pa"),
            episode(2, 2, "B", "pb"),
        ]);

        // Most recent first, framed as finale events.
        assert_eq!(
            continuity_context(&show, 3),
            "Previous Season Finale events: B: pb; A: pa"
        );
    }

    #[test]
    fn test_previous_season_fallback_caps_at_three() {
        let show = show_with_episodes(vec![
            episode(1, 1, "A", "pa"),
            episode(1, 2, "B", "pb"),
            episode(1, 3, "C", "pc"),
            episode(1, 4, "D", "pd"),
        ]);

        assert_eq!(
            continuity_context(&show, 2),
            "Previous Season Finale events: D: pd; C: pc; B: pb"
        );
    }

    #[test]
    fn test_blank_slate_gets_opening_sentinel() {
        let show = show_with_episodes(Vec::new());
        assert_eq!(
            continuity_context(&show, 1),
            "This is the first episode of the season."
        );
    }

    #[test]
    fn test_empty_previous_season_also_gets_sentinel() {
        // Season 2 is empty and so is season 1; season 3 has no material to
        // borrow from two seasons back.
        let show = show_with_episodes(vec![episode(1, 1, "A", "pa")]);
        assert_eq!(
            continuity_context(&show, 3),
            "This is the first episode of the season."
        );
    }
}
