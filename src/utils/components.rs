use serenity::builder::{CreateActionRow, CreateButton};
use serenity::model::application::ButtonStyle;

use crate::music::control::{ControlAction, ControlId, Panel};
use crate::music::{Track, TrackId};

const BUTTONS_PER_ROW: usize = 5;
const MAX_ROWS: usize = 5;

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn button(panel: Panel, action: ControlAction) -> CreateButton {
    CreateButton::new(ControlId::new(panel, action).encode())
}

pub fn now_playing_controls(track_id: TrackId, looping: bool, enabled: bool) -> Vec<CreateActionRow> {
    let skip = button(Panel::NowPlaying, ControlAction::Skip(track_id))
        .label("Skip")
        .emoji('⏭')
        .style(ButtonStyle::Primary)
        .disabled(!enabled);

    let stop = button(Panel::NowPlaying, ControlAction::Stop(track_id))
        .label("Song Stop")
        .emoji('⏹')
        .style(ButtonStyle::Danger)
        .disabled(!enabled);

    let loop_label = if looping { "Loop: Active" } else { "Loop: Off" };
    let loop_toggle = button(Panel::NowPlaying, ControlAction::ToggleLoop(track_id))
        .label(loop_label)
        .emoji('🔁')
        .style(if looping {
            ButtonStyle::Success
        } else {
            ButtonStyle::Secondary
        })
        .disabled(!enabled);

    vec![CreateActionRow::Buttons(vec![skip, stop, loop_toggle])]
}

pub fn queued_controls(track_id: TrackId, enabled: bool) -> Vec<CreateActionRow> {
    let play = button(Panel::Queued, ControlAction::JumpTo(track_id))
        .label("Play")
        .emoji('▶')
        .style(ButtonStyle::Primary)
        .disabled(!enabled);

    vec![CreateActionRow::Buttons(vec![play])]
}

/// One "N: title" jump button per upcoming track, five to a row.
pub fn playlist_controls(upcoming: &[Track], enabled: bool) -> Vec<CreateActionRow> {
    let buttons: Vec<CreateButton> = upcoming
        .iter()
        .take(BUTTONS_PER_ROW * MAX_ROWS)
        .enumerate()
        .map(|(i, track)| {
            button(Panel::Playlist, ControlAction::JumpTo(track.id))
                .label(format!("{}: {}", i + 1, truncate_str(&track.title, 20)))
                .style(ButtonStyle::Secondary)
                .disabled(!enabled)
        })
        .collect();

    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|chunk| CreateActionRow::Buttons(chunk.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::testing::track;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 20), "short");
        let long = "a".repeat(30);
        let cut = truncate_str(&long, 20);
        assert_eq!(cut.chars().count(), 20);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_playlist_controls_rows() {
        let upcoming: Vec<Track> = (1..=7).map(track).collect();
        assert_eq!(playlist_controls(&upcoming, true).len(), 2);
        assert!(playlist_controls(&[], true).is_empty());
    }

    #[test]
    fn test_single_row_panels() {
        assert_eq!(now_playing_controls(1, false, true).len(), 1);
        assert_eq!(queued_controls(1, false).len(), 1);
    }
}
