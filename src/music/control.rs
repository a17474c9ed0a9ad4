use std::time::Duration;

use serenity::model::id::ChannelId;

use super::{MusicError, TrackId};

const PREFIX: &str = "music";

/// Which message a control lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    NowPlaying,
    Queued,
    Playlist,
}

impl Panel {
    fn tag(self) -> &'static str {
        match self {
            Self::NowPlaying => "np",
            Self::Queued => "queued",
            Self::Playlist => "playlist",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "np" => Some(Self::NowPlaying),
            "queued" => Some(Self::Queued),
            "playlist" => Some(Self::Playlist),
            _ => None,
        }
    }
}

/// Everything a music button can ask for, bound to the track its panel was
/// created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    Skip(TrackId),
    Stop(TrackId),
    ToggleLoop(TrackId),
    JumpTo(TrackId),
}

impl ControlAction {
    pub fn track_id(self) -> TrackId {
        match self {
            Self::Skip(id) | Self::Stop(id) | Self::ToggleLoop(id) | Self::JumpTo(id) => id,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Skip(_) => "skip",
            Self::Stop(_) => "stop",
            Self::ToggleLoop(_) => "loop",
            Self::JumpTo(_) => "jump",
        }
    }
}

/// A button's `custom_id`, `music:<panel>:<verb>:<track id>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlId {
    pub panel: Panel,
    pub action: ControlAction,
}

impl ControlId {
    pub fn new(panel: Panel, action: ControlAction) -> Self {
        Self { panel, action }
    }

    pub fn encode(&self) -> String {
        format!(
            "{PREFIX}:{}:{}:{}",
            self.panel.tag(),
            self.action.verb(),
            self.action.track_id()
        )
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.split(':');
        if parts.next()? != PREFIX {
            return None;
        }
        let panel = Panel::from_tag(parts.next()?)?;
        let verb = parts.next()?;
        let id: TrackId = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let action = match verb {
            "skip" => ControlAction::Skip(id),
            "stop" => ControlAction::Stop(id),
            "loop" => ControlAction::ToggleLoop(id),
            "jump" => ControlAction::JumpTo(id),
            _ => return None,
        };
        Some(Self { panel, action })
    }
}

/// Session and membership checks every control runs before touching state.
/// Returns the session's channel on success.
pub fn check_session(
    bot_channel: Option<ChannelId>,
    user_channel: Option<ChannelId>,
) -> Result<ChannelId, MusicError> {
    let bot_channel = bot_channel.ok_or(MusicError::NotConnected)?;
    match user_channel {
        Some(ch) if ch == bot_channel => Ok(bot_channel),
        _ => Err(MusicError::ChannelMismatch),
    }
}

/// Idle lifetime check. Timestamps are unix seconds of the panel's last
/// activity and of now.
pub fn is_expired(last_activity: i64, now: i64, lifetime: Duration) -> bool {
    now.saturating_sub(last_activity) > lifetime.as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_id_roundtrip_for_every_action() {
        let ids = [
            ControlId::new(Panel::NowPlaying, ControlAction::Skip(7)),
            ControlId::new(Panel::NowPlaying, ControlAction::Stop(7)),
            ControlId::new(Panel::NowPlaying, ControlAction::ToggleLoop(7)),
            ControlId::new(Panel::Queued, ControlAction::JumpTo(12)),
            ControlId::new(Panel::Playlist, ControlAction::JumpTo(99)),
        ];
        for id in ids {
            assert_eq!(ControlId::parse(&id.encode()), Some(id));
        }
        assert_eq!(
            ControlId::new(Panel::Queued, ControlAction::JumpTo(12)).encode(),
            "music:queued:jump:12"
        );
    }

    #[test]
    fn test_parse_rejects_foreign_ids() {
        assert_eq!(ControlId::parse("music_pause"), None);
        assert_eq!(ControlId::parse("music:np:skip"), None);
        assert_eq!(ControlId::parse("music:np:skip:x"), None);
        assert_eq!(ControlId::parse("music:np:dance:1"), None);
        assert_eq!(ControlId::parse("music:np:skip:1:extra"), None);
        assert_eq!(ControlId::parse("other:np:skip:1"), None);
    }

    #[test]
    fn test_check_session() {
        let ch = ChannelId::new(10);
        let other = ChannelId::new(11);
        assert_eq!(check_session(Some(ch), Some(ch)).unwrap(), ch);
        assert!(matches!(
            check_session(None, Some(ch)),
            Err(MusicError::NotConnected)
        ));
        assert!(matches!(
            check_session(Some(ch), Some(other)),
            Err(MusicError::ChannelMismatch)
        ));
        assert!(matches!(
            check_session(Some(ch), None),
            Err(MusicError::ChannelMismatch)
        ));
    }

    #[test]
    fn test_is_expired() {
        let lifetime = Duration::from_secs(60);
        assert!(!is_expired(1_000, 1_030, lifetime));
        assert!(!is_expired(1_000, 1_060, lifetime));
        assert!(is_expired(1_000, 1_061, lifetime));
    }
}
