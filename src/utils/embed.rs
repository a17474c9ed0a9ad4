use serenity::builder::{CreateEmbed, CreateEmbedFooter};

use crate::music::announce::CloseReason;
use crate::music::{format_duration, Platform, Track};

fn footer(prefix: &str, track: &Track) -> CreateEmbedFooter {
    let footer = CreateEmbedFooter::new(format!("{prefix}: {}", track.requester.name));
    if track.requester.avatar_url.is_empty() {
        footer
    } else {
        footer.icon_url(&track.requester.avatar_url)
    }
}

fn platform_title(platform: Platform, suffix: &str) -> String {
    let icon = match platform {
        Platform::Youtube => "▶️",
        Platform::Spotify => "🟢",
    };
    if suffix.is_empty() {
        format!("{icon} {platform}")
    } else {
        format!("{icon} {platform} {suffix}")
    }
}

pub fn now_playing(track: &Track, status: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(platform_title(track.platform, ""))
        .description(format!(
            "Now Playing: [{}]({})\n\nStatus: **{status}**",
            track.title, track.display_url
        ))
        .field("Duration", track.duration_label(), true)
        .color(track.platform.color())
        .footer(footer("Requested by", track))
}

pub fn added_to_queue(track: &Track, position: usize) -> CreateEmbed {
    CreateEmbed::new()
        .title(platform_title(track.platform, "Added to Queue"))
        .description(format!(
            "[{}]({}) added to queue.\nPosition: **{position}**\nDuration: **{}**",
            track.title,
            track.display_url,
            track.duration_label()
        ))
        .color(track.platform.color())
        .footer(footer("Added by", track))
}

pub fn playlist_added(platform: Platform, queued: usize, total: Option<usize>) -> CreateEmbed {
    let description = match total {
        Some(total) => format!("{queued} songs (first page of {total}) added to queue."),
        None => format!("{queued} songs (first page) added to queue."),
    };
    CreateEmbed::new()
        .title("🎶 Playlist Added")
        .description(description)
        .color(platform.color())
}

pub fn queue_list(current: Option<&Track>, tracks: &[Track], page: usize) -> CreateEmbed {
    let per_page = 10;
    let total_pages = tracks.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let mut description = String::new();

    if let Some(track) = current {
        description.push_str(&format!(
            "**Now playing:** [{}]({}) `{}`\n\n",
            track.title,
            track.display_url,
            track.duration_label()
        ));
    }

    if tracks.is_empty() {
        description.push_str("The queue is empty.");
    } else {
        let start = (page - 1) * per_page;
        let end = (start + per_page).min(tracks.len());

        for (i, track) in tracks[start..end].iter().enumerate() {
            let num = start + i + 1;
            description.push_str(&format!(
                "**{num}.** [{}]({}) `{}`\n",
                track.title,
                track.display_url,
                format_duration(track.duration_seconds)
            ));
        }
    }

    CreateEmbed::new()
        .title(format!("📋 Queue ({page}/{total_pages})"))
        .description(description)
        .color(0x5865F2)
        .footer(CreateEmbedFooter::new(format!("{} songs queued", tracks.len())))
}

pub fn session_closed(reason: &CloseReason) -> CreateEmbed {
    let (title, description, color) = match reason {
        CloseReason::ChannelEmpty => (
            "👋 Auto Disconnect",
            "Left the voice channel because no users remained.".to_string(),
            0xFFD700,
        ),
        CloseReason::QueueFinished => (
            "✅ Queue Finished",
            "Nothing left to play, leaving the voice channel.".to_string(),
            0x00FF00,
        ),
        CloseReason::Disconnected => (
            "🔌 Disconnected",
            "The voice connection was closed.".to_string(),
            0xFFA500,
        ),
        CloseReason::Stopped { by } => (
            "⏹️ Stopped",
            format!("Music stopped by {by} and bot disconnected."),
            0xED4245,
        ),
        CloseReason::Left { .. } => (
            "👋 Disconnected",
            "Left the voice channel.".to_string(),
            0x00FF00,
        ),
    };

    CreateEmbed::new()
        .title(title)
        .description(description)
        .color(color)
}

pub fn notice(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(description)
        .color(0x00FF00)
}

pub fn error(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("⚠️ Error")
        .description(message)
        .color(0xFF0000)
}
