use std::time::Duration;

use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, info};

use super::READY_ACTIVITY;
use crate::music::announce::CloseReason;
use crate::Data;

const WELCOME_DURATION: Duration = Duration::from_secs(10);

/// Non-bot users whose voice state points at `channel`.
pub fn humans_in(
    channel: ChannelId,
    states: impl IntoIterator<Item = (Option<ChannelId>, bool)>,
) -> usize {
    states
        .into_iter()
        .filter(|(ch, is_bot)| *ch == Some(channel) && !is_bot)
        .count()
}

fn humans_in_channel(ctx: &serenity::Context, guild_id: GuildId, channel: ChannelId) -> Option<usize> {
    let guild = ctx.cache.guild(guild_id)?;
    let states = guild.voice_states.values().map(|vs| {
        let is_bot = vs
            .member
            .as_ref()
            .map(|m| m.user.bot)
            .or_else(|| guild.members.get(&vs.user_id).map(|m| m.user.bot))
            .unwrap_or(false);
        (vs.channel_id, is_bot)
    });
    Some(humans_in(channel, states))
}

fn welcome_booster(ctx: &serenity::Context, old: &Option<serenity::VoiceState>, new: &serenity::VoiceState) {
    let joined = new.channel_id.is_some() && old.as_ref().and_then(|o| o.channel_id).is_none();
    let Some(member) = new.member.as_ref() else {
        return;
    };
    if !joined || member.premium_since.is_none() || member.user.bot {
        return;
    }

    let name = member.display_name().to_string();
    info!(user = %name, "server booster joined voice");
    ctx.set_activity(Some(serenity::ActivityData::playing(format!("Welcome {name}"))));

    let ctx = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(WELCOME_DURATION).await;
        ctx.set_activity(Some(serenity::ActivityData::watching(READY_ACTIVITY)));
    });
}

pub async fn handle(
    ctx: &serenity::Context,
    old: &Option<serenity::VoiceState>,
    new: &serenity::VoiceState,
    data: &Data,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let guild_id = match new.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };

    if new.user_id == ctx.cache.current_user().id {
        if new.channel_id.is_none() {
            debug!(guild = %guild_id, "bot left voice");
            data.player.session_lost(guild_id).await;
        }
        return Ok(());
    }

    welcome_booster(ctx, old, new);

    let bot_channel = match data.player.voice().connected_channel(guild_id).await {
        Some(ch) => ch,
        None => return Ok(()),
    };

    if humans_in_channel(ctx, guild_id, bot_channel) != Some(0) {
        return Ok(());
    }

    let ctx = ctx.clone();
    let player = data.player.clone();
    let grace = data.empty_channel_grace;

    tokio::spawn(async move {
        if !grace.is_zero() {
            tokio::time::sleep(grace).await;
        }

        // Someone may have come back, or the session moved.
        let Some(channel) = player.voice().connected_channel(guild_id).await else {
            return;
        };
        if humans_in_channel(&ctx, guild_id, channel) != Some(0) {
            return;
        }

        info!(guild = %guild_id, "voice channel is empty, leaving");
        player.stop(guild_id, CloseReason::ChannelEmpty).await;
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humans_in_ignores_bots_and_other_channels() {
        let ours = ChannelId::new(1);
        let other = ChannelId::new(2);
        let states = vec![
            (Some(ours), true),
            (Some(ours), false),
            (Some(other), false),
            (None, false),
        ];
        assert_eq!(humans_in(ours, states), 1);
    }

    #[test]
    fn test_only_bot_left() {
        let ours = ChannelId::new(1);
        assert_eq!(humans_in(ours, vec![(Some(ours), true)]), 0);
    }
}
