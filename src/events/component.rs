use poise::serenity_prelude as serenity;
use serenity::builder::{
    CreateActionRow, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, EditMessage,
};
use serenity::model::application::ComponentInteraction;
use serenity::model::Timestamp;
use tracing::{debug, info};

use crate::music::control::{self, ControlAction, ControlId, Panel};
use crate::music::player::ControlOutcome;
use crate::music::{MusicError, Track};
use crate::utils::{components, embed};
use crate::{Data, Error};

async fn respond_ephemeral(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    message: &str,
) -> Result<(), Error> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(embed::error(message))
            .ephemeral(true),
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

async fn follow_up(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    message: impl Into<String>,
) -> Result<(), Error> {
    let followup = CreateInteractionResponseFollowup::new()
        .content(message)
        .ephemeral(true);
    interaction.create_followup(&ctx.http, followup).await?;
    Ok(())
}

async fn update_components(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    components: Vec<CreateActionRow>,
) {
    let edit = EditMessage::new().components(components);
    if let Err(e) = interaction
        .channel_id
        .edit_message(&ctx.http, interaction.message.id, edit)
        .await
    {
        debug!(message = %interaction.message.id, "could not update panel: {e}");
    }
}

async fn disable_panel(ctx: &serenity::Context, interaction: &ComponentInteraction, id: ControlId) {
    let track_id = id.action.track_id();
    let rows = match id.panel {
        Panel::NowPlaying => components::now_playing_controls(track_id, false, false),
        Panel::Queued => components::queued_controls(track_id, false),
        Panel::Playlist => Vec::new(),
    };
    update_components(ctx, interaction, rows).await;
}

fn describe_next(prefix: &str, next: Option<&Track>) -> String {
    match next {
        Some(track) => format!("{prefix} Now playing **{}**.", track.title),
        None => format!("{prefix} The queue is finished."),
    }
}

pub async fn handle(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(id) = ControlId::parse(&interaction.data.custom_id) else {
        return Ok(());
    };
    let guild_id = interaction.guild_id.ok_or("Only available inside a server")?;

    let settings = data.player.settings();
    let lifetime = match id.panel {
        Panel::Playlist => settings.playlist_control_timeout,
        Panel::NowPlaying | Panel::Queued => settings.control_timeout,
    };
    let message = &interaction.message;
    let last_activity = message.edited_timestamp.unwrap_or(message.timestamp);
    if control::is_expired(
        last_activity.unix_timestamp(),
        Timestamp::now().unix_timestamp(),
        lifetime,
    ) {
        respond_ephemeral(ctx, interaction, &MusicError::ControlsExpired.to_string()).await?;
        disable_panel(ctx, interaction, id).await;
        return Ok(());
    }

    let bot_channel = data.player.voice().connected_channel(guild_id).await;
    let user_channel = {
        let guild = ctx
            .cache
            .guild(guild_id)
            .ok_or("Could not read the server from cache")?;
        guild
            .voice_states
            .get(&interaction.user.id)
            .and_then(|vs| vs.channel_id)
    };

    if let Err(e) = control::check_session(bot_channel, user_channel) {
        respond_ephemeral(ctx, interaction, &e.to_string()).await?;
        if matches!(e, MusicError::NotConnected) {
            disable_panel(ctx, interaction, id).await;
        }
        return Ok(());
    }

    interaction.defer_ephemeral(&ctx.http).await?;

    let actor = interaction.user.name.clone();
    info!(guild = %guild_id, user = %actor, control = %interaction.data.custom_id, "music control");

    match data.player.apply(guild_id, id.action, &actor).await {
        Ok(ControlOutcome::Skipped { next }) => {
            follow_up(ctx, interaction, describe_next("Skipped.", next.as_ref())).await?;
        }
        Ok(ControlOutcome::Jumped { next }) => {
            if id.panel == Panel::Queued {
                disable_panel(ctx, interaction, id).await;
            }
            follow_up(ctx, interaction, describe_next("Jumped ahead.", next.as_ref())).await?;
        }
        Ok(ControlOutcome::LoopToggled(looping)) => {
            if let ControlAction::ToggleLoop(track_id) = id.action {
                update_components(
                    ctx,
                    interaction,
                    components::now_playing_controls(track_id, looping, true),
                )
                .await;
            }
            let state = if looping { "enabled" } else { "disabled" };
            follow_up(ctx, interaction, format!("Loop {state}.")).await?;
        }
        Ok(ControlOutcome::Stopped) => {
            follow_up(ctx, interaction, format!("Stopped by {actor}.")).await?;
        }
        Err(e) => {
            if matches!(e, MusicError::StaleTarget(_)) && id.panel == Panel::Queued {
                disable_panel(ctx, interaction, id).await;
            }
            follow_up(ctx, interaction, e.to_string()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::testing::track;

    #[test]
    fn test_describe_next() {
        let next = track(4);
        assert_eq!(
            describe_next("Skipped.", Some(&next)),
            "Skipped. Now playing **Track 4**."
        );
        assert_eq!(describe_next("Skipped.", None), "Skipped. The queue is finished.");
    }
}
