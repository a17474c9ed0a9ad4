use poise::CreateReply;

use crate::music::MusicError;
use crate::utils::{components, embed};
use crate::{Context, Error};

async fn nowplaying_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Only available inside a server")?;

    let (current, looping) = {
        let state = ctx.data().player.store().lock(guild_id).await;
        (state.current.clone(), state.looping)
    };

    match current {
        Some(track) => {
            let status = if looping { "Playing (loop)" } else { "Playing" };
            ctx.send(
                CreateReply::default()
                    .embed(embed::now_playing(&track, status))
                    .components(components::now_playing_controls(track.id, looping, true)),
            )
            .await?;
        }
        None => {
            ctx.send(
                CreateReply::default().embed(embed::error(&MusicError::NothingPlaying.to_string())),
            )
            .await?;
        }
    }

    Ok(())
}

/// Show the song currently playing
#[poise::command(slash_command, guild_only)]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), Error> {
    nowplaying_impl(ctx).await
}

/// Show the song currently playing (/nowplaying shortcut)
#[poise::command(slash_command, guild_only)]
pub async fn np(ctx: Context<'_>) -> Result<(), Error> {
    nowplaying_impl(ctx).await
}
