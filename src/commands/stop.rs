use poise::CreateReply;

use crate::music::announce::CloseReason;
use crate::music::MusicError;
use crate::utils::embed;
use crate::{Context, Error};

async fn stop_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Only available inside a server")?;

    let reason = CloseReason::Stopped {
        by: ctx.author().name.clone(),
    };
    if !ctx.data().player.stop(guild_id, reason.clone()).await {
        ctx.send(
            CreateReply::default().embed(embed::error(&MusicError::NothingPlaying.to_string())),
        )
        .await?;
        return Ok(());
    }

    ctx.send(CreateReply::default().embed(embed::session_closed(&reason)))
        .await?;
    Ok(())
}

/// Stop playback, clear the queue and leave
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    stop_impl(ctx).await
}

/// Stop playback and leave (/stop shortcut)
#[poise::command(slash_command, guild_only)]
pub async fn st(ctx: Context<'_>) -> Result<(), Error> {
    stop_impl(ctx).await
}
