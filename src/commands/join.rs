use poise::CreateReply;

use crate::music::announce::CloseReason;
use crate::music::MusicError;
use crate::utils::embed;
use crate::{Context, Error};

async fn join_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Only available inside a server")?;
    let user_channel = super::author_voice_channel(ctx)?;

    let reply = match ctx
        .data()
        .player
        .join(guild_id, user_channel, ctx.channel_id())
        .await
    {
        Ok(channel) => embed::notice("🔊 Joined", &format!("Connected to <#{channel}>.")),
        Err(e) => embed::error(&e.to_string()),
    };
    ctx.send(CreateReply::default().embed(reply)).await?;
    Ok(())
}

async fn leave_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Only available inside a server")?;

    let reason = CloseReason::Left {
        by: ctx.author().name.clone(),
    };
    let embed = if ctx.data().player.stop(guild_id, reason.clone()).await {
        embed::session_closed(&reason)
    } else {
        embed::error(&MusicError::NotConnected.to_string())
    };
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Join your voice channel
#[poise::command(slash_command, guild_only)]
pub async fn join(ctx: Context<'_>) -> Result<(), Error> {
    join_impl(ctx).await
}

/// Leave the voice channel and clear the queue
#[poise::command(slash_command, guild_only)]
pub async fn leave(ctx: Context<'_>) -> Result<(), Error> {
    leave_impl(ctx).await
}
