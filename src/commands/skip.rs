use poise::CreateReply;

use crate::utils::embed;
use crate::{Context, Error};

async fn skip_impl(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Only available inside a server")?;

    match ctx.data().player.skip(guild_id).await {
        Ok((skipped, next)) => {
            let msg = match next {
                Some(ref next_song) => {
                    format!("⏭️ Skipped **{}** → **{}**", skipped.title, next_song.title)
                }
                None => format!("⏭️ Skipped **{}** (queue finished)", skipped.title),
            };
            ctx.say(msg).await?;
        }
        Err(e) => {
            ctx.send(CreateReply::default().embed(embed::error(&e.to_string())))
                .await?;
        }
    }

    Ok(())
}

/// Skip the current song
#[poise::command(slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    skip_impl(ctx).await
}

/// Skip the current song (/skip shortcut)
#[poise::command(slash_command, guild_only)]
pub async fn s(ctx: Context<'_>) -> Result<(), Error> {
    skip_impl(ctx).await
}
