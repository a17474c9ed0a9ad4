use poise::CreateReply;

use crate::music::player::PlayOutcome;
use crate::music::Requester;
use crate::utils::{components, embed};
use crate::{Context, Error};

async fn play_impl(ctx: Context<'_>, query: String) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Only available inside a server")?;
    let user_channel = super::author_voice_channel(ctx)?;

    ctx.defer().await?;

    let requester = Requester {
        name: ctx.author().name.clone(),
        avatar_url: ctx.author().face(),
    };

    let outcome = ctx
        .data()
        .player
        .request(guild_id, user_channel, ctx.channel_id(), &query, &requester)
        .await;

    let reply = match outcome {
        Ok(PlayOutcome::Started(track)) => CreateReply::default().embed(embed::notice(
            "▶️ Playing",
            &format!("Started [{}]({}).", track.title, track.display_url),
        )),
        Ok(PlayOutcome::Queued { track, position }) => CreateReply::default()
            .embed(embed::added_to_queue(&track, position))
            .components(components::queued_controls(track.id, true)),
        Ok(PlayOutcome::Playlist {
            platform,
            queued,
            total,
            ..
        }) => CreateReply::default().embed(embed::playlist_added(platform, queued, total)),
        Err(e) => CreateReply::default().embed(embed::error(&e.to_string())),
    };

    ctx.send(reply).await?;
    Ok(())
}

/// Play a song or playlist, or add it to the queue
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song title, YouTube or Spotify URL"] query: String,
) -> Result<(), Error> {
    play_impl(ctx, query).await
}

/// Play a song or playlist (/play shortcut)
#[poise::command(slash_command, guild_only)]
pub async fn p(
    ctx: Context<'_>,
    #[description = "Song title, YouTube or Spotify URL"] query: String,
) -> Result<(), Error> {
    play_impl(ctx, query).await
}
