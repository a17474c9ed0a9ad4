use poise::CreateReply;
use serenity::builder::CreateEmbed;

use crate::{Context, Error};

const MUSIC_COMMANDS: &str = "\
`/play` (`/p`): play a song, YouTube/Spotify link or playlist
`/join`: join your voice channel
`/leave`: leave the voice channel
`/skip` (`/s`): skip the current song
`/stop` (`/st`): stop playback and leave
`/queue` (`/q`): show the queue
`/nowplaying` (`/np`): show the current song
`/loop` (`/l`): loop the current song";

async fn help_impl(ctx: Context<'_>) -> Result<(), Error> {
    let embed = CreateEmbed::new()
        .title("Help")
        .field("Music", MUSIC_COMMANDS, false)
        .field(
            "Buttons",
            "Song panels carry Skip, Stop and Loop buttons. Queued songs and playlists \
             get buttons that jump straight to them.",
            false,
        )
        .color(0x5865F2);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the command list
#[poise::command(slash_command, guild_only)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    help_impl(ctx).await
}
