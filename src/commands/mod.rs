mod help;
mod join;
mod loop_cmd;
mod nowplaying;
mod play;
mod queue;
mod skip;
mod stop;

use poise::serenity_prelude as serenity;

use crate::{Context, Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        play::play(),
        play::p(),
        join::join(),
        join::leave(),
        skip::skip(),
        skip::s(),
        stop::stop(),
        stop::st(),
        queue::queue(),
        queue::q(),
        nowplaying::nowplaying(),
        nowplaying::np(),
        loop_cmd::loop_cmd(),
        loop_cmd::l(),
    ]
}

/// Voice channel the invoking user is sitting in, if any.
fn author_voice_channel(ctx: Context<'_>) -> Result<Option<serenity::ChannelId>, Error> {
    let guild = ctx.guild().ok_or("Could not read the server from cache")?;
    Ok(guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|vs| vs.channel_id))
}
