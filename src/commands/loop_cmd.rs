use crate::{Context, Error};

async fn loop_impl(ctx: Context<'_>, enabled: Option<bool>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Only available inside a server")?;
    let player = &ctx.data().player;

    let looping = match enabled {
        Some(on) => {
            player.set_loop(guild_id, on).await;
            on
        }
        None => player.toggle_loop(guild_id).await,
    };

    let msg = if looping {
        "🔂 Loop: **Active**"
    } else {
        "➡️ Loop: **Off**"
    };
    ctx.say(msg).await?;
    Ok(())
}

/// Loop the current song
#[poise::command(slash_command, guild_only, rename = "loop")]
pub async fn loop_cmd(
    ctx: Context<'_>,
    #[description = "On or off (toggles when omitted)"] enabled: Option<bool>,
) -> Result<(), Error> {
    loop_impl(ctx, enabled).await
}

/// Loop the current song (/loop shortcut)
#[poise::command(slash_command, guild_only)]
pub async fn l(
    ctx: Context<'_>,
    #[description = "On or off (toggles when omitted)"] enabled: Option<bool>,
) -> Result<(), Error> {
    loop_impl(ctx, enabled).await
}
