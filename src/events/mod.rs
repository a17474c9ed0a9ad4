pub mod component;
pub mod voice_state;

use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Data, Error};

pub const READY_ACTIVITY: &str = "/play and /help";

pub async fn handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!(user = %data_about_bot.user.name, "connected to gateway");
            ctx.set_activity(Some(serenity::ActivityData::watching(READY_ACTIVITY)));
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            voice_state::handle(ctx, old, new, data).await?;
        }
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Component(comp),
        } => {
            component::handle(ctx, comp, data).await?;
        }
        _ => {}
    }
    Ok(())
}
