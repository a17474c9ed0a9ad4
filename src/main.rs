use std::sync::Arc;

use guild_jukebox::music::announce::DiscordAnnouncer;
use guild_jukebox::music::source::{TrackResolver, YtDlp};
use guild_jukebox::music::spotify::{CatalogBackend, SpotifyClient};
use guild_jukebox::music::voice::SongbirdVoice;
use guild_jukebox::music::{PlaybackController, QueueStore, TrackIds};
use guild_jukebox::{commands, config, events, Data};
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let songbird = Songbird::serenity();
    let voice_manager = Arc::clone(&songbird);
    let settings = config.playback_settings();
    let empty_channel_grace = config.empty_channel_grace;
    let http_client = reqwest::Client::new();

    // `http_client` carries songbird streams and must not time out.
    let spotify_http = reqwest::Client::builder()
        .timeout(config.resolve_timeout)
        .build()
        .expect("failed to build Spotify HTTP client");

    let catalog: Option<Arc<dyn CatalogBackend>> = match config.spotify_credentials() {
        Some((id, secret)) => Some(Arc::new(SpotifyClient::new(spotify_http, id, secret))),
        None => {
            tracing::warn!("Spotify credentials not set, Spotify links will be rejected");
            None
        }
    };

    let resolver = Arc::new(TrackResolver::new(
        Arc::new(YtDlp::new(config.ytdlp_path.clone())),
        catalog,
        TrackIds::default(),
        settings.page_size,
        config.resolve_timeout,
    ));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let (ended_tx, ended_rx) = tokio::sync::mpsc::unbounded_channel();
                let voice = SongbirdVoice::new(voice_manager, http_client, ended_tx);

                let player = Arc::new(PlaybackController::new(
                    QueueStore::new(),
                    Arc::new(voice),
                    resolver,
                    Arc::new(DiscordAnnouncer::new(ctx.http.clone())),
                    settings,
                ));
                Arc::clone(&player).listen(ended_rx);

                tracing::info!("bot is ready");
                Ok(Data {
                    player,
                    empty_channel_grace,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .register_songbird_with(songbird)
        .await
        .expect("failed to create client");

    if let Err(e) = client.start().await {
        tracing::error!("client error: {e}");
    }
}
