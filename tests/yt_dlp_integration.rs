use std::sync::Arc;
use std::time::Duration;

use guild_jukebox::music::source::{MediaBackend, Resolution, TrackResolver, YtDlp};
use guild_jukebox::music::{Platform, Requester, TrackIds};

fn resolver() -> TrackResolver {
    TrackResolver::new(
        Arc::new(YtDlp::new("yt-dlp")),
        None,
        TrackIds::default(),
        5,
        Duration::from_secs(60),
    )
}

#[tokio::test]
#[ignore] // Requires yt-dlp installed and network access
async fn test_extract_with_url() {
    let info = YtDlp::new("yt-dlp")
        .extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        .await
        .expect("extraction failed");
    assert!(info.title.is_some());
    assert!(!info.stream_url.is_empty());
    assert!(info.duration.is_some());
}

#[tokio::test]
#[ignore] // Requires yt-dlp installed and network access
async fn test_resolve_search() {
    let resolution = resolver()
        .resolve("never gonna give you up rick astley", &Requester::default())
        .await
        .expect("search failed");
    let Resolution::Single(track) = resolution else {
        panic!("search should resolve to a single track");
    };
    assert_eq!(track.platform, Platform::Youtube);
    assert!(!track.title.is_empty());
    assert!(track.duration_seconds > 0);
}
