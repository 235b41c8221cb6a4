use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use jellyplay::config::Config;
use jellyplay::jellyfin_client::{JellyfinClient, PlaystateClient};
use jellyplay::models::BaseItem;
use jellyplay::playback::{
    MediaPlayerAction, MediaPlayerEvent, MediaPlayerManager, MediaPlayerProxy,
    MediaProgressObserver, PlaybackReporter,
};
use jellyplay::session::SessionRegistry;

/// Engine stand-in that only logs what it is told to do
struct LoggingProxy;

impl MediaPlayerProxy for LoggingProxy {
    fn play(&self) {
        info!("engine: play");
    }

    fn pause(&self) {
        info!("engine: pause");
    }

    fn stop(&self) {
        info!("engine: stop");
    }

    fn set_time(&self, time: Duration) {
        info!("engine: seek to {:?}", time);
    }

    fn set_rate(&self, rate: f32) {
        info!("engine: rate {}", rate);
    }

    fn set_audio_track(&self, index: i32) {
        info!("engine: audio track {}", index);
    }

    fn set_subtitle_track(&self, index: i32) {
        info!("engine: subtitle track {}", index);
    }
}

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let item_id = args[1].clone();
    let mut start_at: Option<Duration> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--start" => {
                let Some(secs) = args.get(i + 1).and_then(|v| v.parse::<u64>().ok()) else {
                    error!("--start requires a number of seconds");
                    print_usage(&args[0]);
                    std::process::exit(1);
                };
                start_at = Some(Duration::from_secs(secs));
                i += 2;
            }
            _ => {
                error!("Unknown argument: {}", args[i]);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
    }

    let config = Config::load();
    let client = match JellyfinClient::new(config.server.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Cannot create server client: {}", e);
            std::process::exit(1);
        }
    };

    let mut item = BaseItem::new(item_id.clone(), item_id);
    if let Some(position) = start_at {
        item = item.with_resume_position(position);
    }

    let runtime_handle = tokio::runtime::Handle::current();
    let registry = Arc::new(SessionRegistry::new());
    let manager = MediaPlayerManager::builder(runtime_handle.clone())
        .config(config.playback.clone())
        .provider(client.provider(item))
        .registry(registry.clone())
        .build();

    let proxy: Arc<dyn MediaPlayerProxy> = Arc::new(LoggingProxy);
    manager.set_proxy(&proxy);

    let playstate: Arc<dyn PlaystateClient> = client.clone();
    let reporter = PlaybackReporter::start(playstate, &runtime_handle);
    let observer = MediaProgressObserver::start(&manager, reporter, &runtime_handle);

    let mut events = manager.subscribe();
    manager.send(MediaPlayerAction::Start);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(MediaPlayerEvent::StateChanged(state)) => {
                    info!("state: {:?}", state);
                    if registry.current_id() != Some(manager.id()) {
                        break;
                    }
                }
                Some(MediaPlayerEvent::PlaybackItemChanged(Some(item))) => {
                    info!("streaming {} from {}", item.base_item.display_title(), item.url);
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping playback");
                manager.send(MediaPlayerAction::Stop);
            }
        }
    }

    // Let the final stopped report go out
    for _ in 0..50 {
        if observer.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <item-id> [--start <seconds>]", program);
    eprintln!();
    eprintln!("Resolves the item on the configured server and runs a playback session");
    eprintln!("against a logging engine, reporting progress until interrupted.");
    eprintln!();
    eprintln!("Reads JELLYPLAY_SERVER_URL, JELLYPLAY_ACCESS_TOKEN and JELLYPLAY_USER_ID");
    eprintln!("from the environment or a .env file.");
}
