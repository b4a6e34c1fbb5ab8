//! CLI command implementations

use anyhow::Context;
use cineview_core::{
    CompletePlayer, MonotonicFraction, PlayerConfig, PlayerEvent, PlayerSession,
    SimulatedEngineFactory, StaticResolver,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

fn build_player(duration: f64) -> (CompletePlayer, broadcast::Receiver<PlayerEvent>) {
    let session = PlayerSession::new(
        Arc::new(StaticResolver::with_duration(duration)),
        Arc::new(SimulatedEngineFactory::default()),
    );
    let events = session.subscribe_events();
    (CompletePlayer::new(session), events)
}

/// Play a URL against the simulated engine with a live progress display
pub async fn play(
    url: &str,
    title: &str,
    duration: f64,
    rate: f64,
    paused: bool,
    repeat: bool,
) -> anyhow::Result<()> {
    let url = Url::parse(url).context("invalid media URL")?;

    println!(
        "{} {}",
        console::style("Playing:").bold().green(),
        console::style(title).bold()
    );
    println!("  URL: {url}");
    println!("  Duration: {duration}s  Rate: {rate}x  Repeat: {repeat}");

    let (player, mut events) = build_player(duration);
    let config = PlayerConfig::new(url, title)
        .with_auto_play(!paused)
        .with_repeat(repeat)
        .with_rate(rate);
    player.setup(config).await;

    let bar = ProgressBar::new(1000);
    bar.set_style(
        ProgressStyle::with_template("{msg:>12} [{bar:40.cyan/blue}] {percent:>3}%")
            .context("bad progress template")?
            .progress_chars("=> "),
    );
    bar.set_message("buffering");

    // The display floor never moves backwards even when the engine
    // re-reports a smaller buffered set.
    let mut buffered = MonotonicFraction::new();

    let result = tokio::select! {
        r = drive_display(&mut events, &bar, &mut buffered, repeat) => r,
        _ = tokio::signal::ctrl_c() => {
            bar.abandon_with_message("interrupted");
            Ok(())
        }
    };

    player.clean_up().await;
    result
}

async fn drive_display(
    events: &mut broadcast::Receiver<PlayerEvent>,
    bar: &ProgressBar,
    buffered: &mut MonotonicFraction,
    repeat: bool,
) -> anyhow::Result<()> {
    loop {
        match events.recv().await {
            Ok(PlayerEvent::BufferingStarted) => bar.set_message("buffering"),
            Ok(PlayerEvent::ReadyToPlay) => bar.set_message("playing"),
            Ok(PlayerEvent::ProgressUpdated { fraction }) => {
                bar.set_position((fraction * 1000.0) as u64);
            }
            Ok(PlayerEvent::BufferedUpdated { fraction }) => {
                buffered.update(fraction);
                bar.set_message(format!("buffered {:>3.0}%", buffered.get() * 100.0));
            }
            Ok(PlayerEvent::DurationKnown { seconds }) => {
                bar.println(format!("  duration known: {seconds}s"));
            }
            Ok(PlayerEvent::VideoDimensionsKnown { width, height }) => {
                bar.println(format!("  dimensions: {width}x{height}"));
            }
            Ok(PlayerEvent::DidReachEnd) => {
                if repeat {
                    bar.set_position(0);
                    bar.set_message("replaying");
                } else {
                    bar.finish_with_message("done");
                    return Ok(());
                }
            }
            Ok(PlayerEvent::Failed { error }) => {
                bar.abandon_with_message("failed");
                anyhow::bail!("playback failed: {error}");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

/// Play a URL and print every emitted event as a JSON line
pub async fn events(url: &str, duration: f64) -> anyhow::Result<()> {
    let url = Url::parse(url).context("invalid media URL")?;

    let (player, mut events) = build_player(duration);
    let config = PlayerConfig::new(url, "event dump")
        .with_auto_play(true)
        .with_repeat(false);
    player.setup(config).await;

    let result = tokio::select! {
        r = dump_events(&mut events) => r,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };

    player.clean_up().await;
    result
}

async fn dump_events(events: &mut broadcast::Receiver<PlayerEvent>) -> anyhow::Result<()> {
    loop {
        match events.recv().await {
            Ok(event) => {
                println!("{}", serde_json::to_string(&event)?);
                if matches!(event, PlayerEvent::DidReachEnd | PlayerEvent::Failed { .. }) {
                    return Ok(());
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                eprintln!("lagged, {missed} events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}
