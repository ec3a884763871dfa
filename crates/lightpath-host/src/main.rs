use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use lightpath_core::config::SimConfig;
use lightpath_host::protocol::{HostEvent, ParseError, parse_line};
use lightpath_host::sink::{FrameFormat, spawn_frame_writer};
use lightpath_host::spawn_session;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = SimConfig::load();
    let format = match std::env::var("LIGHTPATH_FRAME_FORMAT").as_deref() {
        Ok("full") => FrameFormat::Full,
        _ => FrameFormat::Summary,
    };
    tracing::info!(
        arena_width = config.arena_width,
        arena_height = config.arena_height,
        tick_ms = config.tick_ms,
        ?format,
        "Lightpath starting"
    );

    // Blocking stdout writes stay off the session task.
    let stdout = std::io::BufWriter::new(std::io::stdout());
    let (sink, writer) = spawn_frame_writer(stdout, format);
    let (session, task) = spawn_session(config, sink);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            },
        };
        let sent = match parse_line(&line) {
            Ok(HostEvent::Key(event)) => session.key(event),
            Ok(HostEvent::Collision(event)) => session.collision(event),
            Ok(HostEvent::Quit) => break,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                tracing::warn!(error = %e, line = %line, "Ignoring input line");
                continue;
            },
        };
        if let Err(e) = sent {
            tracing::error!(error = %e, "Input dropped");
            break;
        }
    }

    session.stop();
    match task.await {
        Ok(stats) => tracing::info!(?stats, "Lightpath stopped"),
        Err(e) => tracing::error!(error = %e, "Simulation task failed"),
    }
    match writer.await {
        Ok(out) if out.write_errors() > 0 => {
            tracing::warn!(errors = out.write_errors(), "Some frames were not written")
        },
        Ok(_) => {},
        Err(e) => tracing::error!(error = %e, "Frame writer failed"),
    }
}
