//! Demo: stream new comments (or submissions with STREAM_KIND=submission) and log matches until Ctrl-C.

use reddit_stream::ingest::config::load_settings_default;
use reddit_stream::{ItemKind, RedditClient, RedditStream, StreamEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    reddit_stream::logging::init_tracing();

    let settings = load_settings_default()?;
    let kind = match std::env::var("STREAM_KIND").as_deref() {
        Ok("submission") => ItemKind::Submission,
        _ => ItemKind::Comment,
    };

    let stream = RedditStream::new(RedditClient::from_env()?).with_drift(settings.drift_secs);
    let mut sink = stream.open(kind, &settings.scope, settings.to_options())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            ev = sink.recv() => match ev {
                Some(StreamEvent::Comment(m)) | Some(StreamEvent::Submission(m)) => {
                    tracing::info!(
                        id = %m.item.id,
                        author = m.item.author.as_deref().unwrap_or("?"),
                        matched = %m.matched.matched,
                        "match"
                    );
                }
                Some(StreamEvent::Error(e)) => tracing::warn!("{e}"),
                Some(_) => {}
                None => break,
            }
        }
    }

    sink.shutdown().await;
    println!("stream-demo done");
    Ok(())
}
