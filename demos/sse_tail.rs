//! Tails a Server-Sent Events stream and prints every event.
//!
//! Usage: `cargo run --example sse_tail -- https://example.com/events`
use gosub_net::sse::SseMessage;
use gosub_net::{ClientConfig, HttpClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: sse_tail <url>"))?;
    let url = url::Url::parse(&url)?;

    let client = HttpClient::from_config(ClientConfig::builder().user_agent("GosubNet-sse-tail/0.1").build()?)?;
    let mut source = client.event_source(url);
    log::info!("stream {} started", source.id());

    while let Some(message) = source.recv().await {
        match message {
            SseMessage::Open => println!("-- connected"),
            SseMessage::Event(event) if event.is_keep_alive() => log::debug!("keep-alive"),
            SseMessage::Event(event) => {
                println!(
                    "[{}] {}: {}",
                    event.id.as_deref().unwrap_or("-"),
                    event.event_type(),
                    event.data.as_deref().unwrap_or("")
                );
            }
            SseMessage::Error(e) => println!("-- connection lost: {e}"),
            SseMessage::Terminated(e) => {
                println!("-- stream terminated: {e}");
                break;
            }
        }
    }

    Ok(())
}
