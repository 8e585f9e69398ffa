//! Fetches a URL twice through the cache and a persistent cookie jar.
//!
//! Usage: `cargo run --example fetch_cached -- https://example.com/ [cookies.json]`
use std::time::Instant;

use gosub_net::cache::CacheConfig;
use gosub_net::cookies::read_jar;
use gosub_net::retry::RetryConfig;
use gosub_net::{ClientConfig, HttpClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: fetch_cached <url> [cookie-file]"))?;
    let cookie_file = args.next().unwrap_or_else(|| "cookies.json".to_string());

    let config = ClientConfig::builder()
        .retry(RetryConfig::default().with_max_retries(4))
        .cache(CacheConfig::default().with_ttl_seconds(120))
        .cookie_file(cookie_file)
        .build()?;
    let client = HttpClient::from_config(config)?;

    for round in 1..=2 {
        let started = Instant::now();
        let response = client.get(&url).await?;
        println!(
            "round {round}: {} {} ({} bytes) in {:?}",
            response.status,
            response.status_text,
            response.body.len(),
            started.elapsed()
        );
    }

    for cookie in read_jar(&client.cookie_jar()).all_cookies() {
        println!("cookie {}={} domain={} path={}", cookie.name, cookie.value, cookie.domain, cookie.path);
    }

    Ok(())
}
