//! Metrics Client Demo
//! 
//! Streams a handful of records to a running metrics-ingest server, pausing
//! between writes so each record arrives as its own chunk. Finishes with a
//! record split across two writes, which the server reports as two invalid
//! chunks.
//!
//! Usage: cargo run --example metrics_client -- [addr]

use metrics_ingest::MetricsRecord;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let mut stream = TcpStream::connect(&addr).await?;
    tracing::info!("Connected to {}", addr);

    let samples = [
        MetricsRecord::new(12.5, 3.25),
        MetricsRecord::new(47.0, 3.5),
        MetricsRecord::new(88.25, 7.75),
    ];

    for record in &samples {
        stream.write_all(&record.encode()?).await?;
        tracing::info!("Sent cpu={:.2} memory={:.2}", record.cpu, record.memory);
        sleep(Duration::from_millis(200)).await;
    }

    stream.write_all(br#"{"cpu":1.0,"#).await?;
    sleep(Duration::from_millis(200)).await;
    stream.write_all(br#""memory":2.0}"#).await?;
    tracing::info!("Sent one record split across two writes");
    sleep(Duration::from_millis(200)).await;

    stream.shutdown().await?;
    tracing::info!("Disconnected");

    Ok(())
}
