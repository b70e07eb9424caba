use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split};

use chainsql_core::{ChainEvent, ConnectorConfig, Consumer};
use chainsql_storage::{ChainDatabase, SqliteStorage, TableStore};

/// Feed a JSON-lines capture through the pipeline into the configured database.
/// Malformed lines are logged and skipped.
pub async fn run(config: &ConnectorConfig, file: &Path) -> Result<()> {
    let store = Arc::new(
        SqliteStorage::open(&config.database_url)
            .await
            .with_context(|| format!("open database '{}'", config.database_url))?,
    );
    let db = ChainDatabase::new(store.clone());
    db.prepare(config.wipe_on_startup).await?;

    let input = File::open(file)
        .await
        .with_context(|| format!("open replay file '{}'", file.display()))?;
    let consumer = Consumer::start(db, config)?;
    let Replayed { pushed, skipped } = replay(&consumer, BufReader::new(input)).await?;

    let stats = consumer.stats();
    tracing::info!(pushed, skipped, cycles = stats.cycles, "replay finished");

    println!("✓ Replayed {} events from {}", pushed, file.display());
    if skipped > 0 {
        println!("  {skipped} malformed lines skipped");
    }
    println!("  blocks           {}", stats.blocks_processed);
    println!("  irreversible     {}", stats.irreversible_blocks_processed);
    println!("  tx metadata      {}", stats.transaction_metadata_processed);
    println!("  tx traces        {}", stats.transaction_traces_processed);
    println!("  failed           {}", stats.items_failed);
    println!("  backpressure     {} sleeps", stats.backpressure_sleeps);

    let counts = store.counts().await?;
    println!(
        "  rows             {} blocks, {} transactions, {} actions, {} accounts",
        counts.blocks, counts.transactions, counts.actions, counts.accounts
    );
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Replayed {
    pushed: u64,
    skipped: u64,
}

/// Feed `reader` into `consumer`, then shut it down. The shutdown happens
/// even when reading or pushing fails part way, so events already queued are
/// still written before the error is returned.
async fn replay<R>(consumer: &Consumer, reader: R) -> Result<Replayed>
where
    R: AsyncBufRead + Unpin,
{
    let fed = feed(consumer, &mut reader.split(b'\n')).await;
    consumer.shutdown().await?;
    fed
}

/// Push every parseable line. Lines that are not UTF-8 or not a valid event
/// are logged and skipped; only read and push failures end the replay.
async fn feed<R>(consumer: &Consumer, lines: &mut Split<R>) -> Result<Replayed>
where
    R: AsyncBufRead + Unpin,
{
    let mut out = Replayed::default();
    let mut line_no = 0u64;

    while let Some(raw) = lines.next_segment().await.context("read replay file")? {
        line_no += 1;
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping line that is not UTF-8");
                out.skipped += 1;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ChainEvent>(line) {
            Ok(event) => {
                consumer
                    .push(event)
                    .await
                    .with_context(|| format!("push event from line {line_no}"))?;
                out.pushed += 1;
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed event");
                out.skipped += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainsql_storage::InMemoryStorage;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};
    use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

    const TRACE: &str =
        r#"{"kind":"transaction_trace","id":"t1","block_num":1,"block_time":1700000000}"#;

    /// A reader whose every read fails.
    struct BrokenReader;

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk gone")))
        }
    }

    fn start() -> (Arc<InMemoryStorage>, Consumer) {
        let store = Arc::new(InMemoryStorage::new());
        let consumer =
            Consumer::start(ChainDatabase::new(store.clone()), &ConnectorConfig::default())
                .unwrap();
        (store, consumer)
    }

    #[tokio::test]
    async fn bad_lines_are_skipped() {
        let (store, consumer) = start();
        let mut input = Vec::new();
        input.extend_from_slice(b"{not json}\n");
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"\n");
        input.extend_from_slice(TRACE.as_bytes());

        let replayed = replay(&consumer, BufReader::new(&input[..])).await.unwrap();
        assert_eq!(replayed, Replayed { pushed: 1, skipped: 2 });
        assert!(!consumer.is_running());
        assert!(store.transaction("t1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn read_error_still_drains_queued_events() {
        let (store, consumer) = start();
        let input = format!("{TRACE}\n");
        let reader = BufReader::new(input.as_bytes().chain(BrokenReader));

        let err = replay(&consumer, reader).await.unwrap_err();
        assert!(err.to_string().contains("read replay file"));
        assert!(!consumer.is_running());
        assert_eq!(consumer.stats().transaction_traces_processed, 1);
        assert!(store.transaction("t1").await.unwrap().is_some());
    }
}
