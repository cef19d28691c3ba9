//! Ordered batching relay between a log stream and the UI loop.
//!
//! Lines written to a [`RelayWriter`] come out of [`LineBatches`] in write
//! order, grouped into batches. A batch is flushed when `max_batch` lines are
//! buffered or when the flush interval elapses with at least one line
//! buffered, whichever happens first. Closing the writer flushes what is left
//! as one final batch and ends the batch sequence.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

use crate::error::StreamError;

/// One flush worth of lines, in write order.
pub type LineBatch = Vec<String>;

/// Producer side of the relay.
#[derive(Debug)]
pub struct RelayWriter {
    tx: mpsc::Sender<String>,
}

/// Consumer side of the relay.
#[derive(Debug)]
pub struct LineBatches {
    rx: mpsc::Receiver<LineBatch>,
}

/// Create a relay and spawn its flush task on the current tokio runtime.
pub fn channel(interval: Duration, max_batch: usize) -> (RelayWriter, LineBatches) {
    let max_batch = max_batch.max(1);
    let (line_tx, line_rx) = mpsc::channel(max_batch);
    let (batch_tx, batch_rx) = mpsc::channel(1);

    tokio::spawn(run(interval, max_batch, line_rx, batch_tx));

    (RelayWriter { tx: line_tx }, LineBatches { rx: batch_rx })
}

impl RelayWriter {
    /// Append a line. Fails only when the consumer side is gone.
    pub async fn write(&self, line: impl Into<String>) -> Result<(), StreamError> {
        self.tx
            .send(line.into())
            .await
            .map_err(|_| StreamError::Closed)
    }

    /// Flush the remaining lines and end the batch sequence.
    pub fn close(self) {
        drop(self.tx);
    }
}

impl LineBatches {
    /// Next batch, or `None` once the writer is closed and everything is drained.
    pub async fn next(&mut self) -> Option<LineBatch> {
        self.rx.recv().await
    }
}

async fn run(
    interval: Duration,
    max_batch: usize,
    mut lines: mpsc::Receiver<String>,
    batches: mpsc::Sender<LineBatch>,
) {
    let mut buffer: LineBatch = Vec::with_capacity(max_batch);
    let mut tick = tokio::time::interval_at(Instant::now() + interval, interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    buffer.push(line);
                    if buffer.len() >= max_batch {
                        if !flush(&mut buffer, &batches).await {
                            return;
                        }
                        tick.reset();
                    }
                }
                None => {
                    flush(&mut buffer, &batches).await;
                    return;
                }
            },
            _ = tick.tick() => {
                if !buffer.is_empty() && !flush(&mut buffer, &batches).await {
                    return;
                }
            }
        }
    }
}

/// Returns false when the consumer has gone away.
async fn flush(buffer: &mut LineBatch, batches: &mpsc::Sender<LineBatch>) -> bool {
    if buffer.is_empty() {
        return true;
    }
    let batch = std::mem::take(buffer);
    trace!(lines = batch.len(), "flushing batch");
    batches.send(batch).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(mut batches: LineBatches) -> tokio::task::JoinHandle<Vec<LineBatch>> {
        tokio::spawn(async move {
            let mut out = Vec::new();
            while let Some(batch) = batches.next().await {
                out.push(batch);
            }
            out
        })
    }

    fn numbered(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{:02}", i)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_by_size() {
        let (writer, batches) = channel(Duration::from_secs(60), 5);
        let collector = collect(batches);

        for line in numbered(0..15) {
            writer.write(line).await.unwrap();
        }
        writer.close();

        let out = collector.await.unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|batch| batch.len() == 5));
        assert_eq!(out.concat(), numbered(0..15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_by_time() {
        let (writer, batches) = channel(Duration::from_millis(100), 10);
        let collector = collect(batches);

        for line in numbered(0..5) {
            writer.write(line).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(188)).await;
        for line in numbered(5..10) {
            writer.write(line).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(188)).await;
        writer.close();

        let out = collector.await.unwrap();
        assert_eq!(out, vec![numbered(0..5), numbered(5..10)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_batch_waits_for_more() {
        let (writer, mut batches) = channel(Duration::from_millis(100), 4);

        for line in numbered(0..4) {
            writer.write(line).await.unwrap();
        }
        assert_eq!(batches.next().await, Some(numbered(0..4)));

        // Nothing buffered: idle ticks must not produce empty batches.
        tokio::time::sleep(Duration::from_millis(350)).await;
        writer.write("04").await.unwrap();
        assert_eq!(batches.next().await, Some(numbered(4..5)));

        writer.close();
        assert_eq!(batches.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_remainder_once() {
        let (writer, batches) = channel(Duration::from_secs(60), 100);
        let collector = collect(batches);

        for line in numbered(0..3) {
            writer.write(line).await.unwrap();
        }
        writer.close();

        assert_eq!(collector.await.unwrap(), vec![numbered(0..3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_under_bursts() {
        let (writer, batches) = channel(Duration::from_millis(50), 7);
        let collector = collect(batches);

        let lines = numbered(0..300);
        for (i, line) in lines.iter().enumerate() {
            writer.write(line.clone()).await.unwrap();
            if i % 13 == 0 {
                tokio::time::sleep(Duration::from_millis(i as u64 % 70)).await;
            }
        }
        writer.close();

        let out = collector.await.unwrap();
        assert!(out.iter().all(|batch| !batch.is_empty() && batch.len() <= 7));
        assert_eq!(out.concat(), lines);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_fails_after_consumer_dropped() {
        let (writer, batches) = channel(Duration::from_millis(10), 1);
        drop(batches);

        // The first line may still be accepted before the flush task notices.
        let mut failed = false;
        for line in numbered(0..10) {
            if writer.write(line).await.is_err() {
                failed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(failed);
    }
}
