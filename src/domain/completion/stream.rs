//! Cancellable producer/consumer handoff between a provider and the relay

use tokio::sync::mpsc;

use super::CompletionChunk;

/// Default number of chunks buffered between producer and consumer
pub const DEFAULT_STREAM_BUFFER: usize = 10;

/// Consumer side of an upstream token stream.
///
/// Dropping the stream tells the producer to stop, which is how the upstream
/// connection is released when the client goes away.
#[derive(Debug)]
pub struct CompletionStream {
    rx: mpsc::Receiver<CompletionChunk>,
}

/// Producer side of an upstream token stream.
///
/// The terminal operations consume the sender, so at most one `done` or
/// error chunk can ever be produced.
#[derive(Debug)]
pub struct ChunkSender {
    tx: mpsc::Sender<CompletionChunk>,
}

impl CompletionStream {
    /// Create a connected sender/stream pair
    pub fn channel(buffer: usize) -> (ChunkSender, CompletionStream) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (ChunkSender { tx }, CompletionStream { rx })
    }

    /// Receive the next chunk; `None` once the producer is gone
    pub async fn next(&mut self) -> Option<CompletionChunk> {
        self.rx.recv().await
    }
}

#[cfg(test)]
impl CompletionStream {
    /// Stream that yields the given chunks and then ends
    pub fn from_chunks(chunks: Vec<CompletionChunk>) -> Self {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.try_send(chunk).expect("channel sized to hold every chunk");
        }
        CompletionStream { rx }
    }
}

impl ChunkSender {
    /// Forward a content chunk. Returns `false` once the consumer is gone.
    pub async fn content(&self, content: impl Into<String>) -> bool {
        self.tx.send(CompletionChunk::content(content)).await.is_ok()
    }

    /// Send the terminal chunk
    pub async fn finish(self, token_usage: u32) -> bool {
        self.tx.send(CompletionChunk::done(token_usage)).await.is_ok()
    }

    /// Send an in-band error and end the stream
    pub async fn fail(self, message: impl Into<String>) -> bool {
        self.tx.send(CompletionChunk::failed(message)).await.is_ok()
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the consumer has gone away
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let (tx, mut stream) = CompletionStream::channel(4);

        tokio::spawn(async move {
            tx.content("a").await;
            tx.content("b").await;
            tx.finish(3).await;
        });

        assert_eq!(stream.next().await, Some(CompletionChunk::content("a")));
        assert_eq!(stream.next().await, Some(CompletionChunk::content("b")));
        assert_eq!(stream.next().await, Some(CompletionChunk::done(3)));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_producer_observes_dropped_consumer() {
        let (tx, stream) = CompletionStream::channel(1);

        drop(stream);

        assert!(tx.is_closed());
        assert!(!tx.content("late").await);
    }

    #[tokio::test]
    async fn test_drop_wakes_waiting_producer() {
        let (tx, stream) = CompletionStream::channel(1);
        let producer = tokio::spawn(async move { tx.closed().await });

        drop(stream);

        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_from_chunks() {
        let mut stream = CompletionStream::from_chunks(vec![
            CompletionChunk::content("x"),
            CompletionChunk::done(1),
        ]);

        assert_eq!(stream.next().await, Some(CompletionChunk::content("x")));
        assert_eq!(stream.next().await, Some(CompletionChunk::done(1)));
        assert_eq!(stream.next().await, None);
    }
}
