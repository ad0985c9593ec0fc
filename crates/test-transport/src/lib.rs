//! A local fake transport for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use sidekick_transport::{
    ErrorKind, TransportAdapter, TransportError, TurnRequest, TurnStream,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl TransportError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestTurnStream {
    chunks: VecDeque<String>,
    fail_after: Option<usize>,
    streamed: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TurnStream for TestTurnStream {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<String>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if this.fail_after.is_some_and(|n| this.streamed >= n) {
                return Poll::Ready(Err(Error {
                    message: "scripted mid-stream failure",
                    kind: ErrorKind::Disconnected,
                }));
            }

            let Some(chunk) = this.chunks.pop_front() else {
                return Poll::Ready(Ok(None));
            };
            this.streamed += 1;
            return Poll::Ready(Ok(Some(chunk)));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_chunk(cx)
    }
}

#[derive(Default)]
struct Inner {
    turns: Mutex<Vec<PresetTurn>>,
    next_turn: AtomicUsize,
    requests: Mutex<Vec<TurnRequest>>,
    delay: Mutex<Option<Duration>>,
}

/// A local fake transport for testing purpose.
///
/// Before opening turns, you need to script how the backend should
/// respond. Scripted turns are served in the order they were added;
/// opening more turns than the script has fails the call.
///
/// Clones share the script, the turn cursor and the captured requests,
/// so tests can keep one handle for assertions while the session owns
/// another.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy
/// memory copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestTransport {
    inner: Arc<Inner>,
}

impl TestTransport {
    #[inline]
    pub fn add_turn(&self, preset: PresetTurn) {
        self.inner.turns.lock().unwrap().push(preset);
    }

    #[inline]
    pub fn set_delay(&self, duration: Duration) {
        *self.inner.delay.lock().unwrap() = Some(duration);
    }

    /// Returns the requests captured by `open_turn` so far, in order.
    #[inline]
    pub fn requests(&self) -> Vec<TurnRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

impl TransportAdapter for TestTransport {
    type Error = crate::Error;
    type Stream = TestTurnStream;

    fn open_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        self.inner.requests.lock().unwrap().push(req.clone());

        let turn_idx = self.inner.next_turn.fetch_add(1, Ordering::Relaxed);
        let turns = self.inner.turns.lock().unwrap();
        let result = match turns.get(turn_idx) {
            None => Err(Error {
                message: "no more scripted turns",
                kind: ErrorKind::Other,
            }),
            Some(preset) if preset.refuse => Err(Error {
                message: "scripted refusal",
                kind: ErrorKind::Disconnected,
            }),
            Some(preset) => Ok(TestTurnStream {
                chunks: preset.chunks.clone().into(),
                fail_after: preset.fail_after,
                streamed: 0,
                delay: self
                    .inner
                    .delay
                    .lock()
                    .unwrap()
                    .unwrap_or(Duration::from_millis(1)),
                sleep: None,
            }),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use sidekick_transport::END_OF_TURN;

    use super::*;

    fn request(user_text: &str) -> TurnRequest {
        TurnRequest {
            session_id: "user:1".to_string(),
            user_text: user_text.to_string(),
            context: Default::default(),
        }
    }

    async fn collect_chunks(
        stream: TestTurnStream,
    ) -> Result<Vec<String>, Error> {
        let mut stream = pin!(stream);
        let mut chunks = Vec::new();
        loop {
            let chunk = poll_fn(|cx| stream.as_mut().poll_next_chunk(cx))
                .await?;
            match chunk {
                Some(chunk) => chunks.push(chunk),
                None => break,
            }
        }
        Ok(chunks)
    }

    #[tokio::test]
    async fn test_scripted_turns() {
        let transport = TestTransport::default();
        transport.add_turn(PresetTurn::with_chunks([
            "Hello, ",
            "world!",
            END_OF_TURN,
        ]));
        transport.add_turn(PresetTurn::with_chunks(["Bye.", END_OF_TURN]));

        let stream = transport.open_turn(&request("Hi")).await.unwrap();
        let chunks = collect_chunks(stream).await.unwrap();
        assert_eq!(chunks, ["Hello, ", "world!", END_OF_TURN]);

        let stream = transport.open_turn(&request("Bye")).await.unwrap();
        let chunks = collect_chunks(stream).await.unwrap();
        assert_eq!(chunks, ["Bye.", END_OF_TURN]);

        // The script is exhausted now.
        let err = transport.open_turn(&request("More")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_midstream_failure() {
        let transport = TestTransport::default();
        transport.add_turn(
            PresetTurn::with_chunks(["Partial"]).failing_after(1),
        );

        let stream = transport.open_turn(&request("Hi")).await.unwrap();
        let err = collect_chunks(stream).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disconnected);
    }

    #[tokio::test]
    async fn test_request_capture() {
        let transport = TestTransport::default();
        transport.add_turn(PresetTurn::refused());

        let shared = transport.clone();
        let err = transport.open_turn(&request("Hi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disconnected);

        let requests = shared.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_text, "Hi");
    }
}
