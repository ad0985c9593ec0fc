use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use sidekick_transport::{
    END_OF_TURN, ErrorKind, TransportAdapter, TransportError, TurnRequest,
    TurnStream,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeTransportError(ErrorKind);

impl Display for FakeTransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeTransportError {}

impl TransportError for FakeTransportError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug)]
struct FakeTurnStream {
    fake_chunks: VecDeque<String>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeTurnStream {
    fn new(input: &str) -> Self {
        let mut fake_chunks: VecDeque<String> = format!("You said {}", input)
            .split(" ")
            .map(|word| format!("{word} "))
            .collect();
        fake_chunks.push_back(END_OF_TURN.to_string());
        Self {
            fake_chunks,
            sleep: None,
        }
    }
}

impl TurnStream for FakeTurnStream {
    type Error = FakeTransportError;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<String>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if let Some(chunk) = this.fake_chunks.pop_front() {
                return Poll::Ready(Ok(Some(chunk)));
            }

            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_chunk(cx)
    }
}

struct FakeTransport;

impl TransportAdapter for FakeTransport {
    type Error = FakeTransportError;
    type Stream = FakeTurnStream;

    fn open_turn(
        &self,
        req: &TurnRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        let result = if req.user_text.is_empty() {
            Err(FakeTransportError(ErrorKind::Other))
        } else {
            Ok(FakeTurnStream::new(&req.user_text))
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    fn request(user_text: &str) -> TurnRequest {
        TurnRequest {
            session_id: "user:1".to_string(),
            user_text: user_text.to_string(),
            context: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_streaming() {
        let transport = FakeTransport;
        let mut stream =
            transport.open_turn(&request("Good morning")).await.unwrap();

        let mut chunks = Vec::new();
        loop {
            let chunk_fut =
                poll_fn(|cx| Pin::new(&mut stream).poll_next_chunk(cx));
            match chunk_fut.await {
                Ok(Some(chunk)) => chunks.push(chunk),
                Ok(None) => break,
                Err(err) => unreachable!("unexpected error: {err:?}"),
            }
        }

        // The sentinel arrives like any other chunk, in order.
        assert_eq!(chunks.last().map(String::as_str), Some(END_OF_TURN));
        let text: String =
            chunks[..chunks.len() - 1].iter().map(String::as_str).collect();
        assert_eq!(text, "You said Good morning ");
    }

    #[tokio::test]
    async fn test_error() {
        let transport = FakeTransport;
        let result = transport.open_turn(&request("")).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
