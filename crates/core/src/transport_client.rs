use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use sidekick_transport::{
    TransportAdapter, TransportError, TurnRequest, TurnStream,
};
use tracing::Instrument;

pub(crate) type TurnResult = Result<(), Box<dyn TransportError>>;
type BoxedRunTurnFuture =
    Pin<Box<dyn Future<Output = TurnResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(TurnRequest, Box<dyn Fn(String) + Send + 'static>)
        -> BoxedRunTurnFuture + Send + Sync
>;

/// A wrapper around a transport adapter that drives the chunk stream
/// of each turn and provides a type-erased interface for the session.
#[derive(Clone)]
pub(crate) struct TransportClient {
    handler_fn: HandlerFn,
}

impl TransportClient {
    #[inline]
    pub(crate) fn new<A: TransportAdapter + 'static>(adapter: A) -> Self {
        // We have to erase the type `A`, since the session doesn't have
        // a generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_chunk| {
            let fut = adapter.open_turn(&req);
            Box::pin(
                async move {
                    trace!("opening a turn: {req:?}");
                    let stream_or_err = fut.await;
                    drive_stream::<A>(stream_or_err, on_chunk).await
                }
                .instrument(trace_span!("turn")),
            )
        });
        Self { handler_fn }
    }

    /// Runs one turn to completion, invoking `on_chunk` for every chunk
    /// the stream yields, reserved values included.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The stream stops being polled when
    /// this operation is cancelled.
    #[inline]
    pub(crate) async fn run_turn(
        &self,
        req: TurnRequest,
        on_chunk: impl Fn(String) + Send + 'static,
    ) -> TurnResult {
        (self.handler_fn)(req, Box::new(on_chunk)).await
    }
}

async fn drive_stream<A: TransportAdapter + 'static>(
    stream_or_err: Result<A::Stream, A::Error>,
    on_chunk: Box<dyn Fn(String) + Send + 'static>,
) -> TurnResult {
    let stream = match stream_or_err {
        Ok(stream) => stream,
        Err(err) => {
            error!("failed to open the turn: {err:?}");
            return Err(Box::new(err));
        }
    };

    trace!("start receiving chunks");

    let mut pinned_stream = pin!(stream);
    loop {
        let chunk_or_err =
            poll_fn(|cx| pinned_stream.as_mut().poll_next_chunk(cx)).await;
        let chunk = match chunk_or_err {
            Ok(chunk) => chunk,
            Err(err) => {
                error!("the turn stream failed: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(chunk) = chunk else {
            break;
        };
        trace!("got a chunk ({} bytes)", chunk.len());
        on_chunk(chunk);
    }

    trace!("the turn settled");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use sidekick_test_transport::{PresetTurn, TestTransport};
    use sidekick_transport::{END_OF_TURN, ErrorKind};

    use super::*;

    fn request() -> TurnRequest {
        TurnRequest {
            session_id: "user:1".to_owned(),
            user_text: "Hi".to_owned(),
            context: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_run_turn() {
        let transport = TestTransport::default();
        transport.add_turn(PresetTurn::with_chunks([
            "How ", "", "are ", "you?", END_OF_TURN,
        ]));

        let client = TransportClient::new(transport);
        let chunks = Arc::new(Mutex::new(Vec::new()));
        client
            .run_turn(request(), {
                let chunks = Arc::clone(&chunks);
                move |chunk| chunks.lock().unwrap().push(chunk)
            })
            .await
            .unwrap();

        // Every chunk is surfaced in order, reserved values included.
        assert_eq!(
            *chunks.lock().unwrap(),
            ["How ", "", "are ", "you?", END_OF_TURN]
        );
    }

    #[tokio::test]
    async fn test_error_handling() {
        let transport = TestTransport::default();
        transport.add_turn(PresetTurn::refused());

        let client = TransportClient::new(transport);
        let err = client.run_turn(request(), |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Disconnected);
    }
}
