//! A lightweight actor framework.
//!
//! Actors own their state exclusively. All mutations go through the
//! mailbox and are handled one message at a time, in arrival order.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;

pub use error::{CallError, MailboxClosed};
pub use handle::Actor;
pub use mailbox::Message;

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[derive(Default)]
    struct CounterState {
        value: u32,
    }

    #[derive(Debug)]
    struct AddMessage(u32);

    impl Message<CounterState> for AddMessage {
        fn handle(
            self,
            state: &mut CounterState,
            _handle: &Actor<CounterState>,
        ) {
            state.value += self.0;
        }
    }

    #[derive(Debug)]
    struct GetMessage(oneshot::Sender<u32>);

    impl Message<CounterState> for GetMessage {
        fn handle(
            self,
            state: &mut CounterState,
            _handle: &Actor<CounterState>,
        ) {
            self.0.send(state.value).unwrap();
        }
    }

    #[derive(Debug)]
    struct IgnoreMessage(#[allow(dead_code)] oneshot::Sender<u32>);

    impl Message<CounterState> for IgnoreMessage {
        fn handle(
            self,
            _state: &mut CounterState,
            _handle: &Actor<CounterState>,
        ) {
            // Drops the reply channel without answering.
        }
    }

    #[tokio::test]
    async fn test_send_message() {
        let actor = Actor::spawn(CounterState::default(), None);
        actor.send(AddMessage(42)).unwrap();

        let (tx, rx) = oneshot::channel();
        actor.send(GetMessage(tx)).unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_call() {
        let actor = Actor::spawn(CounterState::default(), Some("counter"));
        actor.send(AddMessage(1)).unwrap();
        actor.send(AddMessage(2)).unwrap();

        let value = actor.call(GetMessage).await.unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_call_dropped_reply() {
        let actor = Actor::spawn(CounterState::default(), None);
        let res = actor.call(IgnoreMessage).await;
        assert_eq!(res.unwrap_err(), CallError::DroppedReply);
    }
}
