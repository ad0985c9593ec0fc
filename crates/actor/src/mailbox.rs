use std::fmt::Debug;
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;

use crate::{Actor, MailboxClosed};

/// The message that an actor can handle.
pub trait Message<S>: Send + Debug + 'static {
    /// Handles the message with mutable access to the actor's state.
    ///
    /// `handle` addresses the running actor itself, so handlers can
    /// enqueue follow-up messages from tasks they spawn.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

/// Object-safe view of [`Message`] for queueing.
pub(crate) trait DynMessage<S>: Send + Debug {
    fn dispatch(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> DynMessage<S> for M {
    #[inline]
    fn dispatch(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}

pub(crate) struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<Box<dyn DynMessage<S>>>,
}

impl<S: Send + 'static> Mailbox<S> {
    #[inline]
    pub(crate) fn new() -> (
        Arc<Self>,
        mpsc::UnboundedReceiver<Box<dyn DynMessage<S>>>,
    ) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        (Arc::new(Mailbox { msg_tx }), msg_rx)
    }

    #[inline]
    pub(crate) fn send(
        &self,
        msg: Box<dyn DynMessage<S>>,
    ) -> Result<(), MailboxClosed> {
        self.msg_tx.send(msg).map_err(|_| MailboxClosed)
    }
}

/// Drains the mailbox until every handle to the actor is gone.
///
/// The loop holds only a weak reference to the mailbox. Once all
/// strong handles (including clones captured by in-flight tasks) are
/// dropped, the sender side closes and the loop stops.
pub(crate) async fn run<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<Box<dyn DynMessage<S>>>,
) {
    debug!("the actor started");

    while let Some(msg) = msg_rx.recv().await {
        trace!("received message: {msg:?}");
        let Some(mailbox) = mailbox.upgrade() else {
            warn!("every handle is gone, the message will not be handled");
            break;
        };
        let handle = Actor::from_mailbox(mailbox);
        trace_span!("handle message")
            .in_scope(|| msg.dispatch(&mut state, &handle));
    }

    debug!("the actor is stopping");
}
