use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::mailbox::{self, Mailbox};
use crate::{CallError, MailboxClosed, Message};

/// Handle to an actor.
///
/// Handles are cheap to clone. The actor keeps running until every
/// handle to it (including clones captured by in-flight tasks) has
/// been dropped.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor with the specified state and an optional
    /// label for tracing.
    pub fn spawn(state: S, label: Option<&str>) -> Self {
        let (mailbox, msg_rx) = Mailbox::new();
        tokio::spawn(
            mailbox::run(Arc::downgrade(&mailbox), state, msg_rx)
                .instrument(trace_span!("actor", label = label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor without waiting for it to be
    /// handled.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), MailboxClosed> {
        self.mailbox.send(Box::new(msg))
    }

    /// Sends a message built around a reply channel and waits for the
    /// reply.
    ///
    /// The closure receives the sender half of the channel and must
    /// embed it into the message it returns. The handler may answer
    /// immediately or hand the sender off to a later message; either
    /// way this method resolves when the reply arrives.
    pub async fn call<R, M, F>(&self, make_msg: F) -> Result<R, CallError>
    where
        M: Message<S>,
        F: FnOnce(oneshot::Sender<R>) -> M,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make_msg(reply_tx))
            .map_err(|_| CallError::Closed)?;
        reply_rx.await.map_err(|_| CallError::DroppedReply)
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
