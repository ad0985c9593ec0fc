use sidekick_transport::TransportAdapter;

use super::state::SignalFn;
use super::{Session, UserId};
use crate::signal::UiSignal;
use crate::transport_client::TransportClient;

/// [`Session`] builder.
pub struct SessionBuilder {
    pub(crate) transport: TransportClient,
    pub(crate) user: UserId,
    pub(crate) greeting: Option<String>,
    pub(crate) on_signal: Option<SignalFn>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified transport adapter.
    #[inline]
    pub fn with_transport<A: TransportAdapter + 'static>(adapter: A) -> Self {
        Self {
            transport: TransportClient::new(adapter),
            user: UserId::new("anonymous"),
            greeting: None,
            on_signal: None,
        }
    }

    /// Sets the identity of the user driving the session.
    #[inline]
    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = user;
        self
    }

    /// Seeds an assistant greeting as the first message of every
    /// conversation this session starts.
    #[inline]
    pub fn with_greeting<S: Into<String>>(mut self, greeting: S) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Attaches a callback to be invoked on every UI signal.
    #[inline]
    pub fn on_signal(
        mut self,
        on_signal: impl Fn(UiSignal) + Send + Sync + 'static,
    ) -> Self {
        self.on_signal = Some(Box::new(on_signal));
        self
    }

    /// Builds the session.
    ///
    /// This spawns the session actor and must be called within a tokio
    /// runtime.
    #[inline]
    pub fn build(self) -> Session {
        Session::spawn_from_builder(self)
    }
}
