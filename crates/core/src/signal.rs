//! Outbound UI notifications.

/// A fire-and-forget notification for the rendering collaborator.
///
/// Signals are emitted synchronously right after the state transition
/// they describe, on the session's own task. There is no reply channel
/// and the session never waits for the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiSignal {
    /// The timeline grew or its open message changed. The view should
    /// follow the newest content.
    ScrollToBottom,
    /// An error-debugging conversation just began. The chat surface
    /// should come to the front.
    Open,
    /// The user picked an apply action. The editor should take the
    /// candidate's suggested code.
    ApplyCodeSnippet {
        /// The snippet to apply, when the candidate carried one.
        code: Option<String>,
    },
}
