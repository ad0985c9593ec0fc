use serde::{Deserialize, Serialize};

/// The scripted reply for one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetTurn {
    /// Chunks to stream, in order. Include
    /// [`sidekick_transport::END_OF_TURN`] yourself when the scripted
    /// backend is supposed to close the turn cleanly.
    pub chunks: Vec<String>,
    /// If set, the stream fails after this many chunks were streamed.
    /// `Some(0)` means the stream fails before producing anything.
    pub fail_after: Option<usize>,
    /// If set, opening the turn fails outright.
    pub refuse: bool,
}

impl PresetTurn {
    /// Creates a `PresetTurn` that streams the specified chunks.
    #[inline]
    pub fn with_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Creates a `PresetTurn` that cannot even be opened.
    #[inline]
    pub fn refused() -> Self {
        Self {
            refuse: true,
            ..Default::default()
        }
    }

    /// Makes the stream fail after `streamed` chunks.
    #[inline]
    pub fn failing_after(mut self, streamed: usize) -> Self {
        self.fail_after = Some(streamed);
        self
    }
}
