use serde_json::Value;
use sidekick_actor::{Actor, Message};
use sidekick_transport::{
    NodeError, SchemaSummary, TurnContext, TurnRequest,
};
use tokio::sync::oneshot;

use super::{
    SessionError, SessionId, SessionSnapshot, TurnKind, UserId,
};
use crate::merge::{self, MergeOutcome};
use crate::signal::UiSignal;
use crate::suggest::{self, ActionKind, SuggestionSet};
use crate::timeline::{MessageBody, MessageId, MessageSender, Timeline};
use crate::transport_client::{TransportClient, TurnResult};

pub(crate) type SignalFn = Box<dyn Fn(UiSignal) + Send + Sync>;

type TurnReply = oneshot::Sender<Result<(), SessionError>>;

/// Identifies one turn within the session, monotonically.
///
/// Chunks fed by the session's own turn driver carry the id of the
/// turn their stream belongs to, so a replaced turn can never write
/// into its successor even within the same conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct TurnId(u64);

struct ActiveTurn {
    id: TurnId,
    kind: TurnKind,
    reply: Option<TurnReply>,
}

pub(super) struct SessionState {
    transport: TransportClient,
    user: UserId,
    greeting: Option<String>,
    on_signal: Option<SignalFn>,

    timeline: Timeline,
    session_id: SessionId,
    title: Option<String>,
    context: TurnContext,
    pending_suggestions: Option<SuggestionSet>,
    active_turn: Option<ActiveTurn>,

    conversation_seq: u64,
    next_turn: u64,
}

impl SessionState {
    pub(super) fn new(
        transport: TransportClient,
        user: UserId,
        greeting: Option<String>,
        on_signal: Option<SignalFn>,
    ) -> Self {
        let session_id = SessionId::for_conversation(&user, 0);
        let mut state = Self {
            transport,
            user,
            greeting,
            on_signal,
            timeline: Timeline::new(),
            session_id,
            title: None,
            context: TurnContext::default(),
            pending_suggestions: None,
            active_turn: None,
            conversation_seq: 0,
            next_turn: 0,
        };
        state.reset_conversation(None);
        state
    }

    /// Throws the current conversation away and sets up the next one.
    ///
    /// Dropping the active turn drops its reply channel, which is how
    /// the awaiting caller observes the abandonment. Whatever the old
    /// turn's stream still delivers goes stale by the id change.
    fn reset_conversation(&mut self, debug_error: Option<&NodeError>) {
        self.active_turn = None;
        self.pending_suggestions = None;
        self.timeline = Timeline::new();
        self.context = TurnContext::default();

        self.conversation_seq += 1;
        (self.session_id, self.title) = match debug_error {
            Some(error) => (
                SessionId::for_error(&self.user, error.timestamp),
                Some(error.message.clone()),
            ),
            None => (
                SessionId::for_conversation(&self.user, self.conversation_seq),
                None,
            ),
        };
        debug!("conversation reset, now {}", self.session_id);

        if let Some(greeting) = self.greeting.clone() {
            self.timeline.push(
                MessageSender::Assistant,
                MessageBody::Text(greeting),
                false,
            );
            self.emit(UiSignal::ScrollToBottom);
        }
    }

    /// Opens a turn and spawns the task that drives its chunk stream.
    fn begin_turn(
        &mut self,
        user_text: String,
        render_user_message: bool,
        kind: TurnKind,
        reply: TurnReply,
        handle: &Actor<Self>,
    ) {
        if self.active_turn.is_some() {
            reply.send(Err(SessionError::TurnInProgress)).ok();
            return;
        }

        // Moving on invalidates whatever suggestion prompts are up.
        self.discard_suggestions();

        if render_user_message {
            self.timeline.push(
                MessageSender::User,
                MessageBody::Text(user_text.clone()),
                false,
            );
            self.emit(UiSignal::ScrollToBottom);
        }

        self.next_turn += 1;
        let turn = TurnId(self.next_turn);
        self.active_turn = Some(ActiveTurn {
            id: turn,
            kind,
            reply: Some(reply),
        });
        debug!("starting a {kind:?} turn");

        let req = TurnRequest {
            session_id: self.session_id.as_str().to_owned(),
            user_text,
            context: self.context.clone(),
        };

        let transport = self.transport.clone();
        let session_id = self.session_id.clone();
        let chunk_session_id = session_id.clone();
        let settle_handle = handle.clone();
        let chunk_handle = handle.clone();
        tokio::spawn(async move {
            let result = transport
                .run_turn(req, move |chunk| {
                    chunk_handle
                        .send(ChunkArrived {
                            session_id: chunk_session_id.clone(),
                            turn: Some(turn),
                            chunk,
                            reply: None,
                        })
                        .ok();
                })
                .await;
            settle_handle
                .send(TurnSettled {
                    session_id,
                    turn,
                    result,
                })
                .ok();
        });
    }

    /// Folds one inbound chunk into the timeline.
    ///
    /// Chunks must pass the staleness checks first: the conversation
    /// tag has to match, a turn has to be open, and a chunk tagged
    /// with a turn id has to belong to the active turn. Stale chunks
    /// are dropped without an error.
    fn fold_chunk(
        &mut self,
        tag: &SessionId,
        turn: Option<TurnId>,
        chunk: &str,
    ) -> Result<(), SessionError> {
        if *tag != self.session_id {
            trace!("dropping a chunk of an abandoned conversation");
            return Ok(());
        }
        let Some(active) = &self.active_turn else {
            trace!("dropping a chunk, no turn is open");
            return Ok(());
        };
        if turn.is_some_and(|id| id != active.id) {
            trace!("dropping a chunk of a replaced turn");
            return Ok(());
        }

        let kind = active.kind;
        let outcome = match kind {
            TurnKind::Text => merge::apply_text(&mut self.timeline, chunk),
            TurnKind::Structured => {
                merge::apply_structured(&mut self.timeline, chunk)
                    .map_err(SessionError::MalformedPayload)?
            }
        };
        match outcome {
            MergeOutcome::Ignored => {}
            MergeOutcome::Appended(_) | MergeOutcome::Updated(_) => {
                self.emit(UiSignal::ScrollToBottom);
            }
            MergeOutcome::TurnClosed(open) => {
                self.finish_turn(Ok(()));
                if kind == TurnKind::Structured {
                    self.offer_suggestions(open);
                }
            }
        }
        Ok(())
    }

    /// Closes the active turn and resolves its awaiting caller.
    fn finish_turn(&mut self, result: Result<(), SessionError>) {
        self.timeline.close_open();
        let Some(mut turn) = self.active_turn.take() else {
            return;
        };
        if let Some(reply) = turn.reply.take() {
            reply.send(result).ok();
        }
    }

    /// Registers the suggestions carried by the message a structured
    /// turn just closed, appending their transient prompts.
    fn offer_suggestions(&mut self, closed: Option<MessageId>) {
        let Some(id) = closed else {
            return;
        };
        let Some(candidates) = self
            .timeline
            .get(id)
            .and_then(|msg| msg.body.as_structured())
            .and_then(suggest::parse_candidates)
        else {
            debug!("the closing payload carries no usable suggestions");
            return;
        };

        let set = suggest::present(&mut self.timeline, candidates);
        self.pending_suggestions = Some(set);
        self.emit(UiSignal::ScrollToBottom);
    }

    fn select_action(
        &mut self,
        index: usize,
        reply: TurnReply,
        handle: &Actor<Self>,
    ) {
        if self.active_turn.is_some() {
            reply.send(Err(SessionError::TurnInProgress)).ok();
            return;
        }
        let Some(set) = &self.pending_suggestions else {
            reply.send(Err(SessionError::NoPendingSuggestion)).ok();
            return;
        };
        let Some(action) = set.actions.get(index) else {
            reply.send(Err(SessionError::NoPendingSuggestion)).ok();
            return;
        };

        match action.key {
            ActionKind::ApplyCode => {
                // Actions map to candidates by position. Applying
                // keeps the prompts up.
                let code = set
                    .candidates
                    .get(index)
                    .and_then(|candidate| candidate.code_snippet.clone());
                self.emit(UiSignal::ApplyCodeSnippet { code });
                reply.send(Ok(())).ok();
            }
            ActionKind::AskAgain => {
                let label = action.label.clone();
                self.discard_suggestions();
                self.begin_turn(label, true, TurnKind::Text, reply, handle);
            }
        }
    }

    /// Drops the registered suggestion set along with its transient
    /// prompt messages.
    fn discard_suggestions(&mut self) {
        let Some(set) = self.pending_suggestions.take() else {
            return;
        };
        self.timeline.remove(set.prompt_id);
        self.timeline.remove(set.panel_id);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            title: self.title.clone(),
            busy: self.active_turn.is_some(),
            messages: self.timeline.messages().to_vec(),
        }
    }

    #[inline]
    fn emit(&self, signal: UiSignal) {
        if let Some(on_signal) = &self.on_signal {
            on_signal(signal);
        }
    }
}

#[derive(Debug)]
pub(super) struct StartConversation;

impl Message<SessionState> for StartConversation {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        state.reset_conversation(None);
    }
}

#[derive(Debug)]
pub(super) struct StartDebugConversation {
    pub(super) error: NodeError,
    pub(super) schemas: Vec<SchemaSummary>,
    pub(super) nodes: Vec<String>,
    pub(super) parameters: Value,
    pub(super) reply: TurnReply,
}

impl Message<SessionState> for StartDebugConversation {
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.reset_conversation(Some(&self.error));
        state.emit(UiSignal::Open);

        let error = self.error.without_stack();
        let prompt = render_error_prompt(&error);
        state.context = TurnContext {
            error: Some(error),
            schemas: self.schemas,
            nodes: self.nodes,
            parameters: self.parameters,
        };
        // The opening turn renders no user message, the editor surface
        // already shows the failed node.
        state.begin_turn(
            prompt,
            false,
            TurnKind::Structured,
            self.reply,
            handle,
        );
    }
}

#[derive(Debug)]
pub(super) struct StartTurn {
    pub(super) user_text: String,
    pub(super) kind: TurnKind,
    pub(super) reply: TurnReply,
}

impl Message<SessionState> for StartTurn {
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.begin_turn(self.user_text, true, self.kind, self.reply, handle);
    }
}

#[derive(Debug)]
pub(super) struct ChunkArrived {
    pub(super) session_id: SessionId,
    pub(super) turn: Option<TurnId>,
    pub(super) chunk: String,
    pub(super) reply: Option<TurnReply>,
}

impl Message<SessionState> for ChunkArrived {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        let result = state.fold_chunk(&self.session_id, self.turn, &self.chunk);
        if let Some(reply) = self.reply {
            reply.send(result).ok();
        } else if let Err(err) = result {
            // Turn-driver chunks have nobody awaiting them, the error
            // is dropped along with the chunk.
            warn!("dropping a bad chunk: {err}");
        }
    }
}

#[derive(Debug)]
struct TurnSettled {
    session_id: SessionId,
    turn: TurnId,
    result: TurnResult,
}

impl Message<SessionState> for TurnSettled {
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        if self.session_id != state.session_id {
            trace!("dropping a settle notice of an abandoned conversation");
            return;
        }
        if state
            .active_turn
            .as_ref()
            .is_none_or(|active| active.id != self.turn)
        {
            // The sentinel already closed this turn.
            trace!("dropping a settle notice of a closed turn");
            return;
        }

        let result = self.result.map_err(SessionError::Transport);
        if let Err(err) = &result {
            error!("the turn failed: {err}");
        }
        state.finish_turn(result);
    }
}

#[derive(Debug)]
pub(super) struct SelectSuggestion {
    pub(super) index: usize,
    pub(super) reply: TurnReply,
}

impl Message<SessionState> for SelectSuggestion {
    fn handle(self, state: &mut SessionState, handle: &Actor<SessionState>) {
        state.select_action(self.index, self.reply, handle);
    }
}

#[derive(Debug)]
pub(super) struct QuerySnapshot {
    pub(super) reply: oneshot::Sender<SessionSnapshot>,
}

impl Message<SessionState> for QuerySnapshot {
    #[inline]
    fn handle(self, state: &mut SessionState, _handle: &Actor<SessionState>) {
        self.reply.send(state.snapshot()).ok();
    }
}

/// Renders the outbound prompt text of an error-debugging opener.
fn render_error_prompt(error: &NodeError) -> String {
    let rendered = serde_json::to_string(error)
        .unwrap_or_else(|_| error.message.clone());
    format!("## Error:\n{rendered}")
}
