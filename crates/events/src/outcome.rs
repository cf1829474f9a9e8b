//! Typed outcomes of applying one webhook event

/// What applying a validated event did
///
/// The webhook endpoint maps each outcome to a response status and detail
/// string; callers can rely on the distinction between a fresh apply and a
/// reported conflict (duplicates are errors, not outcomes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A new conversation record was created with status OPEN
    ConversationCreated,
    /// A new message was stored and fanned out to live viewers
    MessageCreated,
    /// The conversation is now closed (idempotent: re-closing also
    /// reports this outcome)
    ConversationClosed,
}

impl EventOutcome {
    /// Human-readable detail string for webhook acknowledgements
    pub fn detail(&self) -> &'static str {
        match self {
            EventOutcome::ConversationCreated => "Conversation created.",
            EventOutcome::MessageCreated => "Message created.",
            EventOutcome::ConversationClosed => "Conversation closed.",
        }
    }
}
