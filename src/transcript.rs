//! Ordered conversation transcript with an explicit in-flight turn slot.

use chat_provider::{Message, Role};

/// The turn currently being streamed: the user prompt and the partial reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTurn {
    prompt: String,
    reply: String,
}

impl OpenTurn {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Reply text accumulated so far.
    pub fn reply(&self) -> &str {
        &self.reply
    }
}

/// One rendered transcript row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub role: Role,
    pub content: String,
    /// True only for the reply placeholder of the open turn.
    pub streaming: bool,
}

impl Entry {
    fn committed(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            streaming: false,
        }
    }
}

/// Committed messages followed by at most one open turn.
///
/// The open turn always renders after every committed message, so the
/// streaming placeholder is the last entry whenever one exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    committed: Vec<Message>,
    open: Option<OpenTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            committed: messages,
            open: None,
        }
    }

    /// Committed messages in append order.
    pub fn messages(&self) -> &[Message] {
        &self.committed
    }

    pub fn open_turn(&self) -> Option<&OpenTurn> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Number of rendered entries, counting both rows of an open turn.
    pub fn len(&self) -> usize {
        self.committed.len() + if self.open.is_some() { 2 } else { 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self.committed.iter().map(Entry::committed).collect();
        if let Some(open) = &self.open {
            entries.push(Entry {
                role: Role::User,
                content: open.prompt.clone(),
                streaming: false,
            });
            entries.push(Entry {
                role: Role::Assistant,
                content: open.reply.clone(),
                streaming: true,
            });
        }
        entries
    }

    /// Opens a turn. Returns `false` when one is already open.
    pub(crate) fn open(&mut self, prompt: String) -> bool {
        if self.open.is_some() {
            return false;
        }
        self.open = Some(OpenTurn {
            prompt,
            reply: String::new(),
        });
        true
    }

    /// Overwrites the placeholder with the accumulated reply.
    pub(crate) fn set_reply(&mut self, accumulated: &str) {
        if let Some(open) = self.open.as_mut() {
            open.reply.clear();
            open.reply.push_str(accumulated);
        }
    }

    /// Moves the open turn into the committed messages.
    pub(crate) fn commit(&mut self) -> bool {
        let Some(open) = self.open.take() else {
            return false;
        };
        self.committed.push(Message::user(open.prompt));
        self.committed.push(Message::assistant(open.reply));
        true
    }

    /// Discards the open turn, optionally keeping its prompt as committed.
    pub(crate) fn rollback(&mut self, keep_prompt: bool) -> bool {
        let Some(open) = self.open.take() else {
            return false;
        };
        if keep_prompt {
            self.committed.push(Message::user(open.prompt));
        }
        true
    }

    pub(crate) fn replace(&mut self, messages: Vec<Message>) {
        self.committed = messages;
        self.open = None;
    }
}
