/// An inbound command as delivered by a presentation adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    /// Command token without the leading `/`, case-sensitive
    pub command: String,
    /// Everything after the token, not tokenized yet
    pub args: String,
    pub sender_id: i64,
    pub sender_name: String,
    pub chat_id: i64,
    pub message_id: i64,
}

impl CommandEvent {
    pub fn new(command: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: args.into(),
            sender_id: 0,
            sender_name: String::new(),
            chat_id: 0,
            message_id: 0,
        }
    }

    pub fn with_sender(mut self, id: i64, name: impl Into<String>) -> Self {
        self.sender_id = id;
        self.sender_name = name.into();
        self
    }

    pub fn with_chat(mut self, chat_id: i64, message_id: i64) -> Self {
        self.chat_id = chat_id;
        self.message_id = message_id;
        self
    }

    pub fn has_args(&self) -> bool {
        !self.args.trim().is_empty()
    }
}
