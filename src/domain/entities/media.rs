/// Downloaded media ready to be sent back to a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub file_name: String,
    pub content: Vec<u8>,
    pub audio_only: bool,
}

impl Media {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}
