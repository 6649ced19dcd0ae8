/// A host-owned input buffer the engine can poll.
///
/// Hosts that hold the typed text themselves (a text field, a line editor)
/// implement this and call [`TypingEngine::poll`](super::TypingEngine::poll)
/// instead of pushing every change through
/// [`TypingEngine::input`](super::TypingEngine::input).
pub trait InputSource {
    /// Current contents of the buffer
    fn read(&self) -> &str;

    /// Replaces the contents of the buffer.
    fn write(&mut self, value: &str);
}

impl InputSource for String {
    fn read(&self) -> &str {
        self
    }

    fn write(&mut self, value: &str) {
        self.clear();
        self.push_str(value);
    }
}
