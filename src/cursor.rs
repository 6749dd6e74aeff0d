use crate::key::FIRST_ID;

/// Forward position of a queue's sequential consumer.
///
/// A positioned cursor lets `dequeue_next` start its scan at the last claimed
/// id instead of walking every deleted record from the head. When the scan
/// from the position finds nothing the cursor is exhausted and gets
/// re-seeked to the head, which also picks up ids whose transactions
/// committed out of order behind the cursor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Cursor {
    position: Option<u64>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<u64> {
        self.position
    }

    pub fn is_positioned(&self) -> bool {
        self.position.is_some()
    }

    /// Moves the cursor to `id` (0 is treated as the first id).
    pub fn reseek(&mut self, id: u64) {
        self.position = Some(id.max(FIRST_ID));
    }

    /// Positions the cursor just past a claimed message.
    pub fn advance_past(&mut self, id: u64) {
        self.position = id.checked_add(1);
    }

    /// Drops the position; the next scan starts from the head.
    pub fn reset(&mut self) {
        self.position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cursor_is_unpositioned() {
        let cursor = Cursor::new();
        assert!(!cursor.is_positioned());
        assert_eq!(cursor.position(), None);
    }

    #[test]
    fn advance_and_reset() {
        let mut cursor = Cursor::new();
        cursor.advance_past(5);
        assert_eq!(cursor.position(), Some(6));
        cursor.reset();
        assert!(!cursor.is_positioned());
    }

    #[test]
    fn reseek_clamps_to_first_id() {
        let mut cursor = Cursor::new();
        cursor.reseek(0);
        assert_eq!(cursor.position(), Some(FIRST_ID));
        cursor.reseek(40);
        assert_eq!(cursor.position(), Some(40));
    }

    #[test]
    fn advancing_past_the_last_id_exhausts() {
        let mut cursor = Cursor::new();
        cursor.advance_past(u64::MAX);
        assert!(!cursor.is_positioned());
    }
}
