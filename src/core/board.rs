//! Purpose: Hold posted notices until they expire or are dismissed.
//! Exports: `NoticeBoard`, `Posted`, `NoticeId`, `DEFAULT_NOTICE_TTL`.
//! Role: Reference notification sink; callers forward store notices here.
//! Invariants: Each notice expires exactly `ttl` after it was posted.
//! Invariants: Time is always passed in, so expiry is deterministic.
use crate::notice::Notice;
use std::time::{Duration, Instant};

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

pub type NoticeId = u64;

#[derive(Clone, Debug)]
pub struct Posted {
    pub id: NoticeId,
    pub notice: Notice,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    next_id: NoticeId,
    posted: Vec<Posted>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            posted: Vec::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn post(&mut self, notice: Notice, now: Instant) -> NoticeId {
        let id = self.next_id;
        self.next_id += 1;
        self.posted.push(Posted {
            id,
            notice,
            expires_at: now + self.ttl,
        });
        id
    }

    /// Removes a notice early; `false` if it already expired or never existed.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.posted.len();
        self.posted.retain(|posted| posted.id != id);
        self.posted.len() != before
    }

    /// Drops every notice whose deadline is at or before `now` and returns them.
    pub fn expire(&mut self, now: Instant) -> Vec<Posted> {
        let (expired, live): (Vec<Posted>, Vec<Posted>) = std::mem::take(&mut self.posted)
            .into_iter()
            .partition(|posted| posted.expires_at <= now);
        self.posted = live;
        expired
    }

    pub fn active(&self) -> &[Posted] {
        &self.posted
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.posted.iter().map(|posted| posted.expires_at).min()
    }

    pub fn len(&self) -> usize {
        self.posted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_NOTICE_TTL, NoticeBoard};
    use crate::notice::{Notice, Op};
    use std::time::{Duration, Instant};

    #[test]
    fn notices_expire_after_ttl() {
        let mut board = NoticeBoard::default();
        assert_eq!(board.ttl(), DEFAULT_NOTICE_TTL);
        let start = Instant::now();
        let first = board.post(Notice::success(Op::Load, "loaded"), start);
        let second = board.post(
            Notice::error(Op::Delete, "failed"),
            start + Duration::from_secs(2),
        );
        assert_ne!(first, second);

        assert!(board.expire(start + Duration::from_secs(4)).is_empty());
        assert_eq!(board.len(), 2);

        let expired = board.expire(start + Duration::from_secs(5));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, first);
        assert_eq!(board.active()[0].id, second);
        assert_eq!(
            board.next_deadline(),
            Some(start + Duration::from_secs(7))
        );

        board.expire(start + Duration::from_secs(7));
        assert!(board.is_empty());
        assert!(board.next_deadline().is_none());
    }

    #[test]
    fn dismiss_removes_early() {
        let mut board = NoticeBoard::new(Duration::from_secs(5));
        let now = Instant::now();
        let id = board.post(Notice::info(Op::View, "page 2"), now);
        assert!(board.dismiss(id));
        assert!(!board.dismiss(id));
        assert!(board.is_empty());
    }
}
