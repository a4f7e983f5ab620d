//! Waiting pool and active-session table.
//!
//! All mutation happens through the engine's single lock, so the
//! methods here are plain synchronous state transitions.

use std::collections::{HashMap, HashSet};

use rand::seq::IteratorRandom;

use crate::error::MatchError;
use crate::types::UserId;

/// Result of a partner request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Paired with this partner.
    Paired(UserId),
    /// Nobody available; parked in the waiting pool.
    Waiting,
}

/// How a `leave` call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// An active session ended; this was the partner.
    SessionEnded(UserId),
    /// The user was only queued; removed from the pool.
    LeftQueue,
    /// Neither paired nor waiting.
    Idle,
}

/// Waiting pool plus the symmetric session table.
///
/// Invariants, restored before every public method returns:
/// - `sessions[a] == b` implies `sessions[b] == a`
/// - nobody appears in both the pool and the session table
/// - nobody is ever paired with themselves
#[derive(Debug, Default)]
pub struct Matchmaker {
    waiting: HashSet<UserId>,
    sessions: HashMap<UserId, UserId>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `id` with any waiting user, or park it in the pool.
    ///
    /// Re-requesting while already waiting restarts the search rather
    /// than erroring. Requesting while paired is an error; callers go
    /// through `next_partner` for that.
    pub fn request_partner(&mut self, id: UserId) -> Result<MatchOutcome, MatchError> {
        if self.sessions.contains_key(&id) {
            return Err(MatchError::AlreadyPaired(id));
        }
        Ok(self.pair_or_wait(id))
    }

    /// Tear down `id`'s session, removing both directions. Returns the
    /// former partner, `None` if not paired. Safe to call repeatedly.
    pub fn end_session(&mut self, id: UserId) -> Option<UserId> {
        let partner = self.sessions.remove(&id)?;
        self.sessions.remove(&partner);
        Some(partner)
    }

    /// End the current session (if any) and immediately look for a new
    /// partner, as one transition. Returns the old partner alongside
    /// the new outcome.
    pub fn next_partner(&mut self, id: UserId) -> (Option<UserId>, MatchOutcome) {
        let old_partner = self.end_session(id);
        (old_partner, self.pair_or_wait(id))
    }

    /// Explicit exit: ends the session if paired, otherwise removes
    /// `id` from the waiting pool if queued.
    pub fn leave(&mut self, id: UserId) -> LeaveOutcome {
        if let Some(partner) = self.end_session(id) {
            return LeaveOutcome::SessionEnded(partner);
        }
        if self.waiting.remove(&id) {
            return LeaveOutcome::LeftQueue;
        }
        LeaveOutcome::Idle
    }

    pub fn partner_of(&self, id: UserId) -> Option<UserId> {
        self.sessions.get(&id).copied()
    }

    pub fn is_paired(&self, id: UserId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn is_waiting(&self, id: UserId) -> bool {
        self.waiting.contains(&id)
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Number of active pairs (the table holds two entries per pair).
    pub fn active_pairs(&self) -> usize {
        self.sessions.len() / 2
    }

    /// Core pairing step. Caller ensures `id` is not in a session.
    ///
    /// `id` is pulled out of the pool before a candidate is drawn, so
    /// self-pairing cannot happen even transiently.
    fn pair_or_wait(&mut self, id: UserId) -> MatchOutcome {
        self.waiting.remove(&id);

        let candidate = self.waiting.iter().copied().choose(&mut rand::thread_rng());
        match candidate {
            Some(partner) => {
                self.waiting.remove(&partner);
                self.sessions.insert(id, partner);
                self.sessions.insert(partner, id);
                MatchOutcome::Paired(partner)
            }
            None => {
                self.waiting.insert(id);
                MatchOutcome::Waiting
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(m: &Matchmaker) {
        for (&a, &b) in &m.sessions {
            assert_ne!(a, b, "self-pairing");
            assert_eq!(m.sessions.get(&b), Some(&a), "asymmetric session entry");
            assert!(!m.waiting.contains(&a), "paired user still in pool");
        }
    }

    #[test]
    fn first_requester_waits_second_pairs() {
        let mut m = Matchmaker::new();
        let (u1, u2) = (UserId(1), UserId(2));

        assert_eq!(m.request_partner(u1), Ok(MatchOutcome::Waiting));
        assert!(m.is_waiting(u1));
        assert_eq!(m.waiting_count(), 1);

        assert_eq!(m.request_partner(u2), Ok(MatchOutcome::Paired(u1)));
        assert_eq!(m.waiting_count(), 0);
        assert_eq!(m.partner_of(u1), Some(u2));
        assert_eq!(m.partner_of(u2), Some(u1));
        assert_eq!(m.active_pairs(), 1);
        check_invariants(&m);
    }

    #[test]
    fn re_request_while_waiting_is_idempotent() {
        let mut m = Matchmaker::new();
        let u1 = UserId(1);

        for _ in 0..5 {
            assert_eq!(m.request_partner(u1), Ok(MatchOutcome::Waiting));
            assert_eq!(m.waiting_count(), 1);
        }
        assert!(!m.is_paired(u1), "lone user must never pair with themselves");
        check_invariants(&m);
    }

    #[test]
    fn request_while_paired_is_an_error() {
        let mut m = Matchmaker::new();
        let (u1, u2) = (UserId(1), UserId(2));
        m.request_partner(u1).unwrap();
        m.request_partner(u2).unwrap();

        assert_eq!(
            m.request_partner(u1),
            Err(MatchError::AlreadyPaired(u1))
        );
        // State untouched by the rejected call
        assert_eq!(m.partner_of(u1), Some(u2));
        check_invariants(&m);
    }

    #[test]
    fn end_session_removes_both_directions() {
        let mut m = Matchmaker::new();
        let (u1, u2) = (UserId(1), UserId(2));
        m.request_partner(u1).unwrap();
        m.request_partner(u2).unwrap();

        assert_eq!(m.end_session(u1), Some(u2));
        assert_eq!(m.partner_of(u1), None);
        assert_eq!(m.partner_of(u2), None);
        assert_eq!(m.active_pairs(), 0);

        // Idempotent from either side
        assert_eq!(m.end_session(u1), None);
        assert_eq!(m.end_session(u2), None);
        check_invariants(&m);
    }

    #[test]
    fn next_partner_with_empty_pool_leaves_old_partner_idle() {
        let mut m = Matchmaker::new();
        let (u1, u2) = (UserId(1), UserId(2));
        m.request_partner(u1).unwrap();
        m.request_partner(u2).unwrap();

        let (old, outcome) = m.next_partner(u1);
        assert_eq!(old, Some(u2));
        assert_eq!(outcome, MatchOutcome::Waiting);

        assert!(m.is_waiting(u1));
        assert!(!m.is_waiting(u2), "old partner must not re-enter the pool");
        assert!(!m.is_paired(u1));
        assert!(!m.is_paired(u2));
        check_invariants(&m);
    }

    #[test]
    fn next_partner_picks_from_pool() {
        let mut m = Matchmaker::new();
        let (u1, u2, u3) = (UserId(1), UserId(2), UserId(3));
        m.request_partner(u1).unwrap();
        m.request_partner(u2).unwrap();
        m.request_partner(u3).unwrap();
        assert_eq!(m.partner_of(u1), Some(u2));
        assert!(m.is_waiting(u3));

        let (old, outcome) = m.next_partner(u1);
        assert_eq!(old, Some(u2));
        assert_eq!(outcome, MatchOutcome::Paired(u3));
        assert_eq!(m.partner_of(u3), Some(u1));
        assert!(!m.is_paired(u2));
        check_invariants(&m);
    }

    #[test]
    fn next_partner_never_repairs_with_the_leaver() {
        // The old partner is not in the pool, so the only candidate
        // for the next pairing is a third user.
        for _ in 0..50 {
            let mut m = Matchmaker::new();
            m.request_partner(UserId(1)).unwrap();
            m.request_partner(UserId(2)).unwrap();
            let (old, outcome) = m.next_partner(UserId(1));
            assert_eq!(old, Some(UserId(2)));
            assert_eq!(outcome, MatchOutcome::Waiting);
            check_invariants(&m);
        }
    }

    #[test]
    fn leave_reports_all_three_cases() {
        let mut m = Matchmaker::new();
        let (u1, u2) = (UserId(1), UserId(2));

        assert_eq!(m.leave(u1), LeaveOutcome::Idle);

        m.request_partner(u1).unwrap();
        assert_eq!(m.leave(u1), LeaveOutcome::LeftQueue);
        assert_eq!(m.waiting_count(), 0);

        m.request_partner(u1).unwrap();
        m.request_partner(u2).unwrap();
        assert_eq!(m.leave(u1), LeaveOutcome::SessionEnded(u2));
        assert_eq!(m.leave(u2), LeaveOutcome::Idle);
        check_invariants(&m);
    }

    #[test]
    fn invariants_hold_through_mixed_operations() {
        let mut m = Matchmaker::new();
        let users: Vec<UserId> = (1..=8).map(UserId).collect();

        for &u in &users {
            m.request_partner(u).unwrap();
            check_invariants(&m);
        }
        // 8 requests pair everybody off
        assert_eq!(m.active_pairs(), 4);
        assert_eq!(m.waiting_count(), 0);

        for &u in &users {
            let _ = m.next_partner(u);
            check_invariants(&m);
            let accounted = m.waiting_count() + 2 * m.active_pairs();
            assert!(accounted <= users.len(), "more slots than users");
        }
        for &u in &users {
            m.leave(u);
            check_invariants(&m);
        }
        assert_eq!(m.active_pairs(), 0);
        assert_eq!(m.waiting_count(), 0);
    }
}
