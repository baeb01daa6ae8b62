//! Seat accounting.
//!
//! A seat is held by every active non-owner membership and every unexpired pending
//! invite. These checks run ahead of the write to give a specific message; the store's
//! seat guard is what actually makes the limit hold under concurrent writers.

use serde::Serialize;
use tally_storage::SeatCounts;

use crate::MembershipError;

/// Seat usage of one organization at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SeatUsage {
    pub active_members: i64,
    pub pending_invites: i64,
    pub seat_limit: i64,
}

impl SeatUsage {
    /// Fails with `SeatLimitNotConfigured` when the organization has no limit.
    pub fn new(counts: SeatCounts, seat_limit: Option<i32>) -> Result<Self, MembershipError> {
        let seat_limit = seat_limit.ok_or(MembershipError::SeatLimitNotConfigured)?;
        Ok(Self {
            active_members: counts.active_members,
            pending_invites: counts.pending_invites,
            seat_limit: i64::from(seat_limit),
        })
    }

    pub fn reserved(&self) -> i64 {
        self.active_members + self.pending_invites
    }

    pub fn available(&self) -> i64 {
        (self.seat_limit - self.reserved()).max(0)
    }

    pub fn has_capacity(&self) -> bool {
        self.reserved() < self.seat_limit
    }

    /// e.g. `"2/2 seats"`
    pub fn describe(&self) -> String {
        format!("{}/{} seats", self.reserved(), self.seat_limit)
    }

    /// Check before creating an invite.
    pub fn check_invite(&self) -> Result<(), MembershipError> {
        if self.has_capacity() {
            return Ok(());
        }
        let msg = if self.pending_invites == 0 {
            format!(
                "Seat limit reached ({} used by active members). Upgrade your plan to invite more members.",
                self.describe()
            )
        } else {
            format!(
                "Seat limit reached ({} used by {} active members and {} pending invites). \
                 Cancel a pending invite or upgrade your plan.",
                self.describe(),
                self.active_members,
                self.pending_invites
            )
        };
        Err(MembershipError::SeatLimitExceeded(msg))
    }

    /// Check at acceptance time. `counts_self` is true while the invite being accepted is
    /// still pending and therefore already included in `pending_invites`.
    pub fn check_accept(&self, counts_self: bool) -> Result<(), MembershipError> {
        let others = self.reserved() - i64::from(counts_self);
        if others < self.seat_limit {
            return Ok(());
        }
        Err(MembershipError::SeatLimitExceeded(format!(
            "This organization has no seats available ({}). Ask the owner to free a seat or upgrade the plan.",
            self.describe()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(active: i64, pending: i64, limit: i32) -> SeatUsage {
        SeatUsage::new(
            SeatCounts {
                active_members: active,
                pending_invites: pending,
                owners: 1,
            },
            Some(limit),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_limit_is_an_error() {
        let err = SeatUsage::new(SeatCounts::default(), None).unwrap_err();
        assert!(matches!(err, MembershipError::SeatLimitNotConfigured));
    }

    #[test]
    fn test_reserved_counts_members_and_invites() {
        let u = usage(2, 1, 5);
        assert_eq!(u.reserved(), 3);
        assert_eq!(u.available(), 2);
        assert_eq!(u.describe(), "3/5 seats");
    }

    #[test]
    fn test_available_never_negative() {
        // Limit lowered below current usage.
        assert_eq!(usage(4, 1, 3).available(), 0);
    }

    #[test]
    fn test_invite_check_members_only_message() {
        let err = usage(2, 0, 2).check_invite().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2/2 seats"));
        assert!(msg.contains("active members"));
        assert!(!msg.contains("pending"));
    }

    #[test]
    fn test_invite_check_mentions_pending() {
        let err = usage(1, 1, 2).check_invite().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2/2 seats"));
        assert!(msg.contains("1 pending invites"));
    }

    #[test]
    fn test_invite_check_allows_below_limit() {
        assert!(usage(1, 0, 2).check_invite().is_ok());
    }

    #[test]
    fn test_accept_excludes_own_reservation() {
        // A member and this invite fill a 2-seat org; accepting converts the same seat.
        assert!(usage(1, 1, 2).check_accept(true).is_ok());
        // Members filled every seat after the invite went out.
        assert!(usage(2, 1, 2).check_accept(true).is_err());
        assert!(usage(2, 0, 2).check_accept(false).is_err());
    }
}
