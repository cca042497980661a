//! Capacity read models definitions.

use std::iter::Sum;

use derive_more::{Display, From, Into};
use tracing as log;

use crate::domain::{order::detail, Detail};
#[cfg(doc)]
use crate::domain::{reply::Status, Reply};

/// Number of [`Reply`]s occupying slots of a [`Detail`].
///
/// Counts [`Status::Accepted`] [`Reply`]s only: a [`Status::Paid`] one has
/// served its shift already.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct ApprovedCount(u32);

impl Sum for ApprovedCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|c| c.0).sum())
    }
}

/// Number of free slots of a [`Detail`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AvailableReplies {
    /// ID of the [`Detail`].
    pub detail_id: detail::Id,

    /// Number of [`Reply`]s which still can be approved.
    pub quantity: u32,
}

impl AvailableReplies {
    /// Calculates [`AvailableReplies`] of the provided [`Detail`] having the
    /// provided number of approved [`Reply`]s.
    ///
    /// The quantity never goes below zero. Reaching it means the [`Detail`]
    /// is overbooked, which is reported as a data integrity warning.
    #[must_use]
    pub fn new(detail: &Detail, approved: ApprovedCount) -> Self {
        let raw = i64::from(detail.count.get()) - i64::from(approved.0);
        if raw < 0 {
            log::warn!(
                "`Detail(id: {})` is overbooked: {approved} approved `Reply`s \
                 for {} slots",
                detail.id,
                detail.count,
            );
        }
        Self {
            detail_id: detail.id,
            quantity: u32::try_from(raw).unwrap_or_default(),
        }
    }

    /// Indicates whether no more [`Reply`]s can be approved.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.quantity == 0
    }
}
