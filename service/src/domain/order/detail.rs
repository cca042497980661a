//! [`Detail`] definitions.

use std::ops::Range;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::domain::{order, person};
#[cfg(doc)]
use crate::domain::{person::Worker, Order, Reply};

/// Staffing requirement of an [`Order`] (a line item).
#[derive(Clone, Debug)]
pub struct Detail {
    /// ID of this [`Detail`].
    pub id: Id,

    /// ID of the [`Order`] this [`Detail`] belongs to.
    pub order_id: order::Id,

    /// Calendar date the shift of this [`Detail`] starts on.
    pub date: Date,

    /// Time the shift of this [`Detail`] starts at.
    pub start_at: Time,

    /// Time the shift of this [`Detail`] ends at.
    ///
    /// Being less than [`Detail::start_at`] means the shift ends on the next
    /// day.
    pub end_at: Time,

    /// [`Position`] required by this [`Detail`].
    pub position: Position,

    /// [`person::Gender`] of [`Worker`]s required by this [`Detail`], if any.
    pub gender: Option<person::Gender>,

    /// Number of [`Worker`]s required by this [`Detail`].
    pub count: Count,

    /// Hourly rate of this [`Detail`].
    pub wager: Decimal,

    /// Commission of the platform taken from the [`Detail::wager`].
    pub fee: Decimal,

    /// [`DateTime`] when this [`Detail`] was created.
    pub created_at: CreationDateTime,
}

impl Detail {
    /// Indicates whether the shift of this [`Detail`] wraps past midnight.
    #[must_use]
    pub fn is_overnight(&self) -> bool {
        self.end_at < self.start_at
    }

    /// Returns the `[start, end)` interval of the shift of this [`Detail`].
    #[must_use]
    pub fn shift(&self) -> Range<PrimitiveDateTime> {
        let start = PrimitiveDateTime::new(self.date, self.start_at);
        let mut end = PrimitiveDateTime::new(self.date, self.end_at);
        if self.is_overnight() {
            end = end.saturating_add(time::Duration::DAY);
        }
        start..end
    }

    /// Returns the duration of the shift of this [`Detail`] in hours.
    #[must_use]
    pub fn hours(&self) -> Decimal {
        let Range { start, end } = self.shift();
        Decimal::from((end - start).whole_minutes()) / Decimal::from(60)
    }

    /// Returns the calendar dates occupied by the shift of this [`Detail`].
    ///
    /// An overnight shift occupies the next date too, unless it ends exactly
    /// at midnight.
    pub fn occupied_dates(&self) -> impl Iterator<Item = Date> {
        let next = (self.is_overnight() && self.end_at > Time::MIDNIGHT)
            .then(|| self.date.next_day())
            .flatten();
        [Some(self.date), next].into_iter().flatten()
    }

    /// Indicates whether the shift of this [`Detail`] occupies the provided
    /// calendar `date`.
    #[must_use]
    pub fn occupies(&self, date: Date) -> bool {
        self.occupied_dates().any(|d| d == date)
    }

    /// Indicates whether the same [`Worker`] cannot take both this and the
    /// `other` [`Detail`].
    ///
    /// [`Detail`]s conflict if they occupy a common calendar date or their
    /// shifts overlap.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        if self.occupied_dates().any(|d| other.occupies(d)) {
            return true;
        }

        let (a, b) = (self.shift(), other.shift());
        a.start < b.end && b.start < a.end
    }
}

/// ID of a [`Detail`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Number of [`Worker`]s required by a [`Detail`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Count(i32);

impl Count {
    /// Creates a new [`Count`] if the provided `count` is at least `1`.
    #[must_use]
    pub fn new(count: i32) -> Option<Self> {
        (count >= 1).then_some(Self(count))
    }

    /// Returns the number of [`Worker`]s.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.unsigned_abs()
    }
}

define_kind! {
    #[doc = "Position a [`Worker`] takes in a [`Detail`]."]
    enum Position {
        #[doc = "General helper."]
        Helper = 1,

        #[doc = "Hostess."]
        Hostess = 2,

        #[doc = "Installer."]
        Installer = 3,

        #[doc = "Parking attendant."]
        Parking = 4,

        #[doc = "Any other position."]
        Other = 5,
    }
}

/// [`DateTime`] when a [`Detail`] was created.
pub type CreationDateTime = DateTimeOf<(Detail, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::DateTime;
    use rust_decimal::Decimal;
    use time::macros::{date, datetime, time};

    use crate::domain::order;

    use super::{Count, Detail, Id, Position};

    fn detail(date: time::Date, start_at: time::Time, end_at: time::Time) -> Detail {
        Detail {
            id: Id::new(),
            order_id: order::Id::new(),
            date,
            start_at,
            end_at,
            position: Position::Helper,
            gender: None,
            count: Count::new(1).unwrap(),
            wager: Decimal::from(500),
            fee: Decimal::from(50),
            created_at: DateTime::UNIX_EPOCH.coerce(),
        }
    }

    #[test]
    fn wraps_overnight_shift() {
        let night = detail(date!(2024 - 06 - 01), time!(22:00), time!(02:00));

        assert!(night.is_overnight());
        assert_eq!(
            night.shift(),
            datetime!(2024-06-01 22:00)..datetime!(2024-06-02 02:00),
        );
        assert_eq!(night.hours(), Decimal::from(4));
        assert_eq!(
            night.occupied_dates().collect::<Vec<_>>(),
            vec![date!(2024 - 06 - 01), date!(2024 - 06 - 02)],
        );
    }

    #[test]
    fn shift_ending_at_midnight_occupies_single_date() {
        let evening =
            detail(date!(2024 - 06 - 01), time!(18:00), time!(00:00));

        assert_eq!(evening.hours(), Decimal::from(6));
        assert!(evening.occupies(date!(2024 - 06 - 01)));
        assert!(!evening.occupies(date!(2024 - 06 - 02)));
    }

    #[test]
    fn detects_conflicts() {
        let night = detail(date!(2024 - 06 - 01), time!(22:00), time!(02:00));
        let morning = detail(date!(2024 - 06 - 02), time!(08:00), time!(10:00));
        let same_day = detail(date!(2024 - 06 - 01), time!(08:00), time!(10:00));
        let later = detail(date!(2024 - 06 - 04), time!(08:00), time!(10:00));

        assert!(night.conflicts_with(&morning));
        assert!(morning.conflicts_with(&night));
        assert!(night.conflicts_with(&same_day));
        assert!(!night.conflicts_with(&later));
        assert!(!morning.conflicts_with(&later));
    }

    #[test]
    fn requires_positive_count() {
        assert!(Count::new(0).is_none());
        assert!(Count::new(-3).is_none());
        assert_eq!(Count::new(2).map(Count::get), Some(2));
    }
}
