//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;
#[cfg(doc)]
use crate::domain::Reply;

/// Database operation.
pub use common::Handler as Database;

/// Name of the constraint keeping a single [`Reply`] per worker and line
/// item.
pub const REPLY_ID_CONSTRAINT: &str = "replies_pkey";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }

    /// Checks if the error is a violation of any integrity constraint.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        match self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => e.is_integrity_violation(),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_integrity_violation(),
        }
    }
}
