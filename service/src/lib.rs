//! Service contains the reply allocation and capacity tracking logic of the
//! marketplace.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;

#[cfg(test)]
mod fixture;

use std::time::Duration;

use common::{Clock, Percent, SystemClock};
use rust_decimal::Decimal;
use smart_default::SmartDefault;

#[cfg(doc)]
use infra::Database;
#[cfg(doc)]
use domain::order::Detail;

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Commission of the platform taken from a [`Detail`] wager.
    #[default(Percent::new(Decimal::TEN).expect("valid `Percent`"))]
    pub fee: Percent,

    /// Time before a [`Detail`] starts when applications to it are closed.
    #[default(Duration::from_secs(2 * 60 * 60))]
    pub reply_deadline: Duration,
}

impl Config {
    /// Returns the amount of the provided `wager` paid to a worker.
    ///
    /// The amount is rounded down to a whole number.
    #[must_use]
    pub fn pay(&self, wager: Decimal) -> Decimal {
        self.fee.complement().of(wager).floor()
    }

    /// Returns the commission of the platform for the provided `wager`.
    #[must_use]
    pub fn fee(&self, wager: Decimal) -> Decimal {
        wager - self.pay(wager)
    }
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Clk = SystemClock> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Clock`] of this [`Service`].
    clock: Clk,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, database: Db) -> Self {
        Self::with_clock(config, database, SystemClock)
    }
}

impl<Db, Clk> Service<Db, Clk> {
    /// Creates a new [`Service`] using the provided [`Clock`].
    #[must_use]
    pub fn with_clock(config: Config, database: Db, clock: Clk) -> Self {
        Self {
            config,
            database,
            clock,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns the current [`DateTime`] according to the [`Clock`] of this
    /// [`Service`].
    ///
    /// [`DateTime`]: common::DateTime
    #[must_use]
    pub fn now(&self) -> common::DateTime
    where
        Clk: Clock,
    {
        self.clock.now()
    }
}
