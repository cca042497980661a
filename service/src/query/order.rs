//! [`Query`] collection related to a single [`Order`].

use common::operations::By;

use crate::domain::{
    order::{self, detail},
    Detail, Order,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Order`] by its [`order::Id`].
pub type ById = DatabaseQuery<By<Option<Order>, order::Id>>;

/// Queries a [`Detail`] by its [`detail::Id`].
pub type DetailById = DatabaseQuery<By<Option<Detail>, detail::Id>>;

/// Queries [`Detail`]s of an [`Order`] in their creation order.
pub type Details = DatabaseQuery<By<Vec<Detail>, order::Id>>;
