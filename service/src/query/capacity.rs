//! [`Query`] collection of the capacity ledger.

use std::collections::HashMap;

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        order::{self, detail},
        Detail, Order,
    },
    infra::{database, Database},
    read::capacity::{ApprovedCount, AvailableReplies},
    Service,
};
#[cfg(doc)]
use crate::domain::Reply;

use super::{DatabaseQuery, Query};

/// Queries the [`ApprovedCount`] of a [`Detail`].
pub type ApprovedOfDetail = DatabaseQuery<By<ApprovedCount, detail::Id>>;

/// [`Query`] for the [`ApprovedCount`] summed over all the [`Detail`]s of an
/// [`Order`].
#[derive(Clone, Copy, Debug)]
pub struct ApprovedOfOrder(pub order::Id);

impl<Db, Clk> Query<ApprovedOfOrder> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<detail::Id, ApprovedCount>, order::Id>>,
            Ok = HashMap<detail::Id, ApprovedCount>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = ApprovedCount;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ApprovedOfOrder(order_id): ApprovedOfOrder,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        self.database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        Ok(self
            .database()
            .execute(Select(By::<HashMap<_, ApprovedCount>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_values()
            .sum())
    }
}

/// [`Query`] for the [`AvailableReplies`] of a [`Detail`].
#[derive(Clone, Copy, Debug)]
pub struct AvailableOfDetail(pub detail::Id);

impl<Db, Clk> Query<AvailableOfDetail> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<Detail>, detail::Id>>,
            Ok = Option<Detail>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<ApprovedCount, detail::Id>>,
            Ok = ApprovedCount,
            Err = Traced<database::Error>,
        >,
{
    type Ok = AvailableReplies;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        AvailableOfDetail(detail_id): AvailableOfDetail,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let detail = self
            .database()
            .execute(Select(By::<Option<Detail>, _>::new(detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DetailNotExists(detail_id))
            .map_err(tracerr::wrap!())?;

        let approved = self
            .database()
            .execute(Select(By::<ApprovedCount, _>::new(detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(AvailableReplies::new(&detail, approved))
    }
}

/// [`Query`] for the [`AvailableReplies`] of every [`Detail`] of an
/// [`Order`], in their creation order.
#[derive(Clone, Copy, Debug)]
pub struct AvailabilityOfOrder(pub order::Id);

impl<Db, Clk> Query<AvailabilityOfOrder> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Detail>, order::Id>>,
            Ok = Vec<Detail>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<detail::Id, ApprovedCount>, order::Id>>,
            Ok = HashMap<detail::Id, ApprovedCount>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<AvailableReplies>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        AvailabilityOfOrder(order_id): AvailabilityOfOrder,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        self.database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let details = self
            .database()
            .execute(Select(By::<Vec<Detail>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let approved = self
            .database()
            .execute(Select(By::<HashMap<_, ApprovedCount>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(details
            .iter()
            .map(|d| {
                let count = approved.get(&d.id).copied().unwrap_or_default();
                AvailableReplies::new(d, count)
            })
            .collect())
    }
}

/// [`Query`] for the number of [`Reply`]s which still can be approved
/// across all the [`Detail`]s of an [`Order`].
#[derive(Clone, Copy, Debug)]
pub struct AvailableOfOrder(pub order::Id);

impl<Db, Clk> Query<AvailableOfOrder> for Service<Db, Clk>
where
    Self: Query<
        AvailabilityOfOrder,
        Ok = Vec<AvailableReplies>,
        Err = Traced<ExecutionError>,
    >,
{
    type Ok = u32;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        AvailableOfOrder(order_id): AvailableOfOrder,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .execute(AvailabilityOfOrder(order_id))
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|a| a.quantity)
            .sum())
    }
}

/// [`Query`] checking whether an [`Order`] has no free slots left.
#[derive(Clone, Copy, Debug)]
pub struct FullyStaffed(pub order::Id);

impl<Db, Clk> Query<FullyStaffed> for Service<Db, Clk>
where
    Self: Query<
        AvailableOfOrder,
        Ok = u32,
        Err = Traced<ExecutionError>,
    >,
{
    type Ok = bool;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        FullyStaffed(order_id): FullyStaffed,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(AvailableOfOrder(order_id))
            .await
            .map_err(tracerr::wrap!())
            .map(|available| available == 0)
    }
}

/// Error of capacity [`Query`]s execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Detail`] with the provided ID does not exist.
    #[display("`Detail(id: {_0})` does not exist")]
    DetailNotExists(#[error(not(source))] detail::Id),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),
}
