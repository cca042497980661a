//! [`Command`] for moving an [`Order`] through its lifecycle.

use std::collections::BTreeSet;

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        order::{self, Transition},
        person, reply, Order, Reply,
    },
    infra::{database, Database},
    read::reply::DropScope,
    Service,
};
#[cfg(doc)]
use crate::domain::person::Worker;

use super::Command;

/// [`Command`] for moving an [`Order`] into the provided [`order::Status`].
///
/// Cancelling an [`Order`] which has been reviewed already drops all its
/// held [`Reply`]s. Activating an [`Order`] drops its unapproved [`Reply`]s.
/// The dropping happens along with the [`order::Status`] change, so either
/// both take place or none.
#[derive(Clone, Copy, Debug)]
pub struct ChangeOrderStatus {
    /// ID of the [`Order`] to move.
    pub order_id: order::Id,

    /// [`order::Status`] to move the [`Order`] into.
    pub status: order::Status,
}

/// Output of the [`ChangeOrderStatus`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Order`] in its new [`order::Status`].
    pub order: Order,

    /// Distinct IDs of the [`Worker`]s whose [`Reply`]s have been dropped,
    /// to be notified.
    pub dropped_workers: Vec<person::Id>,
}

impl<Db, Clk> Command<ChangeOrderStatus> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reply>, DropScope>>,
            Ok = Vec<Reply>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Order, order::Id>>, Err = Traced<database::Error>>
        + Database<Update<Order>, Err = Traced<database::Error>>
        + Database<Update<Reply>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ChangeOrderStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;
        use order::Status as S;

        let ChangeOrderStatus { order_id, status } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid `Reply`s being accepted while the `Order` is moving.
        tx.execute(Lock(By::<Order, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        let from = order
            .change_status(status)
            .map_err(E::InvalidTransition)
            .map_err(tracerr::wrap!())?;
        tx.execute(Update(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let scope = match status {
            S::Cancelled if from != S::Created => {
                Some(DropScope::AllOfOrder(order_id))
            }
            S::Active => Some(DropScope::UnapprovedOfOrder(order_id)),
            S::Created | S::Open | S::Closed | S::Cancelled | S::Fulfilled => {
                None
            }
        };
        let mut workers = BTreeSet::new();
        if let Some(scope) = scope {
            let replies = tx
                .execute(Select(By::<Vec<Reply>, _>::new(scope)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            for mut reply in replies {
                if !reply
                    .dismiss()
                    .map_err(E::ReplyNotDroppable)
                    .map_err(tracerr::wrap!())?
                {
                    continue;
                }
                _ = workers.insert(reply.worker_id);
                tx.execute(Update(reply))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Order(id: {order_id})` moved from `{from}` to `{status}`, \
             dropping `Reply`s of {} `Worker`s",
            workers.len(),
        );

        Ok(Output {
            order,
            dropped_workers: workers.into_iter().collect(),
        })
    }
}

/// Error of [`ChangeOrderStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Order`] cannot move into the requested [`order::Status`].
    #[display("Cannot change `Order` status: {_0}")]
    InvalidTransition(#[error(not(source))] Transition),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),

    /// Held [`Reply`] of the [`Order`] cannot be dropped.
    #[display("Cannot drop `Reply` of the `Order`: {_0}")]
    ReplyNotDroppable(#[error(not(source))] reply::Transition),
}
