//! [`Command`] for accepting a [`Reply`].

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        order::detail,
        reply::{self, Transition},
        Detail, Reply,
    },
    infra::{database, Database},
    read::capacity::{ApprovedCount, AvailableReplies},
    Service,
};

use super::Command;

/// [`Command`] for accepting a [`Reply`], so it occupies a slot of its
/// [`Detail`].
#[derive(Clone, Copy, Debug)]
pub struct AcceptReply(pub reply::Id);

impl<Db, Clk> Command<AcceptReply> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<Reply>, reply::Id>>,
            Ok = Option<Reply>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Reply>, reply::Id>>,
            Ok = Option<Reply>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Detail>, detail::Id>>,
            Ok = Option<Detail>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<ApprovedCount, detail::Id>>,
            Ok = ApprovedCount,
            Err = Traced<database::Error>,
        > + Database<Update<Reply>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Lock<By<Detail, detail::Id>>, Err = Traced<database::Error>>
        + Database<Lock<By<Reply, reply::Id>>, Err = Traced<database::Error>>,
{
    type Ok = Reply;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        AcceptReply(id): AcceptReply,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        self.database()
            .execute(Select(By::<Option<Reply>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReplyNotExists(id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent acceptances exceeding the `Detail` capacity.
        tx.execute(Lock(By::<Detail, _>::new(id.detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Reply, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut reply = tx
            .execute(Select(By::<Option<Reply>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReplyNotExists(id))
            .map_err(tracerr::wrap!())?;
        reply
            .accept()
            .map_err(E::InvalidTransition)
            .map_err(tracerr::wrap!())?;

        let detail = tx
            .execute(Select(By::<Option<Detail>, _>::new(id.detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DetailNotExists(id.detail_id))
            .map_err(tracerr::wrap!())?;
        let approved = tx
            .execute(Select(By::<ApprovedCount, _>::new(id.detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if AvailableReplies::new(&detail, approved).is_full() {
            return Err(tracerr::new!(E::CapacityExceeded {
                detail_id: id.detail_id,
                observed: approved,
            }));
        }

        tx.execute(Update(reply.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!("`Reply(id: {id})` is accepted");

        Ok(reply)
    }
}

/// Error of [`AcceptReply`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Detail`] has no free slots left.
    #[display(
        "`Detail(id: {detail_id})` has no free slots: {observed} `Reply`s \
         are approved already"
    )]
    CapacityExceeded {
        /// ID of the full [`Detail`].
        detail_id: detail::Id,

        /// Observed number of approved [`Reply`]s.
        observed: ApprovedCount,
    },

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Detail`] with the provided ID does not exist.
    #[display("`Detail(id: {_0})` does not exist")]
    DetailNotExists(#[error(not(source))] detail::Id),

    /// [`Reply`] cannot be accepted in its current [`reply::Status`].
    #[display("{_0}")]
    InvalidTransition(#[error(not(source))] Transition),

    /// [`Reply`] with the provided ID does not exist.
    #[display("`Reply(id: {_0})` does not exist")]
    ReplyNotExists(#[error(not(source))] reply::Id),
}
