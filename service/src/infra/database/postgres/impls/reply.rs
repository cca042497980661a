//! [`Reply`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        order::{self, detail},
        reply, Person, Reply,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{self, capacity::ApprovedCount},
};

use super::{
    order::{detail_from_row, DETAIL_COLUMNS},
    person,
};

/// Columns of a [`Reply`] row, as expected by [`from_row()`].
pub(super) const COLUMNS: &str = "\
    r.worker_id, r.detail_id AS reply_detail_id, \
    r.wager AS reply_wager, r.status AS reply_status, \
    r.paid_at, r.created_at AS reply_created_at";

/// Assembles a [`Reply`] out of the provided [`Row`] having [`COLUMNS`].
pub(super) fn from_row(row: &Row) -> Reply {
    Reply {
        worker_id: row.get("worker_id"),
        detail_id: row.get("reply_detail_id"),
        wager: row.get("reply_wager"),
        status: row.get("reply_status"),
        paid_at: row.get("paid_at"),
        created_at: row.get("reply_created_at"),
    }
}

impl<C> Database<Select<By<Option<Reply>, reply::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reply>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reply>, reply::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let reply::Id {
            worker_id,
            detail_id,
        } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM replies r \
             WHERE r.worker_id = $1::UUID \
               AND r.detail_id = $2::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&worker_id, &detail_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C> Database<Insert<Reply>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reply): Insert<Reply>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reply {
            worker_id,
            detail_id,
            wager,
            status,
            paid_at,
            created_at,
        } = reply;

        // No upsert here: a duplicate must hit the `replies_pkey`.
        const SQL: &str = "\
            INSERT INTO replies (\
                worker_id, detail_id, \
                wager, status, \
                paid_at, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, \
                $3::NUMERIC, $4::INT2, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &worker_id,
                &detail_id,
                &wager,
                &status,
                &paid_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Reply>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reply): Update<Reply>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reply {
            worker_id,
            detail_id,
            wager,
            status,
            paid_at,
            created_at: _,
        } = reply;

        const SQL: &str = "\
            UPDATE replies \
            SET wager = $3::NUMERIC, \
                status = $4::INT2, \
                paid_at = $5::TIMESTAMPTZ \
            WHERE worker_id = $1::UUID \
              AND detail_id = $2::UUID";
        self.exec(SQL, &[&worker_id, &detail_id, &wager, &status, &paid_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Reply, reply::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Reply, reply::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let reply::Id {
            worker_id,
            detail_id,
        } = by.into_inner();

        const SQL: &str = "\
            SELECT 1 \
            FROM replies \
            WHERE worker_id = $1::UUID \
              AND detail_id = $2::UUID \
            FOR UPDATE";
        self.query(SQL, &[&worker_id, &detail_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<ApprovedCount, detail::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ApprovedCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<ApprovedCount, detail::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let status = reply::Status::Accepted;

        const SQL: &str = "\
            SELECT COUNT(*)::INT8 \
            FROM replies \
            WHERE detail_id = $1::UUID \
              AND status = $2::INT2";
        self.query_opt(SQL, &[&id, &status])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                let count = row.expect("always exists").get::<_, i64>(0);
                u32::try_from(count).unwrap_or(u32::MAX).into()
            })
    }
}

impl<C> Database<Select<By<HashMap<detail::Id, ApprovedCount>, order::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = HashMap<detail::Id, ApprovedCount>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<detail::Id, ApprovedCount>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let status = reply::Status::Accepted;

        const SQL: &str = "\
            SELECT d.id, \
                   COUNT(r.detail_id) FILTER (\
                       WHERE r.status = $2::INT2\
                   )::INT8 AS approved \
            FROM order_details d \
            LEFT JOIN replies r ON r.detail_id = d.id \
            WHERE d.order_id = $1::UUID \
            GROUP BY d.id";
        Ok(self
            .query(SQL, &[&id, &status])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let approved = row.get::<_, i64>("approved");
                (
                    row.get("id"),
                    u32::try_from(approved).unwrap_or(u32::MAX).into(),
                )
            })
            .collect())
    }
}

impl<C>
    Database<Select<By<Vec<read::reply::Engagement>, read::reply::Schedule>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::reply::Engagement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::reply::Engagement>, read::reply::Schedule>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::Schedule {
            worker_id,
            statuses,
            dates,
        } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS}, {DETAIL_COLUMNS} \
             FROM replies r \
             INNER JOIN order_details d ON d.id = r.detail_id \
             WHERE r.worker_id = $1::UUID \
               AND r.status = ANY($2::INT2[]) \
               AND d.date BETWEEN $3::DATE AND $4::DATE \
             ORDER BY d.date, d.start_at, d.id"
        );
        Ok(self
            .query(
                &sql,
                &[&worker_id, &statuses, dates.start(), dates.end()],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| read::reply::Engagement {
                reply: from_row(row),
                detail: detail_from_row(row),
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Reply>, read::reply::FirstUnapproved>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reply>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reply>, read::reply::FirstUnapproved>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::FirstUnapproved {
            order_id,
            worker_id,
        } = by.into_inner();
        let status = reply::Status::Created;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&status];

        let order_idx = order_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let worker_idx = worker_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM replies r \
             INNER JOIN order_details d ON d.id = r.detail_id \
             WHERE r.status = $1::INT2 \
                   {order_filtering} \
                   {worker_filtering} \
             ORDER BY r.created_at, r.detail_id, r.worker_id \
             LIMIT 1",
            order_filtering = order_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND d.order_id = ${idx}::UUID"))
            }),
            worker_filtering =
                worker_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND r.worker_id = ${idx}::UUID"))
                }),
        );
        Ok(self
            .query_opt(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row)))
    }
}

impl<C>
    Database<Select<By<read::reply::list::Page, read::reply::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::reply::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::reply::list::Page, read::reply::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::list::Selector {
            arguments,
            filter: read::reply::list::Filter { order_id, status },
        } = by.into_inner();

        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);
        let limit = arguments
            .limit()
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&order_id, &offset];

        let status_idx = status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let limit_idx = limit.as_ref().map(|l| {
            ps.push(l);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM replies r \
             INNER JOIN order_details d ON d.id = r.detail_id \
             WHERE d.order_id = $1::UUID \
                   {status_filtering} \
             ORDER BY r.created_at, r.detail_id, r.worker_id \
             {limiting} \
             OFFSET $2::INT8",
            status_filtering =
                status_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND r.status = ${idx}::INT2"))
                }),
            limiting = limit_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("LIMIT ${idx}::INT8"))
            }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::reply::list::Page::new(
            arguments,
            rows.iter().map(from_row),
        ))
    }
}

impl<C> Database<Select<By<Vec<Person>, read::reply::ApprovedWorkers>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Person>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Person>, read::reply::ApprovedWorkers>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::ApprovedWorkers(order_id) = by.into_inner();
        let statuses = reply::Status::APPROVED;

        let sql = format!(
            "SELECT {columns} \
             FROM people p \
             WHERE p.id IN (\
                 SELECT r.worker_id \
                 FROM replies r \
                 INNER JOIN order_details d ON d.id = r.detail_id \
                 WHERE d.order_id = $1::UUID \
                   AND r.status = ANY($2::INT2[])\
             ) \
             ORDER BY p.id",
            columns = person::COLUMNS,
        );
        self.query(&sql, &[&order_id, &statuses])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(person::from_row)
            .collect::<Result<_, _>>()
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<Reply>, read::reply::DropScope>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reply>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reply>, read::reply::DropScope>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::reply::DropScope as S;

        let scope = by.into_inner();
        let statuses = scope.statuses();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&statuses];

        let scoping = match &scope {
            S::AllOfOrder(id) | S::UnapprovedOfOrder(id) => {
                ps.push(id);
                format!("AND d.order_id = ${}::UUID", ps.len())
            }
            S::UnapprovedOfDetail(id) => {
                ps.push(id);
                format!("AND d.id = ${}::UUID", ps.len())
            }
            S::UnapprovedOfWorkerOnDate { worker_id, date } => {
                ps.push(worker_id);
                let worker_idx = ps.len();
                ps.push(date);
                format!(
                    "AND r.worker_id = ${worker_idx}::UUID \
                     AND d.date = ${}::DATE",
                    ps.len(),
                )
            }
        };

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM replies r \
             INNER JOIN order_details d ON d.id = r.detail_id \
             WHERE r.status = ANY($1::INT2[]) \
                   {scoping} \
             ORDER BY r.created_at, r.detail_id, r.worker_id \
             FOR UPDATE OF r"
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

