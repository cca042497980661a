//! [`Order`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        order::{self, detail},
        Detail, Order,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of a [`Detail`] row, as expected by [`detail_from_row()`].
pub(super) const DETAIL_COLUMNS: &str = "\
    d.id AS detail_id, d.order_id, \
    d.date, d.start_at, d.end_at, \
    d.position, d.gender, d.count, \
    d.wager AS detail_wager, d.fee, \
    d.created_at AS detail_created_at";

/// Assembles a [`Detail`] out of the provided [`Row`] having
/// [`DETAIL_COLUMNS`].
pub(super) fn detail_from_row(row: &Row) -> Detail {
    Detail {
        id: row.get("detail_id"),
        order_id: row.get("order_id"),
        date: row.get("date"),
        start_at: row.get("start_at"),
        end_at: row.get("end_at"),
        position: row.get("position"),
        gender: row.get("gender"),
        count: row.get("count"),
        wager: row.get("detail_wager"),
        fee: row.get("fee"),
        created_at: row.get("detail_created_at"),
    }
}

impl<C> Database<Select<By<Option<Order>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, customer_id, supervisor_id, \
                   status, address, \
                   created_at \
            FROM orders \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Order {
                id: row.get("id"),
                customer_id: row.get("customer_id"),
                supervisor_id: row.get("supervisor_id"),
                status: row.get("status"),
                address: row.get("address"),
                created_at: row.get("created_at"),
            }))
    }
}

impl<C> Database<Insert<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        let Order {
            id,
            customer_id,
            supervisor_id,
            status,
            address,
            created_at,
        } = order;

        const SQL: &str = "\
            INSERT INTO orders (\
                id, customer_id, supervisor_id, \
                status, address, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::INT2, $5::VARCHAR, \
                $6::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET customer_id = EXCLUDED.customer_id, \
                supervisor_id = EXCLUDED.supervisor_id, \
                status = EXCLUDED.status, \
                address = EXCLUDED.address, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[
                &id,
                &customer_id,
                &supervisor_id,
                &status,
                &address,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(order): Update<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        let Order {
            id,
            customer_id: _,
            supervisor_id,
            status,
            address: _,
            created_at: _,
        } = order;

        const SQL: &str = "\
            UPDATE orders \
            SET supervisor_id = $2::UUID, \
                status = $3::INT2 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &supervisor_id, &status])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Order, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: order::Id = by.into_inner();

        const SQL: &str = "\
            SELECT 1 \
            FROM orders \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Option<Detail>, detail::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Detail>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Detail>, detail::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {DETAIL_COLUMNS} \
             FROM order_details d \
             WHERE d.id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| detail_from_row(&row)))
    }
}

impl<C> Database<Select<By<Vec<Detail>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Detail>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Detail>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {DETAIL_COLUMNS} \
             FROM order_details d \
             WHERE d.order_id = $1::UUID \
             ORDER BY d.created_at, d.id"
        );
        Ok(self
            .query(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(detail_from_row)
            .collect())
    }
}

impl<C> Database<Insert<Detail>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(detail): Insert<Detail>,
    ) -> Result<Self::Ok, Self::Err> {
        let Detail {
            id,
            order_id,
            date,
            start_at,
            end_at,
            position,
            gender,
            count,
            wager,
            fee,
            created_at,
        } = detail;

        const SQL: &str = "\
            INSERT INTO order_details (\
                id, order_id, \
                date, start_at, end_at, \
                position, gender, count, \
                wager, fee, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, \
                $3::DATE, $4::TIME, $5::TIME, \
                $6::INT2, $7::INT2, $8::INT4, \
                $9::NUMERIC, $10::NUMERIC, \
                $11::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &order_id,
                &date,
                &start_at,
                &end_at,
                &position,
                &gender,
                &count,
                &wager,
                &fee,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Detail, detail::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Detail, detail::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: detail::Id = by.into_inner();

        const SQL: &str = "\
            SELECT 1 \
            FROM order_details \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
