//! [`Person`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{person, Person},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
};

/// Columns of a [`Person`] row, as expected by [`from_row()`].
pub(super) const COLUMNS: &str = "\
    p.id, p.name, \
    p.role, p.gender, p.company, p.has_proxy, \
    p.created_at";

/// Assembles a [`Person`] out of the provided [`Row`] having [`COLUMNS`].
pub(super) fn from_row(row: &Row) -> Result<Person, Traced<database::Error>> {
    let role = person::Role::from_parts(
        row.get("role"),
        row.get("gender"),
        row.get("company"),
        row.get("has_proxy"),
    )
    .ok_or_else(|| {
        tracerr::new!(database::Error::from(postgres::Error::MalformedRow(
            "`people` role doesn't match its profile",
        )))
    })?;

    Ok(Person {
        id: row.get("id"),
        name: row.get("name"),
        role,
        created_at: row.get("created_at"),
    })
}

impl<C> Database<Select<By<Option<Person>, person::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Person>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Person>, person::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM people p \
             WHERE p.id = $1::UUID"
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| from_row(&row))
            .transpose()
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Insert<Person>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(person): Insert<Person>,
    ) -> Result<Self::Ok, Self::Err> {
        let Person {
            id,
            name,
            role,
            created_at,
        } = person;
        let (kind, gender, company, has_proxy) = role.to_parts();

        const SQL: &str = "\
            INSERT INTO people (\
                id, name, \
                role, gender, company, has_proxy, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::INT2, $4::INT2, $5::VARCHAR, $6::BOOL, \
                $7::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                role = EXCLUDED.role, \
                gender = EXCLUDED.gender, \
                company = EXCLUDED.company, \
                has_proxy = EXCLUDED.has_proxy, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &kind,
                &gender,
                &company,
                &has_proxy,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Person, person::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Person, person::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: person::Id = by.into_inner();

        const SQL: &str = "\
            SELECT 1 \
            FROM people \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
