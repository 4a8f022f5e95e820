use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "backend")]
use {
    super::{
        row_exists, CompletionIden, Entity, TrainingTaskDetails, TrainingTaskIden, UpdateBuilder,
    },
    crate::api::{payloads::DeleteSummary, response_errors::StoreResult},
    exemplar::Model,
    rusqlite::{Connection, OptionalExtension},
    sea_query::{enum_def, Expr, Order, Query, SqliteQueryBuilder},
    sea_query_rusqlite::RusqliteBinder,
    tracing::{debug, instrument},
};

use super::{
    validate::{missing_fields, non_blank, parse_date},
    ValidateModel,
};
use crate::api::response_errors::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("recovery_cycle"))]
#[cfg_attr(feature = "backend", enum_def)]
pub struct RecoveryCycle {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryCycleWithTasks {
    #[serde(flatten)]
    pub cycle: RecoveryCycle,
    pub tasks: Vec<TrainingTaskDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("recovery_cycle"))]
pub struct NewRecoveryCycle {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRecoveryCycle {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
}

impl ValidateModel for CreateRecoveryCycle {
    type Valid = NewRecoveryCycle;

    fn validate(self) -> Result<NewRecoveryCycle, StoreError> {
        let missing = missing_fields([
            ("name", self.name.is_none()),
            ("start_date", self.start_date.is_none()),
            ("end_date", self.end_date.is_none()),
        ]);

        let (Some(name), Some(start_date), Some(end_date)) =
            (self.name, self.start_date, self.end_date)
        else {
            return Err(missing);
        };

        let start_date = parse_date("start_date", &start_date)?;
        let end_date = parse_date("end_date", &end_date)?;
        if start_date > end_date {
            return Err(StoreError::InvalidDateRange { start_date, end_date });
        }

        Ok(NewRecoveryCycle {
            name: non_blank("name", name)?,
            start_date,
            end_date,
            notes: self.notes,
        })
    }
}

/// Partial update. The date range is only checked on create, so an update may
/// move either end freely
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecoveryCycle {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub notes: Option<Option<String>>,
}

#[cfg(feature = "backend")]
impl RecoveryCycle {
    #[instrument(skip(conn))]
    pub fn fetch_by_id(conn: &Connection, id: i64) -> StoreResult<RecoveryCycle> {
        let (sql, values) = Query::select()
            .columns([
                RecoveryCycleIden::Id,
                RecoveryCycleIden::Name,
                RecoveryCycleIden::StartDate,
                RecoveryCycleIden::EndDate,
                RecoveryCycleIden::Notes,
            ])
            .from(RecoveryCycleIden::Table)
            .and_where(Expr::col(RecoveryCycleIden::Id).eq(id))
            .limit(1)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.query_row(&*values.as_params(), RecoveryCycle::from_row)
            .optional()?
            .ok_or_else(|| StoreError::not_found(Entity::RecoveryCycle, id).into())
    }

    /// Newest cycles first
    #[instrument(skip(conn))]
    pub fn fetch_all(conn: &Connection) -> StoreResult<Vec<RecoveryCycle>> {
        let (sql, values) = Query::select()
            .columns([
                RecoveryCycleIden::Id,
                RecoveryCycleIden::Name,
                RecoveryCycleIden::StartDate,
                RecoveryCycleIden::EndDate,
                RecoveryCycleIden::Notes,
            ])
            .from(RecoveryCycleIden::Table)
            .order_by(RecoveryCycleIden::StartDate, Order::Desc)
            .order_by(RecoveryCycleIden::Id, Order::Desc)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let res = stmt
            .query_map(&*values.as_params(), RecoveryCycle::from_row)?
            .collect::<Result<_, _>>()?;
        Ok(res)
    }

    #[instrument(skip(conn))]
    pub fn fetch_with_tasks(conn: &Connection, id: i64) -> StoreResult<RecoveryCycleWithTasks> {
        let cycle = RecoveryCycle::fetch_by_id(conn, id)?;
        let tasks = TrainingTaskDetails::fetch_for_cycle(conn, id)?;
        Ok(RecoveryCycleWithTasks { cycle, tasks })
    }

    #[instrument(skip(conn))]
    pub fn create(
        conn: &mut Connection,
        new_cycle: NewRecoveryCycle,
    ) -> StoreResult<RecoveryCycle> {
        let tx = conn.transaction()?;
        let cycle = {
            new_cycle.insert(&tx)?;
            RecoveryCycle::fetch_by_id(&tx, tx.last_insert_rowid())?
        };
        tx.commit()?;

        Ok(cycle)
    }

    #[instrument(skip(conn))]
    pub fn update(
        conn: &mut Connection,
        id: i64,
        update: UpdateRecoveryCycle,
    ) -> StoreResult<RecoveryCycle> {
        let tx = conn.transaction()?;
        if !row_exists(&tx, RecoveryCycleIden::Table, RecoveryCycleIden::Id, id)? {
            return Err(StoreError::not_found(Entity::RecoveryCycle, id).into());
        }

        let mut builder = UpdateBuilder::new();
        if let Some(name) = update.name {
            builder.set(RecoveryCycleIden::Name, non_blank("name", name)?);
        }
        if let Some(start_date) = update.start_date {
            builder.set(RecoveryCycleIden::StartDate, parse_date("start_date", &start_date)?);
        }
        if let Some(end_date) = update.end_date {
            builder.set(RecoveryCycleIden::EndDate, parse_date("end_date", &end_date)?);
        }
        if let Some(notes) = update.notes {
            builder.set(RecoveryCycleIden::Notes, notes);
        }
        builder.execute(&tx, RecoveryCycleIden::Table, RecoveryCycleIden::Id, id)?;

        let cycle = RecoveryCycle::fetch_by_id(&tx, id)?;
        tx.commit()?;

        Ok(cycle)
    }

    /// Removes the completions of the cycle's tasks, then the tasks, then the
    /// cycle itself
    #[instrument(skip(conn))]
    pub fn delete(conn: &mut Connection, id: i64) -> StoreResult<DeleteSummary> {
        let tx = conn.transaction()?;
        if !row_exists(&tx, RecoveryCycleIden::Table, RecoveryCycleIden::Id, id)? {
            return Err(StoreError::not_found(Entity::RecoveryCycle, id).into());
        }

        let (sql, values) = Query::delete()
            .from_table(CompletionIden::Table)
            .and_where(
                Expr::col(CompletionIden::TaskId).in_subquery(
                    Query::select()
                        .column(TrainingTaskIden::Id)
                        .from(TrainingTaskIden::Table)
                        .and_where(Expr::col(TrainingTaskIden::CycleId).eq(id))
                        .to_owned(),
                ),
            )
            .build_rusqlite(SqliteQueryBuilder);
        let completions = tx.execute(&sql, &*values.as_params())?;

        let (sql, values) = Query::delete()
            .from_table(TrainingTaskIden::Table)
            .and_where(Expr::col(TrainingTaskIden::CycleId).eq(id))
            .build_rusqlite(SqliteQueryBuilder);
        let training_tasks = tx.execute(&sql, &*values.as_params())?;

        let (sql, values) = Query::delete()
            .from_table(RecoveryCycleIden::Table)
            .and_where(Expr::col(RecoveryCycleIden::Id).eq(id))
            .build_rusqlite(SqliteQueryBuilder);
        tx.execute(&sql, &*values.as_params())?;
        tx.commit()?;

        debug!(training_tasks, completions, "cycle removed");
        Ok(DeleteSummary { id, training_tasks, completions })
    }
}
