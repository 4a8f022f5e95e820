use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
#[cfg(feature = "backend")]
use chrono::{Local, SubsecRound};
use serde::{Deserialize, Serialize};
#[cfg(feature = "backend")]
use {
    super::{row_exists, Entity, ExerciseIden, TrainingTask, TrainingTaskIden, UpdateBuilder},
    crate::api::{payloads::DeleteSummary, response_errors::StoreResult},
    exemplar::Model,
    rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior},
    sea_query::{
        enum_def, Alias, Expr, Func, Iden, Order, Query, SelectStatement, SimpleExpr,
        SqliteQueryBuilder,
    },
    sea_query_rusqlite::RusqliteBinder,
    tracing::{debug, instrument},
};

use super::{
    validate::{missing_fields, non_empty, non_negative, parse_date, parse_integer, parse_timestamp},
    ValidateModel,
};
use crate::api::response_errors::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("completion"))]
#[cfg_attr(feature = "backend", enum_def)]
pub struct Completion {
    pub id: i64,
    pub task_id: i64,
    pub completed_at: NaiveDateTime,
    pub actual_sets: Option<i64>,
    pub notes: Option<String>,
}

/// A completion with the schedule and exercise it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionDetails {
    #[serde(flatten)]
    pub completion: Completion,
    pub scheduled_time: NaiveTime,
    pub exercise_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("completion"))]
pub struct NewCompletion {
    pub task_id: i64,
    pub completed_at: NaiveDateTime,
    pub actual_sets: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCompletion {
    pub task_id: Option<i64>,
    /// Defaults to the current local time
    pub completed_at: Option<String>,
    pub actual_sets: Option<i64>,
    pub notes: Option<String>,
}

/// Body of `POST /api/tasks/:id/complete`, the task comes from the path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordCompletion {
    pub completed_at: Option<String>,
    pub actual_sets: Option<i64>,
    pub notes: Option<String>,
}

impl RecordCompletion {
    pub fn for_task(self, task_id: i64) -> CreateCompletion {
        CreateCompletion {
            task_id: Some(task_id),
            completed_at: self.completed_at,
            actual_sets: self.actual_sets,
            notes: self.notes,
        }
    }
}

/// A completion before its timestamp defaults are filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCompletion {
    pub task_id: i64,
    pub completed_at: Option<NaiveDateTime>,
    pub actual_sets: Option<i64>,
    pub notes: Option<String>,
}

impl ValidateModel for CreateCompletion {
    type Valid = ValidCompletion;

    fn validate(self) -> Result<ValidCompletion, StoreError> {
        let Some(task_id) = self.task_id else {
            return Err(missing_fields([("task_id", true)]));
        };

        Ok(ValidCompletion {
            task_id,
            completed_at: self
                .completed_at
                .map(|c| parse_timestamp("completed_at", &c))
                .transpose()?,
            actual_sets: self
                .actual_sets
                .map(|s| non_negative("actual_sets", s))
                .transpose()?,
            notes: self.notes,
        })
    }
}

#[cfg(feature = "backend")]
impl From<ValidCompletion> for NewCompletion {
    fn from(valid: ValidCompletion) -> Self {
        Self {
            task_id: valid.task_id,
            completed_at: valid
                .completed_at
                .unwrap_or_else(|| Local::now().naive_local().trunc_subsecs(0)),
            actual_sets: valid.actual_sets,
            notes: valid.notes,
        }
    }
}

/// Partial update. Moving a completion to another task updates both tasks'
/// completion flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCompletion {
    pub task_id: Option<i64>,
    pub completed_at: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub actual_sets: Option<Option<i64>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub notes: Option<Option<String>>,
}

/// Raw query string of the completion listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub task_id: Option<String>,
}

/// Date bounds are inclusive and apply to the day part of `completed_at`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub task_id: Option<i64>,
}

impl ValidateModel for CompletionFilter {
    type Valid = CompletionQuery;

    fn validate(self) -> Result<CompletionQuery, StoreError> {
        Ok(CompletionQuery {
            start_date: non_empty(self.start_date)
                .map(|d| parse_date("start_date", &d))
                .transpose()?,
            end_date: non_empty(self.end_date).map(|d| parse_date("end_date", &d)).transpose()?,
            task_id: non_empty(self.task_id).map(|t| parse_integer("task_id", &t)).transpose()?,
        })
    }
}

/// Raw query string of the statistics endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub cycle_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cycle_id: Option<i64>,
}

impl ValidateModel for StatsFilter {
    type Valid = StatsQuery;

    fn validate(self) -> Result<StatsQuery, StoreError> {
        Ok(StatsQuery {
            start_date: non_empty(self.start_date)
                .map(|d| parse_date("start_date", &d))
                .transpose()?,
            end_date: non_empty(self.end_date).map(|d| parse_date("end_date", &d)).transpose()?,
            cycle_id: non_empty(self.cycle_id)
                .map(|c| parse_integer("cycle_id", &c))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionStats {
    pub total_completions: i64,
    pub total_sets: i64,
    pub exercise_stats: Vec<ExerciseStat>,
    pub date_stats: Vec<DateStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStat {
    pub name: String,
    pub count: i64,
    pub total_sets: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateStat {
    pub date: NaiveDate,
    pub count: i64,
}

/// SQLite `date()`
#[cfg(feature = "backend")]
#[derive(Iden)]
struct Date;

#[cfg(feature = "backend")]
fn completed_on() -> SimpleExpr {
    Func::cust(Date)
        .arg(Expr::col((CompletionIden::Table, CompletionIden::CompletedAt)))
        .into()
}

#[cfg(feature = "backend")]
fn sets_sum() -> SimpleExpr {
    Func::coalesce([
        SimpleExpr::from(Func::sum(Expr::col((CompletionIden::Table, CompletionIden::ActualSets)))),
        Expr::val(0).into(),
    ])
    .into()
}

/// Completions joined with their task and exercise
#[cfg(feature = "backend")]
fn joined_query() -> SelectStatement {
    use CompletionIden as C;

    Query::select()
        .from(C::Table)
        .inner_join(
            TrainingTaskIden::Table,
            Expr::col((C::Table, C::TaskId))
                .equals((TrainingTaskIden::Table, TrainingTaskIden::Id)),
        )
        .inner_join(
            ExerciseIden::Table,
            Expr::col((TrainingTaskIden::Table, TrainingTaskIden::ExerciseId))
                .equals((ExerciseIden::Table, ExerciseIden::Id)),
        )
        .to_owned()
}

#[cfg(feature = "backend")]
fn details_query() -> SelectStatement {
    use CompletionIden as C;

    joined_query()
        .columns([
            (C::Table, C::Id),
            (C::Table, C::TaskId),
            (C::Table, C::CompletedAt),
            (C::Table, C::ActualSets),
            (C::Table, C::Notes),
        ])
        .column((TrainingTaskIden::Table, TrainingTaskIden::ScheduledTime))
        .expr_as(Expr::col((ExerciseIden::Table, ExerciseIden::Name)), Alias::new("exercise_name"))
        .to_owned()
}

#[cfg(feature = "backend")]
fn date_range(
    select: &mut SelectStatement,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) {
    if let Some(start_date) = start_date {
        select.and_where(Expr::expr(completed_on()).gte(start_date));
    }
    if let Some(end_date) = end_date {
        select.and_where(Expr::expr(completed_on()).lte(end_date));
    }
}

/// Inserts the completion and marks its task done. The task must already be
/// known to exist
#[cfg(feature = "backend")]
fn insert_completion(
    conn: &Connection,
    new_completion: NewCompletion,
) -> StoreResult<CompletionDetails> {
    let task_id = new_completion.task_id;
    new_completion.insert(conn)?;
    let id = conn.last_insert_rowid();
    TrainingTask::sync_completed(conn, task_id)?;

    CompletionDetails::fetch_by_id(conn, id)
}

#[cfg(feature = "backend")]
impl CompletionDetails {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            completion: Completion::from_row(row)?,
            scheduled_time: row.get("scheduled_time")?,
            exercise_name: row.get("exercise_name")?,
        })
    }

    #[instrument(skip(conn))]
    pub fn fetch_by_id(conn: &Connection, id: i64) -> StoreResult<CompletionDetails> {
        let (sql, values) = details_query()
            .and_where(Expr::col((CompletionIden::Table, CompletionIden::Id)).eq(id))
            .limit(1)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.query_row(&*values.as_params(), CompletionDetails::from_row)
            .optional()?
            .ok_or_else(|| StoreError::not_found(Entity::Completion, id).into())
    }
}

#[cfg(feature = "backend")]
impl Completion {
    /// Newest first
    #[instrument(skip(conn))]
    pub fn fetch_for_task(conn: &Connection, task_id: i64) -> StoreResult<Vec<Completion>> {
        let (sql, values) = Query::select()
            .columns([
                CompletionIden::Id,
                CompletionIden::TaskId,
                CompletionIden::CompletedAt,
                CompletionIden::ActualSets,
                CompletionIden::Notes,
            ])
            .from(CompletionIden::Table)
            .and_where(Expr::col(CompletionIden::TaskId).eq(task_id))
            .order_by(CompletionIden::CompletedAt, Order::Desc)
            .order_by(CompletionIden::Id, Order::Desc)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let res = stmt
            .query_map(&*values.as_params(), Completion::from_row)?
            .collect::<Result<_, _>>()?;
        Ok(res)
    }

    /// Filtered listing, newest first
    #[instrument(skip(conn))]
    pub fn fetch_all(
        conn: &Connection,
        query: &CompletionQuery,
    ) -> StoreResult<Vec<CompletionDetails>> {
        use CompletionIden as C;

        let mut select = details_query();
        date_range(&mut select, query.start_date, query.end_date);
        if let Some(task_id) = query.task_id {
            select.and_where(Expr::col((C::Table, C::TaskId)).eq(task_id));
        }
        let (sql, values) = select
            .order_by((C::Table, C::CompletedAt), Order::Desc)
            .order_by((C::Table, C::Id), Order::Desc)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let res = stmt
            .query_map(&*values.as_params(), CompletionDetails::from_row)?
            .collect::<Result<_, _>>()?;
        Ok(res)
    }

    /// Records a completion from the collection endpoint. An unknown task is a
    /// bad reference
    #[instrument(skip(conn))]
    pub fn create(conn: &mut Connection, valid: ValidCompletion) -> StoreResult<CompletionDetails> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !row_exists(&tx, TrainingTaskIden::Table, TrainingTaskIden::Id, valid.task_id)? {
            return Err(StoreError::missing_reference(Entity::TrainingTask, valid.task_id).into());
        }
        let completion = insert_completion(&tx, valid.into())?;
        tx.commit()?;

        Ok(completion)
    }

    /// Records a completion for the task named in the path. An unknown task is
    /// not found
    #[instrument(skip(conn))]
    pub fn record(conn: &mut Connection, valid: ValidCompletion) -> StoreResult<CompletionDetails> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !row_exists(&tx, TrainingTaskIden::Table, TrainingTaskIden::Id, valid.task_id)? {
            return Err(StoreError::not_found(Entity::TrainingTask, valid.task_id).into());
        }
        let completion = insert_completion(&tx, valid.into())?;
        tx.commit()?;

        Ok(completion)
    }

    #[instrument(skip(conn))]
    pub fn update(
        conn: &mut Connection,
        id: i64,
        update: UpdateCompletion,
    ) -> StoreResult<CompletionDetails> {
        use CompletionIden as C;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let previous = CompletionDetails::fetch_by_id(&tx, id)?.completion;

        let mut builder = UpdateBuilder::new();
        if let Some(task_id) = update.task_id {
            builder.set(C::TaskId, task_id);
        }
        if let Some(completed_at) = update.completed_at {
            builder.set(C::CompletedAt, parse_timestamp("completed_at", &completed_at)?);
        }
        if let Some(actual_sets) = update.actual_sets {
            builder.set(
                C::ActualSets,
                actual_sets.map(|s| non_negative("actual_sets", s)).transpose()?,
            );
        }
        if let Some(notes) = update.notes {
            builder.set(C::Notes, notes);
        }
        if builder.is_empty() {
            return Err(StoreError::EmptyUpdate.into());
        }
        if let Some(task_id) = update.task_id {
            if !row_exists(&tx, TrainingTaskIden::Table, TrainingTaskIden::Id, task_id)? {
                return Err(StoreError::missing_reference(Entity::TrainingTask, task_id).into());
            }
        }
        builder.execute(&tx, C::Table, C::Id, id)?;

        if let Some(task_id) = update.task_id.filter(|t| *t != previous.task_id) {
            TrainingTask::sync_completed(&tx, previous.task_id)?;
            TrainingTask::sync_completed(&tx, task_id)?;
        }

        let completion = CompletionDetails::fetch_by_id(&tx, id)?;
        tx.commit()?;

        Ok(completion)
    }

    /// Removes the completion. The task stays completed while other
    /// completions remain
    #[instrument(skip(conn))]
    pub fn delete(conn: &mut Connection, id: i64) -> StoreResult<DeleteSummary> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let previous = CompletionDetails::fetch_by_id(&tx, id)?.completion;

        let (sql, values) = Query::delete()
            .from_table(CompletionIden::Table)
            .and_where(Expr::col(CompletionIden::Id).eq(id))
            .build_rusqlite(SqliteQueryBuilder);
        tx.execute(&sql, &*values.as_params())?;
        let still_completed = TrainingTask::sync_completed(&tx, previous.task_id)?;
        tx.commit()?;

        debug!(task_id = previous.task_id, still_completed, "completion removed");
        Ok(DeleteSummary::new(id))
    }

    #[instrument(skip(conn))]
    pub fn stats(conn: &Connection, query: &StatsQuery) -> StoreResult<CompletionStats> {
        let filtered = || {
            let mut select = joined_query();
            date_range(&mut select, query.start_date, query.end_date);
            if let Some(cycle_id) = query.cycle_id {
                select.and_where(
                    Expr::col((TrainingTaskIden::Table, TrainingTaskIden::CycleId)).eq(cycle_id),
                );
            }
            select
        };

        let (sql, values) = filtered()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("total_completions"))
            .expr_as(sets_sum(), Alias::new("total_sets"))
            .build_rusqlite(SqliteQueryBuilder);
        let mut stmt = conn.prepare_cached(&sql)?;
        let (total_completions, total_sets) = stmt.query_row(&*values.as_params(), |row| {
            Ok((row.get("total_completions")?, row.get("total_sets")?))
        })?;

        let (sql, values) = filtered()
            .expr_as(Expr::col((ExerciseIden::Table, ExerciseIden::Name)), Alias::new("name"))
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("count"))
            .expr_as(sets_sum(), Alias::new("total_sets"))
            .group_by_col((ExerciseIden::Table, ExerciseIden::Id))
            .order_by(Alias::new("count"), Order::Desc)
            .order_by(Alias::new("name"), Order::Asc)
            .build_rusqlite(SqliteQueryBuilder);
        let mut stmt = conn.prepare_cached(&sql)?;
        let exercise_stats = stmt
            .query_map(&*values.as_params(), |row| {
                Ok(ExerciseStat {
                    name: row.get("name")?,
                    count: row.get("count")?,
                    total_sets: row.get("total_sets")?,
                })
            })?
            .collect::<Result<_, _>>()?;

        let (sql, values) = filtered()
            .expr_as(completed_on(), Alias::new("day"))
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("count"))
            .group_by_col(Alias::new("day"))
            .order_by(Alias::new("day"), Order::Asc)
            .build_rusqlite(SqliteQueryBuilder);
        let mut stmt = conn.prepare_cached(&sql)?;
        let date_stats = stmt
            .query_map(&*values.as_params(), |row| {
                Ok(DateStat { date: row.get("day")?, count: row.get("count")? })
            })?
            .collect::<Result<_, _>>()?;

        Ok(CompletionStats { total_completions, total_sets, exercise_stats, date_stats })
    }
}
