use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
#[cfg(feature = "backend")]
use {
    super::{
        count_rows, row_exists, Completion, CompletionIden, Entity, ExerciseIden,
        RecoveryCycleIden, UpdateBuilder,
    },
    crate::api::{payloads::DeleteSummary, response_errors::StoreResult},
    exemplar::Model,
    rusqlite::{Connection, OptionalExtension, Row},
    sea_query::{enum_def, Alias, Cond, Expr, Order, Query, SelectStatement, SqliteQueryBuilder},
    sea_query_rusqlite::RusqliteBinder,
    tracing::{debug, instrument},
};

use super::{
    validate::{
        day_of_week, missing_fields, non_empty, parse_date, parse_integer, parse_time, positive,
    },
    ValidateModel,
};
use crate::api::response_errors::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("training_task"))]
#[cfg_attr(feature = "backend", enum_def)]
pub struct TrainingTask {
    pub id: i64,
    pub cycle_id: i64,
    pub exercise_id: i64,
    pub scheduled_time: NaiveTime,
    pub sets: i64,
    /// 0 is Monday. `None` means every day
    pub day_of_week: Option<i64>,
    /// `None` means any date
    pub specific_date: Option<NaiveDate>,
    /// Kept in step with the task's completions
    pub is_completed: bool,
}

/// A task together with the exercise fields a schedule needs to show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTaskDetails {
    #[serde(flatten)]
    pub task: TrainingTask,
    pub exercise_name: String,
    pub duration_sec: i64,
    pub rest_sec: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTaskWithCompletions {
    #[serde(flatten)]
    pub details: TrainingTaskDetails,
    pub completions: Vec<Completion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("training_task"))]
pub struct NewTrainingTask {
    pub cycle_id: i64,
    pub exercise_id: i64,
    pub scheduled_time: NaiveTime,
    pub sets: i64,
    pub day_of_week: Option<i64>,
    pub specific_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTrainingTask {
    pub cycle_id: Option<i64>,
    pub exercise_id: Option<i64>,
    pub scheduled_time: Option<String>,
    pub sets: Option<i64>,
    pub day_of_week: Option<i64>,
    pub specific_date: Option<String>,
}

impl ValidateModel for CreateTrainingTask {
    type Valid = NewTrainingTask;

    fn validate(self) -> Result<NewTrainingTask, StoreError> {
        let missing = missing_fields([
            ("cycle_id", self.cycle_id.is_none()),
            ("exercise_id", self.exercise_id.is_none()),
            ("scheduled_time", self.scheduled_time.is_none()),
            ("sets", self.sets.is_none()),
        ]);

        let (Some(cycle_id), Some(exercise_id), Some(scheduled_time), Some(sets)) =
            (self.cycle_id, self.exercise_id, self.scheduled_time, self.sets)
        else {
            return Err(missing);
        };

        Ok(NewTrainingTask {
            cycle_id,
            exercise_id,
            scheduled_time: parse_time("scheduled_time", &scheduled_time)?,
            sets: positive("sets", sets)?,
            day_of_week: self.day_of_week.map(|d| day_of_week("day_of_week", d)).transpose()?,
            specific_date: self
                .specific_date
                .map(|d| parse_date("specific_date", &d))
                .transpose()?,
        })
    }
}

/// Partial update. `day_of_week` and `specific_date` can be cleared with
/// `null`. `is_completed` follows the completions and cannot be set here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTrainingTask {
    pub cycle_id: Option<i64>,
    pub exercise_id: Option<i64>,
    pub scheduled_time: Option<String>,
    pub sets: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub day_of_week: Option<Option<i64>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub specific_date: Option<Option<String>>,
}

/// Raw query string of the task listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub date: Option<String>,
    pub day_of_week: Option<String>,
    pub cycle_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    /// Tasks pinned to this date plus tasks with no date
    pub date: Option<NaiveDate>,
    /// Exact match on its own, with `date` also admits tasks with no weekday
    pub day_of_week: Option<i64>,
    pub cycle_id: Option<i64>,
}

impl ValidateModel for TaskFilter {
    type Valid = TaskQuery;

    fn validate(self) -> Result<TaskQuery, StoreError> {
        let day = non_empty(self.day_of_week)
            .map(|d| parse_integer("day_of_week", &d).and_then(|d| day_of_week("day_of_week", d)))
            .transpose()?;

        Ok(TaskQuery {
            date: non_empty(self.date).map(|d| parse_date("date", &d)).transpose()?,
            day_of_week: day,
            cycle_id: non_empty(self.cycle_id)
                .map(|c| parse_integer("cycle_id", &c))
                .transpose()?,
        })
    }
}

#[cfg(feature = "backend")]
fn details_query() -> SelectStatement {
    use TrainingTaskIden as T;

    Query::select()
        .columns([
            (T::Table, T::Id),
            (T::Table, T::CycleId),
            (T::Table, T::ExerciseId),
            (T::Table, T::ScheduledTime),
            (T::Table, T::Sets),
            (T::Table, T::DayOfWeek),
            (T::Table, T::SpecificDate),
            (T::Table, T::IsCompleted),
        ])
        .expr_as(Expr::col((ExerciseIden::Table, ExerciseIden::Name)), Alias::new("exercise_name"))
        .column((ExerciseIden::Table, ExerciseIden::DurationSec))
        .column((ExerciseIden::Table, ExerciseIden::RestSec))
        .from(T::Table)
        .inner_join(
            ExerciseIden::Table,
            Expr::col((T::Table, T::ExerciseId)).equals((ExerciseIden::Table, ExerciseIden::Id)),
        )
        .to_owned()
}

#[cfg(feature = "backend")]
fn query_details(
    conn: &Connection,
    select: &SelectStatement,
) -> StoreResult<Vec<TrainingTaskDetails>> {
    let (sql, values) = select.build_rusqlite(SqliteQueryBuilder);

    let mut stmt = conn.prepare_cached(&sql)?;
    let res = stmt
        .query_map(&*values.as_params(), TrainingTaskDetails::from_row)?
        .collect::<Result<_, _>>()?;
    Ok(res)
}

/// Fails with a reference error naming whichever of the two parents is absent
#[cfg(feature = "backend")]
fn check_references(
    conn: &Connection,
    cycle_id: Option<i64>,
    exercise_id: Option<i64>,
) -> StoreResult<()> {
    if let Some(cycle_id) = cycle_id {
        if !row_exists(conn, RecoveryCycleIden::Table, RecoveryCycleIden::Id, cycle_id)? {
            return Err(StoreError::missing_reference(Entity::RecoveryCycle, cycle_id).into());
        }
    }
    if let Some(exercise_id) = exercise_id {
        if !row_exists(conn, ExerciseIden::Table, ExerciseIden::Id, exercise_id)? {
            return Err(StoreError::missing_reference(Entity::Exercise, exercise_id).into());
        }
    }
    Ok(())
}

#[cfg(feature = "backend")]
impl TrainingTaskDetails {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            task: TrainingTask::from_row(row)?,
            exercise_name: row.get("exercise_name")?,
            duration_sec: row.get("duration_sec")?,
            rest_sec: row.get("rest_sec")?,
        })
    }

    #[instrument(skip(conn))]
    pub fn fetch_by_id(conn: &Connection, id: i64) -> StoreResult<TrainingTaskDetails> {
        let (sql, values) = details_query()
            .and_where(Expr::col((TrainingTaskIden::Table, TrainingTaskIden::Id)).eq(id))
            .limit(1)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.query_row(&*values.as_params(), TrainingTaskDetails::from_row)
            .optional()?
            .ok_or_else(|| StoreError::not_found(Entity::TrainingTask, id).into())
    }

    /// Ordered by weekday, then time of day
    #[instrument(skip(conn))]
    pub fn fetch_for_cycle(
        conn: &Connection,
        cycle_id: i64,
    ) -> StoreResult<Vec<TrainingTaskDetails>> {
        use TrainingTaskIden as T;

        let select = details_query()
            .and_where(Expr::col((T::Table, T::CycleId)).eq(cycle_id))
            .order_by((T::Table, T::DayOfWeek), Order::Asc)
            .order_by((T::Table, T::ScheduledTime), Order::Asc)
            .order_by((T::Table, T::Id), Order::Asc)
            .to_owned();
        query_details(conn, &select)
    }
}

#[cfg(feature = "backend")]
impl TrainingTask {
    #[instrument(skip(conn))]
    pub fn fetch_with_completions(
        conn: &Connection,
        id: i64,
    ) -> StoreResult<TrainingTaskWithCompletions> {
        let details = TrainingTaskDetails::fetch_by_id(conn, id)?;
        let completions = Completion::fetch_for_task(conn, id)?;
        Ok(TrainingTaskWithCompletions { details, completions })
    }

    /// Filtered listing ordered by time of day
    #[instrument(skip(conn))]
    pub fn fetch_all(
        conn: &Connection,
        query: &TaskQuery,
    ) -> StoreResult<Vec<TrainingTaskDetails>> {
        use TrainingTaskIden as T;

        let mut select = details_query();
        match (query.date, query.day_of_week) {
            (Some(date), day) => {
                select.cond_where(
                    Cond::any()
                        .add(Expr::col((T::Table, T::SpecificDate)).eq(date))
                        .add(Expr::col((T::Table, T::SpecificDate)).is_null()),
                );
                if let Some(day) = day {
                    select.cond_where(
                        Cond::any()
                            .add(Expr::col((T::Table, T::DayOfWeek)).eq(day))
                            .add(Expr::col((T::Table, T::DayOfWeek)).is_null()),
                    );
                }
            }
            (None, Some(day)) => {
                select.and_where(Expr::col((T::Table, T::DayOfWeek)).eq(day));
            }
            (None, None) => {}
        }
        if let Some(cycle_id) = query.cycle_id {
            select.and_where(Expr::col((T::Table, T::CycleId)).eq(cycle_id));
        }
        select
            .order_by((T::Table, T::ScheduledTime), Order::Asc)
            .order_by((T::Table, T::Id), Order::Asc);

        query_details(conn, &select)
    }

    #[instrument(skip(conn))]
    pub fn create(
        conn: &mut Connection,
        new_task: NewTrainingTask,
    ) -> StoreResult<TrainingTaskDetails> {
        let tx = conn.transaction()?;
        check_references(&tx, Some(new_task.cycle_id), Some(new_task.exercise_id))?;
        let task = {
            new_task.insert(&tx)?;
            TrainingTaskDetails::fetch_by_id(&tx, tx.last_insert_rowid())?
        };
        tx.commit()?;

        Ok(task)
    }

    #[instrument(skip(conn))]
    pub fn update(
        conn: &mut Connection,
        id: i64,
        update: UpdateTrainingTask,
    ) -> StoreResult<TrainingTaskDetails> {
        use TrainingTaskIden as T;

        let tx = conn.transaction()?;
        if !row_exists(&tx, T::Table, T::Id, id)? {
            return Err(StoreError::not_found(Entity::TrainingTask, id).into());
        }

        let mut builder = UpdateBuilder::new();
        if let Some(cycle_id) = update.cycle_id {
            builder.set(T::CycleId, cycle_id);
        }
        if let Some(exercise_id) = update.exercise_id {
            builder.set(T::ExerciseId, exercise_id);
        }
        if let Some(scheduled_time) = update.scheduled_time {
            builder.set(T::ScheduledTime, parse_time("scheduled_time", &scheduled_time)?);
        }
        if let Some(sets) = update.sets {
            builder.set(T::Sets, positive("sets", sets)?);
        }
        if let Some(day) = update.day_of_week {
            builder.set(T::DayOfWeek, day.map(|d| day_of_week("day_of_week", d)).transpose()?);
        }
        if let Some(date) = update.specific_date {
            builder.set(
                T::SpecificDate,
                date.map(|d| parse_date("specific_date", &d)).transpose()?,
            );
        }
        if builder.is_empty() {
            return Err(StoreError::EmptyUpdate.into());
        }
        check_references(&tx, update.cycle_id, update.exercise_id)?;
        builder.execute(&tx, T::Table, T::Id, id)?;

        let task = TrainingTaskDetails::fetch_by_id(&tx, id)?;
        tx.commit()?;

        Ok(task)
    }

    /// Removes the task's completions, then the task
    #[instrument(skip(conn))]
    pub fn delete(conn: &mut Connection, id: i64) -> StoreResult<DeleteSummary> {
        let tx = conn.transaction()?;
        if !row_exists(&tx, TrainingTaskIden::Table, TrainingTaskIden::Id, id)? {
            return Err(StoreError::not_found(Entity::TrainingTask, id).into());
        }

        let (sql, values) = Query::delete()
            .from_table(CompletionIden::Table)
            .and_where(Expr::col(CompletionIden::TaskId).eq(id))
            .build_rusqlite(SqliteQueryBuilder);
        let completions = tx.execute(&sql, &*values.as_params())?;

        let (sql, values) = Query::delete()
            .from_table(TrainingTaskIden::Table)
            .and_where(Expr::col(TrainingTaskIden::Id).eq(id))
            .build_rusqlite(SqliteQueryBuilder);
        tx.execute(&sql, &*values.as_params())?;
        tx.commit()?;

        debug!(completions, "task removed");
        Ok(DeleteSummary { id, training_tasks: 0, completions })
    }

    /// Recomputes `is_completed` from the completions that reference the task.
    /// Callers hold an immediate transaction around the change that triggered it
    #[instrument(skip(conn))]
    pub fn sync_completed(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
        let completed = count_rows(conn, CompletionIden::Table, CompletionIden::TaskId, id)? > 0;

        let (sql, values) = Query::update()
            .table(TrainingTaskIden::Table)
            .value(TrainingTaskIden::IsCompleted, completed)
            .and_where(Expr::col(TrainingTaskIden::Id).eq(id))
            .build_rusqlite(SqliteQueryBuilder);
        conn.execute(&sql, &*values.as_params())?;

        Ok(completed)
    }
}
