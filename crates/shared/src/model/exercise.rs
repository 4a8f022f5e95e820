use serde::{Deserialize, Serialize};
#[cfg(feature = "backend")]
use {
    super::{count_rows, row_exists, TrainingTaskIden, UpdateBuilder},
    crate::api::{payloads::DeleteSummary, response_errors::StoreResult},
    exemplar::Model,
    rusqlite::{Connection, OptionalExtension},
    sea_query::{enum_def, Expr, Order, Query, SqliteQueryBuilder},
    sea_query_rusqlite::RusqliteBinder,
    tracing::instrument,
};

use super::{
    validate::{missing_fields, non_blank, non_negative},
    ValidateModel,
};
#[cfg(feature = "backend")]
use super::Entity;
use crate::api::response_errors::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("exercise"))]
#[cfg_attr(feature = "backend", enum_def)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub duration_sec: i64,
    pub rest_sec: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(Model))]
#[cfg_attr(feature = "backend", table("exercise"))]
pub struct NewExercise {
    pub name: String,
    pub duration_sec: i64,
    pub rest_sec: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateExercise {
    pub name: Option<String>,
    pub duration_sec: Option<i64>,
    pub rest_sec: Option<i64>,
    pub description: Option<String>,
}

impl ValidateModel for CreateExercise {
    type Valid = NewExercise;

    fn validate(self) -> Result<NewExercise, StoreError> {
        let missing = missing_fields([
            ("name", self.name.is_none()),
            ("duration_sec", self.duration_sec.is_none()),
            ("rest_sec", self.rest_sec.is_none()),
        ]);

        match (self.name, self.duration_sec, self.rest_sec) {
            (Some(name), Some(duration_sec), Some(rest_sec)) => Ok(NewExercise {
                name: non_blank("name", name)?,
                duration_sec: non_negative("duration_sec", duration_sec)?,
                rest_sec: non_negative("rest_sec", rest_sec)?,
                description: self.description,
            }),
            _ => Err(missing),
        }
    }
}

/// Partial update. `description: null` clears the description, leaving it out
/// keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateExercise {
    pub name: Option<String>,
    pub duration_sec: Option<i64>,
    pub rest_sec: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub description: Option<Option<String>>,
}

#[cfg(feature = "backend")]
impl Exercise {
    #[instrument(skip(conn))]
    pub fn fetch_by_id(conn: &Connection, id: i64) -> StoreResult<Exercise> {
        let (sql, values) = Query::select()
            .columns([
                ExerciseIden::Id,
                ExerciseIden::Name,
                ExerciseIden::DurationSec,
                ExerciseIden::RestSec,
                ExerciseIden::Description,
            ])
            .from(ExerciseIden::Table)
            .and_where(Expr::col(ExerciseIden::Id).eq(id))
            .limit(1)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        stmt.query_row(&*values.as_params(), Exercise::from_row)
            .optional()?
            .ok_or_else(|| StoreError::not_found(Entity::Exercise, id).into())
    }

    #[instrument(skip(conn))]
    pub fn fetch_all(conn: &Connection) -> StoreResult<Vec<Exercise>> {
        let (sql, values) = Query::select()
            .columns([
                ExerciseIden::Id,
                ExerciseIden::Name,
                ExerciseIden::DurationSec,
                ExerciseIden::RestSec,
                ExerciseIden::Description,
            ])
            .from(ExerciseIden::Table)
            .order_by(ExerciseIden::Name, Order::Asc)
            .order_by(ExerciseIden::Id, Order::Asc)
            .build_rusqlite(SqliteQueryBuilder);

        let mut stmt = conn.prepare_cached(&sql)?;
        let res = stmt
            .query_map(&*values.as_params(), Exercise::from_row)?
            .collect::<Result<_, _>>()?;
        Ok(res)
    }

    #[instrument(skip(conn))]
    pub fn create(conn: &mut Connection, new_exercise: NewExercise) -> StoreResult<Exercise> {
        let tx = conn.transaction()?;
        let exercise = {
            new_exercise.insert(&tx)?;
            Exercise::fetch_by_id(&tx, tx.last_insert_rowid())?
        };
        tx.commit()?;

        Ok(exercise)
    }

    #[instrument(skip(conn))]
    pub fn update(conn: &mut Connection, id: i64, update: UpdateExercise) -> StoreResult<Exercise> {
        let tx = conn.transaction()?;
        if !row_exists(&tx, ExerciseIden::Table, ExerciseIden::Id, id)? {
            return Err(StoreError::not_found(Entity::Exercise, id).into());
        }

        let mut builder = UpdateBuilder::new();
        if let Some(name) = update.name {
            builder.set(ExerciseIden::Name, non_blank("name", name)?);
        }
        if let Some(duration_sec) = update.duration_sec {
            builder.set(ExerciseIden::DurationSec, non_negative("duration_sec", duration_sec)?);
        }
        if let Some(rest_sec) = update.rest_sec {
            builder.set(ExerciseIden::RestSec, non_negative("rest_sec", rest_sec)?);
        }
        if let Some(description) = update.description {
            builder.set(ExerciseIden::Description, description);
        }
        builder.execute(&tx, ExerciseIden::Table, ExerciseIden::Id, id)?;

        let exercise = Exercise::fetch_by_id(&tx, id)?;
        tx.commit()?;

        Ok(exercise)
    }

    /// Refuses while any training task still points at the exercise
    #[instrument(skip(conn))]
    pub fn delete(conn: &mut Connection, id: i64) -> StoreResult<DeleteSummary> {
        let tx = conn.transaction()?;
        if !row_exists(&tx, ExerciseIden::Table, ExerciseIden::Id, id)? {
            return Err(StoreError::not_found(Entity::Exercise, id).into());
        }

        let references =
            count_rows(&tx, TrainingTaskIden::Table, TrainingTaskIden::ExerciseId, id)?;
        if references > 0 {
            return Err(StoreError::InUse { entity: Entity::Exercise, id, references }.into());
        }

        let (sql, values) = Query::delete()
            .from_table(ExerciseIden::Table)
            .and_where(Expr::col(ExerciseIden::Id).eq(id))
            .build_rusqlite(SqliteQueryBuilder);
        tx.execute(&sql, &*values.as_params())?;
        tx.commit()?;

        Ok(DeleteSummary::new(id))
    }
}

#[cfg(all(test, feature = "backend"))]
mod test {
    use super::*;
    use crate::{db::test_connection, model::fixtures::push_up};

    #[test]
    fn test_create_reports_every_missing_field() {
        let err = CreateExercise { rest_sec: Some(10), ..Default::default() }
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::MissingFields { fields: vec!["name".into(), "duration_sec".into()] }
        );
    }

    #[test]
    fn test_create_rejects_negative_duration() {
        let err = CreateExercise {
            name: Some("Plank".into()),
            duration_sec: Some(-5),
            rest_sec: Some(0),
            description: None,
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { field, .. } if field == "duration_sec"));
    }

    #[test]
    fn test_create_and_fetch() {
        let mut conn = test_connection();
        let created = Exercise::create(&mut conn, push_up()).unwrap();
        assert_eq!(created.name, "Push up");
        assert_eq!(Exercise::fetch_by_id(&conn, created.id).unwrap(), created);
    }

    #[test]
    fn test_fetch_all_orders_by_name() {
        let mut conn = test_connection();
        for name in ["Squat", "Bridge", "Lunge"] {
            Exercise::create(&mut conn, NewExercise { name: name.into(), ..push_up() }).unwrap();
        }
        let names: Vec<_> =
            Exercise::fetch_all(&conn).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Bridge", "Lunge", "Squat"]);
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut conn = test_connection();
        let created = Exercise::create(&mut conn, push_up()).unwrap();

        let update = UpdateExercise { rest_sec: Some(20), ..Default::default() };
        let updated = Exercise::update(&mut conn, created.id, update).unwrap();
        assert_eq!(updated, Exercise { rest_sec: 20, ..created });
    }

    #[test]
    fn test_update_null_clears_description() {
        let mut conn = test_connection();
        let created = Exercise::create(&mut conn, push_up()).unwrap();

        let update: UpdateExercise = serde_json::from_str(r#"{"description": null}"#).unwrap();
        let updated = Exercise::update(&mut conn, created.id, update).unwrap();
        assert_eq!(updated.description, None);
        assert_eq!(updated.name, created.name);
    }

    #[test]
    fn test_update_errors() {
        let mut conn = test_connection();
        let created = Exercise::create(&mut conn, push_up()).unwrap();

        let err = Exercise::update(&mut conn, created.id, UpdateExercise::default()).unwrap_err();
        assert_eq!(err.inner(), Some(&StoreError::EmptyUpdate));

        let update = UpdateExercise { name: Some("x".into()), ..Default::default() };
        let err = Exercise::update(&mut conn, created.id + 1, update).unwrap_err();
        assert_eq!(err.inner(), Some(&StoreError::not_found(Entity::Exercise, created.id + 1)));
    }

    #[test]
    fn test_delete() {
        let mut conn = test_connection();
        let created = Exercise::create(&mut conn, push_up()).unwrap();

        let err = Exercise::delete(&mut conn, created.id + 1).unwrap_err();
        assert_eq!(err.code(), http::StatusCode::NOT_FOUND);

        assert_eq!(
            Exercise::delete(&mut conn, created.id).unwrap(),
            DeleteSummary::new(created.id)
        );
        assert!(Exercise::fetch_all(&conn).unwrap().is_empty());
    }
}
