use rusqlite::Connection;

use super::*;

pub fn push_up() -> NewExercise {
    CreateExercise {
        name: Some("Push up".into()),
        duration_sec: Some(30),
        rest_sec: Some(15),
        description: Some("Slow and controlled".into()),
    }
    .validate()
    .unwrap()
}

pub fn cycle(start_date: &str, end_date: &str) -> NewRecoveryCycle {
    CreateRecoveryCycle {
        name: Some(format!("Cycle from {start_date}")),
        start_date: Some(start_date.into()),
        end_date: Some(end_date.into()),
        notes: None,
    }
    .validate()
    .unwrap()
}

pub fn cycle_and_exercise(conn: &mut Connection) -> (RecoveryCycle, Exercise) {
    let cycle = RecoveryCycle::create(conn, cycle("2024-03-01", "2024-03-31")).unwrap();
    let exercise = Exercise::create(conn, push_up()).unwrap();
    (cycle, exercise)
}

pub fn new_task(
    cycle_id: i64,
    exercise_id: i64,
    scheduled_time: &str,
    day_of_week: Option<i64>,
) -> NewTrainingTask {
    CreateTrainingTask {
        cycle_id: Some(cycle_id),
        exercise_id: Some(exercise_id),
        scheduled_time: Some(scheduled_time.into()),
        sets: Some(3),
        day_of_week,
        specific_date: None,
    }
    .validate()
    .unwrap()
}

pub fn task(
    conn: &mut Connection,
    cycle_id: i64,
    exercise_id: i64,
    scheduled_time: &str,
    day_of_week: Option<i64>,
) -> TrainingTaskDetails {
    TrainingTask::create(conn, new_task(cycle_id, exercise_id, scheduled_time, day_of_week))
        .unwrap()
}

pub fn complete(conn: &mut Connection, task_id: i64) -> CompletionDetails {
    let valid = CreateCompletion { task_id: Some(task_id), ..Default::default() }
        .validate()
        .unwrap();
    Completion::create(conn, valid).unwrap()
}
