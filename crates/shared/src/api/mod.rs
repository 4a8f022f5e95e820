use const_format::concatcp;
pub mod error;
pub mod payloads;
pub mod response_errors;

pub const API_BASE_PATH: &str = "/api/";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Object {
    Exercise,
    Cycle,
    Task,
    Completion,
    TaskComplete,
    CompletionStats,
    Table,
    Ping,
}

impl Object {
    /// Collection path, resources nest `/:id` below it
    pub const fn path(&self) -> &str {
        use Object::*;
        match self {
            Exercise => concatcp!(API_BASE_PATH, "exercises"),
            Cycle => concatcp!(API_BASE_PATH, "cycles"),
            Task => concatcp!(API_BASE_PATH, "tasks"),
            Completion => concatcp!(API_BASE_PATH, "completions"),
            TaskComplete => concatcp!(API_BASE_PATH, "tasks/:id/complete"),
            CompletionStats => concatcp!(API_BASE_PATH, "completions/stats"),
            Table => concatcp!(API_BASE_PATH, "table"),
            Ping => concatcp!(API_BASE_PATH, "ping"),
        }
    }

    pub const fn id_path(&self) -> &str {
        use Object::*;
        match self {
            Exercise => concatcp!(API_BASE_PATH, "exercises/:id"),
            Cycle => concatcp!(API_BASE_PATH, "cycles/:id"),
            Task => concatcp!(API_BASE_PATH, "tasks/:id"),
            Completion => concatcp!(API_BASE_PATH, "completions/:id"),
            TaskComplete | CompletionStats | Table | Ping => self.path(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Object;

    #[test]
    fn test_id_path_extends_path() {
        for object in [Object::Exercise, Object::Cycle, Object::Task, Object::Completion] {
            assert_eq!(object.id_path(), format!("{}/:id", object.path()));
        }
    }
}
