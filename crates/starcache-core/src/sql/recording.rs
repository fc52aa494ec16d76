use crate::sql::{Row, SqlError, SqlExecutor, SqlStatement};
use parking_lot::Mutex;

type Responder = dyn Fn(&SqlStatement) -> Result<Vec<Row>, SqlError> + Send + Sync;

///
/// RecordingSqlExecutor
///
/// Executor that records every statement it is handed and answers from a
/// caller-supplied responder. Used to assert generated SQL and to script
/// result sets without a database.
///

pub struct RecordingSqlExecutor {
    statements: Mutex<Vec<String>>,
    responder: Box<Responder>,
}

impl RecordingSqlExecutor {
    pub fn new(
        responder: impl Fn(&SqlStatement) -> Result<Vec<Row>, SqlError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Answers every statement with an empty result set.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    /// Fails every statement with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| {
            Err(SqlError::Failed {
                message: message.clone(),
            })
        })
    }

    /// SQL text of every statement executed so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }
}

impl SqlExecutor for RecordingSqlExecutor {
    fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>, SqlError> {
        self.statements.lock().push(statement.sql.clone());
        (self.responder)(statement)
    }
}

impl std::fmt::Debug for RecordingSqlExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSqlExecutor")
            .field("statements", &self.statement_count())
            .finish_non_exhaustive()
    }
}
