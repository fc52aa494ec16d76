use std::sync::atomic::{AtomicU64, Ordering};
use tracing::span::EnteredSpan;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

///
/// ExecutionContext
///
/// Who is asking: the session and statement an operation runs for.
/// Passed explicitly to every batch load and cache edit.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionContext {
    id: u64,
    session: String,
    statement: String,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(session: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            session: session.into(),
            statement: statement.into(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn session(&self) -> &str {
        &self.session
    }

    #[must_use]
    pub fn statement(&self) -> &str {
        &self.statement
    }

    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "execution",
            id = self.id,
            session = %self.session,
            statement = %self.statement
        )
    }
}

///
/// ContextStack
///
/// Contexts entered on one logical worker. Entering returns a guard that
/// pops the context on every exit path, so nesting is strict.
///

#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<ExecutionContext>,
}

impl ContextStack {
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    #[must_use]
    pub fn current(&self) -> Option<&ExecutionContext> {
        self.frames.last()
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push `context` and enter its tracing span until the guard drops.
    pub fn enter(&mut self, context: ExecutionContext) -> ContextGuard<'_> {
        let span = context.span().entered();
        self.frames.push(context);

        ContextGuard {
            stack: self,
            _span: span,
        }
    }
}

///
/// ContextGuard
///

#[derive(Debug)]
pub struct ContextGuard<'a> {
    stack: &'a mut ContextStack,
    _span: EnteredSpan,
}

impl ContextGuard<'_> {
    /// The context this guard entered.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        // the guard's frame is on top while the guard is alive
        &self.stack.frames[self.stack.frames.len() - 1]
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Enter a nested context; it is popped before this guard's.
    pub fn enter(&mut self, context: ExecutionContext) -> ContextGuard<'_> {
        self.stack.enter(context)
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.pop();
    }
}
