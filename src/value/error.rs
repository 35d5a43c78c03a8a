use std::fmt;

use crate::ast::Pos;
use crate::value::Value;

/// A runtime or parse error. The position is optional because value-model
/// operations do not know where they were invoked from; the evaluator patches
/// it in at the call site.
#[derive(Debug)]
pub struct RuntimeError {
    pub pos: Option<Pos>,
    pub message: String,
}

impl RuntimeError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            pos: None,
            message: message.into(),
        }
    }

    pub(crate) fn at(pos: &Pos, message: impl Into<String>) -> Self {
        Self {
            pos: Some(pos.clone()),
            message: message.into(),
        }
    }

    /// Fills in the position unless one was already recorded.
    pub(crate) fn or_pos(mut self, pos: &Pos) -> Self {
        if self.pos.is_none() {
            self.pos = Some(pos.clone());
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{}: {}", pos, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// The status word threaded through every evaluation step. `Ok` is the `Ok`
/// arm of the surrounding `Result`; everything that aborts a block travels
/// here. Loops intercept `Break`/`Continue`, command calls intercept
/// `Return`, nothing intercepts `Error` short of the program root.
#[derive(Debug)]
pub enum Signal {
    Error(RuntimeError),
    Break,
    Continue,
    Return(Value),
}

impl From<RuntimeError> for Signal {
    fn from(err: RuntimeError) -> Self {
        Signal::Error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn pos() -> Pos {
        Pos {
            file: Rc::from("t.bk"),
            line: 1,
            col: 4,
        }
    }

    #[test]
    fn display_with_and_without_pos() {
        let e = RuntimeError::new("boom");
        assert_eq!(e.to_string(), "boom");
        let e = e.or_pos(&pos());
        assert_eq!(e.to_string(), "t.bk:2:5: boom");
    }

    #[test]
    fn or_pos_keeps_existing_position() {
        let first = pos();
        let later = Pos {
            file: Rc::from("other.bk"),
            line: 9,
            col: 9,
        };
        let e = RuntimeError::at(&first, "x").or_pos(&later);
        assert_eq!(e.to_string(), "t.bk:2:5: x");
    }
}
