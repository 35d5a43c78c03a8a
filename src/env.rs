//! The variable environment: a hash table of name → binding tagged with a
//! scope identifier. Entering a block copies the whole table with the scope
//! bumped; bindings are shared *cells*, so assignment through a nested scope
//! is visible to every environment holding the same cell, while declaration
//! and deletion touch only the local table.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::hashtable::Table;
use crate::value::{lossy, RuntimeError, Value};

pub type Scope = u32;

const ENV_CAPACITY: usize = 512;

#[derive(Debug, Clone)]
struct Binding {
    scope: Scope,
    cell: Rc<RefCell<Value>>,
}

#[derive(Debug)]
pub struct Env {
    vars: Table<Binding, Scope>,
    out: Output,
}

impl Env {
    pub(crate) fn new(out: Output) -> Env {
        Env {
            vars: Table::new(ENV_CAPACITY, 0),
            out,
        }
    }

    pub fn scope(&self) -> Scope {
        *self.vars.data()
    }

    /// Full copy of every binding with the scope identifier bumped. Cells are
    /// shared, tables are not.
    pub fn nested(&self) -> Env {
        Env {
            vars: self.vars.clone_with(self.scope() + 1),
            out: self.out.clone(),
        }
    }

    pub fn get(&self, name: &[u8]) -> Option<Value> {
        self.vars.get(name).map(|b| b.cell.borrow().clone())
    }

    /// The binding cell itself, for commands that rebind in place (`swap!`).
    pub(crate) fn cell(&self, name: &[u8]) -> Option<Rc<RefCell<Value>>> {
        self.vars.get(name).map(|b| b.cell.clone())
    }

    /// `let!`: declaring a name twice in the same scope is an error; a nested
    /// scope may shadow by installing a fresh cell in its own table.
    pub fn declare(&mut self, name: &[u8], value: Value) -> Result<(), RuntimeError> {
        if let Some(existing) = self.vars.get(name) {
            if existing.scope == self.scope() {
                return Err(RuntimeError::new(format!(
                    "Cannot redeclare variable {}. (perhaps you meant to use set!)",
                    lossy(name)
                )));
            }
        }
        self.bind(name, value);
        Ok(())
    }

    /// Unconditional fresh binding at the current scope; used for parameter
    /// binding and catalog registration where redeclaration cannot happen.
    pub(crate) fn bind(&mut self, name: &[u8], value: Value) {
        self.vars.set(
            name,
            Binding {
                scope: self.scope(),
                cell: Rc::new(RefCell::new(value)),
            },
        );
    }

    /// `set!`: writes through the existing cell at whatever scope declared
    /// it; there must be one.
    pub fn assign(&mut self, name: &[u8], value: Value) -> Result<(), RuntimeError> {
        match self.vars.get(name) {
            Some(binding) => {
                *binding.cell.borrow_mut() = value;
                Ok(())
            }
            None => Err(RuntimeError::new(format!(
                "Variable {} does not exist. (perhaps you meant to use let!)",
                lossy(name)
            ))),
        }
    }

    /// `del!`: removes the local entry regardless of which scope declared it.
    pub fn delete(&mut self, name: &[u8]) {
        self.vars.del(name);
    }

    pub(crate) fn out(&self) -> &Output {
        &self.out
    }
}

/// Where `echo` and friends write. The handle is shared by an environment
/// and all its nested copies, so the interpreter can capture a whole run.
#[derive(Debug, Clone)]
pub(crate) struct Output {
    sink: Rc<RefCell<Sink>>,
}

#[derive(Debug)]
enum Sink {
    Stdout,
    Buffer(Vec<u8>),
}

impl Output {
    pub(crate) fn stdout() -> Output {
        Output {
            sink: Rc::new(RefCell::new(Sink::Stdout)),
        }
    }

    pub(crate) fn buffer() -> Output {
        Output {
            sink: Rc::new(RefCell::new(Sink::Buffer(Vec::new()))),
        }
    }

    /// Switches between buffering and pass-through; every environment
    /// sharing the handle sees the change.
    pub(crate) fn set_immediate(&self, immediate: bool) {
        let mut sink = self.sink.borrow_mut();
        let is_stdout = matches!(*sink, Sink::Stdout);
        if immediate && !is_stdout {
            *sink = Sink::Stdout;
        } else if !immediate && is_stdout {
            *sink = Sink::Buffer(Vec::new());
        }
    }

    pub(crate) fn write_bytes(&self, bytes: &[u8]) {
        match &mut *self.sink.borrow_mut() {
            Sink::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                let _ = handle.write_all(bytes);
                let _ = handle.flush();
            }
            Sink::Buffer(buf) => buf.extend_from_slice(bytes),
        }
    }

    /// Drains the captured output. Empty for pass-through sinks.
    pub(crate) fn take(&self) -> String {
        match &mut *self.sink.borrow_mut() {
            Sink::Stdout => String::new(),
            Sink::Buffer(buf) => String::from_utf8_lossy(&std::mem::take(buf)).into_owned(),
        }
    }
}
