use std::borrow::Cow;
use std::rc::Rc;

use super::Value;

/// Best-effort text for byte strings embedded in messages.
pub(crate) fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

impl Value {
    /// Renders the value as bytes. At the top level strings appear raw;
    /// nested inside a list or map they are quoted so the structure stays
    /// readable.
    pub(crate) fn to_bytes(&self, toplevel: bool, out: &mut Vec<u8>) {
        match self {
            Value::Null => out.extend_from_slice(b"null"),
            Value::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Value::Float(f) => out.extend_from_slice(format!("{:.6}", f).as_bytes()),
            Value::Str(s) => {
                if !toplevel {
                    out.push(b'"');
                }
                out.extend_from_slice(&s.borrow());
                if !toplevel {
                    out.push(b'"');
                }
            }
            Value::List(items) => {
                out.extend_from_slice(b"[list");
                for item in items.borrow().iter() {
                    out.push(b' ');
                    item.to_bytes(false, out);
                }
                out.push(b']');
            }
            Value::Map(table) => {
                out.extend_from_slice(b"[map");
                for (key, item) in table.borrow().iter() {
                    out.push(b' ');
                    out.extend_from_slice(key);
                    out.push(b' ');
                    item.to_bytes(false, out);
                }
                out.push(b']');
            }
            Value::Native(cmd) => {
                out.extend_from_slice(
                    format!("<externcmd @ {:p}>", Rc::as_ptr(cmd)).as_bytes(),
                );
            }
            Value::Cmd(cmd) => {
                out.extend_from_slice(b"[cmd");
                for param in &cmd.params {
                    out.push(b' ');
                    out.push(b'$');
                    out.extend_from_slice(param);
                }
                out.extend_from_slice(b" ...]");
            }
        }
    }

    /// The `string` conversion: top-level rendering as a new string value.
    pub fn to_value_string(&self) -> Value {
        match self {
            Value::Str(_) => self.clone(),
            _ => {
                let mut out = Vec::new();
                self.to_bytes(true, &mut out);
                Value::new_str(out)
            }
        }
    }

    /// Top-level rendering as host text, for errors, tests and the REPL.
    pub fn to_display_string(&self) -> String {
        let mut out = Vec::new();
        self.to_bytes(true, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::super::MapTable;
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(Value::Null.to_display_string(), "null");
        assert_eq!(Value::Int(-7).to_display_string(), "-7");
        assert_eq!(Value::Float(1.5).to_display_string(), "1.500000");
    }

    #[test]
    fn strings_raw_at_top_level_quoted_nested() {
        let s = Value::new_str(b"hi".to_vec());
        assert_eq!(s.to_display_string(), "hi");
        let l = Value::new_list(vec![s, Value::Int(2)]);
        assert_eq!(l.to_display_string(), "[list \"hi\" 2]");
    }

    #[test]
    fn maps_render_pairs() {
        let mut t = MapTable::new(8, ());
        t.set(b"a", Value::Int(1));
        let m = Value::new_map(t);
        assert_eq!(m.to_display_string(), "[map a 1]");
    }

    #[test]
    fn commands_render_params() {
        let cmd = Value::Cmd(std::rc::Rc::new(super::super::CmdData {
            params: vec![b"x".to_vec(), b"y".to_vec()],
            body: crate::ast::Ast {
                kind: crate::ast::AstKind::Null,
                pos: crate::ast::Pos {
                    file: Rc::from("<test>"),
                    line: 0,
                    col: 0,
                },
            },
            receiver: std::cell::RefCell::new(None),
        }));
        assert_eq!(cmd.to_display_string(), "[cmd $x $y ...]");
    }

    #[test]
    fn string_conversion_returns_string_value() {
        let v = Value::Int(42).to_value_string();
        assert!(matches!(&v, Value::Str(s) if *s.borrow() == b"42".to_vec()));
    }
}
