use std::fmt;
use std::rc::Rc;

/// A position in a source file. Line and column are 0-based internally and
/// printed 1-based.
#[derive(Debug, Clone)]
pub struct Pos {
    pub file: Rc<str>,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line + 1, self.col + 1)
    }
}

#[derive(Debug, Clone)]
pub struct Ast {
    pub kind: AstKind,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum AstKind {
    Int(i64),
    Float(f64),
    Null,
    /// A literal string. Holds raw bytes; source text is not required to be
    /// valid UTF-8 inside quotes.
    Str(Vec<u8>),
    /// A `$name` variable reference.
    Var(Vec<u8>),
    /// A block: command lines, each a non-empty list of nodes.
    Commands(Vec<Vec<Ast>>),
    /// The binary `:` operator, built by the post-parse rewrite pass.
    Index(Box<Ast>, Box<Ast>),
    /// A bare `:` token. Only exists while parsing; the rewrite pass turns
    /// every occurrence into `Index` or fails.
    IndexOp,
}

/// True when a bare string would not scan back as a single string token
/// (delimiter bytes, or text that classifies as a number or `null`).
fn needs_quotes(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return true;
    }
    if bytes.iter().any(|b| {
        matches!(
            b,
            b' ' | b'\t' | b'\r' | b'\n' | b'[' | b']' | b';' | b':' | b'#' | b'$' | b'"' | b'\\'
        )
    }) {
        return true;
    }
    crate::parser::is_int_literal(bytes)
        || crate::parser::is_float_literal(bytes)
        || bytes == b"null"
}

fn write_quoted(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "\"")?;
    for ch in crate::value::lossy(bytes).chars() {
        match ch {
            '\\' => write!(f, "\\\\")?,
            '"' => write!(f, "\\\"")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            _ => write!(f, "{}", ch)?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Ast {
    /// Prints a node in source form. Parsing the output yields an equal tree,
    /// which is what `--dump-ast` and the round-trip tests rely on.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AstKind::Int(i) => write!(f, "{}", i),
            AstKind::Float(x) => write!(f, "{:.6}", x),
            AstKind::Null => write!(f, "null"),
            AstKind::Str(s) => {
                if needs_quotes(s) {
                    write_quoted(f, s)
                } else {
                    write!(f, "{}", crate::value::lossy(s))
                }
            }
            AstKind::Var(name) => write!(f, "${}", crate::value::lossy(name)),
            AstKind::Commands(lines) => {
                write!(f, "[")?;
                for (i, line) in lines.iter().enumerate() {
                    if i != 0 {
                        write!(f, ";")?;
                    }
                    for (j, node) in line.iter().enumerate() {
                        if j != 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{}", node)?;
                    }
                }
                write!(f, "]")
            }
            AstKind::Index(left, right) => write!(f, "{}:{}", left, right),
            AstKind::IndexOp => write!(f, ":"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Pos {
        Pos {
            file: Rc::from("<test>"),
            line: 0,
            col: 0,
        }
    }

    fn node(kind: AstKind) -> Ast {
        Ast { kind, pos: pos() }
    }

    #[test]
    fn pos_prints_one_based() {
        let p = Pos {
            file: Rc::from("demo.bk"),
            line: 2,
            col: 7,
        };
        assert_eq!(p.to_string(), "demo.bk:3:8");
    }

    #[test]
    fn bare_string_prints_raw() {
        assert_eq!(node(AstKind::Str(b"hello".to_vec())).to_string(), "hello");
    }

    #[test]
    fn delimiters_force_quoting() {
        assert_eq!(
            node(AstKind::Str(b"two words".to_vec())).to_string(),
            "\"two words\""
        );
        assert_eq!(node(AstKind::Str(b"a;b".to_vec())).to_string(), "\"a;b\"");
        assert_eq!(node(AstKind::Str(b"".to_vec())).to_string(), "\"\"");
    }

    #[test]
    fn numeric_looking_strings_quote() {
        // Without quotes "12" would re-parse as an Int node.
        assert_eq!(node(AstKind::Str(b"12".to_vec())).to_string(), "\"12\"");
        assert_eq!(node(AstKind::Str(b"-1.5".to_vec())).to_string(), "\"-1.5\"");
        assert_eq!(node(AstKind::Str(b"null".to_vec())).to_string(), "\"null\"");
    }

    #[test]
    fn commands_print_with_separators() {
        let block = node(AstKind::Commands(vec![
            vec![node(AstKind::Str(b"echo".to_vec())), node(AstKind::Int(1))],
            vec![node(AstKind::Str(b"echo".to_vec())), node(AstKind::Int(2))],
        ]));
        assert_eq!(block.to_string(), "[echo 1;echo 2]");
    }

    #[test]
    fn index_prints_infix() {
        let idx = node(AstKind::Index(
            Box::new(node(AstKind::Var(b"l".to_vec()))),
            Box::new(node(AstKind::Int(0))),
        ));
        assert_eq!(idx.to_string(), "$l:0");
    }
}
