//! Interactive mode. Reads lines with rustyline, accumulates input until
//! brackets and quotes balance, evaluates against a persistent interpreter
//! so bindings survive between inputs, and resets the status after errors.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::interpreter::Interpreter;
use crate::value::Value;

/// Check if the input has unbalanced brackets or an open quote, suggesting
/// more input is needed before parsing.
fn is_incomplete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut escaped = false;
    let mut in_comment = false;
    for ch in input.chars() {
        if in_quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quote = false;
            }
            continue;
        }
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        match ch {
            '"' => in_quote = true,
            '#' => in_comment = true,
            '[' => depth += 1,
            ']' => depth -= 1,
            _ => {}
        }
    }
    depth > 0 || in_quote
}

/// Result of processing a single REPL line.
enum LineResult {
    /// Need more input (incomplete expression).
    Continue,
    /// Line was processed (output may have been produced).
    Done,
    /// `:q` was entered.
    Quit,
}

/// Process a single line of REPL input. Returns what, if anything, should be
/// displayed. This is the testable core of the loop; it does no I/O itself.
fn process_line(
    interpreter: &mut Interpreter,
    accumulated: &mut String,
    line: &str,
) -> (LineResult, Option<String>) {
    if accumulated.is_empty() && line.trim() == ":q" {
        return (LineResult::Quit, None);
    }
    if accumulated.is_empty() {
        *accumulated = line.to_string();
    } else {
        accumulated.push('\n');
        accumulated.push_str(line);
    }

    if is_incomplete(accumulated) {
        return (LineResult::Continue, None);
    }
    if accumulated.trim().is_empty() {
        accumulated.clear();
        return (LineResult::Done, None);
    }

    let display = match interpreter.eval_source(accumulated) {
        Ok((value, output)) => {
            let mut text = output;
            if !matches!(value, Value::Null) {
                text.push_str(&value.to_display_string());
                text.push('\n');
            }
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        // The status resets here; the next line starts clean.
        Err(err) => Some(format!("{}\n", err)),
    };

    accumulated.clear();
    (LineResult::Done, display)
}

pub fn run_repl() {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Failed to initialize line editor: {}", err);
            std::process::exit(1);
        }
    };

    let history_path = history_path();
    if let Some(ref path) = history_path {
        let _ = editor.load_history(path);
    }

    println!("bracken interpreter");
    println!("To quit, either send an EOF, or type ':q'.");

    let mut interpreter = Interpreter::new();
    interpreter.set_program_path("<repl>");
    let mut accumulated = String::new();

    loop {
        let prompt = if accumulated.is_empty() { "> " } else { "* " };
        match editor.readline(prompt) {
            Ok(line) => {
                let _ = editor.add_history_entry(&line);
                let (result, display) = process_line(&mut interpreter, &mut accumulated, &line);
                if let Some(text) = display {
                    print!("{}", text);
                }
                match result {
                    LineResult::Quit => break,
                    LineResult::Continue | LineResult::Done => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: cancel current input
                accumulated.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = editor.save_history(path);
    }
}

fn history_path() -> Option<std::path::PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let dir = std::path::PathBuf::from(home).join(".bracken");
    let _ = std::fs::create_dir_all(&dir);
    Some(dir.join("history"))
}
