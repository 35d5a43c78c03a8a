use std::io::Read;

use bracken::{parse, Interpreter};

fn usage(program: &str) {
    println!(
        "Usage: {} [interpreter arguments] <filename> [program arguments]",
        program
    );
    println!(
        "Running with no arguments will launch an interactive REPL mode. \
         Running with filename '-' will read the program from stdin.\n"
    );
    println!("Interpreter Arguments:");
    println!("-h | --help\tShows this help information");
    println!("--repl\t\tLaunches the REPL even when a filename is given");
    println!("--dump-ast\tPrints the parsed program instead of running it");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("bracken");

    let mut dump_ast = false;
    let mut repl_flag = false;
    let mut filename: Option<String> = None;
    for arg in &args[1..] {
        match arg.as_str() {
            "-h" | "--help" => {
                usage(program);
                return;
            }
            "--dump-ast" => dump_ast = true,
            "--repl" => repl_flag = true,
            other => {
                filename = Some(other.to_string());
                break;
            }
        }
    }

    if repl_flag || filename.is_none() {
        bracken::run_repl();
        return;
    }

    let filename = filename.unwrap_or_default();
    let source = if filename == "-" {
        let mut text = String::new();
        if std::io::stdin().read_to_string(&mut text).is_err() {
            eprintln!("Could not read program from stdin.");
            std::process::exit(1);
        }
        text
    } else {
        match std::fs::read_to_string(&filename) {
            Ok(text) => text,
            Err(_) => {
                eprintln!("Could not open file {}.", filename);
                std::process::exit(1);
            }
        }
    };

    if dump_ast {
        match parse(&source, &filename) {
            Ok(ast) => println!("{}", ast),
            Err(err) => {
                eprintln!("{}", err);
                std::process::exit(2);
            }
        }
        return;
    }

    let mut interp = Interpreter::new();
    interp.set_immediate_stdout(true);
    interp.set_program_path(&filename);
    if let Err(err) = interp.run(&source) {
        eprintln!("{}", err);
        std::process::exit(2);
    }
}
