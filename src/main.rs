use std::fs;
use std::path::{Path, PathBuf};

use calc_interpreter::{DisplayComplex, Lexer};
use clap::Parser;
use miette::IntoDiagnostic;
use miette::WrapErr;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

#[derive(Parser, Debug)]
#[command(version, about = "An interactive calculator over complex numbers")]
struct Args {
    /// Evaluate the expressions in this file instead of starting a session.
    script: Option<PathBuf>,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let mut parser = calc_interpreter::Parser::new();
    match args.script {
        Some(filename) => run_file(&mut parser, &filename),
        None => run_cli(&mut parser),
    }
}

fn run_file(parser: &mut calc_interpreter::Parser, filename: &Path) -> miette::Result<()> {
    let contents = fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;

    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parser.parse(&mut Lexer::new(filename.to_str(), line)) {
            Ok(value) => println!("{}", DisplayComplex(value)),
            Err(e) => eprintln!("[line {}] {e:?}", number + 1),
        }
    }
    Ok(())
}

fn run_cli(parser: &mut calc_interpreter::Parser) -> miette::Result<()> {
    show_intro();
    let mut rl = DefaultEditor::new().into_diagnostic()?;
    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                match command_for(line) {
                    Some(Command::Quit) => break,
                    Some(Command::Help) => print_help(),
                    None => match parser.parse(&mut Lexer::new(None, line)) {
                        Ok(value) => println!("{}", DisplayComplex(value)),
                        Err(e) => eprintln!("{e:?}"),
                    },
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).into_diagnostic(),
        }
    }
    Ok(())
}

enum Command {
    Help,
    Quit,
}

/// Administrative commands are matched against the raw line; anything else is
/// forwarded to the parser as an expression.
fn command_for(line: &str) -> Option<Command> {
    match line {
        "help" | "?" => Some(Command::Help),
        "quit" | "exit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

fn show_intro() {
    println!(
        "calc {} -- complex arithmetic with variables",
        env!("CARGO_PKG_VERSION")
    );
    println!("type `help` for the operator and command list, `quit` to leave");
}

fn print_help() {
    println!("operators: + - * / % | ^ ! ( ) =");
    println!("  `|` floor division, `^` power, `!` factorial, `name = expr` assignment");
    println!("constants: i, pi, e");
    println!("commands: help (?), quit (exit, q)");
}
