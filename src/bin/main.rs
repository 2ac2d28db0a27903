use std::{
    error::Error,
    io::{self, Write},
    process::ExitCode,
};

use tacky::{
    parser,
    scanner::Scanner,
    util::{fmt::listing, TokenStreamExt},
};

const EXIT_USAGE: u8 = 64;
const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_IO_ERROR: u8 = 74;

struct Options {
    tokens: bool,
    path: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();

    let Some(options) = parse_args(std::env::args().skip(1)) else {
        print_usage();
        return ExitCode::from(EXIT_USAGE);
    };

    let result = match options.path {
        Some(ref path) => run_file(path, options.tokens),
        None => repl(options.tokens).map(|()| true),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_COMPILE_ERROR),
        Err(error) => {
            eprintln!("failed to run: {error}");
            ExitCode::from(EXIT_IO_ERROR)
        }
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Option<Options> {
    let mut options = Options {
        tokens: false,
        path: None,
    };
    for arg in args {
        if arg == "--tokens" {
            options.tokens = true;
        } else if !arg.starts_with('-') && options.path.is_none() {
            options.path = Some(arg);
        } else {
            return None;
        }
    }
    Some(options)
}

fn print_usage() {
    eprintln!("Usage: tacky [--tokens] [path]");
    eprintln!();
    eprintln!("Compiles the file at `path`, or starts a prompt when none is given.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --tokens    Print the scanned tokens instead of the instruction listing");
}

/// Installs a stderr subscriber, but only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(path: &str, tokens: bool) -> Result<bool, Box<dyn Error>> {
    let src = std::fs::read_to_string(path)?;
    Ok(run(&src, tokens))
}

fn repl(tokens: bool) -> Result<(), Box<dyn Error>> {
    let mut input = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        input.clear();
        let n = io::stdin().read_line(&mut input)?;

        if n == 0 {
            println!("^D");
            return Ok(());
        }

        run(&input, tokens);
    }
}

/// Compiles `src`, printing either its tokens or its listing, followed by any
/// diagnostics. Returns whether the source compiled cleanly.
fn run(src: &str, tokens: bool) -> bool {
    if tokens {
        for token in Scanner::new(src).until_eof() {
            println!("{:>4}:{:<3} {}", token.line, token.col, token.kind);
        }
        return true;
    }

    let (output, errors) = match parser::compile(src) {
        Ok(output) => (output, Vec::new()),
        Err((output, errors)) => (output, errors),
    };
    print!(
        "{}",
        listing::print_program_string(&output.pool, &output.program)
    );
    for error in &errors {
        eprintln!("{error}");
    }
    errors.is_empty()
}
