use std::env;
use std::fs;
use std::io::IsTerminal;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use edmacro::{
    ensure_terminated, host, repl, DocumentId, MacroError, MacroRuntime, MenuConfig, ScratchHost,
};

const MAIN_DOC: DocumentId = DocumentId(1);

fn usage(program: &str) {
    eprintln!(
        "Usage: {} [-do command] [--macros file] [--repl] [macro-file]",
        program
    );
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut do_command: Option<String> = None;
    let mut macros_path: Option<String> = None;
    let mut repl_flag = false;
    let mut script_path: Option<String> = None;

    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        if arg == "-do" {
            match iter.next() {
                Some(cmd) => do_command = Some(cmd.clone()),
                None => {
                    usage(&args[0]);
                    return ExitCode::from(2);
                }
            }
        } else if arg == "--macros" {
            match iter.next() {
                Some(path) => macros_path = Some(path.clone()),
                None => {
                    usage(&args[0]);
                    return ExitCode::from(2);
                }
            }
        } else if arg == "--repl" {
            repl_flag = true;
        } else if arg.starts_with('-') {
            usage(&args[0]);
            return ExitCode::from(2);
        } else if script_path.is_none() {
            script_path = Some(arg.clone());
        } else {
            usage(&args[0]);
            return ExitCode::from(2);
        }
    }

    // Nothing else to do and a terminal attached: drop into the shell.
    let enter_repl =
        repl_flag || (do_command.is_none() && script_path.is_none() && std::io::stdin().is_terminal());

    let mut runtime = MacroRuntime::new();
    let mut scratch = ScratchHost::new();

    // A -do command must compile before anything starts; a bad one stops
    // the process with the offset-bearing message.
    let do_program = match do_command {
        Some(cmd) => {
            let source = ensure_terminated(&cmd);
            match runtime.compile_source("-do macro", &source) {
                Ok(program) => Some(program),
                Err(e) => {
                    eprintln!("edmacro: -do argument: {}", e);
                    return ExitCode::from(2);
                }
            }
        }
        None => None,
    };

    if let Some(path) = macros_path {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("edmacro: cannot read {}: {}", path, e);
                return ExitCode::from(1);
            }
        };
        let config = match MenuConfig::from_toml(&text) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("edmacro: {}", e);
                return ExitCode::from(1);
            }
        };
        if let Err(e) = runtime.load_menu_config(&config) {
            eprintln!("edmacro: {}", e);
            return ExitCode::from(1);
        }
    }

    if let Some(path) = script_path {
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("edmacro: cannot read {}: {}", path, e);
                return ExitCode::from(1);
            }
        };
        let outcome = runtime.run_source(MAIN_DOC, &path, &source, &mut scratch);
        if let Err(code) = report(&mut runtime, &mut scratch, outcome) {
            return code;
        }
    }

    if let Some(program) = do_program {
        let outcome = runtime.run_macro(MAIN_DOC, program, &mut scratch);
        if let Err(code) = report(&mut runtime, &mut scratch, outcome) {
            return code;
        }
    }

    if enter_repl {
        repl::run_repl(&mut runtime, &mut scratch);
    }
    ExitCode::SUCCESS
}

/// Drive an invocation to its value and print what it produced.
fn report(
    runtime: &mut MacroRuntime,
    scratch: &mut ScratchHost,
    outcome: Result<edmacro::RunOutcome, MacroError>,
) -> Result<(), ExitCode> {
    match host::run_to_completion(runtime, MAIN_DOC, scratch, outcome) {
        Ok(value) => {
            print!("{}", scratch.take_output());
            let rendered = value.to_string_value();
            if !rendered.is_empty() {
                println!("{}", rendered);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("edmacro: {}", e);
            Err(ExitCode::from(1))
        }
    }
}
