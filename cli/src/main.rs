use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use viper_lang::ir::write_object;
use viper_lang::Compiler;

#[derive(Parser)]
#[command(name = "viper")]
#[command(about = "Compiler for the Viper language")]
struct Cli {
    /// The root compilation unit.
    input: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(input) = cli.input else {
        eprint!("viper: no input files");
        return ExitCode::FAILURE;
    };

    let compiler = Compiler::new();
    match compiler.compile_file(&input) {
        Ok(result) => {
            for warning in &result.warnings {
                eprintln!("warning: [{}] {}", warning.category, warning.message);
            }
            print!("{}", result.module);

            let mut object_path = input.into_os_string();
            object_path.push(".o");
            if let Err(err) = write_object(&result.module, PathBuf::from(object_path).as_path()) {
                eprintln!("viper: failed to write object file: {err}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            failure.errors.eprint(&failure.sources);
            ExitCode::FAILURE
        }
    }
}
