use clap::Parser;
use h5lookup::cli::{Cli, execute, load_config};
use h5lookup::log::init_logging;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    // A second logger cannot be installed; keep the first
    let _ = init_logging(cli.verbose, cli.quiet, config.log_level.as_deref());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, config, &mut out)
}
