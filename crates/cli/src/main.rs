//! earthly-secret-provider-vault
//!
//! Earthly runs this binary with a single lookup argument. The secret value is
//! written to stdout; exit code 2 tells Earthly the secret does not exist here.

// The secret and version info go to stdout; the panic hook writes to stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use earthly_secret_provider_vault::cli::{
    self, Cli, CliError, Commands, EXIT_OK, exit_code_for, render_error,
};
use earthly_secret_provider_vault::commands::{
    config::execute_config, get::execute_get, version::version_info,
};
use earthly_secret_provider_vault::shutdown::cancel_on_shutdown;
use earthly_secret_provider_vault::tracing::{TracingConfig, init_tracing};
use std::io;

fn main() {
    // Tracing may be unusable during a panic, so the hook writes directly.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with --level debug for more information.");
    }));

    let cli = cli::parse();

    if let Err(e) = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
    }) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let exit_code = match run(&cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Some(Commands::Version) => {
            println!("{}", version_info());
            Ok(())
        }
        Some(Commands::Config { key, value }) => execute_config(&cli.provider()?, key, value),
        None => {
            let Some(lookup) = cli.lookup.as_deref() else {
                return Err(CliError::config(
                    "a lookup of the form path/to/secret.field is required",
                ));
            };
            run_lookup(cli, lookup)
        }
    }
}

fn run_lookup(cli: &Cli, lookup: &str) -> Result<(), CliError> {
    let provider = cli.provider()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::other(format!("failed to create tokio runtime: {e}")))?;

    runtime.block_on(async {
        let cancel = cancel_on_shutdown(cli.deadline());
        let mut stdout = io::stdout().lock();
        let result = execute_get(&provider, &cancel, lookup, &mut stdout).await;
        cancel.cancel();
        result
    })
}
