use std::io;
use std::process::ExitCode;

use clap::Parser;

use vault_cli::cli::{run, Cli};
use vault_cli::config::CONSUL_TOKEN_ENV;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let token = std::env::var(CONSUL_TOKEN_ENV).ok();

    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();
    match run(&cli, token, &mut input, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:?}", e);
            println!("* {}", e);
            ExitCode::FAILURE
        }
    }
}
