use clap::Parser;
use taint_cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let code = taint_cli::run(cli)?;
    std::process::exit(code);
}
