use clap::Parser;
use php_taint::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let code = php_taint::cli::run(cli)?;
    std::process::exit(code);
}
