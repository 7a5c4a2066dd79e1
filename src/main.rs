use anyhow::Result;
use sigguard::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
