mod bootstrap;
mod cli;
mod headless;
mod reader;
mod run;
mod simulate;
mod window;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::run(args)
}
