use std::io;

use clap::Parser;

use retro_desk::cli::PlaygroundCli;
use retro_desk::runner;

fn main() -> io::Result<()> {
    let cli = PlaygroundCli::parse();
    runner::run(&cli)
}
