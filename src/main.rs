use clap::Parser;
use dataloom::{cli::Cli, main as lib_main};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lib_main(Cli::parse()).await
}
