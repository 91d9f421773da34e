use super::catalog::cmd_catalog;
use super::env::CliArgs;
use super::place::cmd_place;
use super::policy::cmd_policy;
use super::simulate::cmd_simulate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Simulate(args) => cmd_simulate(args, ctx).await,
        Commands::Place(args) => cmd_place(args, ctx),
        Commands::Catalog(args) => cmd_catalog(args, ctx),
        Commands::Policy(args) => cmd_policy(args, ctx),
    }
}
