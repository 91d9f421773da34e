use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use tourguide_policy_center::PolicySource;

use super::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PolicyCommand {
    Show(PolicyShowArgs),
}

#[derive(Args, Clone, Debug)]
pub struct PolicyShowArgs {
    /// Output JSON instead of human summary
    #[arg(long)]
    pub json: bool,
    /// Also list where each value came from
    #[arg(long)]
    pub provenance: bool,
}

pub fn cmd_policy(args: PolicyArgs, ctx: &CliContext) -> Result<()> {
    match args.command {
        PolicyCommand::Show(show_args) => show(show_args, ctx),
    }
}

fn show(args: PolicyShowArgs, ctx: &CliContext) -> Result<()> {
    let loaded = ctx.loaded_policy();
    if args.json {
        let payload = json!({
            "source": ctx.policy_path().map(|path| path.display().to_string()),
            "policy": &loaded.policy,
            "provenance": &loaded.provenance,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let policy = &loaded.policy;
    match ctx.policy_path() {
        Some(path) => println!("Policy file: {}", path.display()),
        None => println!("Policy file: (defaults)"),
    }
    println!();
    println!(
        "Placement → width={}, height={}, max_width_ratio={}, gap={}, margin={}, padding={}, nav_rail={}",
        policy.placement.tooltip_width,
        policy.placement.tooltip_height,
        policy.placement.max_width_ratio,
        policy.placement.gap,
        policy.placement.viewport_margin,
        policy.placement.highlight_padding,
        policy.placement.nav_rail_width
    );
    println!(
        "Tab sync → max_attempts={}, verify_delay_ms={}, retry_delay_ms={}, settle_ms={}",
        policy.sync.max_attempts,
        policy.sync.verify_delay_ms,
        policy.sync.retry_delay_ms,
        policy.sync.settle_ms
    );
    println!("Tab selector → {}", policy.sync.tab_selector_template);
    println!(
        "Timing → completion_ms={}, frame_interval_ms={}, event_capacity={}",
        policy.timing.completion_ms, policy.timing.frame_interval_ms, policy.timing.event_capacity
    );

    if args.provenance {
        println!();
        for (key, source) in &loaded.provenance {
            let label = match source {
                PolicySource::Builtin => "builtin",
                PolicySource::File => "file",
                PolicySource::Env => "env",
            };
            println!("  {key:<40} {label}");
        }
    }
    Ok(())
}
