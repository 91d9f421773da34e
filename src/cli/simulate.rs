use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use target_locator::{DomPort, FixtureDom};
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep, timeout};
use tour_engine::{
    RenderState, StaticCatalogProvider, TourController, TourEvent, TourHost, TourPhase,
};
use tourguide_core_types::{PageId, Viewport};
use tourguide_policy_center::TourPolicy;
use tracing::{debug, info, warn};

use super::context::CliContext;
use super::output::OutputFormat;
use crate::script::{parse_script, ScriptCommand};

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Step catalog file (YAML or JSON)
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// Fixture document describing the page layout
    #[arg(long)]
    pub dom: PathBuf,

    /// Page the tour is opened on
    #[arg(long)]
    pub page: String,

    /// Commands to run after opening, e.g. "next; next; wait:200"
    #[arg(short, long, default_value = "")]
    pub script: String,

    /// Read commands from a file instead of --script
    #[arg(long, conflicts_with = "script")]
    pub script_file: Option<PathBuf>,

    /// Also print engine events
    #[arg(long)]
    pub events: bool,
}

/// How the simulated session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Closed,
    /// Still running when the script ran out.
    Active,
    /// Ended without a host callback (page change to a page without steps).
    Dropped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Closed => "closed",
            Outcome::Active => "active",
            Outcome::Dropped => "dropped",
        }
    }
}

/// Publishes the host callback so the simulation can await it.
struct ReportingHost {
    ending: watch::Sender<Option<Outcome>>,
}

impl ReportingHost {
    fn new() -> Self {
        let (ending, _) = watch::channel(None);
        Self { ending }
    }

    fn ending(&self) -> Option<Outcome> {
        *self.ending.borrow()
    }
}

impl TourHost for ReportingHost {
    fn on_close(&self) {
        self.ending.send_replace(Some(Outcome::Closed));
    }

    fn on_complete(&self) {
        self.ending.send_replace(Some(Outcome::Completed));
    }
}

#[derive(Serialize)]
struct StepRecord<'a> {
    command: String,
    state: &'a RenderState,
}

#[derive(Serialize)]
struct OutcomeRecord {
    outcome: Outcome,
    revision: u64,
}

/// Time allowed for a step to reach its first render: every tab activation
/// attempt, the settle pause and some slack.
fn step_budget(policy: &TourPolicy) -> Duration {
    let attempt = policy.sync.verify_delay() + policy.sync.retry_delay();
    attempt * u32::from(policy.sync.max_attempts) + policy.sync.settle() + Duration::from_secs(1)
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext) -> Result<()> {
    let raw_script = match &args.script_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?,
        None => args.script.clone(),
    };
    let script = parse_script(&raw_script).context("Invalid script")?;

    let provider = StaticCatalogProvider::load(&args.catalog)
        .with_context(|| format!("Invalid catalog {}", args.catalog.display()))?;
    let dom = Arc::new(
        FixtureDom::load(&args.dom)
            .with_context(|| format!("Invalid fixture {}", args.dom.display()))?,
    );
    let host = Arc::new(ReportingHost::new());
    let policy = ctx.policy().clone();
    let controller = TourController::new(Arc::new(provider), dom.clone(), host.clone(), &policy);

    let mut sim = Simulation {
        render: controller.subscribe(),
        events: args.events.then(|| controller.events()),
        controller,
        dom,
        output: ctx.output(),
        budget: step_budget(&policy),
        idle: policy.timing.frame_interval() * 8 + policy.sync.settle(),
    };

    let page = PageId::from(args.page.as_str());
    info!(page = %page, commands = script.len(), "starting simulation");
    if !sim.controller.open(page.clone()) {
        bail!("No tour steps for page {}", page.normalized());
    }
    sim.settle(&format!("open:{page}"), None).await?;

    for command in &script {
        sim.apply(command).await?;
    }

    if sim.controller.phase() == TourPhase::Completing {
        let wait = policy.timing.completion() + Duration::from_secs(1);
        let mut ending = host.ending.subscribe();
        if timeout(wait, ending.wait_for(Option::is_some)).await.is_err() {
            warn!("completion did not finish in {:?}", wait);
        }
    }
    sim.flush_events()?;

    let outcome = match host.ending() {
        Some(ending) => ending,
        None if sim.controller.phase().is_closed() => Outcome::Dropped,
        None => Outcome::Active,
    };
    let record = OutcomeRecord {
        outcome,
        revision: sim.controller.render_state().revision,
    };
    match sim.output {
        OutputFormat::Human => println!("outcome: {}", outcome.as_str()),
        _ => sim.emit(&record)?,
    }
    Ok(())
}

struct Simulation {
    controller: TourController,
    dom: Arc<FixtureDom>,
    render: watch::Receiver<RenderState>,
    events: Option<broadcast::Receiver<TourEvent>>,
    output: OutputFormat,
    budget: Duration,
    idle: Duration,
}

impl Simulation {
    async fn apply(&mut self, command: &ScriptCommand) -> Result<()> {
        debug!(%command, "applying");
        let before = self.controller.render_state().revision;
        let mut changed_after = None;
        match command {
            ScriptCommand::Next => self.controller.next(),
            ScriptCommand::Previous => self.controller.previous(),
            ScriptCommand::GoTo(index) => {
                if !self.controller.go_to(*index) {
                    warn!(index, "goto ignored");
                }
            }
            ScriptCommand::Skip => {
                self.controller.skip();
            }
            ScriptCommand::Close => {
                self.controller.close();
            }
            ScriptCommand::Open(page) => {
                if !self.controller.open(page.clone()) {
                    warn!(page = %page, "no tour steps, tour closed");
                }
            }
            ScriptCommand::Page(page) => self.controller.page_changed(page.clone()),
            ScriptCommand::Resize { width, height } => {
                let current = self.dom.viewport().await?;
                self.dom.set_viewport(
                    Viewport::new(*width, *height).with_scroll(current.scroll_x, current.scroll_y),
                );
                self.controller.viewport_changed();
                changed_after = Some(before);
            }
            ScriptCommand::Scroll { x, y } => {
                let current = self.dom.viewport().await?;
                self.dom
                    .set_viewport(Viewport::new(current.width, current.height).with_scroll(*x, *y));
                self.controller.viewport_changed();
                changed_after = Some(before);
            }
            ScriptCommand::Wait(duration) => sleep(*duration).await,
        }
        self.settle(&command.to_string(), changed_after).await
    }

    /// Waits until the published state matches the controller's position,
    /// then prints it. Viewport commands wait for any newer revision instead
    /// and accept the current state when nothing moved.
    async fn settle(&mut self, command: &str, changed_after: Option<u64>) -> Result<()> {
        let state = match changed_after {
            Some(revision) => {
                let wait = self.render.wait_for(|state| state.revision > revision);
                match timeout(self.idle, wait).await {
                    Ok(Ok(state)) => state.clone(),
                    _ => self.controller.render_state(),
                }
            }
            None => {
                let phase = self.controller.phase();
                let session = self.controller.session_id();
                let page = self.controller.page();
                let wait = self.render.wait_for(|state| match phase {
                    TourPhase::Active { index } => {
                        state.index() == Some(index)
                            && state.session == session
                            && state.page == page
                            && state.tooltip.is_some()
                    }
                    other => state.phase == other,
                });
                match timeout(self.budget, wait).await {
                    Ok(Ok(state)) => state.clone(),
                    Ok(Err(_)) => bail!("render channel closed"),
                    Err(_) => {
                        warn!(command, "state did not settle in {:?}", self.budget);
                        self.controller.render_state()
                    }
                }
            }
        };

        self.flush_events()?;
        self.emit_state(command, &state)
    }

    fn flush_events(&mut self) -> Result<()> {
        let Some(rx) = self.events.as_mut() else {
            return Ok(());
        };
        let mut pending = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => pending.push(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged");
                }
                Err(_) => break,
            }
        }
        for event in &pending {
            match self.output {
                OutputFormat::Human => println!("  · {} ({})", event.name(), event.session()),
                _ => self.emit(event)?,
            }
        }
        Ok(())
    }

    fn emit_state(&self, command: &str, state: &RenderState) -> Result<()> {
        if self.output != OutputFormat::Human {
            return self.emit(&StepRecord {
                command: command.to_string(),
                state,
            });
        }
        let summary = match (&state.phase, &state.step) {
            (TourPhase::Active { index }, Some(step)) => {
                let mut line = format!(
                    "step {}/{} {} side={}",
                    index + 1,
                    state.step_count,
                    step.id,
                    state.side.map(|side| side.as_str()).unwrap_or("-")
                );
                if let Some(tooltip) = state.tooltip {
                    line.push_str(&format!(" tooltip=({}, {})", tooltip.left, tooltip.top));
                }
                if state.highlight.is_none() {
                    line.push_str(" no-highlight");
                }
                line
            }
            (TourPhase::Active { index }, None) => format!("step {}", index + 1),
            (TourPhase::Completing, _) => "completing".to_string(),
            (TourPhase::Closed, _) => "closed".to_string(),
        };
        println!("{command:<20} {summary}");
        Ok(())
    }

    /// One compact JSON line per record, or one YAML document.
    fn emit<T: Serialize>(&self, record: &T) -> Result<()> {
        match self.output {
            OutputFormat::Yaml => print!("---\n{}", serde_yaml::to_string(record)?),
            _ => println!("{}", serde_json::to_string(record)?),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_covers_every_activation_attempt() {
        let policy = TourPolicy::default();
        assert_eq!(step_budget(&policy), Duration::from_millis(3 * 250 + 50 + 1000));
    }

    #[test]
    fn host_remembers_the_last_callback() {
        let host = ReportingHost::new();
        assert_eq!(host.ending(), None);
        host.on_close();
        assert_eq!(host.ending(), Some(Outcome::Closed));
    }
}
