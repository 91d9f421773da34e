use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tour_engine::{CatalogProvider, StaticCatalogProvider};
use tourguide_core_types::{PageId, StepDescriptor, BODY_SELECTOR};

use super::context::CliContext;
use super::output::print_structured;

#[derive(Args, Clone, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CatalogCommand {
    /// Parse a catalog file and report its pages
    Validate {
        /// Catalog file (YAML or JSON)
        file: PathBuf,
    },
    /// Print the steps registered for one page
    Show {
        /// Catalog file (YAML or JSON)
        file: PathBuf,
        /// Page route, e.g. /dashboard
        #[arg(long)]
        page: String,
    },
}

#[derive(Serialize)]
struct PageSummary {
    page: PageId,
    steps: usize,
    tab_gated: usize,
}

pub fn cmd_catalog(args: CatalogArgs, ctx: &CliContext) -> Result<()> {
    match args.command {
        CatalogCommand::Validate { file } => {
            let provider = StaticCatalogProvider::load(&file)
                .with_context(|| format!("Invalid catalog {}", file.display()))?;
            let summary: Vec<PageSummary> = provider
                .pages()
                .into_iter()
                .map(|page| {
                    let catalog = provider.catalog(&page);
                    PageSummary {
                        steps: catalog.len(),
                        tab_gated: catalog
                            .iter()
                            .filter(|step| step.requires_tab.is_some())
                            .count(),
                        page,
                    }
                })
                .collect();
            if print_structured(ctx.output(), &summary)? {
                return Ok(());
            }
            println!("✅ {} is valid ({} pages)", file.display(), summary.len());
            for entry in &summary {
                println!(
                    "  {:<32} {} steps, {} behind tabs",
                    entry.page.as_str(),
                    entry.steps,
                    entry.tab_gated
                );
            }
            Ok(())
        }
        CatalogCommand::Show { file, page } => {
            let provider = StaticCatalogProvider::load(&file)
                .with_context(|| format!("Invalid catalog {}", file.display()))?;
            let page = PageId::from(page).normalized();
            let catalog = provider.catalog(&page);
            if catalog.is_empty() {
                bail!("No tour steps for page {}", page);
            }
            if print_structured(ctx.output(), catalog.steps())? {
                return Ok(());
            }
            println!("{} ({} steps)", page, catalog.len());
            for (index, step) in catalog.iter().enumerate() {
                println!("  {}", describe(index, step));
            }
            Ok(())
        }
    }
}

fn describe(index: usize, step: &StepDescriptor) -> String {
    let target = step.target.as_query().unwrap_or(BODY_SELECTOR);
    let mut line = format!(
        "{}. {} [{}] → {} ({})",
        index + 1,
        step.title,
        step.id,
        target,
        step.preferred_side
    );
    if let Some(tab) = &step.requires_tab {
        line.push_str(&format!(" after tab '{}'", tab.label));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourguide_core_types::{Side, TargetSelector};

    #[test]
    fn describes_body_and_tab_gated_steps() {
        let body = StepDescriptor::new("welcome", TargetSelector::Body, "Welcome")
            .with_side(Side::Center);
        assert_eq!(describe(0, &body), "1. Welcome [welcome] → body (center)");

        let gated = StepDescriptor::new("lal", TargetSelector::query("#lal"), "Lookalike")
            .requiring_tab("Lookalike");
        assert_eq!(
            describe(2, &gated),
            "3. Lookalike [lal] → #lal (bottom) after tab 'Lookalike'"
        );
    }
}
