use clap::Subcommand;

use super::catalog::CatalogArgs;
use super::place::PlaceArgs;
use super::policy::PolicyArgs;
use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run a tour against a fixture document and print every render state
    Simulate(SimulateArgs),

    /// Compute one tooltip placement
    Place(PlaceArgs),

    /// Validate or inspect a step catalog file
    Catalog(CatalogArgs),

    /// Show the effective tour policy
    Policy(PolicyArgs),
}
