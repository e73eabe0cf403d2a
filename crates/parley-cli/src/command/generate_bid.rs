use std::{collections::BTreeMap, path::PathBuf};

use anyhow::ensure;
use chrono::{DateTime, Utc};
use parley_bidding::generator::BidGenerator;
use parley_domain::{Bid, LinearAdditiveSpace, PartyId, UtilitySpace as _};
use serde::Serialize;
use tracing::info;

use crate::util::{Output, read_scenario_file, seeded_rng};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateBidArg {
    /// Scenario JSON file
    #[arg(long)]
    scenario: PathBuf,
    /// Smallest own utility a generated bid should reach
    #[arg(long)]
    min_utility: f64,
    /// Number of bids to generate
    #[arg(long, default_value_t = 1)]
    count: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct GeneratedBids {
    generated_at: DateTime<Utc>,
    seed: u64,
    agent: PartyId,
    min_utility: f64,
    coalition: Vec<PartyId>,
    bids: Vec<GeneratedBid>,
}

#[derive(Debug, Clone, Serialize)]
struct GeneratedBid {
    bid: Bid,
    utility: f64,
    /// Utility of the bid for every counterpart, from their true profiles
    counterpart_utilities: BTreeMap<PartyId, f64>,
}

pub(crate) fn run(arg: &GenerateBidArg) -> anyhow::Result<()> {
    let GenerateBidArg {
        scenario,
        min_utility,
        count,
        seed,
        output,
    } = arg;
    ensure!(*count > 0, "at least one bid must be requested");

    let scenario = read_scenario_file(scenario)?;
    let agent = scenario.agent_party()?;
    let settings = scenario.settings()?;
    let powers = scenario.powers();
    let opponents: BTreeMap<PartyId, LinearAdditiveSpace> = scenario
        .counterparts()
        .map(|p| (p.id.clone(), p.profile.clone()))
        .collect();

    let (seed, mut rng) = seeded_rng(*seed);
    let generator = BidGenerator::new(&agent.profile, &powers, settings.coalition_power());
    let coalition = generator.coalition(&opponents)?;
    info!(coalition = ?coalition, "selected coalition");

    let mut bids = Vec::with_capacity(*count);
    for _ in 0..*count {
        let bid = generator.generate_bid(&opponents, *min_utility, &mut rng)?;
        let counterpart_utilities = opponents
            .iter()
            .map(|(party, profile)| (party.clone(), profile.utility(&bid)))
            .collect();
        bids.push(GeneratedBid {
            utility: agent.profile.utility(&bid),
            bid,
            counterpart_utilities,
        });
    }

    let report = GeneratedBids {
        generated_at: Utc::now(),
        seed,
        agent: agent.id.clone(),
        min_utility: *min_utility,
        coalition,
        bids,
    };
    Output::save_json(&report, output.clone())?;
    Ok(())
}
