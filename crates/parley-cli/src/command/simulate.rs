//! Round-based negotiation between our negotiator and scripted counterparts.
//!
//! Every round has an offer phase, in which each party makes one offer, and a voting
//! phase, in which each party votes on all offers of the round. A bid is agreed when
//! the total power of its voters reaches the scenario minimum and lies within every
//! voter's declared power range. Scripted counterparts concede on the same schedule
//! as our negotiator, offer random bids above their threshold and vote for every
//! offer above their vote threshold.

use std::{collections::BTreeMap, path::PathBuf};

use chrono::{DateTime, Utc};
use parley_agent::{ConcessionSchedule, Negotiator};
use parley_bidding::{coalition::distance, generator::BidGenerator};
use parley_domain::{
    Action, Bid, LinearAdditiveSpace, PartyId, Progress, UtilitySpace as _, Vote,
};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    schema::scenario::Scenario,
    util::{Output, read_scenario_file, seeded_rng},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Scenario JSON file
    #[arg(long)]
    scenario: PathBuf,
    /// Number of rounds, overriding the scenario
    #[arg(long)]
    rounds: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct SimulationReport {
    simulated_at: DateTime<Utc>,
    seed: u64,
    agent: PartyId,
    rounds: u32,
    rounds_played: u32,
    agreement: Option<Agreement>,
    opponent_models: Vec<ModelSummary>,
}

#[derive(Debug, Clone, Serialize)]
struct Agreement {
    round: u32,
    bid: Bid,
    parties: Vec<PartyId>,
    power: u64,
    utilities: BTreeMap<PartyId, f64>,
}

/// What our negotiator learned about one counterpart.
#[derive(Debug, Clone, Serialize)]
struct ModelSummary {
    party: PartyId,
    examples: usize,
    mean_loss: Option<f64>,
    /// Preference distance between the learned model and the true profile
    distance_to_profile: f64,
    learned_weights: BTreeMap<String, f64>,
    true_weights: BTreeMap<String, f64>,
}

struct ScriptedParty {
    id: PartyId,
    profile: LinearAdditiveSpace,
    schedule: ConcessionSchedule,
    min_power: u32,
    max_power: u32,
}

impl ScriptedParty {
    fn offer<R>(&self, progress: &Progress, rng: &mut R) -> anyhow::Result<Action>
    where
        R: Rng + ?Sized,
    {
        let nobody = BTreeMap::new();
        let generator = BidGenerator::new(&self.profile, &nobody, 0);
        let bid = generator.generate_bid(
            &BTreeMap::<PartyId, LinearAdditiveSpace>::new(),
            self.schedule.threshold(progress),
            rng,
        )?;
        Ok(Action::Offer {
            actor: self.id.clone(),
            bid,
        })
    }

    fn vote(&self, offers: &[Bid], progress: &Progress) -> Action {
        let threshold = self.schedule.vote_threshold(progress);
        let mut votes: Vec<Vote> = vec![];
        for bid in offers {
            if votes.iter().all(|v| v.bid != *bid) && self.profile.utility(bid) >= threshold {
                votes.push(Vote {
                    actor: self.id.clone(),
                    bid: bid.clone(),
                    min_power: self.min_power,
                    max_power: self.max_power,
                });
            }
        }
        Action::Votes {
            actor: self.id.clone(),
            votes,
        }
    }
}

/// Finds the agreement with the largest voting power among `votes`.
fn find_agreement(
    votes: &[Vote],
    powers: &BTreeMap<PartyId, u32>,
    min_power: u32,
) -> Option<(Bid, Vec<PartyId>, u64)> {
    let mut by_bid: BTreeMap<&Bid, Vec<&Vote>> = BTreeMap::new();
    for vote in votes {
        by_bid.entry(&vote.bid).or_default().push(vote);
    }

    let mut best: Option<(Bid, Vec<PartyId>, u64)> = None;
    for (bid, voters) in by_bid {
        let power: u64 = voters
            .iter()
            .map(|v| u64::from(powers.get(&v.actor).copied().unwrap_or_default()))
            .sum();
        let acceptable = power >= u64::from(min_power)
            && voters
                .iter()
                .all(|v| u64::from(v.min_power) <= power && power <= u64::from(v.max_power));
        if acceptable && best.as_ref().is_none_or(|(_, _, p)| power > *p) {
            let parties = voters.iter().map(|v| v.actor.clone()).collect();
            best = Some((bid.clone(), parties, power));
        }
    }
    best
}

fn summarize_models(
    negotiator: &Negotiator<LinearAdditiveSpace>,
    scenario: &Scenario,
) -> Vec<ModelSummary> {
    scenario
        .counterparts()
        .filter_map(|party| {
            let model = negotiator.opponent(&party.id)?;
            Some(ModelSummary {
                party: party.id.clone(),
                examples: model.example_count(),
                mean_loss: model.mean_loss(),
                distance_to_profile: distance(model, &party.profile),
                learned_weights: scenario
                    .domain
                    .issue_names()
                    .map(|issue| (issue.to_owned(), model.weight(issue)))
                    .collect(),
                true_weights: party.profile.weights().clone(),
            })
        })
        .collect()
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let SimulateArg {
        scenario,
        rounds,
        seed,
        output,
    } = arg;
    let scenario = read_scenario_file(scenario)?;
    let rounds = rounds.unwrap_or(scenario.rounds);
    let agent = scenario.agent_party()?;
    let settings = scenario.settings()?;
    let powers = scenario.powers();
    let all_powers: BTreeMap<PartyId, u32> = scenario
        .parties
        .iter()
        .map(|p| (p.id.clone(), p.power))
        .collect();

    let (seed, mut rng) = seeded_rng(*seed);
    let mut negotiator = Negotiator::new(agent.id.clone(), agent.profile.clone(), settings);
    let scripted: Vec<ScriptedParty> = scenario
        .counterparts()
        .map(|p| ScriptedParty {
            id: p.id.clone(),
            profile: p.profile.clone(),
            schedule: ConcessionSchedule::default(),
            min_power: scenario.min_power,
            max_power: scenario.max_power,
        })
        .collect();

    let mut agreement = None;
    let mut progress = Progress::new(rounds);
    while !progress.is_finished() {
        let round = progress.round();

        let mut offers = vec![negotiator.propose(&progress, &powers, &mut rng)?];
        for party in &scripted {
            offers.push(party.offer(&progress, &mut rng)?);
        }
        for action in &offers {
            negotiator.observe(action, &progress)?;
        }
        let bids: Vec<Bid> = offers
            .into_iter()
            .filter_map(|action| match action {
                Action::Offer { bid, .. } => Some(bid),
                _ => None,
            })
            .collect();

        let mut ballots = vec![negotiator.vote(&bids, &progress)];
        ballots.extend(scripted.iter().map(|party| party.vote(&bids, &progress)));
        for action in &ballots {
            negotiator.observe(action, &progress)?;
        }
        let confirmed = negotiator.opt_in();
        debug!(round, ballots = ballots.len(), "voting phase finished");

        let votes: Vec<Vote> = ballots
            .into_iter()
            .filter(|action| action.actor() != negotiator.me())
            .chain([confirmed])
            .filter_map(|action| match action {
                Action::Votes { votes, .. } => Some(votes),
                _ => None,
            })
            .flatten()
            .collect();

        let found = find_agreement(&votes, &all_powers, scenario.min_power);
        if let Some((bid, parties, power)) = found {
            info!(round, power, parties = ?parties, "agreement reached");
            let utilities = scenario
                .parties
                .iter()
                .map(|p| (p.id.clone(), p.profile.utility(&bid)))
                .collect();
            agreement = Some(Agreement {
                round,
                bid,
                parties,
                power,
                utilities,
            });
            progress = progress.advance();
            break;
        }
        info!(round, offers = bids.len(), "no agreement");
        progress = progress.advance();
    }

    let report = SimulationReport {
        simulated_at: Utc::now(),
        seed,
        agent: agent.id.clone(),
        rounds,
        rounds_played: progress.round(),
        agreement,
        opponent_models: summarize_models(&negotiator, &scenario),
    };
    Output::save_json(&report, output.clone())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(actor: &str, bid: &Bid, min_power: u32, max_power: u32) -> Vote {
        Vote {
            actor: actor.into(),
            bid: bid.clone(),
            min_power,
            max_power,
        }
    }

    #[test]
    fn test_agreement_needs_power_within_every_range() {
        let a = Bid::single("issue", "a");
        let b = Bid::single("issue", "b");
        let powers = BTreeMap::from([("p".into(), 1), ("q".into(), 2), ("r".into(), 3)]);

        // b has more power but exceeds the range of q
        let votes = vec![
            vote("p", &a, 2, 10),
            vote("q", &a, 2, 10),
            vote("p", &b, 2, 10),
            vote("q", &b, 2, 5),
            vote("r", &b, 2, 10),
        ];
        let (bid, parties, power) = find_agreement(&votes, &powers, 2).unwrap();
        assert_eq!(bid, a);
        assert_eq!(parties, vec![PartyId::from("p"), PartyId::from("q")]);
        assert_eq!(power, 3);

        assert!(find_agreement(&votes[..1], &powers, 2).is_none());
    }
}
