use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, bail, ensure};
use parley_agent::{ConcessionSchedule, NegotiatorSettings};
use parley_domain::{Domain, LinearAdditiveSpace, PartyId, UtilitySpace as _};
use serde::{Deserialize, Serialize};

/// A negotiation setup: the domain, every party's profile and the voting rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    pub domain: Domain,
    /// The party played by our negotiator
    pub agent: PartyId,
    pub parties: Vec<PartyConfig>,
    /// Smallest total power of an agreement
    #[serde(default = "default_min_power")]
    pub min_power: u32,
    /// Largest total power of an agreement
    #[serde(default = "default_max_power")]
    pub max_power: u32,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Concession schedule of our negotiator
    #[serde(default)]
    pub schedule: ConcessionSchedule,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartyConfig {
    pub id: PartyId,
    pub power: u32,
    pub profile: LinearAdditiveSpace,
}

fn default_min_power() -> u32 {
    NegotiatorSettings::default().min_power
}

fn default_max_power() -> u32 {
    NegotiatorSettings::default().max_power
}

fn default_rounds() -> u32 {
    20
}

impl Scenario {
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = BTreeSet::new();
        for party in &self.parties {
            ensure!(seen.insert(&party.id), "duplicate party '{}'", party.id);
            if party.profile.domain() != &self.domain {
                bail!(
                    "profile of party '{}' is over domain '{}', expected '{}'",
                    party.id,
                    party.profile.domain().name(),
                    self.domain.name()
                );
            }
        }
        ensure!(
            seen.contains(&self.agent),
            "agent '{}' is not one of the parties",
            self.agent
        );
        ensure!(
            self.min_power <= self.max_power,
            "min_power {} exceeds max_power {}",
            self.min_power,
            self.max_power
        );
        ensure!(self.rounds > 0, "a negotiation needs at least one round");
        Ok(())
    }

    pub fn agent_party(&self) -> anyhow::Result<&PartyConfig> {
        self.parties
            .iter()
            .find(|p| p.id == self.agent)
            .with_context(|| format!("agent '{}' is not one of the parties", self.agent))
    }

    pub fn counterparts(&self) -> impl Iterator<Item = &PartyConfig> + '_ {
        self.parties.iter().filter(|p| p.id != self.agent)
    }

    /// Declared power of every counterpart.
    pub fn powers(&self) -> BTreeMap<PartyId, u32> {
        self.counterparts()
            .map(|p| (p.id.clone(), p.power))
            .collect()
    }

    pub fn settings(&self) -> anyhow::Result<NegotiatorSettings> {
        Ok(NegotiatorSettings {
            min_power: self.min_power,
            max_power: self.max_power,
            power: self.agent_party()?.power,
            schedule: self.schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTY: &str = include_str!("../../../../scenarios/party.json");

    #[test]
    fn test_bundled_scenario_is_valid() {
        let scenario: Scenario = serde_json::from_str(PARTY).unwrap();
        scenario.validate().unwrap();
        assert_eq!(scenario.agent_party().unwrap().power, 1);
        assert_eq!(scenario.counterparts().count(), 3);
        assert!(!scenario.powers().contains_key(&scenario.agent));

        let settings = scenario.settings().unwrap();
        assert_eq!(settings.coalition_power(), 2);
        assert_eq!(settings.max_power, 7);
    }

    #[test]
    fn test_rejects_unknown_agent_and_duplicates() {
        let mut scenario: Scenario = serde_json::from_str(PARTY).unwrap();
        scenario.agent = "nobody".into();
        assert!(scenario.validate().is_err());

        let mut scenario: Scenario = serde_json::from_str(PARTY).unwrap();
        let duplicate = scenario.parties[1].clone();
        scenario.parties.push(duplicate);
        assert!(scenario.validate().is_err());
    }
}
