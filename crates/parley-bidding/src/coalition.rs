//! Choosing which counterparts an offer should appeal to.
//!
//! Counterparts whose preferences resemble ours are the cheapest allies: an offer
//! that is good for us is likely good for them too. [`select_coalition`] takes the
//! closest counterparts first until their declared power is enough.

use std::collections::BTreeMap;

use parley_domain::{PartyId, UtilitySpace};
use tracing::debug;

use crate::BidGenerationError;

/// Preference distance between two utility spaces over the same domain.
///
/// ```text
/// distance(a, b) = Σ_issue ½(w_a + w_b) · Σ_value (u_a(value) - u_b(value))²
/// ```
///
/// Issue weights are averaged over both spaces, which keeps the distance symmetric.
#[must_use]
pub fn distance<A, B>(a: &A, b: &B) -> f64
where
    A: UtilitySpace + ?Sized,
    B: UtilitySpace + ?Sized,
{
    a.domain()
        .issues()
        .iter()
        .map(|issue| {
            let name = issue.name();
            let weight = 0.5 * (a.weight(name) + b.weight(name));
            let squared: f64 = issue
                .values()
                .iter()
                .map(|value| {
                    let d = a.value_utility(name, value) - b.value_utility(name, value);
                    d * d
                })
                .sum();
            weight * squared
        })
        .sum()
}

/// Selects the shortest closest-first prefix of counterparts whose summed power
/// reaches `min_power`.
///
/// Ties in distance keep the order of `distances`. A `min_power` of zero selects
/// nobody.
pub fn select_coalition(
    distances: &[(PartyId, f64)],
    powers: &BTreeMap<PartyId, u32>,
    min_power: u32,
) -> Result<Vec<PartyId>, BidGenerationError> {
    let mut ranked: Vec<(&PartyId, f64, u32)> = distances
        .iter()
        .map(|(party, distance)| {
            let power = *powers
                .get(party)
                .ok_or_else(|| BidGenerationError::UnknownPower {
                    party: party.clone(),
                })?;
            Ok((party, *distance, power))
        })
        .collect::<Result<_, BidGenerationError>>()?;
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut coalition = vec![];
    let mut accumulated = 0_u64;
    for (party, distance, power) in &ranked {
        if accumulated >= u64::from(min_power) {
            break;
        }
        debug!(%party, distance, power, "adding party to coalition");
        coalition.push((*party).clone());
        accumulated += u64::from(*power);
    }

    if accumulated < u64::from(min_power) {
        return Err(BidGenerationError::InfeasibleCoalition {
            required: min_power,
            available: accumulated,
        });
    }
    Ok(coalition)
}
