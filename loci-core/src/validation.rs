//! Load-time validation: mechanical handles and narrative tells.
//!
//! Affordances may only touch handles from the closed allowlist below, and
//! at most two of them. Tells must read as narrative: no numbers, no meter
//! language, no entity speech. Violations are fatal at startup.

use crate::error::{AffinityError, Result};

/// The only mechanical handles affordances may modulate. Each corresponds
/// to an existing game variable; the core never invents stats.
pub const HANDLE_ALLOWLIST: &[&str] = &[
    "room.travel_time_modifier",
    "room.redirect_target",
    "room.encounter_rate_modifier",
    "npc.aggro_radius_modifier",
    "harvest.yield_modifier",
    "spell.power_modifier",
    "spell.backfire_chance",
    "rest.healing_modifier",
    "loot.quality_modifier",
    "actor.stamina_modifier",
    "actor.luck_modifier",
    "action.skill_modifier",
];

/// Verbs that would put words in an entity's mouth. Entities never speak.
const SPEECH_VERBS: &[&str] = &["says", "whispers", "urges", "speaks"];

/// Meter-style prefixes that would expose numeric state.
const METER_PREFIXES: &[&str] = &["affinity:", "reputation:", "score:", "meter:"];

/// Check a single handle name against the allowlist.
///
/// # Errors
/// Returns [`AffinityError::Validation`] for unknown handles.
pub fn validate_handle(handle: &str, affordance: &str) -> Result<()> {
    if HANDLE_ALLOWLIST.contains(&handle) {
        Ok(())
    } else {
        Err(AffinityError::Validation(format!(
            "affordance '{affordance}' references handle '{handle}' which is not in the allowlist"
        )))
    }
}

/// Check that an affordance touches at most two handles, all allowlisted.
///
/// # Errors
/// Returns [`AffinityError::Validation`] on unknown handles or more than
/// two of them.
pub fn validate_handles(handles: &[&str], affordance: &str) -> Result<()> {
    if handles.len() > 2 {
        return Err(AffinityError::Validation(format!(
            "affordance '{affordance}' touches {} handles; the maximum is 2",
            handles.len()
        )));
    }
    for handle in handles {
        validate_handle(handle, affordance)?;
    }
    Ok(())
}

/// Whether a tell string violates the narrative rules. Exposed so hosts can
/// vet world content; the shipped tables are validated at registry build.
#[must_use]
pub fn tell_is_forbidden(tell: &str) -> bool {
    let lower = tell.to_lowercase();

    for prefix in METER_PREFIXES {
        if lower.contains(prefix) {
            return true;
        }
    }
    for verb in SPEECH_VERBS {
        // Word-ish match: "says" should trip, "essays" should not.
        for (index, _) in lower.match_indices(verb) {
            let boundary_before = index == 0
                || !lower[..index]
                    .chars()
                    .next_back()
                    .is_some_and(char::is_alphanumeric);
            let after = index + verb.len();
            let boundary_after = after >= lower.len()
                || !lower[after..].chars().next().is_some_and(char::is_alphanumeric);
            if boundary_before && boundary_after {
                return true;
            }
        }
    }

    // Numeric patterns: any digit at all smells like a meter ("+5", "20%",
    // "takes 3 damage"). Tells describe, they never quantify.
    if tell.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    if lower.contains("percent") {
        return true;
    }
    false
}

/// Validate one tell.
///
/// # Errors
/// Returns [`AffinityError::Validation`] naming the offending tell.
pub fn validate_tell(tell: &str, affordance: &str) -> Result<()> {
    if tell_is_forbidden(tell) {
        return Err(AffinityError::Validation(format!(
            "tell for '{affordance}' exposes meter or speech language: '{tell}'"
        )));
    }
    Ok(())
}

/// Validate a whole tell table.
///
/// # Errors
/// Returns the first offending tell's error.
pub fn validate_tells<'a>(
    tells: impl IntoIterator<Item = &'a str>,
    affordance: &str,
) -> Result<()> {
    for tell in tells {
        validate_tell(tell, affordance)?;
    }
    Ok(())
}
