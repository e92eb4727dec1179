//! Tell tables: the narrative voice of triggered affordances.
//!
//! Tells never contain numbers, meter language, or entity speech; the
//! registry validates every table at build time. Selection is by
//! deterministic index derived from the evaluation seed, so replay picks
//! the same line.

use crate::affordance::registry::AffordanceKind;

/// Hostile tells for an affordance.
#[must_use]
pub fn hostile_tells(kind: AffordanceKind) -> &'static [&'static str] {
    match kind {
        AffordanceKind::Pathing => &[
            "The path seems longer than you remember.",
            "Brambles catch at your clothes.",
            "You keep losing your footing on loose stones.",
            "The trail doubles back unexpectedly.",
            "Roots seem to rise just where you step.",
        ],
        AffordanceKind::MisleadingNavigation => &[
            "Wait... this isn't where you meant to go.",
            "The familiar landmark was wrong.",
            "You emerge somewhere unexpected.",
            "The path led you astray.",
        ],
        AffordanceKind::EncounterBias => &[
            "Something watches from the shadows.",
            "Wolves circle at the edge of vision.",
            "The forest's creatures are restless.",
            "Eyes gleam in the underbrush.",
            "Predators seem drawn to this spot.",
        ],
        AffordanceKind::ResourceScarcity => &[
            "The herbs here are sparse and withered.",
            "This vein has gone barren.",
            "The fish aren't biting.",
            "What you seek remains hidden.",
            "Pickings are slim here.",
        ],
        AffordanceKind::SpellSideEffects => &[
            "Your magic feels sluggish here.",
            "The weave resists your touch.",
            "Something dampens your power.",
            "The spell sputters unexpectedly.",
            "Magic flows reluctantly.",
        ],
        AffordanceKind::RestQuality => &[
            "Sleep comes fitfully.",
            "You wake more tired than when you lay down.",
            "Uneasy dreams trouble your rest.",
            "The ground is cold and hard.",
            "You startle awake repeatedly.",
        ],
        AffordanceKind::AmbientMessaging => &[
            "Something feels off here.",
            "An uneasy stillness hangs in the air.",
        ],
        AffordanceKind::LootQuality => &[
            "Rust and decay everywhere.",
            "The chest's contents are disappointing.",
            "Moths have been at this.",
            "Whatever was here, time has claimed it.",
        ],
        AffordanceKind::WeatherMicroclimate => &[
            "A sudden chill wind picks up.",
            "Clouds gather overhead.",
            "Mist rolls in unexpectedly.",
            "The sun finds a cloud just as you arrive.",
        ],
        AffordanceKind::AnimalMessengers => &[
            "A crow follows overhead, watching.",
            "Rats scatter at your approach.",
            "A fox regards you with unusual intensity.",
            "Insects swarm thicker here.",
            "Something howls in the distance, and it sounds meant for you.",
        ],
    }
}

/// Favorable tells for an affordance.
#[must_use]
pub fn favorable_tells(kind: AffordanceKind) -> &'static [&'static str] {
    match kind {
        AffordanceKind::Pathing => &[
            "An easy path opens through the undergrowth.",
            "Your feet find sure footing on the trail.",
            "The journey passes quickly.",
            "A shortcut appears, as if made for you.",
            "The way forward is unusually clear.",
        ],
        AffordanceKind::MisleadingNavigation => &[
            "Your path curves, but you end up exactly where you needed to be.",
        ],
        AffordanceKind::EncounterBias => &[
            "The usual dangers keep their distance.",
            "A deer watches you calmly.",
            "Birdsong fills the air.",
            "Small creatures go about their business, unconcerned.",
            "The wildlife here seems peaceful.",
        ],
        AffordanceKind::ResourceScarcity => &[
            "Rich deposits practically surface themselves.",
            "Herbs grow thick and healthy here.",
            "The land gives freely.",
            "Hidden abundance reveals itself.",
            "A bounty appears before you.",
        ],
        AffordanceKind::SpellSideEffects => &[
            "Magic flows easily here.",
            "Your spell flares bright.",
            "The land lends its strength.",
            "Power wells up from the earth.",
            "The weave responds eagerly.",
        ],
        AffordanceKind::RestQuality => &[
            "Deep, restorative sleep.",
            "You wake refreshed and ready.",
            "Peaceful dreams of distant places.",
            "The earth cradles you gently.",
            "Morning comes too soon, but you feel renewed.",
        ],
        AffordanceKind::AmbientMessaging => &[
            "The light seems warmer here.",
            "A pleasant calm settles over you.",
        ],
        AffordanceKind::LootQuality => &[
            "Something glints in the corner.",
            "Remarkably well-preserved.",
            "A hidden cache reveals itself.",
            "The best of the lot, as if waiting for you.",
        ],
        AffordanceKind::WeatherMicroclimate => &[
            "The clouds part briefly.",
            "A warm breeze carries pleasant scents.",
            "The mist clears as you approach.",
            "Sunlight follows your path.",
        ],
        AffordanceKind::AnimalMessengers => &[
            "A songbird alights nearby.",
            "Butterflies dance in your wake.",
            "A doe raises her head, unafraid.",
            "Bees hum peacefully as you pass.",
            "A hawk circles lazily above, a good omen.",
        ],
    }
}

/// One rung of the ambient atmosphere ladder.
#[derive(Debug, Clone, Copy)]
pub struct AmbientLayer {
    /// Effect label recorded in the trigger log.
    pub label: &'static str,
    /// Candidate tells for this layer.
    pub tells: &'static [&'static str],
}

/// Select the atmosphere layer for an affinity value. Returns `None` in the
/// quiet middle band.
#[must_use]
pub fn ambient_layer(affinity: f64) -> Option<AmbientLayer> {
    if affinity <= -0.8 {
        Some(AmbientLayer {
            label: "menacing",
            tells: &[
                "Every shadow seems to reach toward you.",
                "The darkness here is hungry.",
            ],
        })
    } else if affinity <= -0.6 {
        Some(AmbientLayer {
            label: "oppressive",
            tells: &[
                "The air itself seems heavy with disapproval.",
                "A weight presses on your shoulders.",
            ],
        })
    } else if affinity <= -0.4 {
        Some(AmbientLayer {
            label: "watchful",
            tells: &[
                "You can't shake the feeling of being observed.",
                "The shadows seem to watch.",
            ],
        })
    } else if affinity <= -0.25 {
        Some(AmbientLayer {
            label: "uneasy",
            tells: hostile_tells(AffordanceKind::AmbientMessaging),
        })
    } else if affinity >= 0.8 {
        Some(AmbientLayer {
            label: "blessed",
            tells: &[
                "The very air seems to embrace you.",
                "A profound peace fills this place.",
            ],
        })
    } else if affinity >= 0.6 {
        Some(AmbientLayer {
            label: "protected",
            tells: &[
                "A sense of safety settles over you.",
                "You feel sheltered here.",
            ],
        })
    } else if affinity >= 0.4 {
        Some(AmbientLayer {
            label: "welcoming",
            tells: &[
                "You feel oddly at home.",
                "The space seems to welcome you.",
            ],
        })
    } else if affinity >= 0.25 {
        Some(AmbientLayer {
            label: "pleasant",
            tells: favorable_tells(AffordanceKind::AmbientMessaging),
        })
    } else {
        None
    }
}

/// Every ambient tell, for registry validation.
#[must_use]
pub fn ambient_tables() -> Vec<&'static [&'static str]> {
    [-0.9, -0.7, -0.5, -0.3, 0.3, 0.5, 0.7, 0.9]
        .into_iter()
        .filter_map(|affinity| ambient_layer(affinity).map(|layer| layer.tells))
        .collect()
}

/// Pick one tell from a table by deterministic index.
#[must_use]
pub fn pick(table: &'static [&'static str], seed: u64) -> Option<&'static str> {
    if table.is_empty() {
        return None;
    }
    let index = (seed % table.len() as u64) as usize;
    Some(table[index])
}
