use crate::models::Archetype;

/// Symmetric archetype-pair affinity, 0.0 to 1.0.
///
/// The table is a calibration input, not a derived quantity; same-archetype
/// pairs are 1.0 and every entry mirrors across the diagonal. Indexed by the
/// order of `Archetype::ALL`.
const AFFINITY: [[f64; 6]; 6] = [
    // Adventurer
    [1.00, 0.55, 0.65, 0.90, 0.35, 0.60],
    // Nurturer
    [0.55, 1.00, 0.60, 0.50, 0.85, 0.65],
    // Achiever
    [0.65, 0.60, 1.00, 0.45, 0.70, 0.75],
    // FreeSpirit
    [0.90, 0.50, 0.45, 1.00, 0.30, 0.70],
    // Traditionalist
    [0.35, 0.85, 0.70, 0.30, 1.00, 0.55],
    // Intellectual
    [0.60, 0.65, 0.75, 0.70, 0.55, 1.00],
];

fn index(archetype: Archetype) -> usize {
    match archetype {
        Archetype::Adventurer => 0,
        Archetype::Nurturer => 1,
        Archetype::Achiever => 2,
        Archetype::FreeSpirit => 3,
        Archetype::Traditionalist => 4,
        Archetype::Intellectual => 5,
    }
}

/// Affinity between two archetypes.
#[inline]
pub fn affinity(a: Archetype, b: Archetype) -> f64 {
    AFFINITY[index(a)][index(b)]
}

/// Affinity for possibly-untagged profiles. An untagged side contributes
/// nothing rather than a neutral guess; missing data must not be rewarded.
#[inline]
pub fn affinity_opt(a: Option<Archetype>, b: Option<Archetype>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => affinity(a, b),
        _ => 0.0,
    }
}
