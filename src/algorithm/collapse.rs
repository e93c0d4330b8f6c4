//! Spell aggregation: collapse episode records into hospital spells.
//!
//! Episodes sharing the same (patient, admission date, discharge date)
//! triple belong to one continuous inpatient stay; missing dates group
//! together like SQL nulls. Categorical fields are resolved per group by
//! statistical mode with an ascending lexicographic tie-break, so the
//! result is deterministic and reproducible across runs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithm::dates::{plausible_los, spell_los};
use crate::models::spell::compose_spell_id;
use crate::models::{Episode, Spell};

/// Grouping key for one spell: patient plus the admission/discharge pair.
///
/// `Option` equality gives null-equals-null grouping; the `Ord` derive
/// makes the `BTreeMap` iteration (and thus the output row order)
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SpellKey {
    pseudo_hesid: Option<String>,
    admidate: Option<NaiveDate>,
    disdate: Option<NaiveDate>,
}

/// Running per-group state while scanning episodes.
#[derive(Default)]
struct SpellGroup {
    episode_keys: FxHashSet<String>,
    any_emerg: bool,
    imd_quintile: Option<i8>,
    diag_counts: FxHashMap<String, usize>,
    ethnos_counts: FxHashMap<String, usize>,
    sex_counts: FxHashMap<String, usize>,
}

impl SpellGroup {
    fn add(&mut self, episode: &Episode) {
        if let Some(key) = &episode.epikey {
            self.episode_keys.insert(key.clone());
        }
        self.any_emerg |= episode.is_emergency();
        // First non-null quintile wins; episodes of one stay rarely
        // disagree, and first-observed keeps the choice deterministic.
        if self.imd_quintile.is_none() {
            self.imd_quintile = episode.imd_quintile;
        }
        bump(&mut self.diag_counts, episode.diag.as_deref());
        bump(&mut self.ethnos_counts, episode.ethnos.as_deref());
        bump(&mut self.sex_counts, episode.sex.as_deref());
    }
}

fn bump(counts: &mut FxHashMap<String, usize>, value: Option<&str>) {
    if let Some(v) = value {
        *counts.entry(v.to_string()).or_insert(0) += 1;
    }
}

/// Most frequent non-null value; ties broken by ascending lexicographic
/// order of the code value.
fn mode_with_tiebreak(counts: &FxHashMap<String, usize>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for (value, &count) in counts {
        let better = match best {
            None => true,
            Some((best_value, best_count)) => {
                count > best_count || (count == best_count && value.as_str() < best_value)
            }
        };
        if better {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// Collapse episodes into one spell per (patient, admission, discharge)
/// group, then drop spells with a non-physical length of stay.
///
/// Length of stay is computed from the group's own dates, so it is always
/// consistent with the grouping key. Spells with missing dates keep a null
/// LOS and are retained.
#[must_use]
pub fn collapse_episodes(episodes: &[Episode]) -> Vec<Spell> {
    let mut groups: BTreeMap<SpellKey, SpellGroup> = BTreeMap::new();

    for episode in episodes {
        let key = SpellKey {
            pseudo_hesid: episode.pseudo_hesid.clone(),
            admidate: episode.admidate,
            disdate: episode.disdate,
        };
        groups.entry(key).or_default().add(episode);
    }

    let n_groups = groups.len();
    let mut spells = Vec::with_capacity(n_groups);
    for (key, group) in groups {
        let los_days = spell_los(key.admidate, key.disdate);
        if !plausible_los(los_days) {
            continue;
        }
        let spell_id = compose_spell_id(key.pseudo_hesid.as_deref(), key.admidate, key.disdate);
        spells.push(Spell {
            pseudo_hesid: key.pseudo_hesid,
            admidate: key.admidate,
            disdate: key.disdate,
            n_episodes: group.episode_keys.len() as i64,
            los_days,
            any_emerg: group.any_emerg,
            imd_quintile: group.imd_quintile,
            primary_diag: mode_with_tiebreak(&group.diag_counts),
            ethnicity: mode_with_tiebreak(&group.ethnos_counts),
            sex: mode_with_tiebreak(&group.sex_counts),
            spell_id,
        });
    }

    log::info!(
        "Collapsed {} episodes into {} spells ({} dropped by length-of-stay filter)",
        episodes.len(),
        spells.len(),
        n_groups - spells.len()
    );

    spells
}
