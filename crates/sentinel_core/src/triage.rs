//! Triage classification of checked signs.
//!
//! # Responsibility
//! - Map a selection of sign ids to a concern tier.
//!
//! # Invariants
//! - Pure and deterministic: no I/O, no hidden state.
//! - Ids missing from the lookup never error. They add no severity or
//!   category weight but still count toward the selection size.
//! - Only an empty selection has no tier.
//!
//! Rules, first match wins:
//! 1. emergency: two or more severe signs, or any severe sexual sign.
//! 2. high: one severe plus two moderate, four or more moderate, or signs
//!    spanning three or more categories.
//! 3. medium: three or more selected ids, or two or more moderate.
//! 4. low: everything else.

use crate::catalog::{SignLookup, SignProfile};
use crate::model::observation::ConcernLevel;
use crate::model::sign::{Severity, SignCategory};
use std::collections::BTreeSet;

/// Rule that produced a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageRule {
    MultipleSevere,
    SevereSexual,
    SevereWithModerate,
    ManyModerate,
    ManyCategories,
    ManySigns,
    SeveralModerate,
    Baseline,
}

/// Classification result together with the counts it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageAssessment {
    pub level: ConcernLevel,
    pub rule: TriageRule,
    /// Distinct selected ids, resolved or not.
    pub total: usize,
    pub severe: usize,
    pub moderate: usize,
    pub categories: BTreeSet<SignCategory>,
}

/// Returns the concern tier for `selected`, or `None` for an empty selection.
pub fn classify<'a, I, L>(selected: I, lookup: &L) -> Option<ConcernLevel>
where
    I: IntoIterator<Item = &'a str>,
    L: SignLookup + ?Sized,
{
    assess(selected, lookup).map(|assessment| assessment.level)
}

/// Like [`classify`], but also reports which rule fired and the counts used.
pub fn assess<'a, I, L>(selected: I, lookup: &L) -> Option<TriageAssessment>
where
    I: IntoIterator<Item = &'a str>,
    L: SignLookup + ?Sized,
{
    // Set semantics: a repeated id counts once.
    let ids: BTreeSet<&str> = selected.into_iter().collect();
    if ids.is_empty() {
        return None;
    }
    let total = ids.len();
    let profiles: Vec<SignProfile> = ids.into_iter().filter_map(|id| lookup.profile(id)).collect();

    let severe = count_severity(&profiles, Severity::Severe);
    let moderate = count_severity(&profiles, Severity::Moderate);
    let categories: BTreeSet<SignCategory> =
        profiles.iter().map(|profile| profile.category).collect();
    let has_severe_sexual = profiles.iter().any(|profile| {
        profile.category == SignCategory::Sexual && profile.severity == Severity::Severe
    });

    let (level, rule) = if severe >= 2 {
        (ConcernLevel::Emergency, TriageRule::MultipleSevere)
    } else if has_severe_sexual {
        (ConcernLevel::Emergency, TriageRule::SevereSexual)
    } else if severe >= 1 && moderate >= 2 {
        (ConcernLevel::High, TriageRule::SevereWithModerate)
    } else if moderate >= 4 {
        (ConcernLevel::High, TriageRule::ManyModerate)
    } else if categories.len() >= 3 {
        (ConcernLevel::High, TriageRule::ManyCategories)
    } else if total >= 3 {
        (ConcernLevel::Medium, TriageRule::ManySigns)
    } else if moderate >= 2 {
        (ConcernLevel::Medium, TriageRule::SeveralModerate)
    } else {
        (ConcernLevel::Low, TriageRule::Baseline)
    };

    Some(TriageAssessment {
        level,
        rule,
        total,
        severe,
        moderate,
        categories,
    })
}

fn count_severity(profiles: &[SignProfile], severity: Severity) -> usize {
    profiles
        .iter()
        .filter(|profile| profile.severity == severity)
        .count()
}
