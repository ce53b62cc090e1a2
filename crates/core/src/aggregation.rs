//! Aggregation engine.
//!
//! One pass over the fetched records produces the global summary and one group per
//! `(organisation unit, period)`. Malformed values never fail the pass: unparseable counts count
//! as zero, unparseable ages are dropped and unknown codes are ignored.

use crate::config::{CounselingCategory, DataElementKind, DataElementMapping, TestOutcome};
use crate::models::DataRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Identifies one row of the data table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub org_unit: String,
    pub period: String,
}

/// Tallies for one organisation unit in one period.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AggregationGroup {
    pub org_unit: String,
    pub period: String,
    pub clients_tested: u64,
    pub positive: u64,
    pub negative: u64,
    pub inconclusive: u64,
    /// Ages in arrival order.
    pub ages: Vec<i64>,
    /// Raw counseling-type codes in arrival order, recognised or not.
    pub counseling_selections: Vec<String>,
}

impl AggregationGroup {
    fn new(key: &GroupKey) -> Self {
        Self {
            org_unit: key.org_unit.clone(),
            period: key.period.clone(),
            ..Self::default()
        }
    }

    pub fn average_age(&self) -> Option<i64> {
        rounded_mean(self.ages.iter().sum(), self.ages.len())
    }

    pub fn counseling_sessions(&self) -> usize {
        self.counseling_selections.len()
    }

    /// Test results classified in this group.
    pub fn classified_results(&self) -> u64 {
        self.positive + self.negative + self.inconclusive
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounselingTally {
    pub individual: u64,
    pub group: u64,
    pub couples: u64,
}

/// Totals across every record of one aggregation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GlobalSummary {
    pub total_tested: u64,
    pub positive: u64,
    pub negative: u64,
    pub inconclusive: u64,
    /// Mean over every observed age, `None` when no age was observed.
    pub average_age: Option<i64>,
    pub counseling_sessions: u64,
    pub counseling: CounselingTally,
}

/// Tested, positive and negative totals of one period across all organisation units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub tested: u64,
    pub positive: u64,
    pub negative: u64,
}

/// Output of [`aggregate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub summary: GlobalSummary,
    #[serde(serialize_with = "groups_as_list")]
    pub groups: BTreeMap<GroupKey, AggregationGroup>,
}

impl Aggregation {
    /// Per-period totals, oldest period first.
    ///
    /// Periods are fixed-width `YYYYMM` strings, so sorting them as strings sorts them in time.
    pub fn trend(&self) -> Vec<TrendPoint> {
        let mut by_period: BTreeMap<&str, TrendPoint> = BTreeMap::new();

        for group in self.groups.values() {
            let point = by_period
                .entry(group.period.as_str())
                .or_insert_with(|| TrendPoint {
                    period: group.period.clone(),
                    tested: 0,
                    positive: 0,
                    negative: 0,
                });
            point.tested += group.clients_tested;
            point.positive += group.positive;
            point.negative += group.negative;
        }

        by_period.into_values().collect()
    }

    /// Distinct organisation units present in the groups, sorted.
    pub fn org_units(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.groups.keys().map(|k| k.org_unit.clone()).collect();
        ids.dedup();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Reduces `records` to the global summary and per-group tallies.
pub fn aggregate(records: &[DataRecord], mapping: &DataElementMapping) -> Aggregation {
    let mut aggregation = Aggregation::default();
    let mut age_sum: i64 = 0;
    let mut age_count: usize = 0;

    for record in records {
        let key = GroupKey {
            org_unit: record.org_unit.clone(),
            period: record.period.clone(),
        };
        let group = aggregation
            .groups
            .entry(key)
            .or_insert_with_key(AggregationGroup::new);
        let summary = &mut aggregation.summary;

        match mapping.data_elements.kind_of(&record.data_element) {
            Some(DataElementKind::ClientsTested) => {
                let count = parse_leading_integer(&record.value)
                    .and_then(|n| u64::try_from(n).ok())
                    .unwrap_or(0);
                group.clients_tested = group.clients_tested.saturating_add(count);
                summary.total_tested = summary.total_tested.saturating_add(count);
            }
            Some(DataElementKind::TestResult) => {
                match mapping.options.test_outcome(&record.value) {
                    Some(TestOutcome::Positive) => {
                        group.positive += 1;
                        summary.positive += 1;
                    }
                    Some(TestOutcome::Negative) => {
                        group.negative += 1;
                        summary.negative += 1;
                    }
                    Some(TestOutcome::Inconclusive) => {
                        group.inconclusive += 1;
                        summary.inconclusive += 1;
                    }
                    None => {}
                }
            }
            Some(DataElementKind::ClientAge) => {
                if let Some(age) = parse_leading_integer(&record.value) {
                    group.ages.push(age);
                    age_sum = age_sum.saturating_add(age);
                    age_count += 1;
                }
            }
            Some(DataElementKind::CounselingType) => {
                group.counseling_selections.push(record.value.clone());
                summary.counseling_sessions += 1;
                match mapping.options.counseling_category(&record.value) {
                    Some(CounselingCategory::Individual) => summary.counseling.individual += 1,
                    Some(CounselingCategory::Group) => summary.counseling.group += 1,
                    Some(CounselingCategory::Couples) => summary.counseling.couples += 1,
                    None => {}
                }
            }
            Some(DataElementKind::Comments) | None => {}
        }
    }

    aggregation.summary.average_age = rounded_mean(age_sum, age_count);
    aggregation
}

/// Parses the integer at the start of `value`, the way a lenient `parseInt` does.
///
/// Leading whitespace and one sign are accepted and anything after the digits is ignored, so
/// `"42 years"` and `"25.7"` parse as 42 and 25. Returns `None` when no digit follows.
pub fn parse_leading_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// `round(sum / count)` with halves rounded up, `None` for an empty set.
fn rounded_mean(sum: i64, count: usize) -> Option<i64> {
    if count == 0 {
        return None;
    }
    Some((sum as f64 / count as f64 + 0.5).floor() as i64)
}

fn groups_as_list<S>(
    groups: &BTreeMap<GroupKey, AggregationGroup>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(groups.values())
}
