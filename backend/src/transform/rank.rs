//! Rank Deriver: per-country category shares, rankings and averages.
//!
//! Rankings work on the canonical country identifier from the source table.
//! Display names are a presentation concern and never take part in sorting
//! or lookup.

use serde::Serialize;
use std::cmp::Ordering;

use crate::error::{DataUnit, Incomplete, SchemaError};
use crate::models::{Category, CategoryShare, CountryRecord, PositionTier, RankedCountry};
use crate::parser::RawTable;
use crate::transform::normalize::parse_value;
use crate::validation::Schema;

/// Build one [`CountryRecord`] per table row.
///
/// A category's share is the sum of its `-A` and `-T` columns when both
/// exist and both parse. Rows with a blank country are dropped.
pub fn country_records(table: &RawTable, country_column: &str) -> Result<Vec<CountryRecord>, SchemaError> {
    let schema = Schema::from_headers(&table.headers);
    let country_idx = schema.require(country_column)?;

    let sub_columns: Vec<Option<(usize, usize)>> = Category::ALL
        .iter()
        .map(|c| {
            let a = schema.locate(&c.assertive_column()).index()?;
            let t = schema.locate(&c.turbulent_column()).index()?;
            Some((a, t))
        })
        .collect();

    let mut records = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let country = table.field(row, country_idx).trim();
        if country.is_empty() {
            continue;
        }

        let mut values = [None; 16];
        for (slot, columns) in values.iter_mut().zip(&sub_columns) {
            *slot = columns.and_then(|(a, t)| {
                Some(parse_value(table.field(row, a))? + parse_value(table.field(row, t))?)
            });
        }

        records.push(CountryRecord {
            country: country.to_string(),
            values,
            source_row: row,
        });
    }

    Ok(records)
}

/// Indices of the two sub-columns of `category`, or `MissingRequiredColumn`.
pub fn require_category(table: &RawTable, category: Category) -> Result<(usize, usize), SchemaError> {
    let schema = Schema::from_headers(&table.headers);
    let (a, t) = (category.assertive_column(), category.turbulent_column());
    let idx = schema.require_all(&[a.as_str(), t.as_str()])?;
    Ok((idx[0], idx[1]))
}

/// Allowed distance of a country's share sum from 1.0.
pub const SHARE_SUM_TOLERANCE: f64 = 0.05;

/// Countries with all 16 shares present whose sum is off 1.0 by more than
/// `tolerance`. Partial records are skipped.
pub fn unbalanced_countries(records: &[CountryRecord], tolerance: f64) -> Vec<&str> {
    records
        .iter()
        .filter(|r| r.values.iter().all(Option::is_some))
        .filter(|r| (r.total() - 1.0).abs() > tolerance)
        .map(|r| r.country.as_str())
        .collect()
}

/// Countries ordered by one category, highest share first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub category: Category,
    pub entries: Vec<RankedCountry>,
    /// Countries without a share for this category.
    pub unranked: Vec<String>,
}

/// Rank `records` by `category`.
///
/// The sort is stable, so equal shares keep their source order; rank is
/// the 1-based position in the sorted list.
pub fn rank(records: &[CountryRecord], category: Category) -> Ranking {
    let mut ranked: Vec<&CountryRecord> = Vec::with_capacity(records.len());
    let mut unranked = Vec::new();

    for record in records {
        match record.value(category) {
            Some(_) => ranked.push(record),
            None => unranked.push(record.country.clone()),
        }
    }

    ranked.sort_by(|a, b| descending(a.value(category), b.value(category)));

    let entries = ranked
        .into_iter()
        .enumerate()
        .map(|(pos, record)| RankedCountry {
            country: record.country.clone(),
            value: record.value(category).unwrap_or_default(),
            rank: pos + 1,
            source_row: record.source_row,
        })
        .collect();

    Ranking { category, entries, unranked }
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Countries in the table, ranked or not.
    pub fn country_count(&self) -> usize {
        self.entries.len() + self.unranked.len()
    }

    /// The first `n` entries (all of them if fewer exist).
    pub fn top(&self, n: usize) -> &[RankedCountry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Exact-name lookup.
    pub fn lookup(&self, country: &str) -> Result<&RankedCountry, Incomplete> {
        self.entries
            .iter()
            .find(|e| e.country == country)
            .ok_or_else(|| Incomplete::CountryNotFound { name: country.to_string() })
    }

    /// Lookup by the first alias that names a ranked country.
    pub fn lookup_any<S: AsRef<str>>(&self, aliases: &[S]) -> Result<&RankedCountry, Incomplete> {
        aliases
            .iter()
            .find_map(|alias| self.lookup(alias.as_ref()).ok())
            .ok_or_else(|| Incomplete::CountryNotFound {
                name: aliases.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" / "),
            })
    }

    /// Tier of `entry`: inside the top `n`, else upper or lower half of
    /// all countries in the table.
    pub fn tier(&self, entry: &RankedCountry, n: usize) -> PositionTier {
        if entry.rank <= n {
            PositionTier::TopN
        } else if entry.rank * 2 <= self.country_count() {
            PositionTier::AboveMedian
        } else {
            PositionTier::BelowMedian
        }
    }

    /// The top `n`, plus `highlight` appended when it falls outside them.
    pub fn top_with(&self, n: usize, highlight: Option<&RankedCountry>) -> Vec<RankedCountry> {
        let mut slice = self.top(n).to_vec();
        if let Some(entry) = highlight {
            if entry.rank > n {
                slice.push(entry.clone());
            }
        }
        slice
    }
}

/// One country's shares, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryProfile {
    pub country: String,
    pub distribution: Vec<CategoryShare>,
}

impl CountryProfile {
    /// The most common category, if the country has any shares.
    pub fn dominant(&self) -> Option<&CategoryShare> {
        self.distribution.first()
    }
}

/// Shares of one country, sorted descending (ties keep category order).
pub fn country_profile(record: &CountryRecord) -> CountryProfile {
    let distribution = Category::ALL
        .iter()
        .filter_map(|&category| record.value(category).map(|value| CategoryShare { category, value }))
        .collect();

    CountryProfile {
        country: record.country.clone(),
        distribution: sorted_shares(distribution),
    }
}

/// Exact-name lookup over the unranked records.
pub fn find_country<'a>(records: &'a [CountryRecord], country: &str) -> Result<&'a CountryRecord, Incomplete> {
    records
        .iter()
        .find(|r| r.country == country)
        .ok_or_else(|| Incomplete::CountryNotFound { name: country.to_string() })
}

/// Mean share per category over the countries that have one, largest first.
pub fn global_average(records: &[CountryRecord]) -> Result<Vec<CategoryShare>, Incomplete> {
    if records.is_empty() {
        return Err(Incomplete::InsufficientData { found: 0, required: 1, unit: DataUnit::Countries });
    }

    let averages = Category::ALL
        .iter()
        .filter_map(|&category| {
            let values: Vec<f64> = records.iter().filter_map(|r| r.value(category)).collect();
            if values.is_empty() {
                return None;
            }
            let value = values.iter().sum::<f64>() / values.len() as f64;
            Some(CategoryShare { category, value })
        })
        .collect();

    Ok(sorted_shares(averages))
}

fn sorted_shares(mut shares: Vec<CategoryShare>) -> Vec<CategoryShare> {
    shares.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::load_bytes;

    fn record(country: &str, row: usize, intj: Option<f64>) -> CountryRecord {
        let mut values = [None; 16];
        values[Category::Intj.index()] = intj;
        CountryRecord { country: country.to_string(), values, source_row: row }
    }

    fn three_countries() -> Vec<CountryRecord> {
        vec![
            record("Aland", 0, Some(0.3)),
            record("Bolt", 1, Some(0.1)),
            record("Corr", 2, Some(0.2)),
        ]
    }

    #[test]
    fn test_rank_and_top() {
        let ranking = rank(&three_countries(), Category::Intj);

        let rows: Vec<usize> = ranking.entries.iter().map(|e| e.source_row).collect();
        let ranks: Vec<usize> = ranking.entries.iter().map(|e| e.rank).collect();
        assert_eq!(rows, vec![0, 2, 1]);
        assert_eq!(ranks, vec![1, 2, 3]);

        let top: Vec<usize> = ranking.top(2).iter().map(|e| e.source_row).collect();
        assert_eq!(top, vec![0, 2]);
        assert_eq!(ranking.top(50).len(), 3);
    }

    #[test]
    fn test_rank_is_total_order() {
        let records = vec![
            record("a", 0, Some(0.05)),
            record("b", 1, Some(0.2)),
            record("c", 2, Some(0.05)),
            record("d", 3, Some(0.3)),
            record("e", 4, Some(0.2)),
        ];
        let ranking = rank(&records, Category::Intj);

        for a in &ranking.entries {
            for b in &ranking.entries {
                if a.rank < b.rank {
                    assert!(a.value >= b.value);
                }
            }
        }
    }

    #[test]
    fn test_ties_keep_source_order() {
        let records = vec![
            record("first", 0, Some(0.2)),
            record("second", 1, Some(0.2)),
            record("third", 2, Some(0.2)),
        ];
        let ranking = rank(&records, Category::Intj);

        let names: Vec<&str> = ranking.entries.iter().map(|e| e.country.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(ranking.entries[2].rank, 3);
    }

    #[test]
    fn test_missing_shares_are_unranked() {
        let records = vec![record("a", 0, Some(0.1)), record("b", 1, None)];
        let ranking = rank(&records, Category::Intj);

        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking.unranked, vec!["b"]);
        assert_eq!(ranking.country_count(), 2);
    }

    #[test]
    fn test_lookup() {
        let ranking = rank(&three_countries(), Category::Intj);

        assert_eq!(ranking.lookup("Corr").unwrap().rank, 2);
        assert_eq!(
            ranking.lookup("Narnia").unwrap_err(),
            Incomplete::CountryNotFound { name: "Narnia".into() }
        );
    }

    #[test]
    fn test_lookup_any() {
        let ranking = rank(&three_countries(), Category::Intj);

        let hit = ranking.lookup_any(&["South Korea", "Bolt"]).unwrap();
        assert_eq!(hit.country, "Bolt");

        let miss = ranking.lookup_any(&["South Korea", "Korea, South"]).unwrap_err();
        assert_eq!(miss, Incomplete::CountryNotFound { name: "South Korea / Korea, South".into() });
    }

    #[test]
    fn test_tiers() {
        let records: Vec<CountryRecord> = (0..30)
            .map(|i| record(&format!("c{i}"), i, Some(1.0 - i as f64 / 100.0)))
            .collect();
        let ranking = rank(&records, Category::Intj);

        assert_eq!(ranking.tier(&ranking.entries[9], 10), PositionTier::TopN);
        assert_eq!(ranking.tier(&ranking.entries[14], 10), PositionTier::AboveMedian);
        assert_eq!(ranking.tier(&ranking.entries[15], 10), PositionTier::BelowMedian);
    }

    #[test]
    fn test_top_with_highlight() {
        let ranking = rank(&three_countries(), Category::Intj);
        let bolt = ranking.lookup("Bolt").unwrap().clone();
        let aland = ranking.lookup("Aland").unwrap().clone();

        assert_eq!(ranking.top_with(2, Some(&bolt)).len(), 3);
        assert_eq!(ranking.top_with(2, Some(&aland)).len(), 2);
        assert_eq!(ranking.top_with(2, None).len(), 2);
    }

    #[test]
    fn test_country_records_from_table() {
        let csv = "Country,INTJ-A,INTJ-T,INFP-A,INFP-T,ENFP-A\n\
                   Chile,0.01,0.02,0.05,0.07,0.03\n\
                   ,0.5,0.5,0.5,0.5,0.5\n\
                   Peru,0.02,bad,0.04,0.04,0.01\n";
        let table = load_bytes(csv.as_bytes(), "mbti", &["utf-8"]).unwrap();

        let records = country_records(&table, "Country").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].country, "Chile");
        assert!((records[0].value(Category::Intj).unwrap() - 0.03).abs() < 1e-12);
        assert!((records[0].value(Category::Infp).unwrap() - 0.12).abs() < 1e-12);
        assert_eq!(records[0].value(Category::Enfp), None);
        assert_eq!(records[1].country, "Peru");
        assert_eq!(records[1].source_row, 2);
        assert_eq!(records[1].value(Category::Intj), None);
    }

    #[test]
    fn test_country_column_required() {
        let table = load_bytes(b"Nation,INTJ-A,INTJ-T\nChile,0.1,0.1\n", "mbti", &["utf-8"]).unwrap();
        assert!(country_records(&table, "Country").is_err());
        assert!(require_category(&table, Category::Intj).is_ok());
        assert!(require_category(&table, Category::Estp).is_err());
    }

    #[test]
    fn test_unbalanced_countries() {
        let full = |country: &str, share: f64| CountryRecord {
            country: country.to_string(),
            values: [Some(share); 16],
            source_row: 0,
        };
        let records = vec![
            full("Even", 1.0 / 16.0),
            full("Close", 0.064),
            full("Half", 1.0 / 32.0),
            record("Partial", 1, Some(0.2)),
        ];

        assert_eq!(unbalanced_countries(&records, SHARE_SUM_TOLERANCE), vec!["Half"]);
        assert!(unbalanced_countries(&records, 0.6).is_empty());
    }

    #[test]
    fn test_country_profile() {
        let mut values = [None; 16];
        values[Category::Intj.index()] = Some(0.1);
        values[Category::Infp.index()] = Some(0.4);
        values[Category::Esfj.index()] = Some(0.1);
        let record = CountryRecord { country: "Chile".into(), values, source_row: 0 };

        let profile = country_profile(&record);

        let order: Vec<Category> = profile.distribution.iter().map(|s| s.category).collect();
        assert_eq!(order, vec![Category::Infp, Category::Intj, Category::Esfj]);
        assert_eq!(profile.dominant().unwrap().category, Category::Infp);
    }

    #[test]
    fn test_global_average() {
        let records = vec![
            record("a", 0, Some(0.1)),
            record("b", 1, Some(0.3)),
            record("c", 2, None),
        ];

        let averages = global_average(&records).unwrap();

        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].category, Category::Intj);
        assert!((averages[0].value - 0.2).abs() < 1e-12);

        assert!(matches!(
            global_average(&[]),
            Err(Incomplete::InsufficientData { unit: DataUnit::Countries, .. })
        ));
    }

    #[test]
    fn test_find_country() {
        let records = three_countries();
        assert_eq!(find_country(&records, "Bolt").unwrap().source_row, 1);
        assert!(find_country(&records, "bolt").is_err());
    }
}
