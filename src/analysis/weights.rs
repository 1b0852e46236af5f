//! Sector/size weight resolution.
//!
//! Weight entries are keyed `<sector>_<size>`. Lookup degrades gracefully:
//! exact key, then any size for the same sector, then the generic default
//! for the size, then `Default_Large`, then a hard-coded profile. A
//! valuation never fails for lack of a weight row.

use crate::models::{SizeBucket, WeightEntry, WeightTable};

const SIZE_FALLBACK_ORDER: [SizeBucket; 4] = [
    SizeBucket::Large,
    SizeBucket::Mid,
    SizeBucket::Small,
    SizeBucket::Micro,
];

/// Last-resort weight profile when the table has nothing applicable.
pub fn hard_default_entry() -> WeightEntry {
    WeightEntry {
        key: "hard_default".to_string(),
        earnings: 0.25,
        fcf: 0.35,
        sales: 0.20,
        ebitda: 0.15,
        book_value: 0.05,
        discount_factor: 1.0,
    }
}

/// Resolve the weight entry for a sector and size bucket.
pub fn resolve_weights(table: &WeightTable, sector: &str, size: SizeBucket) -> WeightEntry {
    let exact = format!("{}_{}", sector, size);
    if let Some(entry) = table.get(&exact) {
        return entry.clone();
    }

    // Same sector, any size, in fixed order.
    for fallback_size in SIZE_FALLBACK_ORDER {
        let key = format!("{}_{}", sector, fallback_size);
        if let Some(entry) = table.get(&key) {
            return entry.clone();
        }
    }

    if let Some(entry) = table.get(&format!("Default_{}", size)) {
        return entry.clone();
    }
    if let Some(entry) = table.get("Default_Large") {
        return entry.clone();
    }

    hard_default_entry()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, earnings: f64) -> WeightEntry {
        WeightEntry {
            key: key.to_string(),
            earnings,
            fcf: 0.3,
            sales: 0.2,
            ebitda: 0.1,
            book_value: 0.1,
            discount_factor: 0.95,
        }
    }

    #[test]
    fn test_exact_key_wins() {
        let table = WeightTable::new(vec![
            entry("Technology_Large", 0.40),
            entry("Technology_Mid", 0.10),
        ]);
        let w = resolve_weights(&table, "Technology", SizeBucket::Large);
        assert_eq!(w.key, "Technology_Large");
    }

    #[test]
    fn test_same_sector_other_size_before_default() {
        let table = WeightTable::new(vec![
            entry("Technology_Mid", 0.10),
            entry("Default_Small", 0.99),
        ]);
        let w = resolve_weights(&table, "Technology", SizeBucket::Small);
        assert_eq!(w.key, "Technology_Mid");
    }

    #[test]
    fn test_default_for_size_then_default_large() {
        let table = WeightTable::new(vec![
            entry("Default_Small", 0.11),
            entry("Default_Large", 0.22),
        ]);
        let w = resolve_weights(&table, "Energy", SizeBucket::Small);
        assert_eq!(w.key, "Default_Small");
        let w = resolve_weights(&table, "Energy", SizeBucket::Mid);
        assert_eq!(w.key, "Default_Large");
    }

    #[test]
    fn test_hard_default_when_table_empty() {
        let table = WeightTable::default();
        let w = resolve_weights(&table, "Energy", SizeBucket::Micro);
        assert_eq!(w.key, "hard_default");
        assert!((w.earnings - 0.25).abs() < 1e-12);
        assert!((w.fcf - 0.35).abs() < 1e-12);
        assert!((w.discount_factor - 1.0).abs() < 1e-12);
    }
}
