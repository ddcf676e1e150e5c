//! Collapse duplicate disclosures pulled by overlapping provider fetches.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::models::InsiderSellRecord;

/// Identity of a disclosure across providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub ticker: String,
    pub date: NaiveDate,
    pub insider: String,
    pub shares: i64,
}

impl DedupKey {
    pub fn of(record: &InsiderSellRecord) -> Self {
        Self {
            ticker: record.ticker.trim().to_ascii_uppercase(),
            date: record.transaction_date,
            insider: record.insider_name.clone().unwrap_or_default(),
            // Nearest whole share, ties to even.
            shares: record.shares_sold.round_ties_even() as i64,
        }
    }
}

/// Incremental first-seen-wins merge.
#[derive(Debug, Default)]
pub struct Deduplicator {
    records: IndexMap<DedupKey, InsiderSellRecord>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch, returning how many records were new.
    pub fn extend<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = InsiderSellRecord>,
    {
        let before = self.records.len();
        for record in batch {
            self.records.entry(DedupKey::of(&record)).or_insert(record);
        }
        self.records.len() - before
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in the order their keys were first seen.
    pub fn finish(self) -> Vec<InsiderSellRecord> {
        self.records.into_values().collect()
    }
}

/// Merge any number of batches into one de-duplicated sequence.
pub fn dedup<B, I>(batches: B) -> Vec<InsiderSellRecord>
where
    B: IntoIterator<Item = I>,
    I: IntoIterator<Item = InsiderSellRecord>,
{
    let mut merged = Deduplicator::new();
    for batch in batches {
        merged.extend(batch);
    }
    merged.finish()
}
