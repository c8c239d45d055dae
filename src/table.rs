use serde::Serialize;

/// One listing: who sells it and its catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    pub account_name: String,
    /// Digits exactly as they appear in the marker (leading zeros kept).
    pub product_id: String,
}

/// Ordered rows in document order. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingTable {
    rows: Vec<ListingRecord>,
}

impl ListingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ListingRecord) {
        self.rows.push(record);
    }

    pub fn extend(&mut self, other: ListingTable) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListingRecord> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<ListingRecord> {
        self.rows
    }
}

impl FromIterator<ListingRecord> for ListingTable {
    fn from_iter<I: IntoIterator<Item = ListingRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ListingTable {
    type Item = &'a ListingRecord;
    type IntoIter = std::slice::Iter<'a, ListingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
