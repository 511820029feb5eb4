//! Ordered address collection with the single-primary invariant.
//!
//! Every mutating operation leaves a non-empty book with exactly one
//! primary entry; readers can never observe zero or two primaries.
//! Reordering goes through an explicit draft: the new order takes effect
//! only when the draft is committed, dropping it discards the attempt.

pub mod window;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::address::AddressEntry;
use crate::errors::DomainError;
use crate::validation::rules::postal_code_matches_country;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    entries: Vec<AddressEntry>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts an existing collection, repairing the primary flag if the
    /// stored data disagrees with the invariant.
    pub fn from_entries(entries: Vec<AddressEntry>) -> Self {
        let primaries = entries.iter().filter(|entry| entry.is_primary).count();
        let mut book = Self { entries };
        if !book.entries.is_empty() && primaries != 1 {
            warn!(primaries, "stored address book had a bad primary flag set, repairing");
        }
        book.normalize();
        book
    }

    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AddressEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primary_index(&self) -> Option<usize> {
        self.entries.iter().position(|entry| entry.is_primary)
    }

    pub fn primary(&self) -> Option<&AddressEntry> {
        self.primary_index().map(|index| &self.entries[index])
    }

    /// Appends an entry. The first entry becomes primary automatically;
    /// later entries never steal the flag on insert.
    pub fn add(&mut self, mut entry: AddressEntry) -> usize {
        entry.is_primary = self.entries.is_empty();
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Removes an entry. If it held the primary flag, the new first entry
    /// is promoted in the same operation.
    pub fn remove(&mut self, index: usize) -> Result<AddressEntry, DomainError> {
        if index >= self.entries.len() {
            return Err(DomainError::AddressIndexOutOfRange { index, len: self.entries.len() });
        }

        let removed = self.entries.remove(index);
        if removed.is_primary {
            if let Some(first) = self.entries.first_mut() {
                first.is_primary = true;
            }
        }
        Ok(removed)
    }

    /// Promotes one entry and demotes all others in a single pass.
    pub fn set_primary(&mut self, index: usize) -> Result<(), DomainError> {
        if index >= self.entries.len() {
            return Err(DomainError::AddressIndexOutOfRange { index, len: self.entries.len() });
        }

        for (position, entry) in self.entries.iter_mut().enumerate() {
            entry.is_primary = position == index;
        }
        Ok(())
    }

    /// Per-entry postal validity against each entry's own country, used by
    /// the window's error-aware height estimation.
    pub fn postal_error_flags(&self) -> Vec<bool> {
        self.entries
            .iter()
            .map(|entry| !postal_code_matches_country(&entry.postal_code, &entry.country))
            .collect()
    }

    pub fn begin_reorder(&self) -> ReorderDraft {
        ReorderDraft { entries: self.entries.clone() }
    }

    /// Makes a draft's order current. This is the only point at which a
    /// reorder becomes observable; an uncommitted draft changes nothing.
    pub fn commit_reorder(&mut self, draft: ReorderDraft) {
        self.entries = draft.entries;
        self.normalize();
    }

    fn normalize(&mut self) {
        let Some(keep) = self.primary_index() else {
            if let Some(first) = self.entries.first_mut() {
                first.is_primary = true;
            }
            return;
        };
        for (position, entry) in self.entries.iter_mut().enumerate() {
            entry.is_primary = position == keep;
        }
    }
}

/// A pending reorder of the address book. Mutations stay local to the
/// draft until [`AddressBook::commit_reorder`] runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReorderDraft {
    entries: Vec<AddressEntry>,
}

impl ReorderDraft {
    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), DomainError> {
        let len = self.entries.len();
        if from >= len {
            return Err(DomainError::AddressIndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(DomainError::AddressIndexOutOfRange { index: to, len });
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }
}
