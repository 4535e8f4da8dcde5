//! The quote store: an ordered, id-unique sequence of quotes mirrored to
//! durable storage.
//!
//! Every public mutating operation writes the full sequence to the backing
//! `KeyValueStore` before it returns, and leaves the in-memory sequence
//! untouched if that write fails. The merge primitives used by the sync
//! reconciler (`push_remote`, `replace`) are the exception: they only touch
//! memory and the reconciler calls `persist` once the pass is done. A failed
//! `persist` rolls memory back to the last sequence storage accepted.
//!
//! The store also owns the two other persisted values of the quote manager: the
//! category the user last filtered by and the sync cursor.
use crate::storage::{KeyValueStore, LAST_SYNC_KEY, QUOTES_KEY, SELECTED_CATEGORY_KEY};
use log::{debug, info};
use quote_common::model::now_millis;
use quote_common::{NewQuote, Quote, QuoteError, Result};
use rand::seq::IndexedRandom;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

/// Suggested file name for exports.
pub const EXPORT_FILE_NAME: &str = "my_quotes.json";

const DEFAULT_QUOTES: &[(&str, &str)] = &[
    ("Life is what happens while you're busy making other plans.", "Life"),
    ("The only way to do great work is to love what you do.", "Work"),
    (
        "In three words I can sum up everything I've learned about life: it goes on.",
        "Life",
    ),
];

/// Import or storage element that passed validation.
struct Candidate {
    id: Option<i64>,
    text: String,
    category: String,
    timestamp: Option<i64>,
    origin_flag: bool,
}

impl Candidate {
    fn from_value(index: usize, value: &Value) -> Result<Self> {
        let invalid = |what: &str| {
            QuoteError::Format(format!(
                "Invalid quote format in JSON file: element {} {}",
                index, what
            ))
        };
        let object = value.as_object().ok_or_else(|| invalid("is not an object"))?;
        let text = object
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("has no string `text`"))?;
        let category = object
            .get("category")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("has no string `category`"))?;
        let origin_flag = object
            .get("serverVersion")
            .or_else(|| object.get("originFlag"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Candidate {
            id: object.get("id").and_then(Value::as_i64),
            text: text.to_string(),
            category: category.to_string(),
            timestamp: object.get("timestamp").and_then(Value::as_i64),
            origin_flag,
        })
    }
}

fn parse_candidates(values: &[Value]) -> Result<Vec<Candidate>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| Candidate::from_value(index, value))
        .collect()
}

/// In-memory quote sequence with a durable mirror.
pub struct QuoteStore {
    quotes: Vec<Quote>,
    /// Last sequence storage accepted.
    persisted: Vec<Quote>,
    storage: Box<dyn KeyValueStore>,
    sync_cursor: i64,
    last_issued_id: i64,
}

impl QuoteStore {
    /// Loads the store from `storage`.
    ///
    /// Falls back to the built-in default quotes when nothing is stored, and to
    /// "now" for the sync cursor when no sync was ever recorded.
    pub fn open(storage: Box<dyn KeyValueStore>) -> Result<Self> {
        let now = now_millis();
        let sync_cursor = match storage.get(LAST_SYNC_KEY)? {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| {
                QuoteError::Storage(format!("{} is not a timestamp: {}", LAST_SYNC_KEY, e))
            })?,
            None => now,
        };
        let stored = storage.get(QUOTES_KEY)?;

        let mut store = QuoteStore {
            quotes: Vec::new(),
            persisted: Vec::new(),
            storage,
            sync_cursor,
            last_issued_id: 0,
        };

        store.quotes = match stored {
            Some(json) => {
                let values: Vec<Value> = serde_json::from_str(&json).map_err(|e| {
                    QuoteError::Storage(format!("stored quotes are unreadable: {}", e))
                })?;
                let candidates = parse_candidates(&values)
                    .map_err(|e| QuoteError::Storage(e.to_string()))?;
                store.materialize(candidates, now)
            }
            None => {
                debug!("No stored quotes, starting from defaults");
                DEFAULT_QUOTES
                    .iter()
                    .enumerate()
                    .map(|(index, (text, category))| Quote {
                        id: index as i64 + 1,
                        text: text.to_string(),
                        category: category.to_string(),
                        timestamp: now,
                        origin_flag: false,
                    })
                    .collect()
            }
        };
        store.persisted = store.quotes.clone();
        info!(
            "Quote store opened with {} quotes (sync cursor {})",
            store.quotes.len(),
            store.sync_cursor
        );
        Ok(store)
    }

    /// Validates and appends a quote typed in by the user.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote> {
        let draft = NewQuote::new(text, category)?;
        self.add_draft(draft)
    }

    /// Appends an already validated quote under a fresh id.
    pub fn add_draft(&mut self, draft: NewQuote) -> Result<Quote> {
        let id = self.fresh_id();
        let quote = draft.into_quote(id, now_millis());
        let mut next = self.quotes.clone();
        next.push(quote.clone());
        self.commit(next)?;
        Ok(quote)
    }

    /// Imports a JSON document; see [`Self::import_many`].
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| QuoteError::Format(format!("Invalid JSON: {}", e)))?;
        match document {
            Value::Array(values) => self.import_many(&values),
            _ => Err(QuoteError::Format(
                "Imported document must be a JSON array of quotes".to_string(),
            )),
        }
    }

    /// Appends every candidate, or none of them.
    ///
    /// Each candidate must be an object with string `text` and `category`.
    /// Integer ids that are not taken yet are kept; everything else gets a fresh
    /// id. Missing timestamps become "now".
    pub fn import_many(&mut self, candidates: &[Value]) -> Result<usize> {
        let parsed = parse_candidates(candidates)?;
        let imported = self.materialize(parsed, now_millis());
        let count = imported.len();

        let mut next = self.quotes.clone();
        next.extend(imported);
        self.commit(next)?;
        info!("Imported {} quotes", count);
        Ok(count)
    }

    /// Pretty-printed JSON snapshot of every quote, two-space indented.
    pub fn export_all(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.quotes)?)
    }

    /// Quotes in `category`, or every quote when `category` is `None` or empty.
    pub fn filter_by_category<'a>(
        &'a self,
        category: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Quote> + 'a {
        let wanted = category.filter(|c| !c.is_empty());
        self.quotes
            .iter()
            .filter(move |quote| wanted.is_none_or(|c| quote.category == c))
    }

    /// Distinct categories, sorted ascending.
    pub fn list_categories(&self) -> Vec<String> {
        self.quotes
            .iter()
            .map(|quote| quote.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// A uniformly chosen quote, or `None` when the store is empty.
    pub fn random_quote(&self) -> Option<&Quote> {
        self.quotes.choose(&mut rand::rng())
    }

    /// Remembers the category filter; `None` or empty clears it.
    pub fn select_category(&mut self, category: Option<&str>) -> Result<()> {
        match category.filter(|c| !c.is_empty()) {
            Some(category) => self.storage.set(SELECTED_CATEGORY_KEY, category),
            None => self.storage.remove(SELECTED_CATEGORY_KEY),
        }
    }

    /// The remembered category filter, if any.
    pub fn selected_category(&self) -> Result<Option<String>> {
        self.storage.get(SELECTED_CATEGORY_KEY)
    }

    /// The remembered category filter, if quotes in that category still exist.
    pub fn restored_category(&self) -> Result<Option<String>> {
        Ok(self
            .selected_category()?
            .filter(|saved| self.quotes.iter().any(|quote| &quote.category == saved)))
    }

    /// Boundary used to decide whether a record changed since the last sync.
    pub fn sync_cursor(&self) -> i64 {
        self.sync_cursor
    }

    /// Moves the sync cursor and persists it.
    pub fn set_sync_cursor(&mut self, timestamp: i64) -> Result<()> {
        self.storage.set(LAST_SYNC_KEY, &timestamp.to_string())?;
        self.sync_cursor = timestamp;
        Ok(())
    }

    pub fn get(&self, id: i64) -> Option<&Quote> {
        self.quotes.iter().find(|quote| quote.id == id)
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Appends a remote record in memory only. The caller guarantees the id is free.
    pub(crate) fn push_remote(&mut self, quote: Quote) {
        self.quotes.push(quote);
    }

    /// Overwrites the record with the same id in memory only.
    ///
    /// Returns `false` when no such record exists.
    pub(crate) fn replace(&mut self, quote: Quote) -> bool {
        match self.quotes.iter_mut().find(|q| q.id == quote.id) {
            Some(slot) => {
                *slot = quote;
                true
            }
            None => false,
        }
    }

    /// Writes the current sequence to storage.
    ///
    /// On failure the in-memory sequence is rolled back to the last one storage
    /// accepted, discarding every unpersisted merge.
    pub fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.quotes)?;
        match self.storage.set(QUOTES_KEY, &json) {
            Ok(()) => {
                self.persisted = self.quotes.clone();
                Ok(())
            }
            Err(e) => {
                self.quotes = self.persisted.clone();
                Err(e)
            }
        }
    }

    /// An id not used by any stored quote nor handed out before.
    ///
    /// Ids are time based but strictly increasing, so rapid calls never collide.
    pub fn fresh_id(&mut self) -> i64 {
        let used: HashSet<i64> = self.quotes.iter().map(|quote| quote.id).collect();
        self.next_id(&used)
    }

    fn next_id(&mut self, used: &HashSet<i64>) -> i64 {
        let highest = used
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.last_issued_id);
        match highest.checked_add(1) {
            Some(next) => {
                let id = now_millis().max(next);
                self.last_issued_id = id;
                id
            }
            // Nothing left above the highest id: take the lowest free one.
            None => (1..=i64::MAX).find(|id| !used.contains(id)).unwrap_or(0),
        }
    }

    fn commit(&mut self, next: Vec<Quote>) -> Result<()> {
        let json = serde_json::to_string(&next)?;
        self.storage.set(QUOTES_KEY, &json)?;
        self.persisted = next.clone();
        self.quotes = next;
        Ok(())
    }

    /// Turns validated candidates into quotes whose ids are unique across the
    /// store and the batch itself.
    fn materialize(&mut self, candidates: Vec<Candidate>, now: i64) -> Vec<Quote> {
        let mut used: HashSet<i64> = self.quotes.iter().map(|quote| quote.id).collect();
        let kept: Vec<Option<i64>> = candidates
            .iter()
            .map(|candidate| candidate.id.filter(|id| used.insert(*id)))
            .collect();

        let mut quotes = Vec::with_capacity(candidates.len());
        for (candidate, id) in candidates.into_iter().zip(kept) {
            let id = match id {
                Some(id) => id,
                None => {
                    let id = self.next_id(&used);
                    used.insert(id);
                    id
                }
            };
            quotes.push(Quote {
                id,
                text: candidate.text,
                category: candidate.category,
                timestamp: candidate.timestamp.unwrap_or(now),
                origin_flag: candidate.origin_flag,
            });
        }
        quotes
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{quote, store_with};
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::storage::testing::SharedStorage;

    #[test]
    fn opens_with_defaults_when_storage_is_empty() {
        let store = QuoteStore::open(Box::new(MemoryStorage::new())).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.quotes().iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(store.list_categories(), vec!["Life", "Work"]);
    }

    #[test]
    fn add_trims_assigns_id_and_persists() {
        let storage = SharedStorage::default();
        let mut store = QuoteStore::open(Box::new(storage.clone())).unwrap();

        let added = store.add("  Be kind.  ", " Life ").unwrap();
        assert_eq!(added.text, "Be kind.");
        assert_eq!(added.category, "Life");
        assert!(store.quotes()[..3].iter().all(|q| q.id != added.id));
        assert_eq!(storage.stored_quotes(), store.quotes());
    }

    #[test]
    fn add_rejects_blank_input_and_leaves_store_unchanged() {
        let mut store = store_with(&[quote(1, "A", "Life", 100)], 50);
        let err = store.add("   ", "Life").unwrap_err();
        assert!(matches!(err, QuoteError::Validation(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failed_write_keeps_memory_and_storage_consistent() {
        let storage = SharedStorage::default();
        let mut store = QuoteStore::open(Box::new(storage.clone())).unwrap();
        store.add("first", "Life").unwrap();
        *storage.fail_writes.lock().unwrap() = true;

        assert!(store.add("second", "Life").is_err());
        assert_eq!(store.len(), 4);
        assert_eq!(storage.stored_quotes(), store.quotes());
    }

    #[test]
    fn failed_persist_rolls_back_unpersisted_merges() {
        let storage = SharedStorage::default();
        let mut store = storage.open_store(&[quote(1, "A", "Life", 100)], 50);
        store.push_remote(quote(2, "B", "Work", 200));
        *storage.fail_writes.lock().unwrap() = true;

        assert!(store.persist().is_err());
        assert_eq!(store.quotes(), &[quote(1, "A", "Life", 100)]);
        assert_eq!(storage.stored_quotes(), store.quotes());
    }

    #[test]
    fn fresh_ids_stay_unique_once_the_highest_id_is_taken() {
        let mut store = store_with(&[quote(1, "A", "Life", 100)], 50);
        store
            .import_json(&format!(
                r#"[{{"id":{},"text":"edge","category":"Life"}}]"#,
                i64::MAX
            ))
            .unwrap();
        let first = store.add("first", "Life").unwrap();
        let second = store.add("second", "Life").unwrap();

        let ids: HashSet<i64> = store.quotes().iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), store.len());
        assert!(first.id != i64::MAX && second.id != i64::MAX);

        store
            .import_json(r#"[{"text":"x","category":"Y"},{"text":"z","category":"Y"}]"#)
            .unwrap();
        let ids: HashSet<i64> = store.quotes().iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn import_rejects_whole_batch_on_one_bad_element() {
        let mut store = store_with(&[quote(1, "A", "Life", 100)], 50);
        let err = store
            .import_json(r#"[{"text":"X","category":"Y"},{"text":123,"category":"Z"}]"#)
            .unwrap_err();
        assert!(matches!(err, QuoteError::Format(_)));
        assert_eq!(store.quotes(), &[quote(1, "A", "Life", 100)]);
    }

    #[test]
    fn import_rejects_non_array_documents() {
        let mut store = store_with(&[], 0);
        for doc in [r#"{"text":"X","category":"Y"}"#, "not json", "[null]", "[[]]"] {
            assert!(matches!(store.import_json(doc), Err(QuoteError::Format(_))), "{doc}");
        }
        assert!(store.is_empty());
    }

    #[test]
    fn import_keeps_free_ids_and_reassigns_taken_ones() {
        let mut store = store_with(&[quote(1, "A", "Life", 100)], 50);
        let count = store
            .import_json(
                r#"[
                    {"id": 1, "text": "dup", "category": "Life", "timestamp": 5},
                    {"id": 9, "text": "free", "category": "Work"},
                    {"id": 9, "text": "dup in batch", "category": "Work"},
                    {"text": "no id", "category": "Work", "serverVersion": true}
                ]"#,
            )
            .unwrap();
        assert_eq!(count, 4);

        let ids: HashSet<i64> = store.quotes().iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), 5);
        assert_eq!(store.get(9).unwrap().text, "free");
        assert_eq!(store.get(1).unwrap().text, "A");
        let dup = store.quotes().iter().find(|q| q.text == "dup").unwrap();
        assert_eq!(dup.timestamp, 5);
        assert!(store.quotes().iter().find(|q| q.text == "no id").unwrap().origin_flag);
    }

    #[test]
    fn export_then_import_round_trips() {
        let mut source = store_with(&[], 0);
        let added = source.add("Simplicity is the ultimate sophistication.", "Design").unwrap();
        let exported = source.export_all().unwrap();
        assert!(exported.contains("\n  {\n    \"id\""));

        let mut fresh = store_with(&[], 0);
        fresh.import_json(&exported).unwrap();
        assert_eq!(fresh.quotes(), &[added]);
    }

    #[test]
    fn filter_without_category_returns_everything_in_order() {
        let quotes = [
            quote(3, "c", "Work", 1),
            quote(1, "a", "Life", 1),
            quote(2, "b", "Life", 1),
        ];
        let store = store_with(&quotes, 0);
        assert_eq!(store.filter_by_category(None).cloned().collect::<Vec<_>>(), quotes);
        assert_eq!(store.filter_by_category(Some("")).count(), 3);
        assert_eq!(
            store
                .filter_by_category(Some("Life"))
                .map(|q| q.id)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(store.filter_by_category(Some("Nope")).count(), 0);
    }

    #[test]
    fn categories_are_sorted_and_unique() {
        let store = store_with(
            &[
                quote(1, "a", "Work", 1),
                quote(2, "b", "Life", 1),
                quote(3, "c", "Work", 1),
                quote(4, "d", "Art", 1),
            ],
            0,
        );
        assert_eq!(store.list_categories(), vec!["Art", "Life", "Work"]);
    }

    #[test]
    fn random_quote_on_empty_store_is_none() {
        let store = store_with(&[], 0);
        assert!(store.random_quote().is_none());

        let single = store_with(&[quote(1, "a", "Life", 1)], 0);
        assert_eq!(single.random_quote().map(|q| q.id), Some(1));
    }

    #[test]
    fn selected_category_is_restored_only_if_still_present() {
        let mut store = store_with(&[quote(1, "a", "Life", 1)], 0);
        store.select_category(Some("Life")).unwrap();
        assert_eq!(store.restored_category().unwrap().as_deref(), Some("Life"));

        store.select_category(Some("Gone")).unwrap();
        assert_eq!(store.selected_category().unwrap().as_deref(), Some("Gone"));
        assert_eq!(store.restored_category().unwrap(), None);

        store.select_category(None).unwrap();
        assert_eq!(store.selected_category().unwrap(), None);
    }

    #[test]
    fn sync_cursor_persists_across_reopen() {
        let storage = SharedStorage::default();
        let mut store = QuoteStore::open(Box::new(storage.clone())).unwrap();
        store.set_sync_cursor(1234).unwrap();
        drop(store);

        let reopened = QuoteStore::open(Box::new(storage)).unwrap();
        assert_eq!(reopened.sync_cursor(), 1234);
    }

    #[test]
    fn fresh_ids_are_unique_under_rapid_calls() {
        let mut store = store_with(&[quote(i64::MAX / 2, "far future", "Life", 1)], 0);
        let ids: Vec<i64> = (0..100).map(|_| store.fresh_id()).collect();
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.iter().all(|id| *id > i64::MAX / 2));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn legacy_records_without_ids_load_with_fresh_ids() {
        let mut storage = MemoryStorage::new();
        storage
            .set(QUOTES_KEY, r#"[{"text":"old","category":"Life"},{"id":1,"text":"new","category":"Life","timestamp":3}]"#)
            .unwrap();
        let store = QuoteStore::open(Box::new(storage)).unwrap();
        assert_eq!(store.len(), 2);
        assert_ne!(store.quotes()[0].id, 1);
        assert_eq!(store.get(1).unwrap().text, "new");
    }
}

#[cfg(test)]
mod properties {
    use super::testing::{quote, store_with};
    use proptest::prelude::*;

    fn entries() -> impl Strategy<Value = Vec<(String, &'static str)>> {
        prop::collection::vec(
            (
                "[A-Za-z][A-Za-z .,']{0,24}",
                prop::sample::select(vec!["Life", "Work", "Art", "Love", "art"]),
            ),
            0..16,
        )
    }

    proptest! {
        #[test]
        fn added_quotes_survive_export_and_import(entries in entries()) {
            let mut source = store_with(&[], 0);
            for (text, category) in &entries {
                source.add(text, category).unwrap();
            }

            let mut target = store_with(&[], 0);
            let count = target.import_json(&source.export_all().unwrap()).unwrap();
            prop_assert_eq!(count, entries.len());
            prop_assert_eq!(target.quotes(), source.quotes());
        }

        #[test]
        fn unfiltered_view_is_the_whole_store_in_order(entries in entries()) {
            let quotes: Vec<_> = entries
                .iter()
                .enumerate()
                .map(|(i, (text, category))| quote((entries.len() - i) as i64 * 3, text, category, i as i64))
                .collect();
            let store = store_with(&quotes, 0);
            let view: Vec<_> = store.filter_by_category(None).cloned().collect();
            prop_assert_eq!(view, quotes);
        }

        #[test]
        fn categories_are_sorted_unique_and_complete(entries in entries()) {
            let quotes: Vec<_> = entries
                .iter()
                .enumerate()
                .map(|(i, (text, category))| quote(i as i64 + 1, text, category, 1))
                .collect();
            let categories = store_with(&quotes, 0).list_categories();

            prop_assert!(categories.windows(2).all(|w| w[0] < w[1]));
            for quote in &quotes {
                prop_assert!(categories.contains(&quote.category));
            }
            for category in &categories {
                prop_assert!(quotes.iter().any(|q| &q.category == category));
            }
        }
    }
}
