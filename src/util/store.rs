// Copyright (c) 2024 Mike Tsao

use crate::{orchestration::CompositionRecord, prelude::*};
use anyhow::anyhow;
use derivative::Derivative;
use rustc_hash::FxHashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A summary of one stored composition, for listing.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredCompositionInfo {
    #[allow(missing_docs)]
    pub id: String,
    #[allow(missing_docs)]
    pub title: String,
    #[allow(missing_docs)]
    pub created_at: Option<String>,
    #[allow(missing_docs)]
    pub updated_at: Option<String>,
}

/// [InMemoryCompositionStore] keeps compositions in a table for the life of
/// the process. It's the store for headless sessions and tests; a browser or
/// desktop front end provides its own [CompositionStore].
///
/// Once the store holds `max_compositions` entries, saving a new one first
/// evicts the least recently saved tenth (at least one).
#[derive(Debug, Derivative)]
#[derivative(Default)]
pub struct InMemoryCompositionStore {
    compositions: FxHashMap<String, CompositionRecord>,

    // Least recently saved first.
    save_order: Vec<String>,

    autosaved: Option<CompositionRecord>,

    #[derivative(Default(value = "50"))]
    max_compositions: usize,
    next_id: usize,
}
impl CompositionStore for InMemoryCompositionStore {
    fn save(&mut self, record: &mut CompositionRecord) -> anyhow::Result<String> {
        let id = match &record.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => {
                self.next_id += 1;
                format!("composition-{}", self.next_id)
            }
        };
        if !self.compositions.contains_key(&id) {
            self.ensure_space();
        }
        let now = Self::timestamp();
        record.id = Some(id.clone());
        if record.created_at.is_none() {
            record.created_at = Some(now.clone());
        }
        record.updated_at = Some(now);

        self.save_order.retain(|i| *i != id);
        self.save_order.push(id.clone());
        self.compositions.insert(id.clone(), record.clone());
        log::debug!("stored composition {id} '{}'", record.title);
        Ok(id)
    }

    fn load(&self, id: &str) -> anyhow::Result<CompositionRecord> {
        self.compositions
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("no composition with id {id}"))
    }

    fn autosave(&mut self, record: &CompositionRecord) -> anyhow::Result<()> {
        let mut record = record.clone();
        record.updated_at = Some(Self::timestamp());
        self.autosaved = Some(record);
        Ok(())
    }

    fn load_autosave(&self) -> anyhow::Result<Option<CompositionRecord>> {
        Ok(self.autosaved.clone())
    }
}
impl InMemoryCompositionStore {
    /// Creates a store that keeps at most `max_compositions` compositions.
    pub fn new_with(max_compositions: usize) -> Self {
        Self {
            max_compositions: max_compositions.max(1),
            ..Default::default()
        }
    }

    /// Removes a composition. Removing one that isn't there is an error.
    pub fn delete(&mut self, id: &str) -> anyhow::Result<()> {
        if self.compositions.remove(id).is_some() {
            self.save_order.retain(|i| i != id);
            Ok(())
        } else {
            Err(anyhow!("no composition with id {id}"))
        }
    }

    /// Every stored composition, most recently saved first.
    pub fn list(&self) -> Vec<StoredCompositionInfo> {
        self.save_order
            .iter()
            .rev()
            .filter_map(|id| self.compositions.get(id))
            .map(|r| StoredCompositionInfo {
                id: r.id.clone().unwrap_or_default(),
                title: r.title.clone(),
                created_at: r.created_at.clone(),
                updated_at: r.updated_at.clone(),
            })
            .collect()
    }

    /// The contents of the auto-save slot.
    pub fn autosaved(&self) -> Option<&CompositionRecord> {
        self.autosaved.as_ref()
    }

    #[allow(missing_docs)]
    pub fn clear_autosave(&mut self) {
        self.autosaved = None;
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.compositions.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.compositions.is_empty()
    }

    fn ensure_space(&mut self) {
        if self.compositions.len() < self.max_compositions {
            return;
        }
        let count = self.compositions.len().div_ceil(10).max(1);
        let evicted: Vec<String> = self.save_order.drain(..count).collect();
        for id in evicted {
            log::info!("evicting composition {id} to make room");
            self.compositions.remove(&id);
        }
    }

    // Milliseconds since the Unix epoch.
    fn timestamp() -> String {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
            .to_string()
    }
}
