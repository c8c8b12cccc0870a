//! The available instrument set and navigation over it.
//!
//! The set comes from the SoundFont's presets at startup and never changes
//! during a session. Selection always resolves to a member: unknown ids
//! fall back to the lowest available program, and delta navigation wraps
//! around the sorted id list in both directions.

use std::collections::BTreeMap;

/// Instruments available for the session, keyed by program number.
#[derive(Debug, Clone, Default)]
pub struct InstrumentSet {
    names: BTreeMap<u8, String>,
}

impl InstrumentSet {
    /// An empty set; the engine stays inert with one of these.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the set from (program, name) pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u8, String)>,
    {
        Self {
            names: entries.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether `id` is a selectable program.
    pub fn contains(&self, id: u8) -> bool {
        self.names.contains_key(&id)
    }

    /// Display name for a program, if available.
    pub fn name(&self, id: u8) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// The lowest available program id.
    pub fn first_id(&self) -> Option<u8> {
        self.names.keys().next().copied()
    }

    /// Resolves a requested id to a member of the set.
    ///
    /// Unknown ids deterministically become the lowest available id.
    /// Returns None only when the set is empty.
    pub fn resolve(&self, id: u8) -> Option<u8> {
        if self.contains(id) {
            Some(id)
        } else {
            self.first_id()
        }
    }

    /// Steps `delta` places from `current` through the sorted id list,
    /// wrapping at both ends.
    ///
    /// A `current` that is not in the set lands on the first id, whatever
    /// the delta. Returns None only when the set is empty.
    pub fn step_from(&self, current: u8, delta: i32) -> Option<u8> {
        let ids: Vec<u8> = self.names.keys().copied().collect();
        if ids.is_empty() {
            return None;
        }
        let next = match ids.iter().position(|&id| id == current) {
            Some(index) => (index as i64 + delta as i64).rem_euclid(ids.len() as i64) as usize,
            None => 0,
        };
        Some(ids[next])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> InstrumentSet {
        InstrumentSet::from_entries([
            (0, "Grand Piano".to_string()),
            (19, "Church Organ".to_string()),
            (40, "Violin".to_string()),
            (56, "Trumpet".to_string()),
        ])
    }

    #[test]
    fn test_step_wraps_forward() {
        let set = sample_set();
        assert_eq!(set.step_from(0, 1), Some(19));
        assert_eq!(set.step_from(56, 1), Some(0));
    }

    #[test]
    fn test_step_wraps_backward() {
        let set = sample_set();
        assert_eq!(set.step_from(0, -1), Some(56));
        assert_eq!(set.step_from(40, -1), Some(19));
    }

    #[test]
    fn test_step_with_larger_delta() {
        let set = sample_set();
        assert_eq!(set.step_from(0, 5), Some(19));
        assert_eq!(set.step_from(0, -4), Some(0));
    }

    #[test]
    fn test_step_from_unknown_lands_on_first() {
        let set = sample_set();
        assert_eq!(set.step_from(99, 1), Some(0));
        assert_eq!(set.step_from(99, -1), Some(0));
    }

    #[test]
    fn test_resolve_unknown_id() {
        let set = sample_set();
        assert_eq!(set.resolve(40), Some(40));
        assert_eq!(set.resolve(41), Some(0));
    }

    #[test]
    fn test_empty_set() {
        let set = InstrumentSet::empty();
        assert_eq!(set.resolve(0), None);
        assert_eq!(set.step_from(0, 1), None);
        assert_eq!(set.first_id(), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_names() {
        let set = sample_set();
        assert_eq!(set.name(19), Some("Church Organ"));
        assert_eq!(set.name(1), None);
        assert_eq!(set.len(), 4);
    }
}
