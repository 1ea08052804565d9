//! Shared reference store with immutable snapshots.

use std::sync::{Arc, PoisonError, RwLock};

use piece_match_core::{ReferenceDescriptor, ReferenceId};

/// Immutable view of the references at one generation.
///
/// Cheap to clone; frames hold a snapshot for their whole run so they never
/// observe a partially updated list.
#[derive(Clone, Debug)]
pub struct ReferenceSnapshot {
    references: Arc<[ReferenceDescriptor]>,
    generation: u64,
}

impl ReferenceSnapshot {
    /// Snapshot not tied to any [`ReferenceSet`] (generation 0).
    pub fn from_references(references: Vec<ReferenceDescriptor>) -> Self {
        Self {
            references: references.into(),
            generation: 0,
        }
    }

    #[inline]
    pub fn references(&self) -> &[ReferenceDescriptor] {
        &self.references
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Reference store shared between capture and the frame loop.
///
/// Every mutation swaps in a new snapshot and bumps the generation.
#[derive(Debug)]
pub struct ReferenceSet {
    current: RwLock<ReferenceSnapshot>,
}

impl Default for ReferenceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(ReferenceSnapshot {
                references: Arc::from(Vec::new()),
                generation: 0,
            }),
        }
    }

    /// Current references; never blocks on readers.
    pub fn snapshot(&self) -> ReferenceSnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn update<F>(&self, f: F) -> u64
    where
        F: FnOnce(&mut Vec<ReferenceDescriptor>),
    {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = current.references.to_vec();
        f(&mut next);
        *current = ReferenceSnapshot {
            references: next.into(),
            generation: current.generation + 1,
        };
        current.generation
    }

    /// Append references; returns the new generation.
    pub fn extend<I>(&self, references: I) -> u64
    where
        I: IntoIterator<Item = ReferenceDescriptor>,
    {
        self.update(|list| list.extend(references))
    }

    pub fn add(&self, reference: ReferenceDescriptor) -> u64 {
        self.extend(std::iter::once(reference))
    }

    /// Remove the reference with `id`; returns whether one was removed.
    ///
    /// An unknown id leaves the snapshot and its generation untouched.
    pub fn remove(&self, id: ReferenceId) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if !current.references.iter().any(|r| r.id() == id) {
            return false;
        }
        let next: Vec<ReferenceDescriptor> = current
            .references
            .iter()
            .filter(|r| r.id() != id)
            .cloned()
            .collect();
        *current = ReferenceSnapshot {
            references: next.into(),
            generation: current.generation + 1,
        };
        true
    }

    /// Drop every reference; returns the new generation.
    pub fn clear(&self) -> u64 {
        self.update(Vec::clear)
    }

    /// Replace the whole list; returns the new generation.
    pub fn replace(&self, references: Vec<ReferenceDescriptor>) -> u64 {
        self.update(|list| *list = references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece_match_core::{ColorSample, NormRect, RgbaImage, ShapeSignature, VisualEmbedding};

    fn reference() -> ReferenceDescriptor {
        ReferenceDescriptor::new(
            ShapeSignature::DEGENERATE,
            ColorSample::neutral_grey(),
            vec![VisualEmbedding::new(vec![0.0; 4])],
            NormRect::UNIT,
            RgbaImage::default(),
        )
        .expect("descriptor")
    }

    #[test]
    fn mutations_bump_generation() {
        let set = ReferenceSet::new();
        assert_eq!(set.generation(), 0);
        let a = reference();
        let id = a.id();
        assert_eq!(set.add(a), 1);
        assert_eq!(set.extend([reference(), reference()]), 2);
        assert_eq!(set.len(), 3);
        assert!(set.remove(id));
        assert_eq!(set.generation(), 3);
        assert_eq!(set.clear(), 4);
        assert!(set.is_empty());
    }

    #[test]
    fn snapshots_are_not_affected_by_later_mutations() {
        let set = ReferenceSet::new();
        set.add(reference());
        let snap = set.snapshot();
        set.add(reference());
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.generation(), 1);
        assert_eq!(set.snapshot().len(), 2);
    }

    #[test]
    fn removing_unknown_id_keeps_the_generation() {
        let set = ReferenceSet::new();
        set.add(reference());
        let before = set.snapshot();
        assert!(!set.remove(ReferenceId(u64::MAX)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.generation(), before.generation());
        let report = crate::FrameReport {
            request_id: 0,
            generation: before.generation(),
            candidates: Vec::new(),
        };
        assert!(report.is_current(&set));
    }
}
