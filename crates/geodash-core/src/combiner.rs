//! # Parameter Combiner
//!
//! Turns a generator method's declared input kinds and a selection of
//! candidate inputs into the argument tuples the method is invoked with.
//!
//! - Non-sequential: every unordered k-combination without repetition
//! - Sequential: every contiguous window of k elements, in collection order
//! - k = 0: exactly one empty tuple
//!
//! Methods with mixed input kinds combine each kind separately and join the
//! groups by cartesian product.

use crate::collection::Collection;
use crate::types::{GeometryKind, NodeId};

/// Enumerates argument tuples for generator methods.
///
/// Every enumeration is lazy: tuples are produced one at a time so callers
/// can stop as soon as they have seen enough.
pub struct ParameterCombiner;

/// Index tuples over `0..len`, either unordered `k`-combinations in
/// lexicographic order or contiguous windows of `k`.
#[derive(Debug, Clone)]
pub struct IndexTuples {
    len: usize,
    k: usize,
    sequential: bool,
    next: Option<Vec<usize>>,
}

impl IndexTuples {
    fn new(len: usize, k: usize, sequential: bool) -> Self {
        let next = (k <= len).then(|| (0..k).collect());
        Self {
            len,
            k,
            sequential,
            next,
        }
    }

    fn advance(&self, current: &[usize]) -> Option<Vec<usize>> {
        let k = self.k;
        if k == 0 {
            return None;
        }
        let mut indices = current.to_vec();
        if self.sequential {
            if indices[k - 1] + 1 >= self.len {
                return None;
            }
            for index in &mut indices {
                *index += 1;
            }
            return Some(indices);
        }

        // Rightmost slot that can still advance.
        let slot = (0..k).rev().find(|&i| indices[i] < self.len - k + i)?;
        indices[slot] += 1;
        for i in slot + 1..k {
            indices[i] = indices[i - 1] + 1;
        }
        Some(indices)
    }
}

impl Iterator for IndexTuples {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = self.advance(&current);
        Some(current)
    }
}

/// One kind's share of a typed method's slots.
struct SlotGroup<'a> {
    kind: GeometryKind,
    items: &'a [NodeId],
    count: usize,
    sequential: bool,
    tuples: IndexTuples,
    current: Vec<usize>,
}

impl SlotGroup<'_> {
    /// Step to the next tuple of this group; on exhaustion rewind to the
    /// first and report the carry.
    fn step(&mut self) -> bool {
        if let Some(next) = self.tuples.next() {
            self.current = next;
            return false;
        }
        self.tuples = IndexTuples::new(self.items.len(), self.count, self.sequential);
        if let Some(first) = self.tuples.next() {
            self.current = first;
        }
        true
    }
}

/// Argument tuples of a typed method, produced by a mixed-radix walk over
/// the per-kind groups (last group fastest).
pub struct TypedTuples<'a> {
    inputs: &'a [GeometryKind],
    groups: Vec<SlotGroup<'a>>,
    done: bool,
}

impl Iterator for TypedTuples<'_> {
    type Item = Vec<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut taken = vec![0usize; self.groups.len()];
        let mut tuple = Vec::with_capacity(self.inputs.len());
        for kind in self.inputs {
            let Some(index) = self.groups.iter().position(|g| g.kind == *kind) else {
                continue;
            };
            let group = &self.groups[index];
            tuple.push(group.items[group.current[taken[index]]]);
            taken[index] += 1;
        }

        self.done = true;
        for group in self.groups.iter_mut().rev() {
            if !group.step() {
                self.done = false;
                break;
            }
        }
        Some(tuple)
    }
}

impl ParameterCombiner {
    /// Index tuples of every unordered `k`-combination of `0..len`, in
    /// lexicographic order.
    #[must_use]
    pub fn combinations(len: usize, k: usize) -> IndexTuples {
        IndexTuples::new(len, k, false)
    }

    /// Index tuples of every contiguous window of `k` over `0..len`.
    #[must_use]
    pub fn windows(len: usize, k: usize) -> IndexTuples {
        IndexTuples::new(len, k, true)
    }

    /// Tuples of `items` of size `k`.
    pub fn combine<T: Copy>(
        items: &[T],
        k: usize,
        sequential: bool,
    ) -> impl Iterator<Item = Vec<T>> + '_ {
        IndexTuples::new(items.len(), k, sequential)
            .map(|tuple| tuple.into_iter().map(|i| items[i]).collect())
    }

    /// Argument tuples for a method taking `inputs`, drawn from `selection`.
    ///
    /// Slots are grouped by kind; each group is combined over that kind's
    /// nodes, groups are joined by cartesian product, and every tuple is laid
    /// out in the method's slot order.
    pub fn combine_typed<'a>(
        selection: &'a Collection,
        inputs: &'a [GeometryKind],
        sequential: bool,
    ) -> TypedTuples<'a> {
        // Distinct kinds in order of first appearance, with their multiplicity.
        let mut counts: Vec<(GeometryKind, usize)> = Vec::new();
        for kind in inputs {
            match counts.iter_mut().find(|(k, _)| k == kind) {
                Some((_, count)) => *count += 1,
                None => counts.push((*kind, 1)),
            }
        }

        let mut done = false;
        let mut groups = Vec::with_capacity(counts.len());
        for (kind, count) in counts {
            let items = selection.of_kind(kind);
            let mut tuples = IndexTuples::new(items.len(), count, sequential);
            let Some(current) = tuples.next() else {
                done = true;
                continue;
            };
            groups.push(SlotGroup {
                kind,
                items,
                count,
                sequential,
                tuples,
                current,
            });
        }

        TypedTuples {
            inputs,
            groups,
            done,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
