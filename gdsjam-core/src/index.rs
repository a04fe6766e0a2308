use hashbrown::{HashMap, HashSet};
use gdsjam_model::BoundingBox;
use smallvec::SmallVec;

/// Opaque identifier assigned by the caller at insert time (spec.md §4.1
/// calls this `id`); the index never interprets it.
pub type ItemId = u32;

/// An item plus its attached payload, as returned by [`SpatialIndex::query`].
#[derive(Debug, Clone)]
pub struct IndexedItem<P> {
    pub id: ItemId,
    pub bbox: BoundingBox,
    pub payload: P,
}

/// A bounding-box spatial index over rendered tiles (C1).
///
/// Backed by a uniform grid of buckets rather than a literal R-tree: each
/// item is filed into every bucket its bbox overlaps, and `query` visits the
/// buckets overlapping the query window. This satisfies the spec's actual
/// contract — `query` returns a superset of the truly visible items, with no
/// false negatives and no ordering guarantee — without the complexity of a
/// balanced tree, and the cost of a slightly larger superset for very large
/// items is acceptable since culling itself is approximate by design.
pub struct SpatialIndex<P> {
    cell_size: f64,
    cells: HashMap<(i32, i32), SmallVec<[usize; 8]>>,
    slots: Vec<Option<IndexedItem<P>>>,
}

fn cell_coord(value: f64, cell_size: f64) -> i32 {
    debug_assert!(cell_size > 0.0, "spatial index cell_size must be positive");
    let t = (value / cell_size).floor();
    if t >= f64::from(i32::MAX) {
        i32::MAX
    } else if t <= f64::from(i32::MIN) {
        i32::MIN
    } else {
        t as i32
    }
}

impl<P> SpatialIndex<P> {
    /// Builds an empty index bucketing space into `cell_size`-wide squares.
    /// A reasonable default matches C5's tile size, so a tile's bbox rarely
    /// spans more than a handful of buckets.
    pub fn new(cell_size: f64) -> Self {
        Self { cell_size, cells: HashMap::new(), slots: Vec::new() }
    }

    fn covered_cells(&self, bbox: &BoundingBox) -> SmallVec<[(i32, i32); 4]> {
        let (x0, x1) = (cell_coord(bbox.min_x, self.cell_size), cell_coord(bbox.max_x, self.cell_size));
        let (y0, y1) = (cell_coord(bbox.min_y, self.cell_size), cell_coord(bbox.max_y, self.cell_size));
        let mut out = SmallVec::new();
        for x in x0..=x1 {
            for y in y0..=y1 {
                out.push((x, y));
            }
        }
        out
    }

    /// Inserts an item. Does not deduplicate on `id` — callers are expected
    /// to `clear` between full rebuilds (see [`crate::renderer`]'s
    /// incremental re-render, which constructs a fresh index rather than
    /// mutating the old one).
    pub fn insert(&mut self, id: ItemId, bbox: BoundingBox, payload: P) {
        let slot = self.slots.len();
        for cell in self.covered_cells(&bbox) {
            self.cells.entry(cell).or_default().push(slot);
        }
        self.slots.push(Some(IndexedItem { id, bbox, payload }));
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns every inserted item whose bbox intersects `window` — a
    /// superset of the truly visible items (false positives are permitted,
    /// false negatives are not), in unspecified order.
    pub fn query(&self, window: BoundingBox) -> Vec<&IndexedItem<P>> {
        let mut seen: HashSet<usize> = HashSet::new();
        let mut out = Vec::new();
        for cell in self.covered_cells(&window) {
            let Some(slots) = self.cells.get(&cell) else { continue };
            for &slot in slots {
                if !seen.insert(slot) {
                    continue;
                }
                if let Some(item) = &self.slots[slot] {
                    if item.bbox.intersects(&window) {
                        out.push(item);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn query_finds_overlapping_item() {
        let mut index = SpatialIndex::new(40.0);
        index.insert(0, BoundingBox::new(0.0, 0.0, 10.0, 10.0), "tile-a");
        index.insert(1, BoundingBox::new(100.0, 100.0, 110.0, 110.0), "tile-b");

        let hits = index.query(BoundingBox::new(0.0, 0.0, 40.0, 40.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);
    }

    #[test]
    fn clear_empties_the_index() {
        let mut index = SpatialIndex::new(40.0);
        index.insert(0, BoundingBox::new(0.0, 0.0, 10.0, 10.0), ());
        index.clear();
        assert!(index.query(BoundingBox::new(-1000.0, -1000.0, 1000.0, 1000.0)).is_empty());
    }

    #[test]
    fn item_spanning_many_buckets_is_found_once() {
        let mut index = SpatialIndex::new(5.0);
        index.insert(0, BoundingBox::new(0.0, 0.0, 20.0, 20.0), ());
        let hits = index.query(BoundingBox::new(2.0, 2.0, 18.0, 18.0));
        assert_eq!(hits.len(), 1);
    }

    proptest! {
        #[test]
        fn query_never_misses_an_overlapping_item(
            ax in -200.0..200.0f64, ay in -200.0..200.0f64, aw in 0.0..80.0f64, ah in 0.0..80.0f64,
            wx in -200.0..200.0f64, wy in -200.0..200.0f64, ww in 0.0..80.0f64, wh in 0.0..80.0f64,
        ) {
            let bbox = BoundingBox::new(ax, ay, ax + aw, ay + ah);
            let window = BoundingBox::new(wx, wy, wx + ww, wy + wh);

            let mut index = SpatialIndex::new(16.0);
            index.insert(0, bbox, ());

            let hits = index.query(window);
            let should_hit = bbox.intersects(&window);
            prop_assert_eq!(!hits.is_empty(), should_hit);
        }
    }
}
