//! Bit-per-document bitmap.

use bit_vec::BitVec;

/// A bitmap addressed by 1-based document or field IDs. Bit 0 is unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: BitVec,
}

impl Bitmap {
    /// Bitmap able to hold IDs `1..=max_id`, all clear.
    pub fn new(max_id: u32) -> Self {
        Bitmap {
            bits: BitVec::from_elem(max_id as usize + 1, false),
        }
    }

    /// Bitmap with the given IDs set. IDs above `max_id` grow the bitmap.
    pub fn from_ids<I>(max_id: u32, ids: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut bitmap = Bitmap::new(max_id);
        for id in ids {
            bitmap.set(id);
        }
        bitmap
    }

    pub fn set(&mut self, id: u32) {
        let index = id as usize;
        if index >= self.bits.len() {
            self.bits.grow(index + 1 - self.bits.len(), false);
        }
        self.bits.set(index, true);
    }

    pub fn contains(&self, id: u32) -> bool {
        self.bits.get(id as usize).unwrap_or(false)
    }

    /// `self |= other`.
    pub fn union_with(&mut self, other: &Bitmap) {
        self.equalize(other.bits.len());
        let mut other_bits = other.bits.clone();
        other_bits.grow(self.bits.len() - other_bits.len(), false);
        self.bits.or(&other_bits);
    }

    /// `self &= other`.
    pub fn intersect_with(&mut self, other: &Bitmap) {
        self.equalize(other.bits.len());
        let mut other_bits = other.bits.clone();
        other_bits.grow(self.bits.len() - other_bits.len(), false);
        self.bits.and(&other_bits);
    }

    fn equalize(&mut self, len: usize) {
        if self.bits.len() < len {
            self.bits.grow(len - self.bits.len(), false);
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| *b).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.none()
    }

    /// Set IDs in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, set)| *set)
            .map(|(index, _)| index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_grow() {
        let mut bitmap = Bitmap::new(4);
        bitmap.set(2);
        bitmap.set(10);
        assert!(bitmap.contains(2));
        assert!(bitmap.contains(10));
        assert!(!bitmap.contains(3));
        assert!(!bitmap.contains(1000));
        assert_eq!(bitmap.ids().collect::<Vec<_>>(), vec![2, 10]);
    }

    #[test]
    fn test_union_and_intersection_of_different_sizes() {
        let mut a = Bitmap::from_ids(4, [1, 2]);
        let b = Bitmap::from_ids(8, [2, 7]);

        let mut union = a.clone();
        union.union_with(&b);
        assert_eq!(union.ids().collect::<Vec<_>>(), vec![1, 2, 7]);

        a.intersect_with(&b);
        assert_eq!(a.ids().collect::<Vec<_>>(), vec![2]);
        assert_eq!(a.count(), 1);
    }
}
