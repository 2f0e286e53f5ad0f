//! Arrays indexed by enum ordinals.
//!
//! [`EnumMap`] stores exactly one value per variant of a field-less enum in a
//! fixed-size array. Lookup is an array index, and enumeration visits every
//! variant in ordinal order.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A field-less enum whose variants map onto `0..COUNT`.
pub trait EnumIndex: Copy + Sized + 'static {
    /// Number of variants.
    const COUNT: usize;

    /// Ordinal of this variant, in `0..COUNT`.
    fn index(self) -> usize;

    /// Variant with the given ordinal, or `None` if `index >= COUNT`.
    fn from_index(index: usize) -> Option<Self>;
}

/// One `V` per variant of `E`, stored in a `[V; N]`.
///
/// `N` must equal `E::COUNT`; a mismatch fails to compile as soon as the map
/// is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMap<E, V, const N: usize> {
    values: [V; N],
    _key: PhantomData<E>,
}

impl<E: EnumIndex, V, const N: usize> EnumMap<E, V, N> {
    const LENGTH_MATCHES: () = assert!(N == E::COUNT, "EnumMap length differs from variant count");

    /// Build a map by evaluating `f` once per variant, in ordinal order.
    pub fn from_fn(mut f: impl FnMut(E) -> V) -> Self {
        let () = Self::LENGTH_MATCHES;
        let values = std::array::from_fn(|i| match E::from_index(i) {
            Some(key) => f(key),
            None => unreachable!("ordinal {i} has no variant"),
        });
        Self {
            values,
            _key: PhantomData,
        }
    }

    /// Number of entries (always `E::COUNT`).
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    /// Returns `true` for enums without variants.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Iterate over all variants, in ordinal order.
    pub fn keys(&self) -> impl Iterator<Item = E> {
        (0..N).filter_map(E::from_index)
    }

    /// Iterate over `(variant, value)` pairs, in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (E, &V)> {
        self.keys().zip(self.values.iter())
    }

    /// Mutably iterate over `(variant, value)` pairs, in ordinal order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (E, &mut V)> {
        (0..N).filter_map(E::from_index).zip(self.values.iter_mut())
    }

    /// All values, in ordinal order.
    #[must_use]
    pub fn values(&self) -> &[V] {
        &self.values
    }
}

impl<E: EnumIndex, V: Default, const N: usize> EnumMap<E, V, N> {
    /// Build a map holding `V::default()` for every variant.
    #[must_use]
    pub fn new() -> Self {
        Self::from_fn(|_| V::default())
    }

    /// Reset every value to `V::default()`.
    pub fn reset(&mut self) {
        for value in &mut self.values {
            *value = V::default();
        }
    }
}

impl<E: EnumIndex, V: Default, const N: usize> Default for EnumMap<E, V, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EnumIndex, V, const N: usize> Index<E> for EnumMap<E, V, N> {
    type Output = V;

    fn index(&self, key: E) -> &V {
        &self.values[key.index()]
    }
}

impl<E: EnumIndex, V, const N: usize> IndexMut<E> for EnumMap<E, V, N> {
    fn index_mut(&mut self, key: E) -> &mut V {
        &mut self.values[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Element {
        Fire,
        Ice,
        Poison,
    }

    impl EnumIndex for Element {
        const COUNT: usize = 3;

        fn index(self) -> usize {
            self as usize
        }

        fn from_index(index: usize) -> Option<Self> {
            match index {
                0 => Some(Self::Fire),
                1 => Some(Self::Ice),
                2 => Some(Self::Poison),
                _ => None,
            }
        }
    }

    type Resistances = EnumMap<Element, i32, { Element::COUNT }>;

    #[test]
    fn test_default_values() {
        let map = Resistances::new();
        assert_eq!(map.len(), 3);
        assert!(map.values().iter().all(|v| *v == 0));
    }

    #[test]
    fn test_index_and_index_mut() {
        let mut map = Resistances::new();
        map[Element::Ice] = 25;
        map[Element::Poison] -= 10;
        assert_eq!(map[Element::Fire], 0);
        assert_eq!(map[Element::Ice], 25);
        assert_eq!(map[Element::Poison], -10);
    }

    #[test]
    fn test_enumerates_every_variant_in_order() {
        let map = Resistances::from_fn(|e| e.index() as i32 * 10);
        let pairs: Vec<(Element, i32)> = map.iter().map(|(e, v)| (e, *v)).collect();
        assert_eq!(
            pairs,
            vec![(Element::Fire, 0), (Element::Ice, 10), (Element::Poison, 20)]
        );
    }

    #[test]
    fn test_iter_mut_and_reset() {
        let mut map = Resistances::new();
        for (element, value) in map.iter_mut() {
            *value = element.index() as i32 + 1;
        }
        assert_eq!(map.values(), &[1, 2, 3]);
        map.reset();
        assert_eq!(map.values(), &[0, 0, 0]);
    }
}
