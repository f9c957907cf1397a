use crate::group::ElementModQ;
use crate::hash::HashItem;
use crate::hash_elems;

/// A deterministic stream of nonces derived from a single seed.
///
/// `get(i)` is `H(seed, i)`. Every `get*` call moves the cursor to `i + 1`, and `next()`
/// reads at the cursor. The cursor saturates at `u64::MAX` instead of wrapping. A `Nonces` belongs to exactly one encryption flow; concurrent
/// flows derive their own instances from distinct seeds.
#[derive(Clone, Debug)]
pub struct Nonces {
    seed: ElementModQ,
    cursor: u64,
}

impl Nonces {
    pub fn new(seed: ElementModQ) -> Self {
        Nonces { seed, cursor: 0 }
    }

    /// Start a stream whose seed is `H(seed, header)`
    pub fn with_header<'a, H>(seed: &ElementModQ, header: H) -> Self
    where
        H: Into<HashItem<'a>>,
    {
        let header: HashItem<'a> = header.into();
        Nonces::new(hash_elems!(seed, header))
    }

    pub fn seed(&self) -> &ElementModQ {
        &self.seed
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn get(&mut self, index: u64) -> ElementModQ {
        self.cursor = index.saturating_add(1);
        hash_elems!(&self.seed, index)
    }

    /// `H(seed, index, header)`
    pub fn get_with_header<'a, H>(&mut self, index: u64, header: H) -> ElementModQ
    where
        H: Into<HashItem<'a>>,
    {
        let header: HashItem<'a> = header.into();
        self.cursor = index.saturating_add(1);
        hash_elems!(&self.seed, index, header)
    }

    /// Nonces `start..start + count`, in order, stopping short at `u64::MAX`
    pub fn get_range(&mut self, start: u64, count: u64) -> Vec<ElementModQ> {
        (start..start.saturating_add(count)).map(|i| self.get(i)).collect()
    }

    pub fn next(&mut self) -> ElementModQ {
        self.get(self.cursor)
    }
}
