//! Deterministic, order-sensitive hashing of heterogeneous sequences.
//!
//! Every item is rendered to a canonical string (hex for group elements, decimal for
//! integers, the hex of a recursive hash for nested hashables and sequences) and fed to a
//! streaming SHA-256 context, each followed by a `|` delimiter. The digest is reduced
//! into an [`ElementModQ`].
//!
//! Items that render to an empty string are hashed as the literal `null`. This includes
//! the integer `0`, so `hash_elems!(0u64) == hash_elems!(HashItem::Null)`.

use crate::group::{q, ElementModP, ElementModQ};
use digest::Digest;
use num_bigint::BigUint;
use sha2::Sha256;
use std::borrow::Cow;

const DELIMITER: &[u8] = b"|";
const NULL: &str = "null";

/// A type that commits to its contents with a single hash
pub trait CryptoHashable {
    fn crypto_hash(&self) -> ElementModQ;
}

/// One input to [`hash_items`]
pub enum HashItem<'a> {
    Null,
    Text(Cow<'a, str>),
    Int(u64),
    P(&'a ElementModP),
    Q(&'a ElementModQ),
    Hashable(&'a dyn CryptoHashable),
    Seq(Vec<HashItem<'a>>),
}

impl<'a> HashItem<'a> {
    /// Build a nested sequence, hashed on its own and included by its hex digest
    pub fn seq<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<HashItem<'a>>,
    {
        HashItem::Seq(items.into_iter().map(Into::into).collect())
    }

    fn render(&self) -> String {
        let rendered = match self {
            HashItem::Null => String::new(),
            HashItem::Text(text) => text.to_string(),
            // Zero renders empty and is therefore indistinguishable from null
            HashItem::Int(0) => String::new(),
            HashItem::Int(i) => i.to_string(),
            HashItem::P(elem) => elem.to_hex(),
            HashItem::Q(elem) => elem.to_hex(),
            HashItem::Hashable(hashable) => hashable.crypto_hash().to_hex(),
            HashItem::Seq(items) => hash_items(items).to_hex(),
        };

        if rendered.is_empty() {
            NULL.to_owned()
        } else {
            rendered
        }
    }
}

impl<'a> From<&'a ElementModP> for HashItem<'a> {
    fn from(elem: &'a ElementModP) -> Self {
        HashItem::P(elem)
    }
}

impl<'a> From<&'a ElementModQ> for HashItem<'a> {
    fn from(elem: &'a ElementModQ) -> Self {
        HashItem::Q(elem)
    }
}

impl<'a> From<u64> for HashItem<'a> {
    fn from(i: u64) -> Self {
        HashItem::Int(i)
    }
}

impl<'a> From<&'a str> for HashItem<'a> {
    fn from(text: &'a str) -> Self {
        HashItem::Text(Cow::Borrowed(text))
    }
}

impl<'a> From<String> for HashItem<'a> {
    fn from(text: String) -> Self {
        HashItem::Text(Cow::Owned(text))
    }
}

impl<'a> From<&'a dyn CryptoHashable> for HashItem<'a> {
    fn from(hashable: &'a dyn CryptoHashable) -> Self {
        HashItem::Hashable(hashable)
    }
}

impl<'a> From<Vec<HashItem<'a>>> for HashItem<'a> {
    fn from(items: Vec<HashItem<'a>>) -> Self {
        HashItem::Seq(items)
    }
}

impl<'a, T> From<Option<T>> for HashItem<'a>
where
    T: Into<HashItem<'a>>,
{
    fn from(item: Option<T>) -> Self {
        match item {
            Some(item) => item.into(),
            None => HashItem::Null,
        }
    }
}

/// Hash a sequence of items into an `ElementModQ`.
///
/// The empty sequence hashes the same as a sequence holding only `null`.
pub fn hash_items(items: &[HashItem<'_>]) -> ElementModQ {
    let mut hasher = Sha256::new();
    hasher.update(DELIMITER);

    if items.is_empty() {
        hasher.update(NULL.as_bytes());
        hasher.update(DELIMITER);
    } else {
        for item in items {
            hasher.update(item.render().as_bytes());
            hasher.update(DELIMITER);
        }
    }

    let digest = hasher.finalize();
    ElementModQ::new_unchecked(BigUint::from_bytes_be(&digest) % q())
}

/// Hash any number of values convertible into [`HashItem`]
///
/// ```
/// use ballotguard::*;
///
/// let a = ElementModQ::from(1);
/// let b = ElementModQ::from(2);
/// assert_ne!(hash_elems!(&a, &b), hash_elems!(&b, &a));
/// ```
#[macro_export]
macro_rules! hash_elems {
    ($($item:expr),* $(,)?) => {
        $crate::hash_items(&[$($crate::HashItem::from($item)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::*;

    struct Pair(ElementModQ, ElementModQ);

    impl CryptoHashable for Pair {
        fn crypto_hash(&self) -> ElementModQ {
            hash_elems!(&self.0, &self.1)
        }
    }

    #[test]
    fn empty_input_hashes_as_null() {
        assert_eq!(hash_elems!(), hash_elems!("null"));
        assert_eq!(hash_elems!(), hash_elems!(HashItem::Null));
        assert_eq!(hash_elems!(), hash_items(&[]));
    }

    #[test]
    fn hash_is_order_sensitive() {
        let a = ElementModQ::from(1);
        let b = ElementModQ::from(2);
        assert_ne!(hash_elems!(&a, &b), hash_elems!(&b, &a));
        assert_ne!(hash_elems!("a", "b"), hash_elems!("b", "a"));
        assert_ne!(hash_elems!(1u64, 2u64), hash_elems!(2u64, 1u64));
    }

    #[test]
    fn hash_is_deterministic_and_in_range() {
        let p = g_pow_p(&ElementModQ::from(42));
        let first = hash_elems!(&p, "selection-1", 7u64);
        let second = hash_elems!(&p, "selection-1", 7u64);
        assert_eq!(first, second);
        assert!(first.is_in_bounds());
    }

    // Pins legacy behaviour: zero and the empty string are absorbed into "null"
    #[test]
    fn zero_is_hashed_as_null() {
        assert_eq!(hash_elems!(0u64), hash_elems!("null"));
        assert_eq!(hash_elems!(0u64), hash_elems!(""));
        assert_eq!(hash_elems!(0u64), hash_elems!(HashItem::Null));
        assert_eq!(hash_elems!(&ElementModQ::from(5), 0u64), hash_elems!(&ElementModQ::from(5), "null"));
        assert_ne!(hash_elems!(0u64), hash_elems!(1u64));

        // A zero-valued element is still rendered as hex, not as null
        assert_ne!(hash_elems!(zero_mod_q()), hash_elems!("null"));
    }

    #[test]
    fn integers_render_as_decimal() {
        assert_eq!(hash_elems!(1234u64), hash_elems!("1234"));
    }

    #[test]
    fn elements_render_as_hex() {
        let elem = ElementModQ::from(0xabc);
        assert_eq!(hash_elems!(&elem), hash_elems!("0ABC"));
        assert_eq!(hash_elems!(two_mod_p()), hash_elems!("02"));
    }

    #[test]
    fn nested_sequences_render_as_their_own_hash() {
        let a = ElementModQ::from(1);
        let b = ElementModQ::from(2);
        let inner = hash_elems!(&a, &b);

        let nested = hash_elems!("outer", HashItem::seq(vec![&a, &b]));
        let flattened = hash_elems!("outer", inner.to_hex());
        assert_eq!(nested, flattened);

        let hashable = Pair(a.clone(), b.clone());
        assert_eq!(
            hash_elems!("outer", HashItem::Hashable(&hashable)),
            flattened
        );
        assert_ne!(nested, hash_elems!("outer", &a, &b));
    }

    #[test]
    fn options_hash_as_null_when_absent() {
        let a = ElementModQ::from(9);
        assert_eq!(hash_elems!(Some(&a)), hash_elems!(&a));
        assert_eq!(hash_elems!(None::<&ElementModQ>), hash_elems!("null"));
    }
}
