use crate::error::{FcsError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The byte order of multi-byte values in the DATA segment, from `$BYTEORD`
///
/// The keyword lists 1-based byte positions from least to most significant:
/// `1,2,3,4` is little-endian, `4,3,2,1` big-endian. FCS 2.0 and 3.0 allow
/// arbitrary permutations of `1..n` for integer data (e.g. the PDP-11 order
/// `3,4,1,2`); 3.1 restricts the keyword to the two pure orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
    /// A permutation that is neither ascending nor descending, kept as the
    /// 1-based positions named by the keyword.
    Mixed(Vec<u8>),
}

impl ByteOrder {
    /// Parses a `$BYTEORD` value such as `1,2,3,4` or `2,1`
    /// # Errors
    /// Will return `Err` if the value is not a permutation of `1..n` for
    /// some `n` between 1 and 8
    pub fn from_keyword_str(value: &str) -> Result<Self> {
        let err = || FcsError::UnsupportedByteOrder(value.trim().to_string());

        let indices: Vec<u8> = value
            .split(',')
            .map(|token| token.trim().parse::<u8>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| err())?;

        let n = indices.len();
        if n == 0 || n > 8 {
            return Err(err());
        }
        // Each of 1..=n exactly once.
        let mut seen = [false; 8];
        for &i in &indices {
            if i == 0 || i as usize > n || seen[i as usize - 1] {
                return Err(err());
            }
            seen[i as usize - 1] = true;
        }

        if indices.iter().enumerate().all(|(k, &i)| i as usize == k + 1) {
            Ok(Self::LittleEndian)
        } else if indices.iter().enumerate().all(|(k, &i)| i as usize == n - k) {
            Ok(Self::BigEndian)
        } else {
            Ok(Self::Mixed(indices))
        }
    }

    /// Renders the keyword value for a word of `width` bytes (e.g. 4 ->
    /// `1,2,3,4` for little-endian)
    #[must_use]
    pub fn keyword_string(&self, width: usize) -> String {
        match self {
            Self::LittleEndian => (1..=width).map(|i| i.to_string()).join(","),
            Self::BigEndian => (1..=width).rev().map(|i| i.to_string()).join(","),
            Self::Mixed(indices) => indices.iter().map(|i| i.to_string()).join(","),
        }
    }

    /// Returns the 0-based byte positions of a `width`-byte word, least
    /// significant first, for assembling or splitting integer values.
    ///
    /// For a mixed permutation declared over more bytes than `width`, the
    /// sub-permutation of positions `<= width` is used, which is how
    /// narrower parameters inherit a file-wide `$BYTEORD`.
    ///
    /// # Errors
    /// Will return `Err` if a mixed permutation does not contain each of
    /// `1..=width` (so the sub-permutation is not well defined)
    pub fn permutation(&self, width: usize) -> Result<Vec<usize>> {
        match self {
            Self::LittleEndian => Ok((0..width).collect()),
            Self::BigEndian => Ok((0..width).rev().collect()),
            Self::Mixed(indices) => {
                let sub: Vec<usize> = indices
                    .iter()
                    .filter(|&&i| (i as usize) <= width)
                    .map(|&i| i as usize - 1)
                    .collect();
                if sub.len() == width && {
                    let mut seen = vec![false; width];
                    sub.iter().all(|&p| !std::mem::replace(&mut seen[p], true))
                } {
                    Ok(sub)
                } else {
                    Err(FcsError::UnsupportedByteOrder(format!(
                        "`{}` cannot order a {width}-byte value",
                        self.keyword_string(indices.len())
                    )))
                }
            }
        }
    }

    /// Whether this order is one of the two pure endiannesses, the only
    /// orders defined for floating point data.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        !matches!(self, Self::Mixed(_))
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LittleEndian => write!(f, "little-endian"),
            Self::BigEndian => write!(f, "big-endian"),
            Self::Mixed(indices) => {
                write!(f, "mixed({})", self.keyword_string(indices.len()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_pure_orders() {
        assert_eq!(
            ByteOrder::from_keyword_str("1,2,3,4").unwrap(),
            ByteOrder::LittleEndian
        );
        assert_eq!(
            ByteOrder::from_keyword_str("4,3,2,1").unwrap(),
            ByteOrder::BigEndian
        );
        assert_eq!(
            ByteOrder::from_keyword_str("1,2").unwrap(),
            ByteOrder::LittleEndian
        );
        assert_eq!(
            ByteOrder::from_keyword_str(" 2 , 1 ").unwrap(),
            ByteOrder::BigEndian
        );
    }

    #[test]
    fn keeps_mixed_permutations() {
        assert_eq!(
            ByteOrder::from_keyword_str("3,4,1,2").unwrap(),
            ByteOrder::Mixed(vec![3, 4, 1, 2])
        );
    }

    #[test]
    fn rejects_non_permutations() {
        for s in ["0,1", "1,3", "1,1,2,2", "1,2,3,4,5,6,7,8,9", "", "a,b"] {
            assert!(matches!(
                ByteOrder::from_keyword_str(s),
                Err(FcsError::UnsupportedByteOrder(_))
            ));
        }
    }

    #[test]
    fn permutation_positions() {
        assert_eq!(
            ByteOrder::LittleEndian.permutation(4).unwrap(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(
            ByteOrder::BigEndian.permutation(2).unwrap(),
            vec![1, 0]
        );
        // PDP order restricted to 2 bytes keeps its relative order.
        assert_eq!(
            ByteOrder::Mixed(vec![3, 4, 1, 2]).permutation(2).unwrap(),
            vec![0, 1]
        );
        assert_eq!(
            ByteOrder::Mixed(vec![3, 4, 1, 2]).permutation(4).unwrap(),
            vec![2, 3, 0, 1]
        );
        assert!(ByteOrder::Mixed(vec![3, 4, 1, 2]).permutation(3).is_err());
    }

    #[test]
    fn keyword_strings() {
        assert_eq!(ByteOrder::LittleEndian.keyword_string(4), "1,2,3,4");
        assert_eq!(ByteOrder::BigEndian.keyword_string(4), "4,3,2,1");
        assert_eq!(ByteOrder::Mixed(vec![3, 4, 1, 2]).keyword_string(4), "3,4,1,2");
    }
}
