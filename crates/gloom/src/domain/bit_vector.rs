//! Fixed-length bit storage
//!
//! Flags are monotone: once set they are never cleared. The vector knows
//! nothing about hashing; callers reduce positions before handing them in.

use bitvec::prelude::*;

use crate::error::{FilterError, Result};

/// Fixed-length array of single-bit flags
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVector {
    bits: BitVec<u8, Lsb0>,
}

impl BitVector {
    /// Create a vector of `length` bits, all cleared
    pub fn new(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(FilterError::InvalidConfig(
                "bit vector length cannot be 0".to_string(),
            ));
        }
        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; length],
        })
    }

    /// Number of addressable bits
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Always false: construction rejects zero-length vectors
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Set the flag at `index`
    pub fn set(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        self.bits.set(index, true);
        Ok(())
    }

    /// Read the flag at `index`
    pub fn test(&self, index: usize) -> Result<bool> {
        self.check(index)?;
        Ok(self.bits[index])
    }

    /// Number of flags currently set
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    /// OR every flag of `other` into this vector
    ///
    /// Works on the underlying bytes rather than bit by bit.
    pub fn union(&mut self, other: &BitVector) -> Result<()> {
        if self.len() != other.len() {
            return Err(FilterError::IncompatibleFilters(format!(
                "bit vector lengths differ: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        let ours = self.bits.as_raw_mut_slice();
        let theirs = other.bits.as_raw_slice();
        for (o, t) in ours.iter_mut().zip(theirs.iter()) {
            *o |= *t;
        }
        Ok(())
    }

    /// Iterate over the indices of set flags, lowest first
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    fn check(&self, index: usize) -> Result<()> {
        if index >= self.bits.len() {
            return Err(FilterError::IndexOutOfRange {
                index,
                length: self.bits.len(),
            });
        }
        Ok(())
    }
}
