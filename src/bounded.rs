//! Fixed-capacity lists.
//!
//! Every table the backend shares with plugins has a hard upper bound. Insertion
//! reports [`Error::CapacityExceeded`](crate::Error::CapacityExceeded) instead of
//! growing past it.

use crate::{Result, capacity_error};
use alloc::{format, vec::Vec};
use core::ops::{Index, IndexMut};
use delegate::delegate;

/// A `Vec` that refuses to hold more than `N` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedVec<T, const N: usize> {
    inner: Vec<T>,
}

impl<T, const N: usize> BoundedVec<T, N> {
    /// Maximum number of elements.
    pub const CAPACITY: usize = N;

    #[inline]
    pub const fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Appends `value`, failing once `N` elements are stored.
    pub fn try_push(&mut self, value: T) -> Result<()> {
        if self.inner.len() >= N {
            return Err(capacity_error(format!("list is full ({N} entries)")));
        }
        self.inner.push(value);
        Ok(())
    }

    /// Whether another element can still be inserted.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.inner.len() >= N
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        N - self.inner.len()
    }

    delegate! {
        to self.inner {
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
            pub fn clear(&mut self);
            pub fn iter(&self) -> core::slice::Iter<'_, T>;
            pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T>;
            pub fn as_slice(&self) -> &[T];
            pub fn as_mut_slice(&mut self) -> &mut [T];
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.inner.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.inner.get_mut(index)
    }
}

impl<T, const N: usize> Default for BoundedVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> TryFrom<Vec<T>> for BoundedVec<T, N> {
    type Error = crate::Error;

    fn try_from(inner: Vec<T>) -> Result<Self> {
        if inner.len() > N {
            return Err(capacity_error(format!(
                "{} entries do not fit into a list of {N}",
                inner.len()
            )));
        }
        Ok(Self { inner })
    }
}

impl<T, const N: usize> Index<usize> for BoundedVec<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }
}

impl<T, const N: usize> IndexMut<usize> for BoundedVec<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.inner[index]
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a BoundedVec<T, N> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a mut BoundedVec<T, N> {
    type Item = &'a mut T;
    type IntoIter = core::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter_mut()
    }
}
