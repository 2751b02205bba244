//! Erasure of sensitive key material.
//!
//! Raw entropy and intermediate key bytes are registered for wiping by
//! wrapping them in a [`WipeOnDrop`] guard for the scope that uses them.
//! The guard zeroes the contents when the scope exits, whether it returns
//! normally, returns an error through `?`, or unwinds from a panic.
//!
//! Wiping keeps lengths intact so a caller holding the storage can confirm
//! it reads back as zeros.

use std::ops::{Deref, DerefMut};
use zeroize::Zeroize;

/// Storage holding sensitive bytes.
pub trait Sensitive {
    /// Overwrites every element with zero, keeping the length.
    fn wipe(&mut self);

    /// Returns true if every element is zero.
    fn is_wiped(&self) -> bool;
}

impl Sensitive for [u8] {
    fn wipe(&mut self) {
        self.zeroize();
    }

    fn is_wiped(&self) -> bool {
        self.iter().all(|&b| b == 0)
    }
}

impl Sensitive for [u64] {
    fn wipe(&mut self) {
        self.zeroize();
    }

    fn is_wiped(&self) -> bool {
        self.iter().all(|&w| w == 0)
    }
}

impl Sensitive for Vec<u8> {
    fn wipe(&mut self) {
        self.as_mut_slice().wipe();
    }

    fn is_wiped(&self) -> bool {
        self.as_slice().is_wiped()
    }
}

impl Sensitive for Vec<u64> {
    fn wipe(&mut self) {
        self.as_mut_slice().wipe();
    }

    fn is_wiped(&self) -> bool {
        self.as_slice().is_wiped()
    }
}

impl<const N: usize> Sensitive for [u8; N] {
    fn wipe(&mut self) {
        self.as_mut_slice().wipe();
    }

    fn is_wiped(&self) -> bool {
        self.as_slice().is_wiped()
    }
}

/// Scope guard wiping borrowed storage when dropped.
pub struct WipeOnDrop<'a, T: Sensitive + ?Sized> {
    inner: &'a mut T,
}

impl<'a, T: Sensitive + ?Sized> WipeOnDrop<'a, T> {
    /// Registers `inner` for wiping at the end of the guard's scope.
    pub fn new(inner: &'a mut T) -> Self {
        Self { inner }
    }
}

impl<T: Sensitive + ?Sized> Deref for WipeOnDrop<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner
    }
}

impl<T: Sensitive + ?Sized> DerefMut for WipeOnDrop<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner
    }
}

impl<T: Sensitive + ?Sized> Drop for WipeOnDrop<'_, T> {
    fn drop(&mut self) {
        self.inner.wipe();
    }
}
