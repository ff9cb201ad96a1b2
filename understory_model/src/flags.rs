// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instance lifecycle flags.

use std::sync::atomic::{AtomicU8, Ordering};

bitflags::bitflags! {
    /// Lifecycle state of one model instance.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub(crate) struct StateFlags: u8 {
        /// Construction finished.
        const INITIALIZED = 0b0000_0001;
        /// Every write is rejected, including the read-only flag.
        const FROZEN      = 0b0000_0010;
        /// The validation context reflects the current values.
        const VALIDATED   = 0b0000_0100;
        /// A validation pass is running.
        const VALIDATING  = 0b0000_1000;
    }
}

/// [`StateFlags`] behind an atomic.
#[derive(Debug, Default)]
pub(crate) struct AtomicStateFlags(AtomicU8);

impl AtomicStateFlags {
    pub(crate) fn contains(&self, flags: StateFlags) -> bool {
        StateFlags::from_bits_truncate(self.0.load(Ordering::Acquire)).contains(flags)
    }

    pub(crate) fn insert(&self, flags: StateFlags) {
        self.0.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub(crate) fn remove(&self, flags: StateFlags) {
        self.0.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Sets `flags` and returns `true` if none of them was set before.
    pub(crate) fn try_insert(&self, flags: StateFlags) -> bool {
        let previous = self.0.fetch_or(flags.bits(), Ordering::AcqRel);
        StateFlags::from_bits_truncate(previous) & flags == StateFlags::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_and_try_insert() {
        let flags = AtomicStateFlags::default();
        assert!(flags.try_insert(StateFlags::VALIDATING));
        assert!(!flags.try_insert(StateFlags::VALIDATING));
        flags.insert(StateFlags::FROZEN);
        assert!(flags.contains(StateFlags::FROZEN | StateFlags::VALIDATING));
        flags.remove(StateFlags::VALIDATING);
        assert!(!flags.contains(StateFlags::VALIDATING));
        assert!(flags.contains(StateFlags::FROZEN));
    }
}
