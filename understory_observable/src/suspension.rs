// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted suspension scopes.
//!
//! A [`Suspension`] is the shared slot behind "suspend notifications",
//! "suspend change callbacks" and "suspend validation". Entering creates the
//! [`SuspensionContext`] on first use and increments its counter; leaving
//! decrements it and hands the context back once the outermost scope closes,
//! so the caller can replay what was recorded.
//!
//! [`SuspensionToken`] is the guard form: it runs a release closure exactly
//! once, when dropped.

use std::fmt;
use std::sync::Mutex;

use smallvec::SmallVec;

use crate::event::lock;

/// State of an active suspension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuspensionContext {
    counter: usize,
    properties: Vec<String>,
}

impl SuspensionContext {
    /// Nesting depth.
    #[inline]
    #[must_use]
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Distinct property names touched while suspended, in first-touch order.
    #[must_use]
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Consumes the context and returns the recorded names.
    #[must_use]
    pub fn into_properties(self) -> Vec<String> {
        self.properties
    }

    fn record(&mut self, name: &str) -> bool {
        if self.properties.iter().any(|p| p == name) {
            false
        } else {
            self.properties.push(name.to_owned());
            true
        }
    }
}

/// A suspension slot, empty when nothing is suspended.
#[derive(Default)]
pub struct Suspension {
    slot: Mutex<Option<SuspensionContext>>,
}

impl Suspension {
    /// Creates an inactive slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a scope and returns the new depth.
    pub fn enter(&self) -> usize {
        let mut slot = lock(&self.slot);
        let context = slot.get_or_insert_with(SuspensionContext::default);
        context.counter += 1;
        context.counter
    }

    /// Leaves a scope.
    ///
    /// Returns the context when the outermost scope closes.
    pub fn exit(&self) -> Option<SuspensionContext> {
        let mut slot = lock(&self.slot);
        let context = slot.as_mut()?;
        context.counter = context.counter.saturating_sub(1);
        if context.counter == 0 {
            slot.take()
        } else {
            None
        }
    }

    /// Returns `true` while at least one scope is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        lock(&self.slot).as_ref().map_or(0, SuspensionContext::counter)
    }

    /// Records `name` if a scope is open.
    ///
    /// Returns `true` if the slot is active (whether or not the name was new).
    pub fn record(&self, name: &str) -> bool {
        match lock(&self.slot).as_mut() {
            Some(context) => {
                context.record(name);
                true
            }
            None => false,
        }
    }

    /// Returns the names recorded so far.
    #[must_use]
    pub fn recorded(&self) -> SmallVec<[String; 4]> {
        lock(&self.slot)
            .as_ref()
            .map(|c| c.properties.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("context", &*lock(&self.slot))
            .finish()
    }
}

/// Guard that ends a suspension scope when dropped.
#[must_use = "the scope ends as soon as the token is dropped"]
pub struct SuspensionToken {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SuspensionToken {
    /// Creates a token that calls `release` on drop.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A token that does nothing when dropped.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Ends the scope now.
    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SuspensionToken {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for SuspensionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspensionToken")
            .field("pending", &self.release.is_some())
            .finish()
    }
}
