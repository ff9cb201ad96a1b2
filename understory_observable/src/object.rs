// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The minimal observable base.

use std::fmt;

use crate::args::PropertyChangedArgs;
use crate::event::Event;
use crate::value::ObjectValue;

/// Owns a property-changed event and the one method that raises it.
///
/// Types that want change notification embed an `ObservableObject` and route
/// every notification through [`ObservableObject::raise_property_changed`].
pub struct ObservableObject {
    property_changed: Event<PropertyChangedArgs>,
}

impl ObservableObject {
    /// Creates an object with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            property_changed: Event::new("PropertyChanged"),
        }
    }

    /// The property-changed event.
    #[inline]
    #[must_use]
    pub fn property_changed(&self) -> &Event<PropertyChangedArgs> {
        &self.property_changed
    }

    /// Raises the property-changed event.
    pub fn raise_property_changed(&self, args: &PropertyChangedArgs) {
        self.property_changed.raise(args);
    }

    /// Raises a change of `name` without value information.
    pub fn raise_property_changed_named(&self, name: &str) {
        self.raise_property_changed(&PropertyChangedArgs::new(name));
    }
}

impl Default for ObservableObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableObject")
            .field("handlers", &self.property_changed.handler_count())
            .finish()
    }
}

impl ObjectValue for ObservableObject {
    fn property_changed(&self) -> Option<&Event<PropertyChangedArgs>> {
        Some(&self.property_changed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::value::ObjectRef;

    #[test]
    fn raise_reaches_subscribers() {
        let object = ObservableObject::new();
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = names.clone();
        let _sub = object
            .property_changed()
            .subscribe(move |args| sink.lock().unwrap().push(args.name().to_owned()))
            .unwrap();

        object.raise_property_changed_named("Title");
        assert_eq!(*names.lock().unwrap(), vec!["Title".to_owned()]);
    }

    #[test]
    fn counts_as_observable_value() {
        let object = ObjectRef::new(Arc::new(ObservableObject::new()));
        assert!(object.is_observable());
        assert!(!object.is_collection());
    }
}
