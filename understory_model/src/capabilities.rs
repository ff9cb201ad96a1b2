// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle capabilities of a model: dirty tracking, read-only and freezing.

use crate::model::{Model, ModelType, SetOutcome};

/// Tracks whether an object has unsaved changes.
pub trait DirtyTracking {
    /// Whether there are unsaved changes.
    fn is_dirty(&self) -> bool;

    /// Marks or clears unsaved changes.
    fn set_dirty(&self, dirty: bool);
}

/// An object whose writes can be switched off.
pub trait ReadOnly {
    /// Whether writes are refused.
    fn is_read_only(&self) -> bool;

    /// Switches writes off or back on.
    ///
    /// Has no effect once the object is frozen.
    fn set_read_only(&self, read_only: bool) -> SetOutcome;
}

/// An object that can be made permanently immutable.
pub trait Freezable {
    /// Refuses every later write, including to the read-only flag.
    fn freeze(&self);

    /// Whether [`Freezable::freeze`] was called.
    fn is_frozen(&self) -> bool;
}

impl<M: ModelType> DirtyTracking for Model<M> {
    #[inline]
    fn is_dirty(&self) -> bool {
        self.dirty_flag()
    }

    fn set_dirty(&self, dirty: bool) {
        self.set_dirty_flag(dirty);
    }
}

impl<M: ModelType> ReadOnly for Model<M> {
    #[inline]
    fn is_read_only(&self) -> bool {
        self.read_only_flag()
    }

    fn set_read_only(&self, read_only: bool) -> SetOutcome {
        self.set_read_only_flag(read_only)
    }
}

impl<M: ModelType> Freezable for Model<M> {
    fn freeze(&self) {
        self.freeze_now();
    }

    #[inline]
    fn is_frozen(&self) -> bool {
        self.frozen_flag()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, LazyLock, Mutex};

    use understory_observable::PropertyChangedArgs;
    use understory_property::{Property, PropertyError, TypeRegistration};

    use super::*;

    static NAME: LazyLock<Property<String>> =
        LazyLock::new(|| Property::register("Name", String::new()));

    struct Tag;

    impl ModelType for Tag {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&NAME)?;
            Ok(())
        }
    }

    #[test]
    fn read_only_rejects_writes_silently() {
        let tag = Model::new(Tag).unwrap();
        assert_eq!(tag.set_read_only(true), SetOutcome::Changed);

        let seen = Arc::new(Mutex::new(0_usize));
        let sink = seen.clone();
        let _sub = tag
            .property_changed()
            .subscribe(move |_: &PropertyChangedArgs| *sink.lock().unwrap() += 1)
            .unwrap();

        assert_eq!(
            tag.set(&NAME, "x".to_owned()).unwrap(),
            SetOutcome::Rejected
        );
        assert_eq!(tag.get(&NAME).unwrap(), "");
        assert_eq!(*seen.lock().unwrap(), 0);

        assert_eq!(tag.set_read_only(false), SetOutcome::Changed);
        assert_eq!(tag.set(&NAME, "x".to_owned()).unwrap(), SetOutcome::Changed);
    }

    #[test]
    fn read_only_flag_does_not_mark_dirty() {
        let tag = Model::new(Tag).unwrap();
        tag.set_read_only(true);
        assert!(!tag.is_dirty());
    }

    #[test]
    fn frozen_models_refuse_the_read_only_flag_too() {
        let tag = Model::new(Tag).unwrap();
        tag.freeze();
        assert!(tag.is_frozen());
        assert_eq!(tag.set_read_only(true), SetOutcome::Rejected);
        assert!(!tag.is_read_only());
        assert_eq!(
            tag.set(&NAME, "x".to_owned()).unwrap(),
            SetOutcome::Rejected
        );
    }

    #[test]
    fn dirty_flag_is_settable() {
        let tag = Model::new(Tag).unwrap();
        tag.set(&NAME, "x".to_owned()).unwrap();
        assert!(tag.is_dirty());
        tag.set_dirty(false);
        assert!(!tag.is_dirty());
    }
}
