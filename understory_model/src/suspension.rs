// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-notification and change-callback suspension scopes.

use understory_observable::{PropertyChangedArgs, SuspensionToken};

use crate::model::{Model, ModelType};

impl<M: ModelType> Model<M> {
    /// Defers property-changed notifications until the returned token drops.
    ///
    /// Scopes nest and share one context. When the outermost token is
    /// released with `raise_on_resume`, every distinct property touched in the
    /// meantime is raised once, in first-touch order. Deferred changes neither
    /// mark the model dirty nor run callbacks unless they are replayed.
    ///
    /// The flag of the token that closes the outermost scope decides.
    pub fn suspend_change_notifications(&self, raise_on_resume: bool) -> SuspensionToken {
        let depth = self.inner.notifications.enter();
        tracing::trace!(depth, "change notifications suspended");
        let weak = self.downgrade();
        SuspensionToken::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some(context) = inner.notifications.exit() else {
                return;
            };
            if !raise_on_resume {
                return;
            }
            let model = Self::from_inner(inner);
            let names = context.into_properties();
            tracing::debug!(count = names.len(), "replaying suspended change notifications");
            for name in names {
                model.raise_core(&PropertyChangedArgs::new(name));
            }
        })
    }

    /// Skips per-property change callbacks until the returned token drops.
    ///
    /// Events are still raised. Skipped callbacks are not replayed.
    pub fn suspend_change_callbacks(&self) -> SuspensionToken {
        self.inner.callbacks.enter();
        let weak = self.downgrade();
        SuspensionToken::new(move || {
            if let Some(inner) = weak.upgrade()
                && let Some(context) = inner.callbacks.exit()
            {
                tracing::trace!(
                    skipped = context.properties().len(),
                    "change callbacks resumed"
                );
            }
        })
    }

    /// Whether change notifications are currently suspended.
    #[must_use]
    pub fn change_notifications_suspended(&self) -> bool {
        self.inner.notifications.is_active()
    }

    /// Whether change callbacks are currently suspended.
    #[must_use]
    pub fn change_callbacks_suspended(&self) -> bool {
        self.inner.callbacks.is_active()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, LazyLock, Mutex};

    use understory_observable::Subscription;
    use understory_property::{Property, PropertyDataBuilder, PropertyError, TypeRegistration};

    use super::*;
    use crate::capabilities::DirtyTracking;

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    static TITLE: LazyLock<Property<String>> = LazyLock::new(|| {
        PropertyDataBuilder::new("Title", String::new())
            .on_changed(|_: &Model<Doc>, _| {
                CALLS.fetch_add(1, Ordering::SeqCst);
            })
            .build()
    });
    static PAGES: LazyLock<Property<u32>> = LazyLock::new(|| Property::register("Pages", 0));

    struct Doc;

    impl ModelType for Doc {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&TITLE)?.register(&PAGES)?;
            Ok(())
        }
    }

    fn record(model: &Model<Doc>) -> (Arc<Mutex<Vec<String>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = model
            .property_changed()
            .subscribe(move |args: &PropertyChangedArgs| {
                sink.lock().unwrap().push(args.name().to_owned());
            })
            .unwrap();
        (seen, sub)
    }

    #[test]
    fn nested_scopes_replay_once() {
        let doc = Model::new(Doc).unwrap();
        let (seen, _sub) = record(&doc);

        let outer = doc.suspend_change_notifications(true);
        let inner = doc.suspend_change_notifications(true);
        doc.set(&PAGES, 1).unwrap();
        doc.set(&PAGES, 2).unwrap();
        inner.release();
        assert!(doc.change_notifications_suspended());
        assert!(seen.lock().unwrap().is_empty());
        assert!(!doc.is_dirty());

        outer.release();
        assert_eq!(*seen.lock().unwrap(), ["Pages", "IsDirty"]);
        assert!(doc.is_dirty());
    }

    #[test]
    fn scopes_without_replay_stay_silent() {
        let doc = Model::new(Doc).unwrap();
        let (seen, _sub) = record(&doc);
        {
            let _token = doc.suspend_change_notifications(false);
            doc.set(&PAGES, 7).unwrap();
        }
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(doc.get(&PAGES).unwrap(), 7);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn callbacks_are_skipped_but_events_raised() {
        let doc = Model::new(Doc).unwrap();
        let (seen, _sub) = record(&doc);
        let before = CALLS.load(Ordering::SeqCst);
        {
            let _token = doc.suspend_change_callbacks();
            doc.set(&TITLE, "draft".to_owned()).unwrap();
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), before);
        assert_eq!(seen.lock().unwrap().first().map(String::as_str), Some("Title"));
        assert!(!doc.change_callbacks_suspended());

        doc.set(&TITLE, "final".to_owned()).unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn tokens_outliving_the_model_are_harmless() {
        let doc = Model::new(Doc).unwrap();
        let token = doc.suspend_change_notifications(true);
        drop(doc);
        drop(token);
    }
}
