// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child awareness: property values that raise changes are watched, and
//! their changes bubble up into the holding model.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock, Weak};

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use understory_observable::{
    AsAny, ChangeNotificationWrapper, ChangeOrigin, ObjectRef, PropertyChangedArgs, Subscription,
    Value,
};
use understory_property::{IntrinsicProperty, PropertyBagStore, is_intrinsic};
use understory_validation::ValidationSummary;

use crate::model::{Model, ModelInner, ModelType};
use crate::validation;

struct Watch {
    wrapper: ChangeNotificationWrapper,
    _subscriptions: SmallVec<[Subscription; 3]>,
}

/// Wrappers attached to the current object values of a model.
#[derive(Default)]
pub(crate) struct ChildTracker {
    watched: Mutex<HashMap<Arc<str>, Watch>>,
}

impl ChildTracker {
    fn replace(&self, name: &Arc<str>, watch: Option<Watch>) -> Option<Watch> {
        let mut watched = self.watched.lock().unwrap_or_else(PoisonError::into_inner);
        match watch {
            Some(watch) => watched.insert(name.clone(), watch),
            None => watched.remove(name),
        }
    }

    fn with_wrapper<R>(
        &self,
        name: &str,
        f: impl FnOnce(&ChangeNotificationWrapper) -> R,
    ) -> Option<R> {
        self.watched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|watch| f(&watch.wrapper))
    }
}

impl fmt::Debug for ChildTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let watched = self.watched.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_set().entries(watched.keys()).finish()
    }
}

/// Watches every object value already in the bag.
pub(crate) fn watch_initial_values<M: ModelType>(model: &Model<M>) {
    for (name, value) in model.inner.bag.get_all_properties() {
        update_watch(model, &name, &value);
    }
}

/// Attaches, replaces or drops the wrapper for `name` after its value changed.
pub(crate) fn update_watch<M: ModelType>(model: &Model<M>, name: &Arc<str>, value: &Value) {
    if is_intrinsic(name) {
        return;
    }
    let watch = value
        .as_object()
        .filter(|_| ChangeNotificationWrapper::is_useful_for_object(value))
        .map(|object| attach(model, name, object));
    let had_watch = watch.is_some();
    // Dropped outside the lock: detaching may take the child's event lock.
    let previous = model.inner.children.replace(name, watch);
    if had_watch || previous.is_some() {
        tracing::trace!(
            property = &**name,
            attached = had_watch,
            "child watch updated"
        );
    }
    drop(previous);
}

fn attach<M: ModelType>(model: &Model<M>, name: &Arc<str>, object: &ObjectRef) -> Watch {
    let wrapper = ChangeNotificationWrapper::new(object);
    let mut subscriptions = SmallVec::new();

    let weak = model.downgrade();
    let holder = name.clone();
    subscriptions.extend(
        wrapper
            .property_changed()
            .subscribe(move |args: &PropertyChangedArgs| {
                if let Some(model) = upgrade(&weak) {
                    on_child_property_changed(&model, &holder, args);
                }
            })
            .ok(),
    );

    let weak = model.downgrade();
    subscriptions.extend(
        wrapper
            .collection_changed()
            .subscribe(move |_| {
                if let Some(model) = upgrade(&weak) {
                    on_aggregate_changed(&model);
                }
            })
            .ok(),
    );

    let weak = model.downgrade();
    subscriptions.extend(
        wrapper
            .collection_item_property_changed()
            .subscribe(move |_| {
                if let Some(model) = upgrade(&weak) {
                    on_aggregate_changed(&model);
                }
            })
            .ok(),
    );

    Watch {
        wrapper,
        _subscriptions: subscriptions,
    }
}

fn upgrade<M: ModelType>(weak: &Weak<ModelInner<M>>) -> Option<Model<M>> {
    weak.upgrade().map(Model::from_inner)
}

thread_local! {
    /// Models currently forwarding a child change on this thread.
    static FORWARDING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

struct Forwarding(usize);

impl Drop for Forwarding {
    fn drop(&mut self) {
        let id = self.0;
        FORWARDING.with_borrow_mut(|ids| ids.retain(|&other| other != id));
    }
}

/// Runs `forward` unless `model` is already forwarding a child change
/// further up this call stack. Models that watch each other would otherwise
/// bounce the same change back and forth.
fn forwarding<M: ModelType>(model: &Model<M>, forward: impl FnOnce()) {
    let id = Arc::as_ptr(&model.inner).addr();
    let entered = FORWARDING.with_borrow_mut(|ids| {
        if ids.contains(&id) {
            false
        } else {
            ids.push(id);
            true
        }
    });
    if !entered {
        tracing::trace!(
            model = std::any::type_name::<M>(),
            "child change already being forwarded, not re-entering"
        );
        return;
    }
    let _guard = Forwarding(id);
    forward();
}

fn on_child_property_changed<M: ModelType>(
    model: &Model<M>,
    holder: &Arc<str>,
    args: &PropertyChangedArgs,
) {
    forwarding(model, || forward_child_change(model, holder, args));
}

fn forward_child_change<M: ModelType>(
    model: &Model<M>,
    holder: &Arc<str>,
    args: &PropertyChangedArgs,
) {
    match IntrinsicProperty::from_name(args.name()) {
        Some(IntrinsicProperty::IsDirty) => {
            if matches!(args.new_value, Some(Value::Bool(true))) {
                model.set_dirty_flag(true);
            }
        }
        Some(IntrinsicProperty::HasErrors | IntrinsicProperty::HasWarnings) => {
            validation::invalidate(model);
        }
        Some(IntrinsicProperty::IsReadOnly) => {}
        None => {
            let forwarded = PropertyChangedArgs::new(holder.clone()).with_origin(ChangeOrigin::Child);
            model.notify(&forwarded);
        }
    }
}

/// Something inside a child collection changed. Raised as an unspecified
/// change, which marks the holder dirty and stale.
fn on_aggregate_changed<M: ModelType>(model: &Model<M>) {
    forwarding(model, || {
        model.notify(&PropertyChangedArgs::unspecified().with_origin(ChangeOrigin::Collection));
    });
}

impl<M: ModelType> Model<M> {
    /// Whether the value of `property` is currently watched for changes.
    #[must_use]
    pub fn is_watching_child(&self, property: &str) -> bool {
        self.inner
            .children
            .with_wrapper(property, ChangeNotificationWrapper::is_tracking)
            .unwrap_or(false)
    }

    /// Live items tracked for the collection held by `property`.
    #[must_use]
    pub fn tracked_child_items(&self, property: &str) -> Vec<ObjectRef> {
        self.inner
            .children
            .with_wrapper(property, |wrapper| {
                wrapper
                    .target()
                    .map(|target| wrapper.tracked_items(&target))
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

type SummaryFn = fn(&ObjectRef, Option<&str>, &mut HashSet<usize>) -> Option<ValidationSummary>;

static MODEL_TYPES: LazyLock<RwLock<HashMap<TypeId, SummaryFn>>> =
    LazyLock::new(Default::default);

/// Makes instances of `M` reachable from untyped child values.
pub(crate) fn register_model_type<M: ModelType>() {
    let id = TypeId::of::<ModelInner<M>>();
    if MODEL_TYPES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&id)
    {
        return;
    }
    MODEL_TYPES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, summarize::<M>);
}

fn summarize<M: ModelType>(
    object: &ObjectRef,
    tag: Option<&str>,
    visited: &mut HashSet<usize>,
) -> Option<ValidationSummary> {
    let inner = object.downcast::<ModelInner<M>>()?;
    Some(validation::collect_summary(
        &Model::from_inner(inner),
        true,
        tag,
        visited,
    ))
}

/// The summary of `value` if it is a model, or of every model inside it if
/// it is a collection.
pub(crate) fn child_summaries(
    value: &Value,
    tag: Option<&str>,
    visited: &mut HashSet<usize>,
    out: &mut Vec<ValidationSummary>,
) {
    let Some(object) = value.as_object() else {
        return;
    };
    let type_id = Any::type_id(AsAny::as_any(object.get()));
    let hook = MODEL_TYPES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .copied();
    if let Some(hook) = hook {
        if visited.insert(object.id())
            && let Some(summary) = hook(object, tag, visited)
        {
            out.push(summary);
        }
        return;
    }
    if let Some(items) = object.get().collection_items() {
        for item in &items {
            child_summaries(item, tag, visited, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use understory_observable::{ObservableCollection, ObservableObject};
    use understory_property::{Property, PropertyError, TypeRegistration};

    use super::*;
    use crate::capabilities::DirtyTracking;

    static CHILD: LazyLock<Property<Option<ObjectRef>>> =
        LazyLock::new(|| Property::register("Child", None));
    static ITEMS: LazyLock<Property<Option<ObjectRef>>> =
        LazyLock::new(|| Property::register("Items", None));

    struct Holder;

    impl ModelType for Holder {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&CHILD)?.register(&ITEMS)?;
            Ok(())
        }
    }

    #[test]
    fn observable_values_are_watched_and_released() {
        let holder = Model::new(Holder).unwrap();
        let child = Arc::new(ObservableObject::new());
        holder
            .set(&CHILD, Some(ObjectRef::new(child.clone())))
            .unwrap();
        assert!(holder.is_watching_child("Child"));

        holder.set(&CHILD, None).unwrap();
        assert!(!holder.is_watching_child("Child"));
        assert_eq!(child.property_changed().handler_count(), 0);
    }

    #[test]
    fn child_changes_reraise_under_the_holder_name() {
        let holder = Model::new(Holder).unwrap();
        let child = Arc::new(ObservableObject::new());
        holder
            .set(&CHILD, Some(ObjectRef::new(child.clone())))
            .unwrap();
        holder.set_dirty_flag(false);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = holder
            .property_changed()
            .subscribe(move |args: &PropertyChangedArgs| {
                sink.lock().unwrap().push((args.name().to_owned(), args.origin));
            })
            .unwrap();

        child.raise_property_changed_named("Title");
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], ("Child".to_owned(), ChangeOrigin::Child));
        assert!(holder.is_dirty());
    }

    #[test]
    fn collection_changes_raise_an_unspecified_change() {
        let holder = Model::new(Holder).unwrap();
        let list = ObservableCollection::<i32>::new();
        holder.set(&ITEMS, Some(list.to_object_ref())).unwrap();
        holder.set_dirty_flag(false);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = holder
            .property_changed()
            .subscribe(move |args: &PropertyChangedArgs| {
                sink.lock().unwrap().push(args.name().to_owned());
            })
            .unwrap();

        list.push(3);
        assert!(holder.is_dirty());
        assert_eq!(*seen.lock().unwrap(), ["", "IsDirty"]);
    }

    static PEER: LazyLock<Property<Option<Model<Peer>>>> =
        LazyLock::new(|| Property::register("Peer", None));
    static LABEL: LazyLock<Property<String>> =
        LazyLock::new(|| Property::register("Label", String::new()));

    struct Peer;

    impl ModelType for Peer {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&PEER)?.register(&LABEL)?;
            Ok(())
        }
    }

    #[test]
    fn models_watching_each_other_forward_a_change_once() {
        let a = Model::new(Peer).unwrap();
        let b = Model::new(Peer).unwrap();
        a.set(&PEER, Some(b.clone())).unwrap();
        b.set(&PEER, Some(a.clone())).unwrap();
        a.set_dirty_flag(false);
        b.set_dirty_flag(false);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = a
            .property_changed()
            .subscribe(move |args: &PropertyChangedArgs| {
                sink.lock().unwrap().push(args.name().to_owned());
            })
            .unwrap();

        b.set(&LABEL, "moved".to_owned()).unwrap();
        assert!(a.is_dirty());
        assert!(b.is_dirty());
        let forwarded = seen.lock().unwrap().iter().filter(|n| *n == "Peer").count();
        assert_eq!(forwarded, 1);

        b.set(&PEER, None).unwrap();
    }
}
