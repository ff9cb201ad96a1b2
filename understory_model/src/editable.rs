// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edit sessions with backup and rollback.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use understory_observable::{Event, Value};
use understory_property::PropertyData;

use crate::model::{Model, ModelType};

/// Arguments of the edit events. Handlers may cancel the operation.
#[derive(Debug, Default)]
pub struct EditEventArgs {
    cancel: AtomicBool,
}

impl EditEventArgs {
    /// Cancels the operation being announced.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether a handler cancelled the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// An object supporting begin/cancel/end edit sessions.
pub trait Editable {
    /// Takes a backup of every backed-up property and the dirty flag.
    ///
    /// Does nothing (with a warning) while already editing.
    fn begin_edit(&self);

    /// Restores the backup through the normal set path and ends the session.
    ///
    /// Does nothing outside a session.
    fn cancel_edit(&self);

    /// Keeps the current values and ends the session.
    fn end_edit(&self);

    /// Whether a session is open.
    fn is_editing(&self) -> bool;

    /// Raised before a session starts; cancellable.
    fn beginning_edit(&self) -> &Event<EditEventArgs>;

    /// Raised before a rollback; cancellable.
    fn canceling_edit(&self) -> &Event<EditEventArgs>;

    /// Raised before a commit; cancellable.
    fn ending_edit(&self) -> &Event<EditEventArgs>;
}

struct Backup {
    bytes: Vec<u8>,
    objects: Vec<(Arc<str>, Value)>,
    is_dirty: bool,
}

pub(crate) struct EditState {
    backup: Mutex<Option<Backup>>,
    beginning: Event<EditEventArgs>,
    canceling: Event<EditEventArgs>,
    ending: Event<EditEventArgs>,
}

impl EditState {
    fn backup(&self) -> MutexGuard<'_, Option<Backup>> {
        self.backup.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EditState {
    fn default() -> Self {
        Self {
            backup: Mutex::new(None),
            beginning: Event::new("BeginningEdit"),
            canceling: Event::new("CancelingEdit"),
            ending: Event::new("EndingEdit"),
        }
    }
}

impl fmt::Debug for EditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditState")
            .field("editing", &self.backup().is_some())
            .finish_non_exhaustive()
    }
}

fn raise_cancellable(event: &Event<EditEventArgs>) -> bool {
    let args = EditEventArgs::default();
    event.raise(&args);
    args.is_cancelled()
}

impl<M: ModelType> Model<M> {
    fn take_backup(&self) -> Option<Backup> {
        let (objects, plain): (Vec<_>, Vec<_>) = self
            .members(|data| data.include_in_backup())
            .into_iter()
            .partition(|(_, value)| value.as_object().is_some());
        let mut bytes = Vec::new();
        if let Err(err) = self.serializer().serialize_members(&plain, &mut bytes) {
            tracing::error!(
                model = std::any::type_name::<M>(),
                error = %err,
                "backup failed, edit session not started"
            );
            return None;
        }
        Some(Backup {
            bytes,
            objects,
            is_dirty: self.dirty_flag(),
        })
    }

    fn restore(&self, backup: Backup) {
        let members = match self
            .serializer()
            .deserialize_members(&mut backup.bytes.as_slice())
        {
            Ok(members) => members,
            Err(err) => {
                tracing::error!(
                    model = std::any::type_name::<M>(),
                    error = %err,
                    "backup could not be read, nothing restored"
                );
                return;
            }
        };
        for (name, value) in members {
            match self.revive_member(&name, &value) {
                Ok((data, value)) => self.restore_one(&data, value),
                Err(err) => tracing::error!(
                    property = %name,
                    error = %err,
                    "backup member could not be revived"
                ),
            }
        }
        for (name, value) in backup.objects {
            match self.type_info().get_property_data(&name) {
                Ok(data) => self.restore_one(&data, value),
                Err(err) => tracing::error!(error = %err, "backup member is no longer declared"),
            }
        }
        self.set_dirty_flag(backup.is_dirty);
    }

    fn restore_one(&self, data: &Arc<PropertyData>, value: Value) {
        if let Err(err) = self.set_checked(data, value, true) {
            tracing::error!(
                model = std::any::type_name::<M>(),
                property = data.name(),
                error = %err,
                "property could not be restored from backup"
            );
        }
    }
}

impl<M: ModelType> Editable for Model<M> {
    fn begin_edit(&self) {
        if self.is_editing() {
            tracing::warn!(
                model = std::any::type_name::<M>(),
                "begin_edit called while already editing"
            );
            return;
        }
        if raise_cancellable(&self.inner.edit.beginning) {
            tracing::debug!("begin_edit cancelled by handler");
            return;
        }
        if let Some(backup) = self.take_backup() {
            *self.inner.edit.backup() = Some(backup);
            tracing::trace!(model = std::any::type_name::<M>(), "edit session started");
        }
    }

    fn cancel_edit(&self) {
        if !self.is_editing() {
            tracing::debug!("cancel_edit called without an edit session");
            return;
        }
        if raise_cancellable(&self.inner.edit.canceling) {
            tracing::debug!("cancel_edit cancelled by handler");
            return;
        }
        let backup = self.inner.edit.backup().take();
        if let Some(backup) = backup {
            self.restore(backup);
        }
    }

    fn end_edit(&self) {
        if !self.is_editing() {
            tracing::debug!("end_edit called without an edit session");
            return;
        }
        if raise_cancellable(&self.inner.edit.ending) {
            tracing::debug!("end_edit cancelled by handler");
            return;
        }
        self.inner.edit.backup().take();
    }

    fn is_editing(&self) -> bool {
        self.inner.edit.backup().is_some()
    }

    fn beginning_edit(&self) -> &Event<EditEventArgs> {
        &self.inner.edit.beginning
    }

    fn canceling_edit(&self) -> &Event<EditEventArgs> {
        &self.inner.edit.canceling
    }

    fn ending_edit(&self) -> &Event<EditEventArgs> {
        &self.inner.edit.ending
    }
}
