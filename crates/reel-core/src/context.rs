//! Context channels - shared state between a provider and its readers
//!
//! A [`Channel`] is an identity plus a default value. A provider owns a
//! [`ContextScope`] holding one slot per channel it provides; readers resolve
//! the slot by channel identity and get the object most recently published.
//! Reads are pull-based: there is no notification when a slot changes.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static CHANNEL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Identity of a context channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

/// Typed channel definition carrying a default state object
pub struct Channel<T> {
    id: ChannelId,
    initial: Rc<T>,
}

impl<T: 'static> Channel<T> {
    /// Define a new channel; every call yields a distinct identity
    pub fn define(initial: T) -> Self {
        Self {
            id: ChannelId(CHANNEL_SEQ.fetch_add(1, Ordering::Relaxed)),
            initial: Rc::new(initial),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn initial(&self) -> Rc<T> {
        Rc::clone(&self.initial)
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            initial: Rc::clone(&self.initial),
        }
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("id", &self.id).finish()
    }
}

/// Slots provided by one context provider
#[derive(Clone, Default)]
pub struct ContextScope {
    slots: Rc<RefCell<HashMap<ChannelId, Rc<dyn Any>>>>,
}

impl ContextScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide a channel, seeding its slot with the channel default
    pub fn provide<T: 'static>(&self, channel: &Channel<T>) {
        self.slots
            .borrow_mut()
            .entry(channel.id)
            .or_insert_with(|| channel.initial() as Rc<dyn Any>);
    }

    pub fn provides(&self, id: ChannelId) -> bool {
        self.slots.borrow().contains_key(&id)
    }

    /// Replace the slot's object; returns the published reference
    pub fn publish<T: 'static>(&self, channel: &Channel<T>, value: T) -> Rc<T> {
        let value = Rc::new(value);
        self.publish_rc(channel, Rc::clone(&value));
        value
    }

    /// Replace the slot's object with an existing reference
    pub fn publish_rc<T: 'static>(&self, channel: &Channel<T>, value: Rc<T>) {
        self.slots.borrow_mut().insert(channel.id, value as Rc<dyn Any>);
    }

    /// Current object for the channel, `None` if it was never provided
    pub fn read<T: 'static>(&self, channel: &Channel<T>) -> Option<Rc<T>> {
        let slot = self.slots.borrow().get(&channel.id).cloned()?;
        slot.downcast::<T>().ok()
    }
}

impl std::fmt::Debug for ContextScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.slots.borrow().keys().copied().collect();
        ids.sort();
        f.debug_struct("ContextScope").field("channels", &ids).finish()
    }
}

/// A component that provides context channels to its readers
pub trait ContextParticipant {
    /// Channels this component provides
    fn provides(&self) -> Vec<ChannelId>;

    /// The scope readers resolve channels against
    fn contexts(&self) -> &ContextScope;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Counter {
        value: u32,
    }

    #[test]
    fn test_channels_have_distinct_identity() {
        let a = Channel::define(Counter::default());
        let b = Channel::define(Counter::default());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_read_before_provide() {
        let channel = Channel::define(Counter::default());
        let scope = ContextScope::new();
        assert!(scope.read(&channel).is_none());

        scope.provide(&channel);
        let initial = scope.read(&channel).unwrap();
        assert!(Rc::ptr_eq(&initial, &channel.initial()));
    }

    #[test]
    fn test_publish_is_visible_by_reference() {
        let channel = Channel::define(Counter::default());
        let scope = ContextScope::new();
        scope.provide(&channel);

        let published = scope.publish(&channel, Counter { value: 7 });
        let reader = scope.clone();

        let first = reader.read(&channel).unwrap();
        let second = scope.read(&channel).unwrap();
        assert!(Rc::ptr_eq(&first, &published));
        assert!(Rc::ptr_eq(&second, &published));
        assert_eq!(first.value, 7);

        // earlier reads keep the object they resolved
        scope.publish(&channel, Counter { value: 8 });
        assert_eq!(first.value, 7);
        assert_eq!(reader.read(&channel).unwrap().value, 8);
    }

    #[test]
    fn test_provide_keeps_published_value() {
        let channel = Channel::define(Counter::default());
        let scope = ContextScope::new();
        scope.publish(&channel, Counter { value: 3 });
        scope.provide(&channel);
        assert_eq!(scope.read(&channel).unwrap().value, 3);
        assert!(scope.provides(channel.id()));
    }
}
