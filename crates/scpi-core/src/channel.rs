//! Channel composition.
//!
//! An instrument with `K` channels stores a [`ChannelSet`] of `K` slots indexed
//! `1..=K`, built once at construction. Channel nodes are cheap borrowed views
//! ([`Channel`]) pairing the parent with one slot, so the parent never has to
//! store references to itself.

use crate::node::{AddressVars, Node};
use crate::session::Session;

/// Per-channel data stored by the instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSlot<D> {
    index: usize,
    data: D,
}

impl<D> ChannelSlot<D> {
    /// 1-based channel index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn data(&self) -> &D {
        &self.data
    }
}

/// Fixed sequence of channel slots.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSet<D = ()> {
    slots: Vec<ChannelSlot<D>>,
}

impl<D> ChannelSet<D> {
    /// Build `count` slots, calling `build` with each 1-based index.
    pub fn new(count: usize, mut build: impl FnMut(usize) -> D) -> Self {
        let slots = (1..=count)
            .map(|index| ChannelSlot {
                index,
                data: build(index),
            })
            .collect();
        Self { slots }
    }

    /// Slot for the 1-based `index`.
    pub fn get(&self, index: usize) -> Option<&ChannelSlot<D>> {
        index.checked_sub(1).and_then(|i| self.slots.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelSlot<D>> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Channel node: a parent reference plus one slot.
pub struct Channel<'a, P: ?Sized, D = ()> {
    parent: &'a P,
    slot: &'a ChannelSlot<D>,
}

impl<'a, P: ?Sized, D> Channel<'a, P, D> {
    pub fn new(parent: &'a P, slot: &'a ChannelSlot<D>) -> Self {
        Self { parent, slot }
    }

    pub fn index(&self) -> usize {
        self.slot.index
    }

    pub fn data(&self) -> &'a D {
        &self.slot.data
    }

    pub fn parent(&self) -> &'a P {
        self.parent
    }
}

impl<P: ?Sized, D> Clone for Channel<'_, P, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: ?Sized, D> Copy for Channel<'_, P, D> {}

impl<P: Node + ?Sized, D> Node for Channel<'_, P, D> {
    fn session(&self) -> &Session {
        self.parent.session()
    }

    fn address_vars(&self) -> AddressVars {
        self.parent.address_vars().with("n", self.slot.index)
    }
}

/// Instruments exposing a fixed number of channels.
pub trait Channelled: Node {
    /// Number of channels, fixed per instrument class.
    const CHANNEL_COUNT: usize;

    type Channel<'a>: Node
    where
        Self: 'a;

    /// Channel at the 1-based `index`, or `None` when out of range.
    fn channel(&self, index: usize) -> Option<Self::Channel<'_>>;

    fn channels(&self) -> Vec<Self::Channel<'_>> {
        (1..=Self::CHANNEL_COUNT)
            .filter_map(|index| self.channel(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    struct Bench {
        session: Session,
        channels: ChannelSet<&'static str>,
    }

    impl Node for Bench {
        fn session(&self) -> &Session {
            &self.session
        }
    }

    impl Channelled for Bench {
        const CHANNEL_COUNT: usize = 2;
        type Channel<'a> = Channel<'a, Bench, &'static str>;

        fn channel(&self, index: usize) -> Option<Self::Channel<'_>> {
            self.channels.get(index).map(|slot| Channel::new(self, slot))
        }
    }

    fn bench() -> Bench {
        Bench {
            session: Session::new("mock", MockTransport::new()),
            channels: ChannelSet::new(2, |index| if index == 1 { "input" } else { "output" }),
        }
    }

    #[test]
    fn channels_are_one_based() {
        let bench = bench();
        assert!(bench.channel(0).is_none());
        assert!(bench.channel(3).is_none());

        let second = bench.channel(2).unwrap();
        assert_eq!(second.index(), 2);
        assert_eq!(*second.data(), "output");
        assert_eq!(second.address_vars().index(), Some(2));
    }

    #[test]
    fn channels_share_the_root_session() {
        let bench = bench();
        let channels = bench.channels();
        assert_eq!(channels.len(), 2);
        for channel in &channels {
            assert!(std::ptr::eq(channel.session(), &bench.session));
        }
    }
}
