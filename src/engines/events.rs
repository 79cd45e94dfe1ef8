//! Named publish/subscribe used to decouple the engine from its observers.
//!
//! Event names form a closed set ([`Event`]) with one payload shape per kind.
//! Algorithms may add [`Event::Custom`] names, which always carry an empty
//! payload. The standing events are never removed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::population::Population;
use crate::error::EvoError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Event {
    /// After initialization, before generation 0.
    Init,
    /// After every generation's termination check.
    AfterGeneration,
    /// After the algorithm's finish hook.
    EvolutionFinished,
    Custom(String),
}

impl Event {
    pub const STANDING: [Event; 3] = [Event::Init, Event::AfterGeneration, Event::EvolutionFinished];

    pub fn name(&self) -> &str {
        match self {
            Event::Init => "init",
            Event::AfterGeneration => "after_generation",
            Event::EvolutionFinished => "evolution_finished",
            Event::Custom(name) => name,
        }
    }

    /// Maps standing names to their variant and anything else to `Custom`.
    pub fn from_name(name: &str) -> Event {
        match name {
            "init" => Event::Init,
            "after_generation" => Event::AfterGeneration,
            "evolution_finished" => Event::EvolutionFinished,
            other => Event::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data handed to subscribers, borrowed from the publisher.
pub enum EventPayload<'a, I> {
    Init {
        population: &'a Population<I>,
        statistics: Vec<String>,
        breeder: &'a str,
        termination_checker: &'a str,
        max_generation: usize,
        events: Vec<Event>,
        max_workers: Option<usize>,
    },
    AfterGeneration {
        population: &'a Population<I>,
        best_of_run: Option<&'a I>,
        generation_num: usize,
    },
    EvolutionFinished {
        population: &'a Population<I>,
        best_of_run: Option<&'a I>,
        final_generation: usize,
    },
    /// Payload of events without a dedicated shape.
    Empty,
}

impl<'a, I> EventPayload<'a, I> {
    pub fn population(&self) -> Option<&'a Population<I>> {
        match self {
            EventPayload::Init { population, .. }
            | EventPayload::AfterGeneration { population, .. }
            | EventPayload::EvolutionFinished { population, .. } => Some(*population),
            EventPayload::Empty => None,
        }
    }
}

pub type Callback<I> =
    Box<dyn for<'a> FnMut(&Event, &EventPayload<'a, I>) -> anyhow::Result<()> + Send>;

/// Registry of event name -> subscriber identity -> callback.
pub struct EventBus<I> {
    events: HashMap<Event, BTreeMap<String, Callback<I>>>,
}

impl<I> Default for EventBus<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> fmt::Debug for EventBus<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in self.event_names() {
            map.entry(&event.name().to_string(), &self.subscriber_count(&event));
        }
        map.finish()
    }
}

impl<I> EventBus<I> {
    pub fn new() -> Self {
        Self {
            events: HashMap::new(),
        }
    }

    pub fn with_events<E>(events: E) -> Self
    where
        E: IntoIterator<Item = Event>,
    {
        let mut bus = Self::new();
        for event in events {
            bus.register(event);
        }
        bus
    }

    /// Makes `event` publishable. Returns false if it was already known.
    pub fn register(&mut self, event: Event) -> bool {
        if self.events.contains_key(&event) {
            return false;
        }
        self.events.insert(event, BTreeMap::new());
        true
    }

    pub fn is_registered(&self, event: &Event) -> bool {
        self.events.contains_key(event)
    }

    /// Registers `callback` for `(event, subscriber)`, replacing any previous
    /// callback of the same pair. Returns true if one was replaced.
    pub fn subscribe<S, F>(&mut self, event: Event, subscriber: S, callback: F) -> bool
    where
        S: Into<String>,
        F: for<'a> FnMut(&Event, &EventPayload<'a, I>) -> anyhow::Result<()> + Send + 'static,
    {
        self.events
            .entry(event)
            .or_default()
            .insert(subscriber.into(), Box::new(callback))
            .is_some()
    }

    pub fn unsubscribe(&mut self, event: &Event, subscriber: &str) -> bool {
        self.events
            .get_mut(event)
            .map(|subscribers| subscribers.remove(subscriber).is_some())
            .unwrap_or(false)
    }

    /// Invokes every callback registered for `event`, in subscriber order.
    ///
    /// Publishing a registered event without subscribers does nothing.
    /// Publishing an event that was never registered is an error.
    pub fn publish(&mut self, event: &Event, payload: &EventPayload<'_, I>) -> Result<(), EvoError> {
        let subscribers = match self.events.get_mut(event) {
            Some(subscribers) => subscribers,
            None => {
                log::warn!("Attempted to publish unregistered event '{}'", event);
                return Err(EvoError::UnknownEvent(event.name().to_string()));
            }
        };
        for callback in subscribers.values_mut() {
            callback(event, payload)?;
        }
        Ok(())
    }

    /// Registered events, sorted.
    pub fn event_names(&self) -> Vec<Event> {
        let mut names: Vec<Event> = self.events.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn subscriber_count(&self, event: &Event) -> usize {
        self.events.get(event).map(BTreeMap::len).unwrap_or(0)
    }
}
