use std::sync::{Mutex, MutexGuard};

use crate::analytics::event::Event;

/// Unbounded FIFO of events waiting for the next flush.
///
/// Every operation takes the queue mutex once, so a drain is observed either entirely or not
/// at all by concurrent readers.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: Mutex<Vec<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn push(&self, event: Event) {
        self.guard().push(event);
    }

    /// Removes and returns every queued event in insertion order.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.guard())
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drain_preserves_order_and_empties() {
        let queue = EventQueue::new();
        for name in ["a", "b", "c"] {
            queue.push(Event::new(name));
        }

        let drained = queue.drain();
        let types: Vec<_> = drained.iter().map(Event::event_type).collect();
        assert_eq!(types, ["a", "b", "c"]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn clear_discards_without_returning() {
        let queue = EventQueue::new();
        queue.push(Event::new("a"));
        assert_eq!(queue.snapshot().len(), 1);
        queue.clear();
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn concurrent_pushes_are_all_drained_once() {
        let queue = Arc::new(EventQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..50 {
                        queue.push(Event::new(format!("{worker}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut total = queue.drain().len();
        total += queue.drain().len();
        assert_eq!(total, 200);
    }
}
