use colloquy_core::error::ColloquyError;
use colloquy_core::types::ChatEntry;

type EntryListener = Box<dyn Fn(&ChatEntry) + Send + Sync>;
type ErrorListener = Box<dyn Fn(&ColloquyError) + Send + Sync>;

/// Listener lists per event kind, invoked synchronously in registration
/// order. Message listeners see every appended conversation entry,
/// interrupt listeners see the suspension marker, and error listeners see
/// every classified failure.
#[derive(Default)]
pub(crate) struct EventHandlers {
    message: Vec<EntryListener>,
    interrupt: Vec<EntryListener>,
    error: Vec<ErrorListener>,
}

impl EventHandlers {
    pub(crate) fn on_message(&mut self, listener: impl Fn(&ChatEntry) + Send + Sync + 'static) {
        self.message.push(Box::new(listener));
    }

    pub(crate) fn on_interrupt(&mut self, listener: impl Fn(&ChatEntry) + Send + Sync + 'static) {
        self.interrupt.push(Box::new(listener));
    }

    pub(crate) fn on_error(&mut self, listener: impl Fn(&ColloquyError) + Send + Sync + 'static) {
        self.error.push(Box::new(listener));
    }

    pub(crate) fn emit_message(&self, entry: &ChatEntry) {
        for listener in &self.message {
            listener(entry);
        }
    }

    pub(crate) fn emit_interrupt(&self, entry: &ChatEntry) {
        for listener in &self.interrupt {
            listener(entry);
        }
    }

    pub(crate) fn emit_error(&self, error: &ColloquyError) {
        for listener in &self.error {
            listener(error);
        }
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("message", &self.message.len())
            .field("interrupt", &self.interrupt.len())
            .field("error", &self.error.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_listeners_fire_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handlers = EventHandlers::default();

        for tag in ["first", "second"] {
            let order = order.clone();
            handlers.on_message(move |_| order.lock().unwrap().push(tag));
        }

        handlers.emit_message(&ChatEntry::success("a", "b", "hi"));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_error_listeners() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut handlers = EventHandlers::default();
        let seen = count.clone();
        handlers.on_error(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        handlers.emit_error(&ColloquyError::NotSuspended);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
