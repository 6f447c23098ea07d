//! Tracing output of the bus: rejected subscriptions are loud, pruning is
//! reported at debug level under the `regent.bus` target.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use regent_core::{Bus, Liveness, Message};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone, Debug)]
struct CapturedEvent {
    level: Level,
    target: String,
    message: String,
}

struct Capture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Capture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}

fn with_capture<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(Capture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, f);
    events.lock().unwrap().clone()
}

struct Live(RefCell<HashSet<String>>);

impl Liveness for Live {
    fn is_live(&self, key: &str) -> bool {
        self.0.borrow().contains(key)
    }
}

#[test]
fn unscoped_subscription_emits_error() {
    let events = with_capture(|| {
        let ctx = Live(RefCell::new(HashSet::new()));
        let bus = Bus::new();
        let _sub = bus.subscribe(&ctx, "GeometryChange", "", |_: &Live, _: &Message| {});
    });
    let errors: Vec<_> = events.iter().filter(|e| e.level == Level::ERROR).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].target, "regent.bus");
    assert!(errors[0].message.contains("liveness key"));
}

#[test]
fn pruning_is_reported_at_debug() {
    let events = with_capture(|| {
        let ctx = Live(RefCell::new(["a".to_string()].into_iter().collect()));
        let bus = Bus::new();
        let _sub = bus.subscribe(&ctx, "q", "a", |_: &Live, _: &Message| {});
        ctx.0.borrow_mut().clear();
        bus.publish(&ctx, "q", &Message::null());
    });
    assert!(
        events
            .iter()
            .any(|e| e.level == Level::DEBUG && e.target == "regent.bus" && e.message == "published")
    );
    assert!(events.iter().all(|e| e.level != Level::ERROR));
}
