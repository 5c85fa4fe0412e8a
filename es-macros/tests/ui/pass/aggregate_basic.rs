use es_domain::aggregate::Aggregate;
use es_domain::entity::Entity;
use es_domain::value_object::Version;
use es_macros::{aggregate, event};

#[event]
enum CounterEvent {
    #[event(event_type = "counter.incremented")]
    Incremented { by: i64 },
    #[event(event_type = "counter.reset")]
    Reset,
}

#[aggregate(id = u64, event = CounterEvent)]
#[derive(Clone)]
struct Counter {
    value: i64,
}

impl Aggregate for Counter {
    const TYPE: &'static str = "counter";

    fn apply(&mut self, event: &CounterEvent) {
        match event {
            CounterEvent::Incremented { by } => self.value += by,
            CounterEvent::Reset => self.value = 0,
        }
    }
}

// 默认 id 类型为 String，单元结构体也可以作为聚合
#[aggregate(event = CounterEvent, debug = false)]
struct Marker;

impl std::fmt::Debug for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Marker")
    }
}

fn main() {
    let mut counter = Counter::new(42);
    assert_eq!(*counter.id(), 42);
    assert_eq!(counter.version(), Version::new());

    counter.emit(CounterEvent::Incremented { by: 5 });
    counter.emit(CounterEvent::Incremented { by: 2 });
    assert_eq!(counter.value, 7);
    assert_eq!(counter.version(), Version::from_value(2));
    assert!(counter.validate_version().is_ok());
    assert!(counter.validate_state().is_ok());

    let copy = counter.clone();
    assert_eq!(copy.uncommitted_events().len(), 2);

    let marker = Marker::default();
    let id: &String = marker.id();
    assert!(id.is_empty());
    assert_eq!(format!("{marker:?}"), "Marker");
}
