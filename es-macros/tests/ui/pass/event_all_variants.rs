use es_domain::domain_event::DomainEvent;
use es_macros::event;

// 单元变体
#[event]
enum UnitVariantEvent {
    Activated,
    Deactivated,
}

// 元组变体
#[event]
enum TupleEvent {
    Updated(String),
    Changed(i32, String, bool),
}

// 混合变体与类型覆写
#[event]
enum MixedEvent {
    #[event(event_type = "custom.started")]
    Started,
    Updated(String),
    Completed { result: i32 },
}

// 已有 derive 与宏默认派生合并
#[event]
#[derive(Debug, Clone, serde::Serialize, Eq)]
enum MergedDeriveEvent {
    Happened { at: u64 },
}

fn main() {
    assert_eq!(UnitVariantEvent::Activated.event_type(), "UnitVariantEvent.Activated");
    assert_eq!(
        UnitVariantEvent::EVENT_TYPES,
        &["UnitVariantEvent.Activated", "UnitVariantEvent.Deactivated"]
    );

    assert_eq!(TupleEvent::Updated("x".into()).event_type(), "TupleEvent.Updated");
    assert_eq!(
        TupleEvent::Changed(1, "y".into(), true).event_type(),
        "TupleEvent.Changed"
    );

    assert_eq!(MixedEvent::Started.event_type(), "custom.started");
    assert_eq!(MixedEvent::Completed { result: 1 }.event_type(), "MixedEvent.Completed");
    assert_eq!(MixedEvent::EVENT_TYPES.len(), 3);

    let event = MergedDeriveEvent::Happened { at: 7 };
    assert_eq!(event.clone(), event);
    assert_eq!(event.event_type(), "MergedDeriveEvent.Happened");
}
