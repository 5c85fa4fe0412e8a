use chrono::{DateTime, Utc};
use std::ops::Deref;
use std::slice::Iter;
use std::vec::IntoIter;

use crate::value_object::Version;

use super::event_envelope::EventEnvelope;

/// 聚合事件集合，按聚合版本升序排列，便于获取创建/修改时间等信息
#[derive(Debug, Clone)]
pub struct AggregateEvents<E> {
    events: Vec<EventEnvelope<E>>,
}

impl<E> Default for AggregateEvents<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> AggregateEvents<E> {
    /// 调用方需保证 `events` 已按版本升序
    pub fn new(events: Vec<EventEnvelope<E>>) -> Self {
        Self { events }
    }

    /// 获取创建时间（第一个事件的发生时间）
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.events
            .first()
            .and_then(|e| e.metadata().timestamp().ok())
    }

    /// 获取最后修改时间（最后一个事件的发生时间）
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        self.events
            .last()
            .and_then(|e| e.metadata().timestamp().ok())
    }

    /// 最后一个事件的聚合版本
    pub fn latest_version(&self) -> Option<Version> {
        self.events.last().and_then(|e| e.aggregate_version().ok())
    }

    pub fn events(&self) -> &[EventEnvelope<E>] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 迭代事件引用（不消费 AggregateEvents）
    pub fn iter(&self) -> Iter<'_, EventEnvelope<E>> {
        self.events.iter()
    }
}

impl<E> IntoIterator for AggregateEvents<E> {
    type Item = EventEnvelope<E>;
    type IntoIter = IntoIter<EventEnvelope<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a AggregateEvents<E> {
    type Item = &'a EventEnvelope<E>;
    type IntoIter = Iter<'a, EventEnvelope<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl<E> Deref for AggregateEvents<E> {
    type Target = [EventEnvelope<E>];

    fn deref(&self) -> &Self::Target {
        &self.events
    }
}
