// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Health Signals
//!
//! Each subsystem (gRPC listener, HTTP listener, ...) owns a [`HealthSignal`]:
//! a boolean value holder that remembers its latest value and pushes every
//! change to its observers synchronously. Late subscribers are replayed the
//! current value immediately.
//!
//! [`HealthManager`] composes all registered signals with a logical AND and
//! exposes the result the same way. No registered checks means healthy.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements liveness aggregation for the `/health` probe

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

pub type SubscriptionId = u64;

type Observer = Arc<dyn Fn(bool) + Send + Sync>;

struct SignalState {
    value: bool,
    next_id: SubscriptionId,
    observers: Vec<(SubscriptionId, Observer)>,
}

/// Boolean value holder with replay-on-subscribe.
///
/// Cloning yields another handle to the same signal.
#[derive(Clone)]
pub struct HealthSignal {
    state: Arc<Mutex<SignalState>>,
}

impl HealthSignal {
    pub fn new(initial: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SignalState {
                value: initial,
                next_id: 0,
                observers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> bool {
        self.state.lock().value
    }

    /// Stores `value` and notifies observers if it changed. Observers run on
    /// the caller's thread after the internal lock is released.
    pub fn set(&self, value: bool) {
        let observers: Vec<Observer> = {
            let mut state = self.state.lock();
            if state.value == value {
                return;
            }
            state.value = value;
            state.observers.iter().map(|(_, o)| o.clone()).collect()
        };

        for observer in observers {
            observer(value);
        }
    }

    /// Registers `observer` and immediately replays the current value to it.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        let (id, current) = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, observer.clone()));
            (id, state.value)
        };

        observer(current);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock().observers.retain(|(sid, _)| *sid != id);
    }
}

impl std::fmt::Debug for HealthSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthSignal")
            .field("value", &self.get())
            .finish_non_exhaustive()
    }
}

struct RegisteredCheck {
    signal: HealthSignal,
    subscription: SubscriptionId,
    generation: u64,
    value: bool,
}

#[derive(Default)]
struct ManagerState {
    checks: BTreeMap<String, RegisteredCheck>,
    next_generation: u64,
}

struct ManagerInner {
    state: Mutex<ManagerState>,
    aggregate: HealthSignal,
}

impl ManagerInner {
    fn update(&self, name: &str, generation: u64, value: bool) {
        let aggregate = {
            let mut state = self.state.lock();
            match state.checks.get_mut(name) {
                Some(check) if check.generation == generation => check.value = value,
                _ => return,
            }
            state.checks.values().all(|check| check.value)
        };

        debug!(check = name, value, aggregate, "Health check updated");
        if aggregate != self.aggregate.get() {
            info!(healthy = aggregate, "Aggregate health changed");
        }
        self.aggregate.set(aggregate);
    }
}

/// Process-wide health aggregator.
///
/// Registered signals only hold a weak reference back to the manager, so
/// dropping the last manager handle releases it even while signals live on.
#[derive(Clone)]
pub struct HealthManager {
    inner: Arc<ManagerInner>,
}

impl Default for HealthManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                state: Mutex::new(ManagerState::default()),
                aggregate: HealthSignal::new(true),
            }),
        }
    }

    /// Adds `signal` to the aggregate under `name`. Registering an existing
    /// name replaces the previous signal.
    pub fn register_check(&self, name: impl Into<String>, signal: HealthSignal) {
        let name = name.into();
        info!("Registering health check: {}", name);

        let generation = {
            let mut state = self.inner.state.lock();
            let generation = state.next_generation;
            state.next_generation += 1;

            let previous = state.checks.insert(
                name.clone(),
                RegisteredCheck {
                    signal: signal.clone(),
                    subscription: SubscriptionId::MAX,
                    generation,
                    value: signal.get(),
                },
            );
            if let Some(previous) = previous {
                previous.signal.unsubscribe(previous.subscription);
            }
            generation
        };

        let manager: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let check_name = name.clone();
        let subscription = signal.subscribe(move |value| {
            if let Some(manager) = manager.upgrade() {
                manager.update(&check_name, generation, value);
            }
        });

        let mut state = self.inner.state.lock();
        match state.checks.get_mut(&name) {
            Some(check) if check.generation == generation => check.subscription = subscription,
            // Replaced while subscribing.
            _ => signal.unsubscribe(subscription),
        }
    }

    /// Current aggregate value: AND over every registered check.
    pub fn healthy(&self) -> bool {
        self.inner.aggregate.get()
    }

    /// Latest value of every registered check, ordered by name.
    pub fn checks(&self) -> Vec<(String, bool)> {
        self.inner
            .state
            .lock()
            .checks
            .iter()
            .map(|(name, check)| (name.clone(), check.value))
            .collect()
    }

    /// Subscribes to the aggregate; the current value is replayed at once.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.aggregate.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.aggregate.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_signal_replays_current_value_to_late_subscribers() {
        let signal = HealthSignal::new(false);
        signal.set(true);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        signal.subscribe(move |value| sink.lock().push(value));

        assert_eq!(*seen.lock(), vec![true]);
    }

    #[test]
    fn test_signal_pushes_changes_only() {
        let signal = HealthSignal::new(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = signal.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(false);
        signal.set(true);
        signal.set(true);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        signal.unsubscribe(id);
        signal.set(false);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_manager_is_healthy() {
        assert!(HealthManager::new().healthy());
    }

    #[test]
    fn test_aggregate_is_logical_and() {
        let manager = HealthManager::new();
        let grpc = HealthSignal::new(false);
        let http = HealthSignal::new(false);
        manager.register_check("GRPC server", grpc.clone());
        manager.register_check("HTTP server", http.clone());
        assert!(!manager.healthy());

        grpc.set(true);
        assert!(!manager.healthy());

        http.set(true);
        assert!(manager.healthy());
        assert_eq!(
            manager.checks(),
            vec![
                ("GRPC server".to_string(), true),
                ("HTTP server".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_aggregate_subscribers_see_changes() {
        let manager = HealthManager::new();
        let signal = HealthSignal::new(false);
        manager.register_check("HTTP server", signal.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        manager.subscribe(move |value| sink.lock().push(value));

        signal.set(true);
        assert_eq!(*seen.lock(), vec![false, true]);
    }

    #[test]
    fn test_duplicate_name_last_registration_wins() {
        let manager = HealthManager::new();
        let first = HealthSignal::new(false);
        let second = HealthSignal::new(true);
        manager.register_check("db", first.clone());
        manager.register_check("db", second.clone());

        assert!(manager.healthy());
        // The replaced signal no longer contributes.
        first.set(true);
        first.set(false);
        assert!(manager.healthy());

        second.set(false);
        assert!(!manager.healthy());
    }

    #[test]
    fn test_dropping_manager_releases_it() {
        let signal = HealthSignal::new(false);
        let manager = HealthManager::new();
        manager.register_check("HTTP server", signal.clone());

        let weak = Arc::downgrade(&manager.inner);
        drop(manager);
        assert!(weak.upgrade().is_none());

        // Signals outlive the manager without side effects.
        signal.set(true);
        assert!(signal.get());
    }
}
