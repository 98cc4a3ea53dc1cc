//! Current-value holders.
//!
//! A thin layer over [`tokio::sync::watch`]: the holder always has a value,
//! and a subscriber's first read is that value no matter how late it
//! subscribed. Intermediate values between two reads may be skipped; only
//! the latest is kept.

use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

#[derive(Debug)]
pub struct Observable<T> {
    tx: Mutex<Option<watch::Sender<T>>>,
    // keeps the last value readable after close
    rx: watch::Receiver<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Replace the value and wake every subscriber. Works with zero
    /// subscribers; does nothing once closed.
    pub fn set(&self, value: T) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => {
                tx.send_replace(value);
            }
            None => tracing::debug!("dropping update to a closed observable"),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let rx = match tx.as_ref() {
            Some(tx) => tx.subscribe(),
            None => self.rx.clone(),
        };
        Subscription { rx, primed: false }
    }

    pub fn subscriber_count(&self) -> usize {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        tx.as_ref()
            .map_or(0, |tx| tx.receiver_count().saturating_sub(1))
    }

    /// Stop accepting updates. Every subscription ends after its next read.
    pub fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    /// The holder's value right now, without waiting.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Next value. The first call yields the current value immediately;
    /// later calls wait for a push. `None` once the holder is closed.
    pub async fn next(&mut self) -> Option<T> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the value satisfies `f`, checking the current value first.
    pub async fn wait_for(&mut self, mut f: impl FnMut(&T) -> bool) -> Option<T> {
        self.primed = true;
        self.rx.wait_for(|v| f(v)).await.ok().map(|v| v.clone())
    }

    /// True once the holder has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}
