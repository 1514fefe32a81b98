use std::time::Duration;

use futures::future::BoxFuture;
use shared::domain::MediaItem;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::error::ViewError;

pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_millis(4000);

/// Slideshow position over a collection of `len` items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rotation {
    active: usize,
    len: usize,
}

impl Rotation {
    pub fn new(len: usize) -> Self {
        Self { active: 0, len }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if len == 0 {
            self.active = 0;
        } else if self.active >= len {
            self.active = len - 1;
        }
    }

    /// Advances one position, wrapping at the end. Returns the new index, or
    /// `None` when there is nothing to rotate.
    pub fn tick(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.active = (self.active + 1) % self.len;
        Some(self.active)
    }

    pub fn jump_to(&mut self, index: usize) -> Result<(), ViewError> {
        if index >= self.len {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.active = index;
        Ok(())
    }

    pub fn active<'a>(&self, items: &'a [MediaItem]) -> Option<&'a MediaItem> {
        items.get(self.active.min(items.len().saturating_sub(1)))
    }
}

/// Fixed-period tick source. The task runs until the timer is dropped.
pub struct RotationTimer {
    period: Duration,
    task: JoinHandle<()>,
}

impl RotationTimer {
    pub fn arm<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick().await;
            }
        });
        Self { period, task }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for RotationTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for RotationTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationTimer")
            .field("period", &self.period)
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/rotation_tests.rs"]
mod tests;
