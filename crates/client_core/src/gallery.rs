use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use futures::FutureExt;
use shared::domain::{Category, MediaItem, MediaKey};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info};

use crate::{
    error::ViewError,
    focus::{FocusController, KeyboardHub, PointerTarget},
    loader::{CollectionLoader, LoadOutcome, LoadSource},
    pagination::{PageInfo, Paginator},
    rotation::{Rotation, RotationTimer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Rotation { interval: Duration },
    Pagination { page_size: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
    Loaded {
        category: Category,
        count: usize,
        source: LoadSource,
    },
    LoadFailed {
        category: Category,
        reason: String,
    },
    ActiveIndexChanged(usize),
    PageChanged(usize),
    FocusChanged(Option<MediaKey>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSnapshot {
    Rotation {
        active_index: usize,
        rotating: bool,
    },
    Pagination {
        page_index: usize,
        total_pages: usize,
        visible: Vec<MediaItem>,
    },
}

/// What a host page renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GallerySnapshot {
    pub category: Category,
    pub items: Vec<MediaItem>,
    pub loading: bool,
    pub failure: Option<String>,
    pub view: ViewSnapshot,
    pub selected: Option<MediaItem>,
}

#[derive(Debug)]
enum ViewMode {
    Rotation {
        rotation: Rotation,
        interval: Duration,
        timer: Option<RotationTimer>,
    },
    Pagination(Paginator),
}

impl ViewMode {
    fn set_len(&mut self, len: usize) {
        match self {
            Self::Rotation { rotation, .. } => rotation.set_len(len),
            Self::Pagination(paginator) => paginator.set_len(len),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    items: Vec<MediaItem>,
    loading: bool,
    failure: Option<String>,
    mounted: bool,
    /// Bumped per issued load; only the latest one may land.
    generation: u64,
    view: ViewMode,
    focus: FocusController,
}

type SharedState = Arc<Mutex<SessionState>>;

/// One mounted page: a collection load plus the views derived from it.
pub struct GallerySession {
    category: Category,
    loader: Arc<CollectionLoader>,
    state: SharedState,
    events: broadcast::Sender<GalleryEvent>,
    loading_tx: Arc<watch::Sender<bool>>,
}

impl GallerySession {
    pub fn mount(
        loader: Arc<CollectionLoader>,
        category: Category,
        discipline: Discipline,
        hub: &KeyboardHub,
    ) -> Result<Self, ViewError> {
        let view = match discipline {
            Discipline::Rotation { interval } if interval.is_zero() => {
                return Err(ViewError::InvalidInterval)
            }
            Discipline::Rotation { interval } => ViewMode::Rotation {
                rotation: Rotation::new(0),
                interval,
                timer: None,
            },
            Discipline::Pagination { page_size } => {
                ViewMode::Pagination(Paginator::new(page_size)?)
            }
        };
        let (events, _) = broadcast::channel(256);
        let (loading_tx, _) = watch::channel(true);
        let session = Self {
            category,
            loader,
            state: Arc::new(Mutex::new(SessionState {
                items: Vec::new(),
                loading: true,
                failure: None,
                mounted: true,
                generation: 0,
                view,
                focus: FocusController::new(hub),
            })),
            events,
            loading_tx: Arc::new(loading_tx),
        };
        session.spawn_load(0);
        Ok(session)
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GalleryEvent> {
        self.events.subscribe()
    }

    /// Resolves once the current load has settled, successfully or not.
    pub async fn settled(&self) {
        let mut rx = self.loading_tx.subscribe();
        let _ = rx.wait_for(|loading| !*loading).await;
    }

    /// Issues a fresh load, e.g. from a retry affordance after a failure.
    pub async fn retry(&self) {
        let generation = {
            let mut state = self.state.lock().await;
            if !state.mounted {
                return;
            }
            state.generation += 1;
            state.loading = true;
            self.loading_tx.send_replace(true);
            state.generation
        };
        self.spawn_load(generation);
    }

    pub async fn snapshot(&self) -> GallerySnapshot {
        let state = self.state.lock().await;
        let view = match &state.view {
            ViewMode::Rotation {
                rotation, timer, ..
            } => ViewSnapshot::Rotation {
                active_index: rotation.active_index(),
                rotating: timer.as_ref().is_some_and(RotationTimer::is_armed),
            },
            ViewMode::Pagination(paginator) => ViewSnapshot::Pagination {
                page_index: paginator.page_index(),
                total_pages: paginator.total_pages(),
                visible: paginator.visible(&state.items).to_vec(),
            },
        };
        GallerySnapshot {
            category: self.category.clone(),
            items: state.items.clone(),
            loading: state.loading,
            failure: state.failure.clone(),
            view,
            selected: state.focus.selected().cloned(),
        }
    }

    pub async fn jump_to(&self, index: usize) -> Result<(), ViewError> {
        let mut state = self.state.lock().await;
        match &mut state.view {
            ViewMode::Rotation { rotation, .. } => rotation.jump_to(index)?,
            ViewMode::Pagination(_) => {
                return Err(ViewError::WrongDiscipline {
                    expected: "rotation",
                })
            }
        }
        let _ = self.events.send(GalleryEvent::ActiveIndexChanged(index));
        Ok(())
    }

    pub async fn page_info(&self) -> Result<PageInfo, ViewError> {
        self.with_paginator(|paginator| paginator.info()).await
    }

    pub async fn next_page(&self) -> Result<bool, ViewError> {
        self.with_paginator(Paginator::next).await
    }

    pub async fn prev_page(&self) -> Result<bool, ViewError> {
        self.with_paginator(Paginator::prev).await
    }

    pub async fn go_to_page(&self, page: usize) -> Result<(), ViewError> {
        self.with_paginator(|paginator| paginator.go_to(page))
            .await?
    }

    async fn with_paginator<T>(
        &self,
        op: impl FnOnce(&mut Paginator) -> T,
    ) -> Result<T, ViewError> {
        let mut state = self.state.lock().await;
        let ViewMode::Pagination(paginator) = &mut state.view else {
            return Err(ViewError::WrongDiscipline {
                expected: "pagination",
            });
        };
        let before = paginator.page_index();
        let out = op(paginator);
        let after = paginator.page_index();
        if before != after {
            let _ = self.events.send(GalleryEvent::PageChanged(after));
        }
        Ok(out)
    }

    /// Opens the lightbox on an item of the current collection.
    pub async fn open(&self, key: &MediaKey) -> Result<(), ViewError> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .iter()
            .find(|item| &item.key == key)
            .cloned()
            .ok_or_else(|| ViewError::UnknownItem {
                key: key.to_string(),
            })?;
        state.focus.open(item);
        let _ = self
            .events
            .send(GalleryEvent::FocusChanged(Some(key.clone())));
        Ok(())
    }

    pub async fn close(&self) -> bool {
        let closed = self.state.lock().await.focus.close();
        if closed {
            let _ = self.events.send(GalleryEvent::FocusChanged(None));
        }
        closed
    }

    pub async fn pointer(&self, target: PointerTarget) -> bool {
        let closed = self.state.lock().await.focus.pointer(target);
        if closed {
            let _ = self.events.send(GalleryEvent::FocusChanged(None));
        }
        closed
    }

    /// Feeds pending key presses to the lightbox.
    pub async fn pump_keys(&self) -> bool {
        let closed = self.state.lock().await.focus.pump();
        if closed {
            let _ = self.events.send(GalleryEvent::FocusChanged(None));
        }
        closed
    }

    /// Tears the page down: stops rotation, closes the lightbox and makes any
    /// in-flight load result a no-op.
    pub async fn unmount(&self) {
        let mut state = self.state.lock().await;
        state.mounted = false;
        if let ViewMode::Rotation { timer, .. } = &mut state.view {
            *timer = None;
        }
        state.focus.close();
        debug!(category = %self.category, "gallery unmounted");
    }

    fn spawn_load(&self, generation: u64) {
        let loader = Arc::clone(&self.loader);
        let category = self.category.clone();
        let state = Arc::downgrade(&self.state);
        let events = self.events.clone();
        let loading_tx = Arc::clone(&self.loading_tx);
        tokio::spawn(async move {
            let outcome = loader.load(&category).await;
            let event = match state.upgrade() {
                Some(state) => {
                    let mut guard = state.lock().await;
                    if guard.generation != generation {
                        debug!(%category, generation, "discarding superseded load result");
                        return;
                    }
                    let event = if guard.mounted {
                        Some(apply_outcome(&mut guard, &state, &events, outcome))
                    } else {
                        debug!(%category, "discarding load result after unmount");
                        None
                    };
                    loading_tx.send_replace(false);
                    event
                }
                None => {
                    debug!(%category, "discarding load result for dropped gallery");
                    loading_tx.send_replace(false);
                    None
                }
            };
            if let Some(event) = event {
                let _ = events.send(event);
            }
        });
    }
}

fn apply_outcome(
    state: &mut SessionState,
    shared: &SharedState,
    events: &broadcast::Sender<GalleryEvent>,
    outcome: LoadOutcome,
) -> GalleryEvent {
    let event = match &outcome {
        LoadOutcome::Loaded { collection, source } => GalleryEvent::Loaded {
            category: collection.category.clone(),
            count: collection.items.len(),
            source: *source,
        },
        LoadOutcome::Failed { category, reason } => GalleryEvent::LoadFailed {
            category: category.clone(),
            reason: reason.to_string(),
        },
    };
    state.failure = match &outcome {
        LoadOutcome::Failed { reason, .. } => Some(reason.to_string()),
        LoadOutcome::Loaded { .. } => None,
    };
    state.items = outcome.into_items();
    state.loading = false;
    state.view.set_len(state.items.len());

    let len = state.items.len();
    if let ViewMode::Rotation {
        interval, timer, ..
    } = &mut state.view
    {
        *timer = None;
        if len > 0 {
            *timer = Some(arm_rotation(*interval, Arc::downgrade(shared), events.clone()));
        }
    }
    info!(count = len, "gallery items replaced");
    event
}

fn arm_rotation(
    interval: Duration,
    state: Weak<Mutex<SessionState>>,
    events: broadcast::Sender<GalleryEvent>,
) -> RotationTimer {
    RotationTimer::arm(interval, move || {
        let state = state.clone();
        let events = events.clone();
        async move {
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut guard = state.lock().await;
            if !guard.mounted {
                return;
            }
            if let ViewMode::Rotation { rotation, .. } = &mut guard.view {
                if let Some(index) = rotation.tick() {
                    let _ = events.send(GalleryEvent::ActiveIndexChanged(index));
                }
            }
        }
        .boxed()
    })
}

#[cfg(test)]
#[path = "tests/gallery_tests.rs"]
mod tests;
