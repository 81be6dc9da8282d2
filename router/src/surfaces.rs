use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tether_types::SurfaceId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceState {
    pub full_screen: bool,
}

/// Per-surface UI bookkeeping shared by every router in the host.
///
/// At most one surface is full screen at a time.
#[derive(Debug, Default)]
pub struct SurfaceManager {
    surfaces: Mutex<HashMap<SurfaceId, SurfaceState>>,
}

impl SurfaceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SurfaceId, SurfaceState>> {
        self.surfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, id: SurfaceId) {
        self.lock().entry(id).or_default();
    }

    pub fn remove(&self, id: &SurfaceId) -> bool {
        self.lock().remove(id).is_some()
    }

    #[must_use]
    pub fn state(&self, id: &SurfaceId) -> Option<SurfaceState> {
        self.lock().get(id).copied()
    }

    /// Flip full screen for `id` and return the new value.
    pub fn toggle_full_screen(&self, id: &SurfaceId) -> bool {
        let mut surfaces = self.lock();
        let now = !surfaces.get(id).is_some_and(|s| s.full_screen);
        if now {
            for state in surfaces.values_mut() {
                state.full_screen = false;
            }
        }
        surfaces.entry(id.clone()).or_default().full_screen = now;
        now
    }

    #[must_use]
    pub fn full_screen_surface(&self) -> Option<SurfaceId> {
        self.lock()
            .iter()
            .find(|(_, state)| state.full_screen)
            .map(|(id, _)| id.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
