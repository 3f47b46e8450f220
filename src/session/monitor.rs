// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::state::{AtomicSessionState, SessionState};
use crate::analysis::TimingProfile;
use crate::capture::NoteEvent;

/// Session data published for observers on other threads.
#[derive(Debug)]
pub(super) struct Shared {
    pub(super) state: AtomicSessionState,
    pub(super) monitoring: AtomicBool,
    /// Events accepted by the current or most recent capture.
    pub(super) event_count: AtomicUsize,
    /// Written only on the control thread when a calibration stops.
    pub(super) profile: RwLock<TimingProfile>,
    /// The paired events of the last completed capture.
    pub(super) performance: RwLock<Arc<[NoteEvent]>>,
}

impl Shared {
    pub(super) fn new() -> Shared {
        Shared {
            state: AtomicSessionState::new(SessionState::Idle),
            monitoring: AtomicBool::new(true),
            event_count: AtomicUsize::new(0),
            profile: RwLock::new(TimingProfile::invalid()),
            performance: RwLock::new(Arc::from(Vec::new())),
        }
    }
}

/// A read-only view of a session for control surfaces and displays.
///
/// Monitors are cheap to clone and can be polled from any thread. The audio thread never waits
/// on a monitor.
#[derive(Debug, Clone)]
pub struct SessionMonitor {
    shared: Arc<Shared>,
}

impl SessionMonitor {
    pub(super) fn new(shared: Arc<Shared>) -> SessionMonitor {
        SessionMonitor { shared }
    }

    /// Gets the current state.
    pub fn state(&self) -> SessionState {
        self.shared.state.load()
    }

    /// Gets the timing profile of the last calibration.
    pub fn timing_profile(&self) -> TimingProfile {
        *self.shared.profile.read()
    }

    pub fn is_calibrated(&self) -> bool {
        self.timing_profile().is_valid()
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.shared.monitoring.load(Ordering::Acquire)
    }

    /// Gets the number of events captured so far, updated while recording.
    pub fn event_count(&self) -> usize {
        self.shared.event_count.load(Ordering::Relaxed)
    }

    /// Gets the paired events of the last completed performance.
    pub fn performance(&self) -> Arc<[NoteEvent]> {
        self.shared.performance.read().clone()
    }

    /// Gets the time of the last event of the last completed performance.
    pub fn performance_duration(&self) -> f64 {
        self.shared
            .performance
            .read()
            .last()
            .map_or(0.0, NoteEvent::timestamp)
    }
}
