//! Live-view state machine and frame buffer.
//!
//! The camera acknowledges output-device changes asynchronously. While a
//! change is in flight the controller sits in a `Waiting*` state and only
//! records the state it should end up in; requests issued while waiting
//! never produce extra device commands.

use tracing::debug;

/// Live-view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveViewState {
    /// Live view is not wanted.
    Off,
    /// Output to the host was requested and not yet acknowledged.
    WaitingToStart,
    /// Streaming.
    On,
    /// Wanted on, but interrupted (e.g. by a capture).
    Paused,
    /// Output stop was requested and not yet acknowledged.
    WaitingToStop,
}

impl LiveViewState {
    /// Whether this is one of the `Waiting*` states.
    #[must_use]
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::WaitingToStart | Self::WaitingToStop)
    }
}

/// Output-device change the controller wants sent to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRequest {
    /// Route live view to the host.
    Start,
    /// Stop routing live view to the host.
    Stop,
}

/// Why a frame grab was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabSkip {
    /// Start was requested and the camera has not acknowledged yet.
    NotYetOn,
    /// Live view is not wanted on right now.
    NotWantedOn,
}

impl std::fmt::Display for GrabSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotYetOn => write!(f, "live view is not on yet"),
            Self::NotWantedOn => write!(f, "live view is not wanted on"),
        }
    }
}

/// Live-view controller.
#[derive(Debug, Clone)]
pub struct LiveView {
    state: LiveViewState,
    // Only meaningful while `state.is_waiting()`.
    desired: LiveViewState,
}

impl Default for LiveView {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveView {
    /// Controller in the `Off` state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: LiveViewState::Off,
            desired: LiveViewState::Off,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LiveViewState {
        self.state
    }

    /// End state wanted once the pending acknowledgment arrives.
    #[must_use]
    pub const fn desired(&self) -> Option<LiveViewState> {
        if self.state.is_waiting() {
            Some(self.desired)
        } else {
            None
        }
    }

    /// Whether live view is on or on its way to being on.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        match self.state {
            LiveViewState::On => true,
            LiveViewState::WaitingToStart | LiveViewState::WaitingToStop => {
                matches!(self.desired, LiveViewState::On)
            }
            LiveViewState::Off | LiveViewState::Paused => false,
        }
    }

    /// Ask for live view to be on.
    pub fn start(&mut self) -> Option<OutputRequest> {
        match self.state {
            LiveViewState::Off | LiveViewState::Paused => {
                self.enter(LiveViewState::WaitingToStart, LiveViewState::On);
                Some(OutputRequest::Start)
            }
            LiveViewState::WaitingToStart | LiveViewState::WaitingToStop => {
                self.desire(LiveViewState::On);
                None
            }
            LiveViewState::On => None,
        }
    }

    /// Ask for live view to be off.
    pub fn stop(&mut self) -> Option<OutputRequest> {
        match self.state {
            LiveViewState::On => {
                self.enter(LiveViewState::WaitingToStop, LiveViewState::Off);
                Some(OutputRequest::Stop)
            }
            LiveViewState::Paused => {
                self.enter(LiveViewState::Off, LiveViewState::Off);
                None
            }
            LiveViewState::WaitingToStart | LiveViewState::WaitingToStop => {
                self.desire(LiveViewState::Off);
                None
            }
            LiveViewState::Off => None,
        }
    }

    /// Interrupt live view, remembering that it should come back.
    pub fn pause(&mut self) -> Option<OutputRequest> {
        match self.state {
            LiveViewState::On => {
                self.enter(LiveViewState::WaitingToStop, LiveViewState::Paused);
                Some(OutputRequest::Stop)
            }
            LiveViewState::WaitingToStart | LiveViewState::WaitingToStop => {
                self.desire(LiveViewState::Paused);
                None
            }
            LiveViewState::Off | LiveViewState::Paused => None,
        }
    }

    /// Undo a pause.
    pub fn resume(&mut self) -> Option<OutputRequest> {
        match self.state {
            LiveViewState::Paused => self.start(),
            LiveViewState::WaitingToStart | LiveViewState::WaitingToStop => {
                self.desire(LiveViewState::On);
                None
            }
            LiveViewState::Off | LiveViewState::On => None,
        }
    }

    /// The camera reported its live-view output device.
    ///
    /// Settles a `Waiting*` state. If the wanted end state disagrees with
    /// what the camera now does, exactly one follow-on request is returned.
    pub fn output_changed(&mut self, to_host: bool) -> Option<OutputRequest> {
        match (self.state, to_host) {
            (LiveViewState::WaitingToStart, true) => {
                debug!("live view output acknowledged: streaming to host");
                match self.desired {
                    LiveViewState::On => {
                        self.enter(LiveViewState::On, LiveViewState::On);
                        None
                    }
                    wanted => {
                        self.enter(LiveViewState::WaitingToStop, wanted);
                        Some(OutputRequest::Stop)
                    }
                }
            }
            (LiveViewState::WaitingToStop, false) => {
                debug!("live view output acknowledged: no longer streaming to host");
                match self.desired {
                    LiveViewState::On => {
                        self.enter(LiveViewState::WaitingToStart, LiveViewState::On);
                        Some(OutputRequest::Start)
                    }
                    LiveViewState::Paused => {
                        self.enter(LiveViewState::Paused, LiveViewState::Paused);
                        None
                    }
                    _ => {
                        self.enter(LiveViewState::Off, LiveViewState::Off);
                        None
                    }
                }
            }
            (state, to_host) => {
                debug!(?state, to_host, "ignoring live view output change");
                None
            }
        }
    }

    /// The camera rejected a request; fall back to what it is still doing.
    pub fn request_failed(&mut self, request: OutputRequest) {
        match request {
            OutputRequest::Start => self.enter(LiveViewState::Off, LiveViewState::Off),
            OutputRequest::Stop => self.enter(LiveViewState::On, LiveViewState::On),
        }
    }

    /// Force the controller back to `Off`, e.g. after the session closed.
    pub fn reset(&mut self) {
        self.enter(LiveViewState::Off, LiveViewState::Off);
    }

    /// Check whether a frame may be grabbed.
    pub const fn check_grab(&self) -> Result<(), GrabSkip> {
        match self.state {
            LiveViewState::On => Ok(()),
            LiveViewState::WaitingToStart => Err(GrabSkip::NotYetOn),
            _ => Err(GrabSkip::NotWantedOn),
        }
    }

    fn enter(&mut self, state: LiveViewState, desired: LiveViewState) {
        if state != self.state {
            debug!(from = ?self.state, to = ?state, ?desired, "live view transition");
        }
        self.state = state;
        self.desired = desired;
    }

    fn desire(&mut self, desired: LiveViewState) {
        debug!(state = ?self.state, ?desired, "live view request recorded while waiting");
        self.desired = desired;
    }
}

/// Fixed-size buffer holding the latest live-view frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    data: Vec<u8>,
    len: usize,
}

impl FrameBuffer {
    /// Allocate a buffer of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
        }
    }

    /// Writable storage for the next frame.
    pub fn storage(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Record how many bytes of the storage hold the frame.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.data.len());
    }

    /// Bytes of the latest frame.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.data.get(..self.len).unwrap_or_default()
    }

    /// Size in bytes of the latest frame.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no frame has been grabbed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
}
