//! Typed control signals from the UI layer.

use crate::host::SeekRequest;
use crossbeam_channel::Sender;
use tracing::debug;

/// A request the engine applies on its next [`process_signals`] call.
///
/// [`process_signals`]: super::PlaybackEngine::process_signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineSignal {
    TogglePlay,
    SetTempo(f64),
    Seek(SeekRequest),
    /// The page or window became visible (`true`) or hidden (`false`)
    VisibilityChanged(bool),
}

/// Publishing half of the engine's signal channel.
///
/// Cheap to clone; every widget that issues play/tempo/seek requests gets its
/// own copy.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: Sender<EngineSignal>,
}

impl SignalSender {
    pub(crate) fn new(tx: Sender<EngineSignal>) -> Self {
        Self { tx }
    }

    /// Queue a signal. Returns false once the engine has been dropped.
    pub fn send(&self, signal: EngineSignal) -> bool {
        match self.tx.send(signal) {
            Ok(()) => true,
            Err(e) => {
                debug!(signal = ?e.into_inner(), "Engine gone, dropping signal");
                false
            }
        }
    }

    pub fn toggle_play(&self) -> bool {
        self.send(EngineSignal::TogglePlay)
    }

    pub fn set_tempo(&self, bpm: f64) -> bool {
        self.send(EngineSignal::SetTempo(bpm))
    }

    pub fn seek(&self, request: SeekRequest) -> bool {
        self.send(EngineSignal::Seek(request))
    }

    pub fn visibility_changed(&self, visible: bool) -> bool {
        self.send(EngineSignal::VisibilityChanged(visible))
    }
}
