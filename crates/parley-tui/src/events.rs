//! UI event types consumed by the reducer.

use crossterm::event::Event;

#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Animation / render cadence.
    Tick,
    /// Emitted first in every loop iteration with the current terminal size.
    Frame { width: u16, height: u16 },
    /// Raw terminal input.
    Terminal(Event),
    /// Background requests completed and the client state changed.
    ClientUpdated,
}
