//! Endpoint transport state.
//!
//! # State Machines
//! ```text
//! read axis:   Open → Drained | Reset
//! write axis:  Open → Normal  | Silent
//! error:       None → Pending → Confirmed
//!              None → Confirmed            (EOS already seen)
//! ```
//!
//! Every transition is checked: once an axis has left `Open` it stays where it
//! is until the descriptor is reset. The `EndpointFlags` bit set is the
//! rendered, additive view of the same state.

use serde::Serialize;

flag_set! {
    /// `CS_EP_*` style flags describing an endpoint.
    pub struct EndpointFlags: u32 {
        /// Endpoint is a mux stream.
        const T_MUX = 1 << 0;
        /// Endpoint is an applet.
        const T_APPLET = 1 << 1;

        /// Read side shut after draining.
        const SHRD = 1 << 4;
        /// Read side shut by reset.
        const SHRR = 1 << 5;
        /// Write side shut normally.
        const SHWN = 1 << 6;
        /// Write side shut silently.
        const SHWS = 1 << 7;

        /// End of input reached (no more data expected from the mux).
        const EOI = 1 << 10;
        /// Peer signaled end of stream.
        const EOS = 1 << 11;
        /// Error raised before EOS, delivery pending.
        const ERR_PENDING = 1 << 12;
        /// Error confirmed.
        const ERROR = 1 << 13;

        /// More data is known to be available for reading.
        const RCV_MORE = 1 << 16;
        /// The mux needs more room in the input buffer.
        const WANT_ROOM = 1 << 17;
        /// Closing this stream should also kill its connection.
        const KILL_CONN = 1 << 18;
    }
}

impl EndpointFlags {
    /// Any endpoint type bit.
    pub const T_MASK: Self = Self::T_MUX.union(Self::T_APPLET);
    /// Read side shut, either way.
    pub const SHR: Self = Self::SHRD.union(Self::SHRR);
    /// Write side shut, either way.
    pub const SHW: Self = Self::SHWN.union(Self::SHWS);
    /// Bits owned by the state machines. They can only change through
    /// shutdown, error and EOS transitions.
    pub const STATE_MASK: Self = Self::T_MASK
        .union(Self::SHR)
        .union(Self::SHW)
        .union(Self::EOS)
        .union(Self::ERR_PENDING)
        .union(Self::ERROR);
}

/// How the read side is shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutReadMode {
    /// Consume pending input before closing.
    Drain,
    /// Discard pending input.
    Reset,
}

/// How the write side is shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutWriteMode {
    /// Flush pending output, then close.
    Normal,
    /// Discard pending output.
    Silent,
}

impl ShutReadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutReadMode::Drain => "drain",
            ShutReadMode::Reset => "reset",
        }
    }
}

impl ShutWriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutWriteMode::Normal => "normal",
            ShutWriteMode::Silent => "silent",
        }
    }
}

/// Read axis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadState {
    #[default]
    Open,
    Drained,
    Reset,
}

impl ReadState {
    pub fn is_shut(self) -> bool {
        self != ReadState::Open
    }

    /// State reached by shutting down with `mode`, or `None` if the axis is
    /// already shut. A shut axis never moves again, whatever the mode.
    pub fn shut(self, mode: ShutReadMode) -> Option<Self> {
        match self {
            ReadState::Open => Some(match mode {
                ShutReadMode::Drain => ReadState::Drained,
                ShutReadMode::Reset => ReadState::Reset,
            }),
            ReadState::Drained | ReadState::Reset => None,
        }
    }

    pub fn flags(self) -> EndpointFlags {
        match self {
            ReadState::Open => EndpointFlags::NONE,
            ReadState::Drained => EndpointFlags::SHRD,
            ReadState::Reset => EndpointFlags::SHRR,
        }
    }
}

/// Write axis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteState {
    #[default]
    Open,
    Normal,
    Silent,
}

impl WriteState {
    pub fn is_shut(self) -> bool {
        self != WriteState::Open
    }

    /// State reached by shutting down with `mode`, or `None` if the axis is
    /// already shut.
    pub fn shut(self, mode: ShutWriteMode) -> Option<Self> {
        match self {
            WriteState::Open => Some(match mode {
                ShutWriteMode::Normal => WriteState::Normal,
                ShutWriteMode::Silent => WriteState::Silent,
            }),
            WriteState::Normal | WriteState::Silent => None,
        }
    }

    pub fn flags(self) -> EndpointFlags {
        match self {
            WriteState::Open => EndpointFlags::NONE,
            WriteState::Normal => EndpointFlags::SHWN,
            WriteState::Silent => EndpointFlags::SHWS,
        }
    }
}

/// Two-tier error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorState {
    #[default]
    None,
    /// An error occurred but EOS has not been seen yet.
    Pending,
    /// The error can be reported to the application.
    Confirmed,
}

impl ErrorState {
    /// State after an error is raised, given whether EOS was already seen.
    pub fn raise(self, eos: bool) -> Self {
        match (self, eos) {
            (ErrorState::Confirmed, _) | (_, true) => ErrorState::Confirmed,
            (_, false) => ErrorState::Pending,
        }
    }

    /// State once EOS is observed: a pending error becomes deliverable.
    pub fn on_eos(self) -> Self {
        match self {
            ErrorState::Pending => ErrorState::Confirmed,
            other => other,
        }
    }

    pub fn flags(self) -> EndpointFlags {
        match self {
            ErrorState::None => EndpointFlags::NONE,
            ErrorState::Pending => EndpointFlags::ERR_PENDING,
            ErrorState::Confirmed => EndpointFlags::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_axis_is_terminal_after_first_shut() {
        let drained = ReadState::Open.shut(ShutReadMode::Drain).unwrap();
        assert_eq!(drained, ReadState::Drained);
        assert_eq!(drained.shut(ShutReadMode::Reset), None);
        assert_eq!(drained.shut(ShutReadMode::Drain), None);
        assert_eq!(ReadState::Reset.shut(ShutReadMode::Drain), None);
    }

    #[test]
    fn write_axis_is_terminal_after_first_shut() {
        let silent = WriteState::Open.shut(ShutWriteMode::Silent).unwrap();
        assert_eq!(silent, WriteState::Silent);
        assert_eq!(silent.shut(ShutWriteMode::Normal), None);
        assert_eq!(WriteState::Normal.shut(ShutWriteMode::Silent), None);
    }

    #[test]
    fn error_tiers() {
        assert_eq!(ErrorState::None.raise(false), ErrorState::Pending);
        assert_eq!(ErrorState::None.raise(true), ErrorState::Confirmed);
        assert_eq!(ErrorState::Pending.raise(true), ErrorState::Confirmed);
        // never downgraded
        assert_eq!(ErrorState::Confirmed.raise(false), ErrorState::Confirmed);
        assert_eq!(ErrorState::Pending.on_eos(), ErrorState::Confirmed);
        assert_eq!(ErrorState::None.on_eos(), ErrorState::None);
    }

    #[test]
    fn composite_masks() {
        assert!(EndpointFlags::SHR.contains(EndpointFlags::SHRD));
        assert!(EndpointFlags::SHR.contains(EndpointFlags::SHRR));
        assert!(!EndpointFlags::SHR.intersects(EndpointFlags::SHW));
        assert!(EndpointFlags::STATE_MASK.contains(EndpointFlags::ERROR));
        assert!(!EndpointFlags::STATE_MASK.intersects(EndpointFlags::RCV_MORE));
        assert_eq!(
            (ReadState::Reset.flags() | WriteState::Silent.flags()).to_string(),
            "SHRR|SHWS"
        );
    }
}
