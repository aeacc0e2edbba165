//! The five power states of the bench and the actions bound to each step

use core::fmt;

/// Power state of the ESP-01, ordered from lowest to highest draw.
///
/// Uses the signed encoding with `Idle = 0`, the state the bench boots into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum PowerState {
    /// Module in deep sleep
    Sleep = -1,
    /// Module running, not associated
    Idle = 0,
    /// Associated with the access point
    Connected = 1,
    /// UDP socket open to the remote target
    SocketOpen = 2,
    /// Datagrams are sent on every loop pass
    Sending = 3,
}

impl PowerState {
    /// Number of power states, one state pin each.
    pub const COUNT: usize = 5;

    /// All states in ascending order.
    pub const ALL: [PowerState; Self::COUNT] = [
        PowerState::Sleep,
        PowerState::Idle,
        PowerState::Connected,
        PowerState::SocketOpen,
        PowerState::Sending,
    ];

    /// State after an increment, `None` at the top.
    pub const fn next(self) -> Option<Self> {
        match self {
            PowerState::Sleep => Some(PowerState::Idle),
            PowerState::Idle => Some(PowerState::Connected),
            PowerState::Connected => Some(PowerState::SocketOpen),
            PowerState::SocketOpen => Some(PowerState::Sending),
            PowerState::Sending => None,
        }
    }

    /// State after a decrement, `None` at the bottom.
    pub const fn previous(self) -> Option<Self> {
        match self {
            PowerState::Sleep => None,
            PowerState::Idle => Some(PowerState::Sleep),
            PowerState::Connected => Some(PowerState::Idle),
            PowerState::SocketOpen => Some(PowerState::Connected),
            PowerState::Sending => Some(PowerState::SocketOpen),
        }
    }

    /// Zero-based position, used to index the state pins.
    pub const fn index(self) -> usize {
        (self as i8 - PowerState::Sleep as i8) as usize
    }

    /// Action to run when leaving this state upwards.
    ///
    /// `None` means the increment is ignored.
    pub const fn increment_action(self) -> Option<TransitionAction> {
        match self {
            PowerState::Sleep => Some(TransitionAction::WakeRadio),
            PowerState::Idle => Some(TransitionAction::JoinAccessPoint),
            PowerState::Connected => Some(TransitionAction::OpenSocket),
            PowerState::SocketOpen => Some(TransitionAction::StartSending),
            PowerState::Sending => None,
        }
    }

    /// Action to run when leaving this state downwards.
    ///
    /// `None` means the decrement is ignored.
    pub const fn decrement_action(self) -> Option<TransitionAction> {
        match self {
            PowerState::Sleep => None,
            PowerState::Idle => Some(TransitionAction::EnterDeepSleep),
            PowerState::Connected => Some(TransitionAction::SoftReset),
            PowerState::SocketOpen => Some(TransitionAction::CloseSocket),
            PowerState::Sending => Some(TransitionAction::StopSending),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PowerState::Sleep => "Sleep",
            PowerState::Idle => "Idle",
            PowerState::Connected => "Connected",
            PowerState::SocketOpen => "SocketOpen",
            PowerState::Sending => "Sending",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Side effect bound to a single step of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    /// Sleep -> Idle: pulse the module's reset line
    WakeRadio,
    /// Idle -> Connected: join the access point, retried until it succeeds
    JoinAccessPoint,
    /// Connected -> SocketOpen: open the UDP socket, retried until it succeeds
    OpenSocket,
    /// SocketOpen -> Sending: nothing on the radio
    StartSending,
    /// Idle -> Sleep: indefinite deep sleep
    EnterDeepSleep,
    /// Connected -> Idle: soft reset drops the association
    SoftReset,
    /// SocketOpen -> Connected
    CloseSocket,
    /// Sending -> SocketOpen: nothing on the radio
    StopSending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        for pair in PowerState::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
        }
        assert_eq!(PowerState::Sending.next(), None);
        assert_eq!(PowerState::Sleep.previous(), None);
    }

    #[test]
    fn test_signed_encoding_starts_idle_at_zero() {
        assert_eq!(PowerState::Sleep as i8, -1);
        assert_eq!(PowerState::Idle as i8, 0);
        assert_eq!(PowerState::Sending as i8, 3);
    }

    #[test]
    fn test_pin_indices_are_dense() {
        for (i, state) in PowerState::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }

    #[test]
    fn test_action_table() {
        use TransitionAction::*;

        let up: [Option<TransitionAction>; PowerState::COUNT] =
            PowerState::ALL.map(PowerState::increment_action);
        assert_eq!(
            up,
            [
                Some(WakeRadio),
                Some(JoinAccessPoint),
                Some(OpenSocket),
                Some(StartSending),
                None
            ]
        );

        let down: [Option<TransitionAction>; PowerState::COUNT] =
            PowerState::ALL.map(PowerState::decrement_action);
        assert_eq!(
            down,
            [
                None,
                Some(EnterDeepSleep),
                Some(SoftReset),
                Some(CloseSocket),
                Some(StopSending)
            ]
        );
    }
}
