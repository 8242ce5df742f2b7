//! Session state machine

use enip_core::{EipError, EipResult};

/// State of the encapsulation session on one connection
///
/// # State Transitions
/// ```text
/// Unregistered -> Registered (RegisterSession accepted)
/// Registered   -> Closed     (UnRegisterSession, teardown, inactivity)
/// Unregistered -> Closed     (teardown before registration)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connection accepted, no session yet. Discovery commands only.
    #[default]
    Unregistered,
    /// Session handle issued; every command is accepted
    Registered,
    /// Terminal
    Closed,
}

impl SessionState {
    pub fn is_registered(&self) -> bool {
        matches!(self, SessionState::Registered)
    }

    pub fn validate_transition(&self, new_state: SessionState) -> EipResult<()> {
        let valid = matches!(
            (*self, new_state),
            (SessionState::Unregistered, SessionState::Registered)
                | (SessionState::Unregistered, SessionState::Closed)
                | (SessionState::Registered, SessionState::Closed)
                | (SessionState::Closed, SessionState::Closed)
        );

        if valid {
            Ok(())
        } else {
            Err(EipError::Protocol(format!(
                "Invalid session state transition: {:?} -> {:?}",
                self, new_state
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unregistered => "Unregistered",
            SessionState::Registered => "Registered",
            SessionState::Closed => "Closed",
        }
    }
}
