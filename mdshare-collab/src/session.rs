//! Display-name gate in front of the shared room.
//!
//! A remembered name joins straight away; otherwise the name-entry field is
//! shown and [`SessionState::submit`] is the only way through it.

/// Validation failures for the name-entry step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Please enter a display name")]
    EmptyName,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    display_name: Option<String>,
    joined: bool,
    name_input: String,
    error: Option<SessionError>,
}

impl SessionState {
    /// Session with nothing remembered: name entry required.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session from a previously stored name.
    ///
    /// A stored name that trims to nothing is treated as absent.
    pub fn restore(stored: Option<String>) -> Self {
        match stored.map(|name| name.trim().to_string()) {
            Some(name) if !name.is_empty() => Self {
                display_name: Some(name),
                joined: true,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    pub fn joined(&self) -> bool {
        self.joined
    }

    /// The joined name. `Some` whenever [`joined`](Self::joined) is true.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn name_input(&self) -> &str {
        &self.name_input
    }

    pub fn set_name_input(&mut self, text: impl Into<String>) {
        self.name_input = text.into();
    }

    /// Inline validation error from the last submit, if it failed.
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Validate the name field and join with its trimmed value.
    ///
    /// On failure the input is left as typed and the error is kept for display.
    pub fn submit(&mut self) -> Result<&str, SessionError> {
        let name = self.name_input.trim();
        if name.is_empty() {
            self.error = Some(SessionError::EmptyName);
            return Err(SessionError::EmptyName);
        }
        let name = name.to_string();
        self.error = None;
        self.joined = true;
        Ok(self.display_name.insert(name).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_blank_names_rejected() {
        for input in ["", "   ", "\t\n"] {
            let mut session = SessionState::new();
            session.set_name_input(input);
            assert_eq!(session.submit(), Err(SessionError::EmptyName));
            assert!(!session.joined());
            assert_eq!(session.error(), Some(&SessionError::EmptyName));
            assert_eq!(session.name_input(), input, "input is not cleared");
        }
    }

    #[test]
    fn test_submit_trims_and_joins() {
        let mut session = SessionState::new();
        session.set_name_input(" Alice ");
        assert_eq!(session.submit(), Ok("Alice"));
        assert!(session.joined());
        assert_eq!(session.display_name(), Some("Alice"));
        assert!(session.error().is_none());
    }

    #[test]
    fn test_successful_submit_clears_previous_error() {
        let mut session = SessionState::new();
        session.submit().unwrap_err();
        session.set_name_input("Dana");
        session.submit().unwrap();
        assert!(session.error().is_none());
    }

    #[test]
    fn test_restore_with_stored_name_is_joined() {
        let session = SessionState::restore(Some("Bob".into()));
        assert!(session.joined());
        assert_eq!(session.display_name(), Some("Bob"));
    }

    #[test]
    fn test_restore_ignores_blank_stored_name() {
        assert!(!SessionState::restore(Some("  ".into())).joined());
        assert!(!SessionState::restore(None).joined());
    }

    #[test]
    fn test_error_message_text() {
        assert_eq!(SessionError::EmptyName.to_string(), "Please enter a display name");
    }
}
