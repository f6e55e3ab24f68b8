//! Navigation seam used by the gate.

use serde::Serialize;

pub trait Navigator {
    /// Push a new location.
    fn redirect(&mut self, path: &str);
    /// Replace the current location without adding history.
    fn replace(&mut self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum Navigation {
    Redirect(String),
    Replace(String),
}

impl Navigation {
    pub fn path(&self) -> &str {
        match self {
            Navigation::Redirect(p) | Navigation::Replace(p) => p,
        }
    }
}

/// Navigator that only remembers where it was sent.
///
/// Navigating to the current location again is recorded but leaves the
/// history untouched.
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    calls: Vec<Navigation>,
    history: Vec<String>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(path: impl Into<String>) -> Self {
        Self {
            calls: Vec::new(),
            history: vec![path.into()],
        }
    }

    pub fn calls(&self) -> &[Navigation] {
        &self.calls
    }

    pub fn location(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&mut self, path: &str) {
        self.calls.push(Navigation::Redirect(path.to_string()));
        if self.location() != Some(path) {
            self.history.push(path.to_string());
        }
    }

    fn replace(&mut self, path: &str) {
        self.calls.push(Navigation::Replace(path.to_string()));
        match self.history.last_mut() {
            Some(current) => *current = path.to_string(),
            None => self.history.push(path.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_redirect_to_current_location_keeps_history() {
        let mut nav = RecordingNavigator::at("/users");
        nav.redirect("/chats");
        nav.redirect("/chats");
        assert_eq!(nav.history(), ["/users", "/chats"]);
        assert_eq!(nav.calls().len(), 2);
    }

    #[test]
    fn replace_swaps_current_entry() {
        let mut nav = RecordingNavigator::at("/");
        nav.replace("/chats");
        assert_eq!(nav.history(), ["/chats"]);
        assert_eq!(nav.calls()[0], Navigation::Replace("/chats".into()));
    }
}
