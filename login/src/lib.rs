//! Login screen logic for the softphone
//!
//! [`LoginFlow`] is the form controller behind the login screen: it holds an
//! edit buffer of the settings, validates the display name and hands the
//! finished settings to the host. Persisting them is up to the host.

use log::{debug, info};
use phone_core::Error;
use rand::Rng;
use settings_manager::{Settings, SettingsManager};

pub mod editor;
pub mod identity;

pub use editor::{Field, FieldError, FieldKind, SettingsEditor};

/// Shortest accepted display name, counted in Unicode scalar values (`char`s),
/// not UTF-16 code units.
pub const MIN_DISPLAY_NAME_LEN: usize = 3;

pub const NAME_TOO_SHORT: &str = "Name too short";

/// Where the login screen is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// Name entry
    Normal,
    /// Settings panel open on top of the name entry
    SettingsOpen,
    /// Settings handed to the host, nothing left to do
    Completed,
}

type OnLogin = Box<dyn FnMut(Settings)>;

pub struct LoginFlow {
    /// Edit buffer, owned by the flow
    settings: Settings,
    state: LoginState,
    name_error: Option<String>,
    editor: Option<SettingsEditor>,
    default_domain: String,
    on_login: OnLogin,
}

impl LoginFlow {
    /// Start a login flow on a snapshot of the current settings.
    ///
    /// `on_login` is called once, with the completed settings, on the first
    /// successful submission.
    pub fn new<F>(settings: Settings, default_domain: impl Into<String>, on_login: F) -> Self
    where
        F: FnMut(Settings) + 'static,
    {
        Self {
            settings,
            state: LoginState::Normal,
            name_error: None,
            editor: None,
            default_domain: default_domain.into(),
            on_login: Box::new(on_login),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn display_name(&self) -> &str {
        self.settings.display_name.as_deref().unwrap_or_default()
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn name_error(&self) -> Option<&str> {
        self.name_error.as_deref()
    }

    pub fn editor(&self) -> Option<&SettingsEditor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut SettingsEditor> {
        self.editor.as_mut()
    }

    /// Whether the submit button should look enabled
    pub fn can_submit(&self) -> bool {
        !self.display_name().is_empty() && self.state == LoginState::Normal
    }

    fn completed(&self, action: &str) -> bool {
        if self.state == LoginState::Completed {
            debug!("{}: login already completed, ignoring", action);
            return true;
        }
        false
    }

    pub fn open_settings(&mut self) {
        debug!("open_settings()");
        if self.completed("open_settings") || self.state == LoginState::SettingsOpen {
            return;
        }
        self.editor = Some(SettingsEditor::new(&self.settings));
        self.state = LoginState::SettingsOpen;
    }

    /// Adopt settings coming back from the settings panel
    pub fn submit_settings(&mut self, settings: Settings) {
        debug!("submit_settings()");
        if self.completed("submit_settings") {
            return;
        }
        if self.state != LoginState::SettingsOpen {
            debug!("submit_settings: settings panel is not open, ignoring");
            return;
        }
        self.settings = settings;
        self.editor = None;
        self.state = LoginState::Normal;
    }

    /// Submit the open settings panel.
    ///
    /// A field error keeps the panel open and is also kept on the editor.
    pub fn submit_editor(&mut self) -> Result<(), FieldError> {
        let Some(editor) = self.editor.as_mut() else {
            debug!("submit_editor: settings panel is not open, ignoring");
            return Ok(());
        };
        let settings = editor.submit()?;
        self.submit_settings(settings);
        Ok(())
    }

    pub fn cancel_settings(&mut self) {
        debug!("cancel_settings()");
        if self.completed("cancel_settings") {
            return;
        }
        self.editor = None;
        if self.state == LoginState::SettingsOpen {
            self.state = LoginState::Normal;
        }
    }

    /// Replace the display name in the edit buffer
    pub fn change_display_name(&mut self, name: impl Into<String>) {
        if self.completed("change_display_name") {
            return;
        }
        self.settings.display_name = Some(name.into());
        self.name_error = None;
    }

    /// Clear the stored settings and start over from the defaults.
    ///
    /// This wipes persisted settings, not just the edit buffer.
    pub fn reset(&mut self, store: &mut SettingsManager) -> Result<(), Error> {
        debug!("reset()");
        if self.completed("reset") {
            return Ok(());
        }
        store.clear()?;
        self.settings = store.snapshot();
        if let Some(editor) = self.editor.as_mut() {
            *editor = SettingsEditor::new(&self.settings);
        }
        Ok(())
    }

    /// Validate and, when valid, hand the settings to the host.
    ///
    /// Returns whether the login went through.
    pub fn submit(&mut self) -> bool {
        self.submit_with(&mut rand::thread_rng())
    }

    /// [`LoginFlow::submit`] with a caller-supplied source of randomness
    pub fn submit_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        debug!("submit()");
        if self.completed("submit") {
            return false;
        }

        if self.display_name().chars().count() < MIN_DISPLAY_NAME_LEN {
            self.name_error = Some(NAME_TOO_SHORT.to_string());
            return false;
        }

        if !self.settings.has_uri() {
            let uri = identity::synthesize_uri(self.display_name(), &self.default_domain, rng);
            info!("No SIP URI set, using {}", uri);
            self.settings.uri = Some(uri);
        }

        self.state = LoginState::Completed;
        self.editor = None;
        (self.on_login)(self.settings.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use settings_manager::{MemoryStorage, SettingsStorage, DEFAULT_SIP_DOMAIN};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Flow plus a record of every `on_login` call
    fn flow_with(settings: Settings) -> (LoginFlow, Rc<RefCell<Vec<Settings>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let flow = LoginFlow::new(settings, DEFAULT_SIP_DOMAIN, move |settings| {
            sink.borrow_mut().push(settings)
        });
        (flow, calls)
    }

    fn named(name: &str) -> Settings {
        let mut settings = Settings::default();
        settings.display_name = Some(name.to_string());
        settings
    }

    #[test]
    fn short_name_is_rejected() {
        let mut settings = named("");
        settings.uri = None;
        let (mut flow, calls) = flow_with(settings);

        flow.change_display_name("Al");
        assert!(!flow.submit());

        assert_eq!(flow.name_error(), Some("Name too short"));
        assert!(calls.borrow().is_empty());
        assert_eq!(flow.settings().uri, None);
        assert_eq!(flow.state(), LoginState::Normal);
    }

    #[test]
    fn name_length_counts_chars() {
        // two chars, three UTF-16 units
        let (mut flow, calls) = flow_with(named("\u{1F600}a"));
        assert!(!flow.submit());
        assert_eq!(flow.name_error(), Some(NAME_TOO_SHORT));

        flow.change_display_name("\u{1F600}ab");
        assert!(flow.submit());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn missing_name_is_rejected() {
        let (mut flow, calls) = flow_with(Settings::default());
        assert!(!flow.submit());
        assert_eq!(flow.name_error(), Some(NAME_TOO_SHORT));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn editing_the_name_clears_the_error() {
        let (mut flow, _) = flow_with(named("Al"));
        flow.submit();
        assert!(flow.name_error().is_some());

        flow.change_display_name("Ali");
        assert!(flow.name_error().is_none());
        assert_eq!(flow.display_name(), "Ali");
    }

    #[test]
    fn valid_name_synthesizes_uri_and_logs_in_once() {
        let (mut flow, calls) = flow_with(named("Alice"));

        assert!(flow.submit());

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        let uri = calls[0].uri.as_deref().unwrap();
        assert!(uri.starts_with("sip:alice_"), "{uri}");
        assert!(uri.ends_with("@tryit.jssip.net"), "{uri}");
        assert_eq!(flow.state(), LoginState::Completed);
    }

    #[test]
    fn synthesized_uri_shape() {
        let (mut flow, calls) = flow_with(named("Bob!!"));
        flow.submit_with(&mut StdRng::seed_from_u64(3));

        let uri = calls.borrow()[0].uri.clone().unwrap();
        let token = uri
            .strip_prefix("sip:bob_")
            .and_then(|rest| rest.strip_suffix("@tryit.jssip.net"))
            .unwrap();
        assert_eq!(token.len(), 6);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn existing_uri_is_kept() {
        let mut settings = named("Carol");
        settings.uri = Some("sip:carol@pbx.example.com".to_string());
        let (mut flow, calls) = flow_with(settings);

        flow.change_display_name("Someone Else Entirely");
        assert!(flow.submit());

        assert_eq!(
            calls.borrow()[0].uri.as_deref(),
            Some("sip:carol@pbx.example.com")
        );
    }

    #[test]
    fn empty_uri_is_replaced() {
        let mut settings = named("Dave");
        settings.uri = Some(String::new());
        let (mut flow, calls) = flow_with(settings);

        flow.submit();
        assert!(calls.borrow()[0]
            .uri
            .as_deref()
            .unwrap()
            .starts_with("sip:dave_"));
    }

    #[test]
    fn further_actions_after_login_are_ignored() {
        let (mut flow, calls) = flow_with(named("Alice"));
        assert!(flow.submit());
        let uri = flow.settings().uri.clone();

        assert!(!flow.submit());
        flow.change_display_name("Mallory");
        flow.open_settings();

        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(flow.display_name(), "Alice");
        assert_eq!(flow.settings().uri, uri);
        assert_eq!(flow.state(), LoginState::Completed);
    }

    #[test]
    fn settings_panel_submit_and_cancel() {
        let (mut flow, _) = flow_with(named("Erin"));
        assert!(flow.can_submit());

        flow.open_settings();
        assert_eq!(flow.state(), LoginState::SettingsOpen);
        assert!(!flow.can_submit());

        flow.editor_mut()
            .unwrap()
            .set_value(Field::Uri, "sip:erin@pbx.example.com");
        flow.cancel_settings();
        assert_eq!(flow.state(), LoginState::Normal);
        assert!(flow.editor().is_none());
        assert_eq!(flow.settings().uri, None);

        flow.open_settings();
        flow.editor_mut()
            .unwrap()
            .set_value(Field::Uri, "sip:erin@pbx.example.com");
        flow.submit_editor().unwrap();
        assert_eq!(flow.state(), LoginState::Normal);
        assert_eq!(
            flow.settings().uri.as_deref(),
            Some("sip:erin@pbx.example.com")
        );
        assert_eq!(flow.display_name(), "Erin");
    }

    #[test]
    fn invalid_panel_stays_open() {
        let (mut flow, _) = flow_with(named("Frank"));
        flow.open_settings();
        flow.editor_mut()
            .unwrap()
            .set_value(Field::SocketUri, "tcp://nope");

        let error = flow.submit_editor().unwrap_err();
        assert_eq!(error.field, Field::SocketUri);
        assert_eq!(flow.state(), LoginState::SettingsOpen);
    }

    #[test]
    fn submit_settings_requires_open_panel() {
        let (mut flow, _) = flow_with(named("Grace"));
        let mut other = named("Other");
        other.session_timers = true;

        flow.submit_settings(other.clone());
        assert_eq!(flow.display_name(), "Grace");

        flow.open_settings();
        flow.submit_settings(other);
        assert_eq!(flow.display_name(), "Other");
        assert!(flow.settings().session_timers);
    }

    #[test_log::test]
    fn reset_clears_the_store() {
        let storage = MemoryStorage::with_value(json!({
            "display_name": "Heidi",
            "uri": "sip:heidi@pbx.example.com"
        }));
        let mut store = SettingsManager::new(Box::new(storage.clone()), None).unwrap();
        let (mut flow, calls) = flow_with(store.snapshot());
        assert_eq!(flow.display_name(), "Heidi");

        flow.reset(&mut store).unwrap();

        assert_eq!(flow.settings(), &Settings::default());
        assert_eq!(store.get(), &Settings::default());
        assert!(!store.is_ready().unwrap());
        assert!(storage.get().unwrap().is_none());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn submit_does_not_touch_the_store() {
        let mut store = SettingsManager::new(Box::new(MemoryStorage::new()), None).unwrap();
        let mut snapshot = store.snapshot();
        snapshot.display_name = Some("Ivan".to_string());
        let (mut flow, calls) = flow_with(snapshot);

        assert!(flow.submit());
        assert_eq!(store.get().uri, None);
        assert!(!store.is_ready().unwrap());

        store.set(calls.borrow()[0].clone()).unwrap();
        assert!(store.is_ready().unwrap());
        assert!(store.get().has_uri());
    }
}
