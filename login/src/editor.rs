//! Form state for the settings panel opened from the login screen.

use phone_core::SipUri;
use settings_manager::settings::{validate_ice_url, validate_socket_uri};
use settings_manager::{IceServer, RtcpMuxPolicy, Settings, ViaTransport};
use uuid::Uuid;

/// How a field is edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Free text, masked when rendered
    Secret,
    /// Boolean, flipped with `activate`
    Toggle,
    /// One of a fixed set, cycled with `activate`
    Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Uri,
    Password,
    SocketUri,
    ViaTransport,
    RegistrarServer,
    ContactUri,
    AuthorizationUser,
    InstanceId,
    SessionTimers,
    PreloadedRoute,
    RtcpMuxPolicy,
    IceServers,
    CallstatsEnabled,
    CallstatsAppId,
    CallstatsAppSecret,
}

impl Field {
    /// Display order
    pub const ALL: [Field; 15] = [
        Field::Uri,
        Field::Password,
        Field::SocketUri,
        Field::ViaTransport,
        Field::RegistrarServer,
        Field::ContactUri,
        Field::AuthorizationUser,
        Field::InstanceId,
        Field::SessionTimers,
        Field::PreloadedRoute,
        Field::RtcpMuxPolicy,
        Field::IceServers,
        Field::CallstatsEnabled,
        Field::CallstatsAppId,
        Field::CallstatsAppSecret,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Uri => "SIP URI",
            Field::Password => "SIP password",
            Field::SocketUri => "WebSocket URI",
            Field::ViaTransport => "Via transport",
            Field::RegistrarServer => "Registrar server",
            Field::ContactUri => "Contact URI",
            Field::AuthorizationUser => "Authorization user",
            Field::InstanceId => "Instance ID",
            Field::SessionTimers => "Session timers",
            Field::PreloadedRoute => "Use preloaded route",
            Field::RtcpMuxPolicy => "RTCP mux policy",
            Field::IceServers => "ICE servers",
            Field::CallstatsEnabled => "callstats",
            Field::CallstatsAppId => "callstats AppID",
            Field::CallstatsAppSecret => "callstats AppSecret",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Password | Field::CallstatsAppSecret => FieldKind::Secret,
            Field::SessionTimers | Field::PreloadedRoute | Field::CallstatsEnabled => {
                FieldKind::Toggle
            }
            Field::ViaTransport | Field::RtcpMuxPolicy => FieldKind::Choice,
            _ => FieldKind::Text,
        }
    }

    fn index(self) -> usize {
        Field::ALL
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default()
    }
}

/// Reason the form could not be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Editable copy of a [`Settings`].
///
/// Every field is held as text and parsed back on [`SettingsEditor::submit`].
/// Fields the form does not show (display name, ICE credentials) are carried
/// over from the settings the editor was opened with.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    base: Settings,
    values: Vec<String>,
    focus: usize,
    error: Option<FieldError>,
}

const ON: &str = "on";
const OFF: &str = "off";

fn toggle_text(value: bool) -> String {
    let text = if value { ON } else { OFF };
    text.to_string()
}

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Trimmed text, `None` when empty
fn text_opt(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `stun:a, stun:b; turn:c` is two servers, the first with two urls
fn format_ice_servers(servers: &[IceServer]) -> String {
    servers
        .iter()
        .map(|server| server.urls.join(", "))
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_ice_servers(value: &str, previous: &[IceServer]) -> Result<Vec<IceServer>, String> {
    let mut servers = Vec::new();
    for group in value.split(';').map(str::trim).filter(|g| !g.is_empty()) {
        let urls: Vec<String> = group
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();
        for url in &urls {
            validate_ice_url(url)?;
        }

        // keep TURN credentials for servers that stay in the same slot
        let mut server = previous
            .get(servers.len())
            .cloned()
            .unwrap_or_else(|| IceServer::new(Vec::<String>::new()));
        server.urls = urls;
        servers.push(server);
    }
    Ok(servers)
}

impl SettingsEditor {
    pub fn new(settings: &Settings) -> Self {
        let values = Field::ALL
            .iter()
            .map(|field| match field {
                Field::Uri => opt_text(&settings.uri),
                Field::Password => opt_text(&settings.password),
                Field::SocketUri => settings.socket.uri.clone(),
                Field::ViaTransport => settings.socket.via_transport.to_string(),
                Field::RegistrarServer => opt_text(&settings.registrar_server),
                Field::ContactUri => opt_text(&settings.contact_uri),
                Field::AuthorizationUser => opt_text(&settings.authorization_user),
                Field::InstanceId => settings
                    .instance_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                Field::SessionTimers => toggle_text(settings.session_timers),
                Field::PreloadedRoute => toggle_text(settings.use_preloaded_route),
                Field::RtcpMuxPolicy => settings.pc_config.rtcp_mux_policy.to_string(),
                Field::IceServers => format_ice_servers(&settings.pc_config.ice_servers),
                Field::CallstatsEnabled => toggle_text(settings.callstats.enabled),
                Field::CallstatsAppId => opt_text(&settings.callstats.app_id),
                Field::CallstatsAppSecret => opt_text(&settings.callstats.app_secret),
            })
            .collect();

        Self {
            base: settings.clone(),
            values,
            focus: 0,
            error: None,
        }
    }

    /// Fields with their current text, in display order
    pub fn fields(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn value(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn focused(&self) -> Field {
        Field::ALL[self.focus]
    }

    pub fn error(&self) -> Option<&FieldError> {
        self.error.as_ref()
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Field::ALL.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + Field::ALL.len() - 1) % Field::ALL.len();
    }

    pub fn focus(&mut self, field: Field) {
        self.focus = field.index();
    }

    /// Type a character into the focused text field
    pub fn input(&mut self, c: char) {
        if matches!(self.focused().kind(), FieldKind::Text | FieldKind::Secret) {
            self.values[self.focus].push(c);
            self.clear_error_for(self.focused());
        }
    }

    pub fn backspace(&mut self) {
        if matches!(self.focused().kind(), FieldKind::Text | FieldKind::Secret) {
            self.values[self.focus].pop();
            self.clear_error_for(self.focused());
        }
    }

    /// Replace the text of `field`
    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        self.values[field.index()] = value.into();
        self.clear_error_for(field);
    }

    /// Flip a toggle or advance a choice on the focused field
    pub fn activate(&mut self) {
        let field = self.focused();
        let current = &self.values[self.focus];
        let next = match field {
            Field::ViaTransport => {
                let all = ViaTransport::ALL;
                let i = all.iter().position(|t| t.as_str() == current).unwrap_or(0);
                all[(i + 1) % all.len()].to_string()
            }
            Field::RtcpMuxPolicy => {
                let all = RtcpMuxPolicy::ALL;
                let i = all.iter().position(|p| p.as_str() == current).unwrap_or(0);
                all[(i + 1) % all.len()].to_string()
            }
            _ if field.kind() == FieldKind::Toggle => toggle_text(current != ON),
            _ => return,
        };
        self.values[self.focus] = next;
    }

    fn clear_error_for(&mut self, field: Field) {
        if self.error.as_ref().is_some_and(|e| e.field == field) {
            self.error = None;
        }
    }

    fn fail(&mut self, field: Field, message: impl Into<String>) -> FieldError {
        let error = FieldError {
            field,
            message: message.into(),
        };
        self.focus = field.index();
        self.error = Some(error.clone());
        error
    }

    /// Parse the form back into settings.
    ///
    /// On error the offending field gets focus and the error is kept for
    /// display until that field is edited.
    pub fn submit(&mut self) -> Result<Settings, FieldError> {
        let mut settings = self.base.clone();

        settings.uri = text_opt(self.value(Field::Uri));
        if let Some(uri) = &settings.uri {
            if let Err(e) = uri.parse::<SipUri>() {
                return Err(self.fail(Field::Uri, e.to_string()));
            }
        }

        let socket_uri = self.value(Field::SocketUri).trim().to_string();
        if let Err(e) = validate_socket_uri(&socket_uri) {
            return Err(self.fail(Field::SocketUri, e));
        }
        settings.socket.uri = socket_uri;

        settings.socket.via_transport = match self.value(Field::ViaTransport).parse() {
            Ok(transport) => transport,
            Err(e) => return Err(self.fail(Field::ViaTransport, e.to_string())),
        };

        settings.instance_id = match text_opt(self.value(Field::InstanceId)) {
            Some(id) => match Uuid::parse_str(&id) {
                Ok(id) => Some(id),
                Err(e) => return Err(self.fail(Field::InstanceId, e.to_string())),
            },
            None => None,
        };

        settings.pc_config.rtcp_mux_policy = match self.value(Field::RtcpMuxPolicy).parse() {
            Ok(policy) => policy,
            Err(e) => return Err(self.fail(Field::RtcpMuxPolicy, e.to_string())),
        };

        settings.pc_config.ice_servers = match parse_ice_servers(
            self.value(Field::IceServers),
            &self.base.pc_config.ice_servers,
        ) {
            Ok(servers) => servers,
            Err(e) => return Err(self.fail(Field::IceServers, e)),
        };

        // passwords are taken verbatim, only an empty one means unset
        settings.password = Some(self.value(Field::Password).to_string()).filter(|p| !p.is_empty());
        settings.registrar_server = text_opt(self.value(Field::RegistrarServer));
        settings.contact_uri = text_opt(self.value(Field::ContactUri));
        settings.authorization_user = text_opt(self.value(Field::AuthorizationUser));
        settings.session_timers = self.value(Field::SessionTimers) == ON;
        settings.use_preloaded_route = self.value(Field::PreloadedRoute) == ON;
        settings.callstats.enabled = self.value(Field::CallstatsEnabled) == ON;
        settings.callstats.app_id = text_opt(self.value(Field::CallstatsAppId));
        settings.callstats.app_secret = text_opt(self.value(Field::CallstatsAppSecret));

        self.error = None;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_form_round_trips() {
        let mut settings = Settings::default();
        settings.uri = Some("sip:alice@example.com".to_string());
        settings.password = Some(" spaced ".to_string());
        settings.instance_id = Some(Uuid::new_v4());
        settings.pc_config.ice_servers = vec![
            IceServer::new(["stun:a.example.com", "stun:b.example.com"]),
            IceServer {
                urls: vec!["turn:c.example.com".to_string()],
                username: Some("user".to_string()),
                credential: Some("pass".to_string()),
            },
        ];

        let mut editor = SettingsEditor::new(&settings);
        assert_eq!(
            editor.value(Field::IceServers),
            "stun:a.example.com, stun:b.example.com; turn:c.example.com"
        );
        assert_eq!(editor.submit().unwrap(), settings);
    }

    #[test]
    fn text_fields_are_trimmed_and_blank_means_unset() {
        let mut settings = Settings::default();
        settings.registrar_server = Some("sip:registrar.example.com".to_string());

        let mut editor = SettingsEditor::new(&settings);
        editor.set_value(Field::RegistrarServer, "   ");
        editor.set_value(Field::AuthorizationUser, "  1002 ");

        let submitted = editor.submit().unwrap();
        assert_eq!(submitted.registrar_server, None);
        assert_eq!(submitted.authorization_user.as_deref(), Some("1002"));
    }

    #[test]
    fn navigation_and_typing() {
        let mut editor = SettingsEditor::new(&Settings::default());
        assert_eq!(editor.focused(), Field::Uri);

        editor.focus_prev();
        assert_eq!(editor.focused(), Field::CallstatsAppSecret);
        editor.focus_next();
        editor.focus_next();
        assert_eq!(editor.focused(), Field::Password);

        for c in "hunter2".chars() {
            editor.input(c);
        }
        editor.backspace();
        assert_eq!(editor.value(Field::Password), "hunter");

        editor.focus(Field::SessionTimers);
        editor.input('x');
        assert_eq!(editor.value(Field::SessionTimers), "off");
    }

    #[test]
    fn toggles_and_choices_cycle() {
        let mut editor = SettingsEditor::new(&Settings::default());

        editor.focus(Field::SessionTimers);
        editor.activate();
        editor.focus(Field::ViaTransport);
        editor.activate();
        editor.activate();
        editor.focus(Field::RtcpMuxPolicy);
        editor.activate();
        editor.focus(Field::Uri);
        editor.activate();

        let submitted = editor.submit().unwrap();
        assert!(submitted.session_timers);
        assert_eq!(submitted.socket.via_transport, ViaTransport::Wss);
        assert_eq!(submitted.pc_config.rtcp_mux_policy, RtcpMuxPolicy::Require);
        assert_eq!(submitted.uri, None);
    }

    #[test]
    fn invalid_fields_are_reported_and_focused() {
        let mut editor = SettingsEditor::new(&Settings::default());
        editor.set_value(Field::SocketUri, "http://example.com");

        let error = editor.submit().unwrap_err();
        assert_eq!(error.field, Field::SocketUri);
        assert_eq!(editor.focused(), Field::SocketUri);
        assert_eq!(editor.error(), Some(&error));

        editor.backspace();
        assert!(editor.error().is_none());

        editor.set_value(Field::SocketUri, "wss://example.com");
        editor.set_value(Field::Uri, "alice");
        assert_eq!(editor.submit().unwrap_err().field, Field::Uri);

        editor.set_value(Field::Uri, "");
        editor.set_value(Field::InstanceId, "1234");
        assert_eq!(editor.submit().unwrap_err().field, Field::InstanceId);

        editor.set_value(Field::InstanceId, "");
        editor.set_value(Field::IceServers, "stun:ok.example.com; http://bad");
        assert_eq!(editor.submit().unwrap_err().field, Field::IceServers);

        editor.set_value(Field::IceServers, "");
        let submitted = editor.submit().unwrap();
        assert!(submitted.pc_config.ice_servers.is_empty());
    }
}
