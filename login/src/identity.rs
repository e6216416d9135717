use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random suffix appended to synthesized usernames.
pub const TOKEN_LEN: usize = 6;

/// Derive a SIP username from a display name: lowercase, ASCII
/// alphanumerics only, plus `_` and a random lowercase token.
pub fn synthesize_username<R: Rng + ?Sized>(display_name: &str, rng: &mut R) -> String {
    let base: String = display_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let token: String = rng
        .sample_iter(Alphanumeric)
        .take(TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    format!("{}_{}", base, token)
}

/// `sip:<username>@<domain>` for a user who never configured an identity.
pub fn synthesize_uri<R: Rng + ?Sized>(display_name: &str, domain: &str, rng: &mut R) -> String {
    format!("sip:{}@{}", synthesize_username(display_name, rng), domain)
}
