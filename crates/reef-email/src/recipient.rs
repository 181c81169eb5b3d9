use lettre::message::Mailbox;

use crate::error::EmailError;

/// Parse a recipient in either plain (`email@host`) or
/// `"Display Name;email@host"` form. The display name has control
/// characters and CR/LF stripped before being handed to lettre, since
/// those are the characters capable of corrupting a header line.
pub fn parse_mailbox(raw: &str) -> Result<Mailbox, EmailError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EmailError::MalformedAddress(raw.to_string()));
    }

    let (display_name, address) = match raw.split_once(';') {
        Some((name, address)) => (Some(sanitize_display_name(name)), address.trim()),
        None => (None, raw),
    };

    let address = address
        .parse()
        .map_err(|_| EmailError::MalformedAddress(raw.to_string()))?;

    Ok(match display_name {
        Some(name) if !name.is_empty() => Mailbox::new(Some(name), address),
        _ => Mailbox::new(None, address),
    })
}

fn sanitize_display_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse a `;`-or-`,`-separated list of recipients (used for CC).
pub fn parse_mailbox_list(raw: &str) -> Result<Vec<Mailbox>, EmailError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_mailbox)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_address() {
        let mailbox = parse_mailbox("user@example.com").expect("parse");
        assert_eq!(mailbox.email.to_string(), "user@example.com");
    }

    #[test]
    fn parses_display_name_syntax() {
        let mailbox = parse_mailbox("Finance Team;finance@example.com").expect("parse");
        assert_eq!(mailbox.email.to_string(), "finance@example.com");
        assert_eq!(mailbox.name.as_deref(), Some("Finance Team"));
    }

    #[test]
    fn strips_control_characters_from_display_name() {
        let mailbox = parse_mailbox("Finance\r\nTeam;finance@example.com").expect("parse");
        assert_eq!(mailbox.name.as_deref(), Some("FinanceTeam"));
    }

    #[test]
    fn rejects_malformed_address() {
        assert!(parse_mailbox("not-an-address").is_err());
        assert!(parse_mailbox("").is_err());
    }
}
