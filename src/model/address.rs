//! Email address parsing and syntactic validation.

/// A parsed email address.
///
/// # Examples
/// - `"Ayşe Yılmaz <ayse@ornek.com.tr>"` → `display_name = "Ayşe Yılmaz"`, `address = "ayse@ornek.com.tr"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Build an address with an optional display name.
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }

    /// Parse a single email address from a metadata cell.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    ///
    /// If parsing fails, the raw string is stored as `address`; use
    /// [`EmailAddress::is_valid`] before trusting it.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    let addr = trimmed[angle_start + 1..angle_end].trim().to_string();
                    let display_name = strip_quotes(&trimmed[..angle_start]);
                    return Self {
                        display_name,
                        address: addr,
                    };
                }
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// `true` if `address` is a syntactically plausible `local@domain.tld`.
    pub fn is_valid(&self) -> bool {
        is_valid_address(&self.address)
    }
}

/// Syntactic address check.
///
/// Exchange distinguished names (`/O=EXCHANGELABS/...`), bare display
/// names and anything with whitespace or angle brackets are rejected.
pub fn is_valid_address(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() || s.len() > 254 {
        return false;
    }
    if s.chars().any(|c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '<' | '>' | '(' | ')' | ',' | ';' | '"' | '\\')
    }) {
        return false;
    }

    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    domain
        .split('.')
        .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
        assert!(addr.is_valid());
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("\"Yılmaz, Ayşe\" <ayse@ornek.com.tr>");
        assert_eq!(addr.address, "ayse@ornek.com.tr");
        assert_eq!(addr.display_name, "Yılmaz, Ayşe");
        assert!(addr.is_valid());
    }

    #[test]
    fn test_exchange_dn_is_invalid() {
        let addr = EmailAddress::parse(
            "/O=EXCHANGELABS/OU=EXCHANGE ADMINISTRATIVE GROUP/CN=RECIPIENTS/CN=ABC",
        );
        assert!(!addr.is_valid());
    }

    #[test]
    fn test_is_valid_address_cases() {
        assert!(is_valid_address("alice@example.com"));
        assert!(is_valid_address("first.last+tag@sub.example.co.uk"));
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("   "));
        assert!(!is_valid_address("backup"));
        assert!(!is_valid_address("a@b"));
        assert!(!is_valid_address("a@@b.com"));
        assert!(!is_valid_address("@example.com"));
        assert!(!is_valid_address("a b@example.com"));
        assert!(!is_valid_address("a@-example.com"));
        assert!(!is_valid_address("a@example..com"));
    }
}
