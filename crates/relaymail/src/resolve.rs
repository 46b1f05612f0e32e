//! Address resolution into the records handed to the mailer.

use crate::address::MailAddress;

/// Recipient classification attached to a resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientKind {
    /// Carbon copy.
    Cc,
    /// Blind carbon copy.
    Bcc,
}

/// A structured address record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// Address part.
    pub email: String,
    /// Display name, present only when one was set.
    pub name: Option<String>,
    /// Classification, present only when requested.
    pub kind: Option<RecipientKind>,
}

/// Resolves one address.
#[must_use]
pub fn resolve_address(address: &MailAddress, kind: Option<RecipientKind>) -> ResolvedAddress {
    ResolvedAddress {
        email: address.email().to_string(),
        name: address.display_name().map(str::to_string),
        kind,
    }
}

/// Resolves a single address or a sequence of addresses, preserving order.
///
/// Accepts anything iterating over `&MailAddress`: a slice, a `Vec`, an
/// `Option`, or [`std::slice::from_ref`] for a single address.
pub fn resolve_addresses<'a, I>(addresses: I) -> Vec<ResolvedAddress>
where
    I: IntoIterator<Item = &'a MailAddress>,
{
    addresses
        .into_iter()
        .map(|address| resolve_address(address, None))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_without_name() {
        let address = MailAddress::new("a@example.com").unwrap();
        let resolved = resolve_address(&address, None);
        assert_eq!(resolved.email, "a@example.com");
        assert_eq!(resolved.name, None);
        assert_eq!(resolved.kind, None);
    }

    #[test]
    fn test_resolve_with_name_and_kind() {
        let address = MailAddress::with_name("Ann", "a@example.com").unwrap();
        let resolved = resolve_address(&address, Some(RecipientKind::Cc));
        assert_eq!(resolved.name.as_deref(), Some("Ann"));
        assert_eq!(resolved.kind, Some(RecipientKind::Cc));
    }

    #[test]
    fn test_resolve_addresses_preserves_order() {
        let list = vec![
            MailAddress::new("b@example.com").unwrap(),
            MailAddress::new("a@example.com").unwrap(),
        ];
        let emails: Vec<_> = resolve_addresses(&list)
            .into_iter()
            .map(|r| r.email)
            .collect();
        assert_eq!(emails, vec!["b@example.com", "a@example.com"]);
    }

    #[test]
    fn test_resolve_addresses_single() {
        let address = MailAddress::new("solo@example.com").unwrap();
        let resolved = resolve_addresses(std::slice::from_ref(&address));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].email, "solo@example.com");

        assert!(resolve_addresses(None::<&MailAddress>).is_empty());
    }
}
