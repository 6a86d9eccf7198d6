//! Reserved trust-header namespace
//!
//! The gateway is the only author of these headers. It strips every inbound
//! occurrence, then writes the verified identity back as exactly one
//! `X-AUTH-USER-EMAIL` and one `X-AUTH-USER-ROLES` (sorted CSV). Downstream services
//! read them back with [`read_identity`].
//!
//! Header names are case-insensitive on the wire; `HeaderName` is always lowercase,
//! so the constants below are the lowercase forms.

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use crypto_core::{Identity, Roles};
use tracing::debug;

pub const EMAIL_HEADER: &str = "x-auth-user-email";
pub const ROLES_HEADER: &str = "x-auth-user-roles";

/// Everything under this prefix belongs to the gateway
pub const RESERVED_PREFIX: &str = "x-auth-";

/// Older naming still honoured by some clients; stripped so it can never be confused
/// with gateway-authored identity
pub const LEGACY_HEADERS: [&str; 2] = ["x-user-email", "x-user-roles"];

pub fn is_reserved(name: &HeaderName) -> bool {
    let name = name.as_str();
    name.starts_with(RESERVED_PREFIX) || LEGACY_HEADERS.contains(&name)
}

/// Remove every reserved header, returning how many values were dropped.
///
/// Applying it twice is the same as applying it once.
pub fn strip_reserved(headers: &mut HeaderMap) -> usize {
    let reserved: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_reserved(name))
        .cloned()
        .collect();

    reserved
        .iter()
        .map(|name| headers.remove(name).count())
        .sum()
}

/// Write `identity` as the trust-header pair, replacing any existing values
pub fn inject(headers: &mut HeaderMap, identity: &Identity) -> Result<(), InvalidHeaderValue> {
    let email = HeaderValue::from_str(identity.subject())?;
    let roles = HeaderValue::from_str(&identity.roles().to_csv())?;

    headers.insert(HeaderName::from_static(EMAIL_HEADER), email);
    headers.insert(HeaderName::from_static(ROLES_HEADER), roles);
    Ok(())
}

/// Rebuild the identity from the trust-header pair.
///
/// Returns `None` unless both headers are present exactly once and parse into a
/// valid [`Identity`].
pub fn read_identity(headers: &HeaderMap) -> Option<Identity> {
    let email = single_value(headers, EMAIL_HEADER)?;
    let roles = single_value(headers, ROLES_HEADER)?;

    let roles = match Roles::parse_csv(roles) {
        Ok(roles) => roles,
        Err(e) => {
            debug!(error = %e, "Ignoring trust headers with invalid roles");
            return None;
        }
    };

    match Identity::new(email, roles) {
        Ok(identity) => Some(identity),
        Err(e) => {
            debug!(error = %e, "Ignoring trust headers with invalid subject");
            None
        }
    }
}

fn single_value<'a>(headers: &'a HeaderMap, name: &'static str) -> Option<&'a str> {
    let name = HeaderName::from_static(name);
    let mut values = headers.get_all(&name);
    let value = values.next()?;
    if values.next().is_some() {
        debug!(header = %name, "Ignoring repeated trust header");
        return None;
    }
    std::str::from_utf8(value.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::new("admin@pms.com", Roles::parse_csv("USER,ADMIN").unwrap()).unwrap()
    }

    fn header(name: &'static str, value: &'static str) -> (HeaderName, HeaderValue) {
        (HeaderName::from_static(name), HeaderValue::from_static(value))
    }

    fn spoofed() -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            header("x-auth-user-roles", "ADMIN"),
            header("x-auth-user-email", "attacker@evil.com"),
            header("x-auth-anything", "1"),
            header("x-user-roles", "ADMIN"),
            header("authorization", "Bearer abc"),
            header("accept", "application/json"),
        ] {
            headers.append(name, value);
        }
        headers.append(
            HeaderName::from_static("x-auth-user-roles"),
            HeaderValue::from_static("SUPERUSER"),
        );
        headers
    }

    #[test]
    fn test_is_reserved_covers_prefix_and_legacy_names() {
        assert!(is_reserved(&HeaderName::from_static("x-auth-user-email")));
        assert!(is_reserved(&HeaderName::from_static("x-auth-tenant")));
        assert!(is_reserved(&HeaderName::from_static("x-user-email")));
        assert!(is_reserved(&HeaderName::from_static("x-user-roles")));
        assert!(!is_reserved(&HeaderName::from_static("authorization")));
        assert!(!is_reserved(&HeaderName::from_static("x-request-id")));
    }

    #[test]
    fn test_strip_reserved_removes_all_values() {
        let mut headers = spoofed();
        assert_eq!(strip_reserved(&mut headers), 5);
        assert!(headers.get("x-auth-user-roles").is_none());
        assert!(headers.get("x-user-roles").is_none());
        assert_eq!(headers.get("authorization").unwrap(), "Bearer abc");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn test_strip_reserved_is_idempotent() {
        let mut once = spoofed();
        strip_reserved(&mut once);
        let mut twice = once.clone();
        assert_eq!(strip_reserved(&mut twice), 0);

        let mut a: Vec<_> = once.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut b: Vec<_> = twice.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        a.sort_by(|x, y| x.0.as_str().cmp(y.0.as_str()));
        b.sort_by(|x, y| x.0.as_str().cmp(y.0.as_str()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_inject_then_read_round_trips() {
        let mut headers = HeaderMap::new();
        inject(&mut headers, &identity()).unwrap();

        assert_eq!(headers.get(EMAIL_HEADER).unwrap(), "admin@pms.com");
        assert_eq!(headers.get(ROLES_HEADER).unwrap(), "ADMIN,USER");
        assert_eq!(read_identity(&headers), Some(identity()));
    }

    #[test]
    fn test_inject_replaces_existing_values() {
        let mut headers = spoofed();
        inject(&mut headers, &identity()).unwrap();
        assert_eq!(headers.get_all(ROLES_HEADER).count(), 1);
        assert_eq!(headers.get(ROLES_HEADER).unwrap(), "ADMIN,USER");
    }

    #[test]
    fn test_read_identity_requires_both_headers() {
        let mut headers = HeaderMap::new();
        let (name, value) = header("x-auth-user-email", "a@pms.com");
        headers.insert(name, value);
        assert_eq!(read_identity(&headers), None);
    }

    #[test]
    fn test_read_identity_rejects_repeated_and_empty_values() {
        assert_eq!(read_identity(&spoofed()), None);

        let mut headers = HeaderMap::new();
        for (name, value) in [
            header("x-auth-user-email", "a@pms.com"),
            header("x-auth-user-roles", " , "),
        ] {
            headers.insert(name, value);
        }
        assert_eq!(read_identity(&headers), None);
    }
}
