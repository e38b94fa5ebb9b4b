//! The signed canonical string.
//!
//! The field list and order are part of the client protocol. Adding fields
//! to the upload does not change what is signed.

use pusher_codec::escape::query_escape;

/// Build `data=<escaped data>&user_id=<escaped user id>` from the raw
/// parameter values as the client sent them.
pub fn canonicalize(raw_data: &str, raw_user_id: &str) -> String {
    format!(
        "data={}&user_id={}",
        query_escape(raw_data),
        query_escape(raw_user_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_field_order() {
        assert_eq!(canonicalize("abc", "u1"), "data=abc&user_id=u1");
    }

    #[test]
    fn test_space_is_percent20() {
        let canonical = canonicalize("{\"a\": 1}", "user 1");
        assert_eq!(canonical, "data=%7B%22a%22%3A%201%7D&user_id=user%201");
        assert!(!canonical.contains('+'));
    }

    #[test]
    fn test_base64_padding_escaped() {
        assert_eq!(canonicalize("ab+/==", "x"), "data=ab%2B%2F%3D%3D&user_id=x");
    }
}
