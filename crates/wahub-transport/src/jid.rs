// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JID normalisation for outbound destinations.
//!
//! The upstream protocol addresses individual chats as
//! `<digits>@s.whatsapp.net` and groups as `<id>@g.us`. The control API
//! accepts bare phone numbers and bare group ids; these helpers coerce them
//! to canonical form and reject garbage before it reaches the transport.

use wahub_core::WahubError;

/// Suffix for individual chat JIDs.
pub const USER_SUFFIX: &str = "@s.whatsapp.net";
/// Suffix for group JIDs.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Strip everything that is not a digit.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalise a destination phone number or user JID to canonical form.
pub fn to_user_jid(input: &str) -> Result<String, WahubError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WahubError::BadInput("destination must not be empty".into()));
    }
    if trimmed.ends_with(USER_SUFFIX) {
        return Ok(trimmed.to_string());
    }
    let digits = digits_only(trimmed);
    if digits.is_empty() {
        return Err(WahubError::BadInput(format!(
            "destination {trimmed:?} contains no digits"
        )));
    }
    Ok(format!("{digits}{USER_SUFFIX}"))
}

/// Normalise a group id or group JID to canonical form.
pub fn to_group_jid(input: &str) -> Result<String, WahubError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WahubError::BadInput("group id must not be empty".into()));
    }
    if trimmed.ends_with(GROUP_SUFFIX) {
        return Ok(trimmed.to_string());
    }
    Ok(format!("{trimmed}{GROUP_SUFFIX}"))
}

/// Whether a JID addresses a group.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_phone_becomes_user_jid() {
        assert_eq!(to_user_jid("628123456789").unwrap(), "628123456789@s.whatsapp.net");
    }

    #[test]
    fn formatted_phone_is_stripped() {
        assert_eq!(to_user_jid("+62 812-3456-789").unwrap(), "628123456789@s.whatsapp.net");
    }

    #[test]
    fn canonical_user_jid_passes_through() {
        assert_eq!(
            to_user_jid("628123@s.whatsapp.net").unwrap(),
            "628123@s.whatsapp.net"
        );
    }

    #[test]
    fn empty_destination_is_bad_input() {
        assert_eq!(to_user_jid("").unwrap_err().code(), "bad_input");
        assert_eq!(to_user_jid("   ").unwrap_err().code(), "bad_input");
        assert_eq!(to_user_jid("abc").unwrap_err().code(), "bad_input");
    }

    #[test]
    fn group_id_is_coerced() {
        assert_eq!(to_group_jid("1203630").unwrap(), "1203630@g.us");
        assert_eq!(to_group_jid("1203630@g.us").unwrap(), "1203630@g.us");
        assert_eq!(to_group_jid("").unwrap_err().code(), "bad_input");
    }

    #[test]
    fn group_detection() {
        assert!(is_group_jid("1203630@g.us"));
        assert!(!is_group_jid("628123@s.whatsapp.net"));
    }
}
