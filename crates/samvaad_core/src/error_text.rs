//! crates/samvaad_core/src/error_text.rs
//!
//! Maps identity-provider error identifiers to the static user-facing
//! strings shown in the client. Matching is a substring check on the
//! lowercased identifier; anything unrecognized falls back to a generic
//! message.

/// Formats a provider error identifier (e.g. `auth/wrong-password`) as a
/// user-facing message.
pub fn user_message(identifier: &str) -> &'static str {
    if identifier.is_empty() {
        return "Something went wrong.";
    }
    let id = identifier.to_lowercase();
    if id.contains("auth/invalid-email") {
        return "The email address is not valid.";
    }
    if id.contains("auth/email-already-in-use") {
        return "This email is already registered.";
    }
    if id.contains("auth/user-not-found") {
        return "No account found with this email.";
    }
    if id.contains("auth/wrong-password") {
        return "Incorrect password. Try again.";
    }
    if id.contains("auth/invalid-credential") {
        return "Invalid email or password.";
    }
    if id.contains("auth/missing-password") {
        return "Please enter your password.";
    }
    if id.contains("auth/weak-password") {
        return "Your password is too weak. Use at least 6 characters.";
    }
    if id.contains("auth/network-request-failed") {
        return "Network error. Check your internet connection.";
    }
    if id.contains("auth/popup-closed-by-user") {
        return "Google sign-in was closed before completion.";
    }
    if id.contains("auth/popup-blocked") {
        return "Popup blocked. Allow popups for this site.";
    }
    if id.contains("auth/too-many-requests") {
        return "Too many attempts. Try again later.";
    }
    "Something went wrong. Please try again."
}

#[cfg(test)]
mod tests {
    use super::user_message;

    #[test]
    fn known_identifiers_map_to_specific_text() {
        assert_eq!(
            user_message("auth/wrong-password"),
            "Incorrect password. Try again."
        );
        assert_eq!(
            user_message("auth/too-many-requests"),
            "Too many attempts. Try again later."
        );
    }

    #[test]
    fn match_is_case_insensitive_and_by_substring() {
        assert_eq!(
            user_message("identity error (AUTH/INVALID-EMAIL)"),
            "The email address is not valid."
        );
    }

    #[test]
    fn unknown_identifier_falls_back_to_generic() {
        assert_eq!(
            user_message("auth/quota-exceeded"),
            "Something went wrong. Please try again."
        );
        assert_eq!(user_message(""), "Something went wrong.");
    }
}
