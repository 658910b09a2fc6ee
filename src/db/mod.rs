pub mod access_tokens;
pub mod password_reset_tokens;
pub mod permissions;
pub mod roles;
pub mod users;

/// Build a case-insensitive substring pattern for `ILIKE`, escaping wildcards.
pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
