//! POSIX username rules for keys published in metadata.

/// Longest username the guest environment accepts.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Whether `username` can be used as a login on the guest: 1 to 32
/// characters, starting with `[a-z_]` and continuing with `[a-z0-9_-]`.
pub fn is_valid_username(username: &str) -> bool {
    let mut chars = username.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    username.len() <= MAX_USERNAME_LENGTH
        && (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Derive a username from an account e-mail address.
///
/// Takes the local part, lower-cases it and replaces everything outside
/// `[a-z0-9_]` with `_`. Names that do not start with a letter get a `g`
/// prefix. The result is truncated to [`MAX_USERNAME_LENGTH`].
pub fn username_from_email(email: &str) -> String {
    let local_part = email.split_once('@').map_or(email, |(local, _)| local);

    let mut username: String = local_part
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !username.starts_with(|c: char| c.is_ascii_lowercase()) {
        username.insert(0, 'g');
    }

    username.truncate(MAX_USERNAME_LENGTH);
    username
}

/// The username to publish keys under: `preferred` if it is valid,
/// otherwise one derived from `account`.
pub fn resolve_username(preferred: Option<&str>, account: &str) -> String {
    match preferred {
        Some(preferred) if is_valid_username(preferred) => preferred.to_string(),
        _ => username_from_email(account),
    }
}
