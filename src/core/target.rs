// src/core/target.rs

/// Reduces free-form user input to a bare hostname.
///
/// Accepts URLs, email addresses and bare hosts. Never fails: garbage in yields a
/// best-effort (possibly empty) string, and an empty target is later reported as
/// a resolution failure.
pub fn normalize_target(input: &str) -> String {
    let mut target = input.trim();

    if let Some((_, domain)) = target.split_once('@') {
        target = domain;
    }

    target = strip_scheme(target);

    if let Some(end) = target.find('/') {
        target = &target[..end];
    }
    if let Some(end) = target.find('?') {
        target = &target[..end];
    }

    target.to_string()
}

fn strip_scheme(input: &str) -> &str {
    for scheme in ["http://", "https://"] {
        if let Some(prefix) = input.get(..scheme.len()) {
            if prefix.eq_ignore_ascii_case(scheme) {
                return &input[scheme.len()..];
            }
        }
    }
    input
}
