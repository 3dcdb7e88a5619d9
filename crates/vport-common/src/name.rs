//! Device name generation.

use crate::error::{VportError, VportResult};

/// Number of random characters appended to the caller's prefix.
pub const SUFFIX_LEN: usize = 7;

/// Linux IFNAMSIZ minus the trailing NUL.
const MAX_DEVICE_NAME_LEN: usize = 15;

/// Generate a candidate device name from `prefix` plus a random
/// 7-character hex suffix.
///
/// The name is not checked against existing devices or switch state;
/// a collision surfaces as a failure of whatever operation first uses
/// the name.
///
/// # Errors
///
/// Returns an error if the prefix is empty or the resulting name would
/// not fit in a kernel interface name.
pub fn generate_device_name(prefix: &str) -> VportResult<String> {
    if prefix.is_empty() {
        return Err(VportError::Config {
            message: "device name prefix is empty".to_string(),
        });
    }
    if prefix.len() + SUFFIX_LEN > MAX_DEVICE_NAME_LEN {
        return Err(VportError::Config {
            message: format!(
                "prefix '{}' too long for an interface name ({} character limit)",
                prefix, MAX_DEVICE_NAME_LEN
            ),
        });
    }

    let uuid = uuid::Uuid::new_v4();
    let hex = hex::encode(&uuid.as_bytes()[..4]);
    Ok(format!("{}{}", prefix, &hex[..SUFFIX_LEN]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_plus_seven_chars() {
        let name = generate_device_name("veth").unwrap();
        assert!(name.starts_with("veth"));
        assert_eq!(name.len(), "veth".len() + SUFFIX_LEN);
    }

    #[test]
    fn names_are_random() {
        let a = generate_device_name("veth").unwrap();
        let b = generate_device_name("veth").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_prefix_rejected() {
        assert!(generate_device_name("").is_err());
    }

    #[test]
    fn oversized_prefix_rejected() {
        assert!(generate_device_name("averylongprefix").is_err());
    }
}
