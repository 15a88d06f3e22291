//! Credential handlers: random passwords and managed secrets.

use crate::core::error::{Error, Result, ValidationError};
use crate::core::types::{PasswordSpec, ProviderConfig, SecretSpec};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

pub const PASSWORD_OUTPUTS: &[&str] = &["result"];
pub const SECRET_OUTPUTS: &[&str] = &["arn", "name"];

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &[u8] = b"0123456789";
const DEFAULT_SPECIAL: &[u8] = b"!@#$%&*()-_=+[]{}<>:?";

/// Length of the unique suffix appended to a secret's name prefix.
pub const SECRET_SUFFIX_LEN: usize = 26;

/// Longest password the generator will produce.
pub const MAX_PASSWORD_LENGTH: u32 = 4096;

/// Check a password policy for satisfiability.
pub fn check_policy(id: &str, spec: &PasswordSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if spec.length == 0 {
        errors.push(ValidationError::new(format!(
            "resource '{}' (random_password) has length 0",
            id
        )));
    }

    if spec.length > MAX_PASSWORD_LENGTH {
        errors.push(ValidationError::new(format!(
            "resource '{}' (random_password) length {} exceeds {}",
            id, spec.length, MAX_PASSWORD_LENGTH
        )));
    }

    let minimums: u64 = [spec.min_lower, spec.min_upper, spec.min_numeric, spec.min_special]
        .iter()
        .map(|&n| u64::from(n))
        .sum();
    if minimums > u64::from(spec.length) {
        errors.push(ValidationError::new(format!(
            "resource '{}' (random_password) requires {} characters by class minimums \
             but length is {}",
            id, minimums, spec.length
        )));
    }

    if spec.min_special > 0 && !spec.special {
        errors.push(ValidationError::new(format!(
            "resource '{}' (random_password) sets min_special with special: false",
            id
        )));
    }

    if let Some(ref chars) = spec.override_special {
        if chars.is_empty() || !chars.is_ascii() {
            errors.push(ValidationError::new(format!(
                "resource '{}' (random_password) override_special must be non-empty ASCII",
                id
            )));
        }
    }

    errors
}

/// Validate a secret declaration.
pub fn validate_secret(id: &str, spec: &SecretSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let allowed = |c: char| c.is_ascii_alphanumeric() || "/_+=.@-".contains(c);
    if spec.name_prefix.is_empty() || !spec.name_prefix.chars().all(allowed) {
        errors.push(ValidationError::new(format!(
            "resource '{}' (secret) has invalid name_prefix '{}'",
            id, spec.name_prefix
        )));
    }
    if spec.value.trim().is_empty() {
        errors.push(ValidationError::new(format!(
            "resource '{}' (secret) has no value",
            id
        )));
    }
    errors
}

fn special_set(spec: &PasswordSpec) -> &[u8] {
    spec.override_special
        .as_deref()
        .map(str::as_bytes)
        .unwrap_or(DEFAULT_SPECIAL)
}

/// Generate a password satisfying `spec` from the given RNG.
pub fn generate_password_with<R: Rng + ?Sized>(
    id: &str,
    spec: &PasswordSpec,
    rng: &mut R,
) -> Result<String> {
    let errors = check_policy(id, spec);
    if !errors.is_empty() {
        return Err(Error::Validation { errors });
    }

    let special = special_set(spec);
    let mut pool: Vec<u8> = [LOWER, UPPER, NUMERIC].concat();
    if spec.special {
        pool.extend_from_slice(special);
    }

    let mut chars: Vec<u8> = Vec::with_capacity(spec.length as usize);
    for (class, count) in [
        (LOWER, spec.min_lower),
        (UPPER, spec.min_upper),
        (NUMERIC, spec.min_numeric),
        (special, spec.min_special),
    ] {
        for _ in 0..count {
            chars.push(class[rng.gen_range(0..class.len())]);
        }
    }
    while chars.len() < spec.length as usize {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(rng);

    // Every class is ASCII.
    Ok(chars.into_iter().map(char::from).collect())
}

/// Generate a password from the OS RNG.
pub fn generate_password(id: &str, spec: &PasswordSpec) -> Result<String> {
    generate_password_with(id, spec, &mut OsRng)
}

/// Whether `name` was generated by `secret_name` from `prefix`.
pub fn has_prefix(name: &str, prefix: &str) -> bool {
    name.len() == prefix.len() + SECRET_SUFFIX_LEN && name.starts_with(prefix)
}

/// Unique secret name: the prefix plus a random lowercase suffix.
pub fn secret_name(prefix: &str) -> String {
    let mut rng = OsRng;
    let suffix: String = (0..SECRET_SUFFIX_LEN)
        .map(|_| {
            let set = b"0123456789abcdefghijklmnopqrstuvwxyz";
            char::from(set[rng.gen_range(0..set.len())])
        })
        .collect();
    format!("{}{}", prefix, suffix)
}

pub fn secret_arn(provider: &ProviderConfig, name: &str) -> String {
    format!(
        "arn:aws:secretsmanager:{}:{}:secret:{}",
        provider.region, provider.account_id, name
    )
}

pub fn describe_password(id: &str, spec: &PasswordSpec) -> String {
    format!("{}: generate {}-character password", id, spec.length)
}

pub fn describe_secret(id: &str, spec: &SecretSpec) -> String {
    format!("{}: store secret {}*", id, spec.name_prefix)
}
