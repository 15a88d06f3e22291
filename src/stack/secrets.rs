//! Managed credentials: a random password stored in the secret store.

use super::{Handle, Output, SecretRef, StackBuilder};
use crate::core::types::{PasswordSpec, ResourceKind, SecretSpec};

/// A generated password and the secret holding it.
#[derive(Debug, Clone)]
pub struct ManagedPassword {
    pub password: Handle,
    pub secret: Handle,
}

impl ManagedPassword {
    /// The raw password; only datastores that are configured with it may use it.
    pub fn value(&self) -> Output {
        self.password.output("result")
    }

    /// The live secret, for consumers.
    pub fn secret_ref(&self) -> SecretRef {
        SecretRef::of(&self.secret)
    }

    pub fn arn(&self) -> Output {
        self.secret.output("arn")
    }
}

/// Declare `<id>-password` and `<id>-secret`.
pub fn managed_password(
    b: &mut StackBuilder,
    id: &str,
    name_prefix: &str,
    policy: PasswordSpec,
) -> ManagedPassword {
    let password = b.add(&format!("{}-password", id), ResourceKind::RandomPassword(policy));
    let secret = b.add(
        &format!("{}-secret", id),
        ResourceKind::Secret(SecretSpec {
            name_prefix: name_prefix.to_string(),
            value: password.output("result").to_string(),
            description: Some(format!("{} credential", id)),
        }),
    );
    ManagedPassword { password, secret }
}
