use std::collections::HashMap;

use crate::error::ConfigError;

pub const ENV_TENANT_ID: &str = "ARM_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "ARM_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ARM_CLIENT_SECRET";
pub const ENV_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";

/// Service principal credentials shared by the REST client and the azurerm
/// Terraform provider.
#[derive(Clone)]
pub struct ArmCredentials {
    pub tenant_id:       String,
    pub client_id:       String,
    pub client_secret:   String,
    pub subscription_id: Option<String>,
}

impl std::fmt::Debug for ArmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

impl ArmCredentials {
    /// Resolve `ARM_TENANT_ID`, `ARM_CLIENT_ID`, `ARM_CLIENT_SECRET` and the
    /// optional `ARM_SUBSCRIPTION_ID` through `lookup`. Blank values count
    /// as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(key))
        };
        Ok(Self {
            tenant_id:       required(ENV_TENANT_ID)?,
            client_id:       required(ENV_CLIENT_ID)?,
            client_secret:   required(ENV_CLIENT_SECRET)?,
            subscription_id: lookup(ENV_SUBSCRIPTION_ID).filter(|v| !v.trim().is_empty()),
        })
    }

    /// Environment for the provisioning subprocess. Never written to disk.
    pub fn env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::from([
            (ENV_TENANT_ID.to_string(), self.tenant_id.clone()),
            (ENV_CLIENT_ID.to_string(), self.client_id.clone()),
            (ENV_CLIENT_SECRET.to_string(), self.client_secret.clone()),
        ]);
        if let Some(sub) = &self.subscription_id {
            env.insert(ENV_SUBSCRIPTION_ID.to_string(), sub.clone());
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn all_required_present() {
        let creds = ArmCredentials::from_lookup(lookup(&[
            ("ARM_TENANT_ID", "t"),
            ("ARM_CLIENT_ID", "c"),
            ("ARM_CLIENT_SECRET", "s"),
        ]))
        .unwrap();
        assert_eq!(creds.tenant_id, "t");
        assert!(creds.subscription_id.is_none());
        let env = creds.env_vars();
        assert_eq!(env.len(), 3);
        assert_eq!(env["ARM_CLIENT_SECRET"], "s");
    }

    #[test]
    fn subscription_passed_through() {
        let creds = ArmCredentials::from_lookup(lookup(&[
            ("ARM_TENANT_ID", "t"),
            ("ARM_CLIENT_ID", "c"),
            ("ARM_CLIENT_SECRET", "s"),
            ("ARM_SUBSCRIPTION_ID", "sub"),
        ]))
        .unwrap();
        assert_eq!(creds.env_vars()["ARM_SUBSCRIPTION_ID"], "sub");
    }

    #[test]
    fn missing_secret_named_in_error() {
        let err = ArmCredentials::from_lookup(lookup(&[
            ("ARM_TENANT_ID", "t"),
            ("ARM_CLIENT_ID", "c"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("ARM_CLIENT_SECRET"), "got: {}", err);
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let err = ArmCredentials::from_lookup(lookup(&[
            ("ARM_TENANT_ID", "  "),
            ("ARM_CLIENT_ID", "c"),
            ("ARM_CLIENT_SECRET", "s"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("ARM_TENANT_ID")));
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = ArmCredentials::from_lookup(lookup(&[
            ("ARM_TENANT_ID", "t"),
            ("ARM_CLIENT_ID", "c"),
            ("ARM_CLIENT_SECRET", "hunter2"),
        ]))
        .unwrap();
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
