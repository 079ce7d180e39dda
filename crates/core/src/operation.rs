//! Operation descriptors - what to install or update.

use serde::{Deserialize, Serialize};

/// Kind of store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Install an application that is not yet present
    Install,
    /// Update an installed application to another version
    Update,
}

impl OperationKind {
    /// Lowercase name used in logs and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Install => "install",
            OperationKind::Update => "update",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Additional operation parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationOptions {
    /// Load the application's demo data along with it
    #[serde(default)]
    pub load_demo_data: bool,

    /// Extra fields forwarded verbatim in the trigger request body
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Describes a single install or update to trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Install or update
    pub kind: OperationKind,

    /// Store application identifier (sys_id or scope)
    pub item_id: String,

    /// Target version; `None` installs the latest available version
    pub version: Option<String>,

    /// Additional parameters
    #[serde(default)]
    pub options: OperationOptions,
}

impl OperationDescriptor {
    /// Describe an install of the latest version.
    pub fn install(item_id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Install,
            item_id: item_id.into(),
            version: None,
            options: OperationOptions::default(),
        }
    }

    /// Describe an update to a specific version.
    pub fn update(item_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Update,
            item_id: item_id.into(),
            version: Some(version.into()),
            options: OperationOptions::default(),
        }
    }

    /// Pin the target version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: OperationOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the descriptor can be sent to the trigger endpoint.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.item_id.trim().is_empty() {
            return Err(DescriptorError::EmptyItemId);
        }

        let has_version = self
            .version
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

        if self.kind == OperationKind::Update && !has_version {
            return Err(DescriptorError::MissingVersion {
                item_id: self.item_id.clone(),
            });
        }

        Ok(())
    }
}

/// Reasons a descriptor is rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// No item identifier given
    #[error("item identifier must not be empty")]
    EmptyItemId,

    /// Update requested without a target version
    #[error("update of {item_id} requires a target version")]
    MissingVersion {
        /// Item the update was requested for
        item_id: String,
    },
}
