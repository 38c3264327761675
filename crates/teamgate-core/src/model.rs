use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid or missing parameter '{field}': {reason}")]
    InvalidParam { field: &'static str, reason: String },
}

impl ModelError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            field,
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidParam { field, .. } => *field,
        }
    }
}

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parses a textual identifier, reporting failures against `field`.
            pub fn parse(raw: &str, field: &'static str) -> Result<Self, ModelError> {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(ModelError::invalid(field, "identifier is required"));
                }
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| ModelError::invalid(field, e.to_string()))
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(ChannelId);
entity_id!(UserId);
entity_id!(RoleId);

const MAX_CHANNEL_NAME_LEN: usize = 64;
const MAX_CHANNEL_DISPLAY_NAME_LEN: usize = 64;
const MAX_CHANNEL_HEADER_LEN: usize = 1024;
const MAX_CHANNEL_PURPOSE_LEN: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Open,
    Private,
    Direct,
    Group,
}

impl ChannelType {
    /// Direct and group channels take their members from the participants
    /// they were created with.
    pub fn has_fixed_participants(&self) -> bool {
        matches!(self, ChannelType::Direct | ChannelType::Group)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelType::Open => "open",
            ChannelType::Private => "private",
            ChannelType::Direct => "direct",
            ChannelType::Group => "group",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub display_name: String,
    pub channel_type: ChannelType,
    pub header: String,
    pub purpose: String,
    pub group_constrained: bool,
}

impl Channel {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        channel_type: ChannelType,
    ) -> Self {
        Self {
            id: ChannelId::generate(),
            name: name.into(),
            display_name: display_name.into(),
            channel_type,
            header: String::new(),
            purpose: String::new(),
            group_constrained: false,
        }
    }

    pub fn with_group_constraint(mut self, constrained: bool) -> Self {
        self.group_constrained = constrained;
        self
    }

    pub fn is_group_constrained(&self) -> bool {
        self.group_constrained
    }

    pub fn apply_patch(&mut self, patch: &ChannelPatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(ref display_name) = patch.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(ref header) = patch.header {
            self.header = header.clone();
        }
        if let Some(ref purpose) = patch.purpose {
            self.purpose = purpose.clone();
        }
        if let Some(constrained) = patch.group_constrained {
            self.group_constrained = constrained;
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !is_valid_channel_name(&self.name) {
            return Err(ModelError::invalid(
                "name",
                format!("'{}' is not a valid channel name", self.name),
            ));
        }
        let display_len = self.display_name.chars().count();
        if display_len == 0 || display_len > MAX_CHANNEL_DISPLAY_NAME_LEN {
            return Err(ModelError::invalid(
                "display_name",
                format!("must be 1..={MAX_CHANNEL_DISPLAY_NAME_LEN} characters"),
            ));
        }
        if self.header.chars().count() > MAX_CHANNEL_HEADER_LEN {
            return Err(ModelError::invalid(
                "header",
                format!("exceeds {MAX_CHANNEL_HEADER_LEN} characters"),
            ));
        }
        if self.purpose.chars().count() > MAX_CHANNEL_PURPOSE_LEN {
            return Err(ModelError::invalid(
                "purpose",
                format!("exceeds {MAX_CHANNEL_PURPOSE_LEN} characters"),
            ));
        }
        Ok(())
    }
}

/// Channel names are lowercase ASCII letters, digits, `-` and `_`.
pub fn is_valid_channel_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_CHANNEL_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        && !name.starts_with('-')
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub header: Option<String>,
    pub purpose: Option<String>,
    pub group_constrained: Option<bool>,
}

impl ChannelPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.display_name.is_none()
            && self.header.is_none()
            && self.purpose.is_none()
            && self.group_constrained.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_bot: bool,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: UserId::generate(),
            username: username.into(),
            is_bot: false,
        }
    }

    pub fn bot(username: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            ..Self::new(username)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMember {
    pub channel_id: ChannelId,
    pub user_id: UserId,
}

impl ChannelMember {
    pub fn new(channel_id: ChannelId, user_id: UserId) -> Self {
        Self {
            channel_id,
            user_id,
        }
    }
}
