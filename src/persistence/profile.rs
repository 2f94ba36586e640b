use serde::{Deserialize, Serialize};

/// The signed-in user as kept in the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub garage_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Embedded image, usually a base64 data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl ProfileRecord {
    pub fn identity(&self) -> IdentityRecord {
        IdentityRecord {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            garage_id: self.garage_id,
        }
    }

    pub fn without_image(&self) -> Self {
        Self {
            profile_image: None,
            ..self.clone()
        }
    }
}

/// Fields that must survive even when nothing else fits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub garage_id: u64,
}

impl From<IdentityRecord> for ProfileRecord {
    fn from(identity: IdentityRecord) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            email: identity.email,
            role: identity.role,
            garage_id: identity.garage_id,
            phone: None,
            company: None,
            profile_image: None,
        }
    }
}

/// Partial update merged over the current record; unset fields are kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub profile_image: Option<String>,
}

impl ProfilePatch {
    pub fn apply(&self, record: &ProfileRecord) -> ProfileRecord {
        let mut updated = record.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(email) = &self.email {
            updated.email = email.clone();
        }
        if let Some(role) = &self.role {
            updated.role = role.clone();
        }
        if let Some(phone) = &self.phone {
            updated.phone = Some(phone.clone());
        }
        if let Some(company) = &self.company {
            updated.company = Some(company.clone());
        }
        if let Some(image) = &self.profile_image {
            updated.profile_image = Some(image.clone());
        }
        updated
    }
}
