/// Camera permission status as reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (device policy, parental controls)
    Restricted,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Detailed permission information returned to the web layer
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub status: PermissionStatus,
    pub message: String,
    pub can_request: bool,
}

impl From<PermissionStatus> for PermissionInfo {
    fn from(status: PermissionStatus) -> Self {
        let (message, can_request) = match status {
            PermissionStatus::Granted => ("Camera access granted", false),
            PermissionStatus::Denied => ("Camera access denied", true),
            PermissionStatus::NotDetermined => ("Camera permission not yet requested", true),
            PermissionStatus::Restricted => ("Camera access restricted by system policy", false),
        };
        PermissionInfo {
            status,
            message: message.to_string(),
            can_request,
        }
    }
}
