use serde::{Deserialize, Serialize};

/// Engine channel carrying upload progress events.
pub const UPLOAD_PROGRESS_CHANNEL: &str = "upload-progress";

/// Engine channel carrying download progress events.
pub const DOWNLOAD_PROGRESS_CHANNEL: &str = "download-progress";

/// Settings key holding the identity-provider setting.
pub const KEY_COGNITO_SETTING: &str = "cognitoSetting";

/// Settings key holding the default download directory.
pub const KEY_DOWNLOAD_PATH: &str = "downloadPath";

/// Settings key holding the persisted refresh token.
pub const KEY_REFRESH_TOKEN: &str = "refreshToken";

/// Settings key holding the persisted temporary credentials.
pub const KEY_AWS_CREDENTIALS: &str = "awsCredentials";

/// Root under which every user's objects live (`private/<identityId>/...`).
pub const PRIVATE_ROOT: &str = "private";

/// Delimiter used when listing a folder.
pub const FOLDER_DELIMITER: &str = "/";

/// Direction of a transfer, derived from the channel it is reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Upload,
    Download,
}

impl TransferDirection {
    /// Returns the engine channel name for this direction.
    pub fn channel(self) -> &'static str {
        match self {
            TransferDirection::Upload => UPLOAD_PROGRESS_CHANNEL,
            TransferDirection::Download => DOWNLOAD_PROGRESS_CHANNEL,
        }
    }

    /// Maps an engine channel name back to a direction.
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            UPLOAD_PROGRESS_CHANNEL => Some(TransferDirection::Upload),
            DOWNLOAD_PROGRESS_CHANNEL => Some(TransferDirection::Download),
            _ => None,
        }
    }
}
