// Preference store trait - small persisted UI flags (theme)

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Failed to access preference file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Preference file corrupted: {message}")]
    Corrupted { message: String },

    #[error("Failed to save preferences: {message}")]
    SaveFailed { message: String },
}

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}
