use serde::{Deserialize, Serialize};

/// The hosted web service the repository is connected to.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServiceConfiguration {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "ServiceConfiguration::default_branch")]
    pub branch: String,
}

impl ServiceConfiguration {
    fn default_branch() -> String {
        "main".to_string()
    }
}
