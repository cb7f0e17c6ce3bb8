use serde::{Deserialize, Serialize};

/// Result of `Shelly.GetDeviceInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Device generation.
    #[serde(default, rename = "gen", skip_serializing_if = "Option::is_none")]
    pub generation: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fw_id: Option<String>,
    /// Firmware version.
    #[serde(default, rename = "ver", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Active profile on multi-profile devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, rename = "auth_en")]
    pub auth_enabled: bool,
    /// Realm used for digest auth; absent when auth is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
}

/// Result of `Shelly.ListMethods`: the methods this caller may invoke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodList {
    #[serde(default)]
    pub methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_from_device_json() {
        let info: DeviceInfo = serde_json::from_str(
            r#"{"name":null,"id":"shellyplus1-a8032ab12345","mac":"A8032AB12345",
                "model":"SNSW-001X16EU","gen":2,"fw_id":"20230912-082000/1.0.3-g6176478",
                "ver":"1.0.3","app":"Plus1","auth_en":true,"auth_domain":"shellyplus1-a8032ab12345"}"#,
        )
        .unwrap();

        assert_eq!(info.id, "shellyplus1-a8032ab12345");
        assert_eq!(info.name, None);
        assert_eq!(info.generation, Some(2));
        assert_eq!(info.version.as_deref(), Some("1.0.3"));
        assert!(info.auth_enabled);
        assert_eq!(info.auth_domain.as_deref(), Some("shellyplus1-a8032ab12345"));
    }

    #[test]
    fn method_list_defaults_to_empty() {
        let list: MethodList = serde_json::from_str("{}").unwrap();
        assert!(list.methods.is_empty());
    }
}
