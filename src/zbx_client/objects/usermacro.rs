use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::GetParameters;
use crate::zbx_client::wire::{is_false, lenient_string, map_rows, non_empty};

/// A host, template or global macro as returned by `usermacro.get`.
#[derive(Clone, Debug, PartialEq)]
pub struct UserMacro {
    /// `hostmacroid`, or `globalmacroid` for global macros.
    pub macro_id: String,
    pub host_id: Option<String>,
    pub macro_name: String,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawUserMacro {
    #[serde(deserialize_with = "lenient_string")]
    hostmacroid: String,
    #[serde(deserialize_with = "lenient_string")]
    globalmacroid: String,
    #[serde(deserialize_with = "lenient_string")]
    hostid: String,
    #[serde(rename = "macro", deserialize_with = "lenient_string")]
    macro_name: String,
    #[serde(deserialize_with = "lenient_string")]
    value: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
}

impl TryFrom<RawUserMacro> for UserMacro {
    type Error = ZbxError;

    fn try_from(raw: RawUserMacro) -> std::result::Result<Self, ZbxError> {
        let macro_id = if raw.hostmacroid.is_empty() {
            raw.globalmacroid
        } else {
            raw.hostmacroid
        };
        if macro_id.is_empty() {
            return Err(ZbxError::MissingField {
                field: "hostmacroid",
            });
        }
        Ok(Self {
            macro_id,
            host_id: (!raw.hostid.is_empty()).then_some(raw.hostid),
            macro_name: raw.macro_name,
            value: raw.value,
            description: raw.description,
        })
    }
}

/// Parameters for `usermacro.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct UserMacroGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "globalmacro", skip_serializing_if = "is_false")]
    pub global_macro: bool,
    #[serde(rename = "globalmacroids")]
    pub global_macro_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "hostmacroids")]
    pub host_macro_ids: Option<Vec<String>>,
    #[serde(rename = "templateids")]
    pub template_ids: Option<Vec<String>>,
}

impl Session {
    /// Query `usermacro.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn user_macros(&self, params: &UserMacroGetParams) -> Result<Vec<UserMacro>> {
        let rows: Vec<RawUserMacro> = self.get("usermacro.get", params).await?;
        Ok(map_rows("UserMacro", non_empty("user macros", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RawUserMacro, UserMacro, UserMacroGetParams};
    use crate::zbx_client::wire::map_rows;

    #[test]
    fn global_macros_use_their_own_id() {
        let rows: Vec<RawUserMacro> = serde_json::from_value(json!([
            {"hostmacroid": "7", "hostid": "10084", "macro": "{$SNMP}", "value": "public"},
            {"globalmacroid": "2", "macro": "{$TIMEOUT}", "value": "30s"}
        ]))
        .unwrap();
        let macros: Vec<UserMacro> = map_rows("UserMacro", rows).unwrap();
        assert_eq!(macros[0].host_id.as_deref(), Some("10084"));
        assert_eq!(macros[1].macro_id, "2");
        assert_eq!(macros[1].host_id, None);
    }

    #[test]
    fn global_flag_serializes_only_when_set() {
        let params = UserMacroGetParams {
            global_macro: true,
            ..UserMacroGetParams::default()
        };
        assert_eq!(serde_json::to_value(params).unwrap(), json!({"globalmacro": true}));
    }
}
