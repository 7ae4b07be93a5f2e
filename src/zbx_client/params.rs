//! Parameter types shared by every `*.get` call.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use super::wire::is_false;

/// Which properties to return, for `output` and the `select*` parameters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum SelectQuery {
    #[default]
    Extend,
    Count,
    Fields(Vec<String>),
}

impl SelectQuery {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }
}

impl Serialize for SelectQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Extend => serializer.serialize_str("extend"),
            Self::Count => serializer.serialize_str("count"),
            Self::Fields(fields) => fields.serialize(serializer),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

/// Common parameters of all get methods; flattened into each entity's
/// parameter struct. Unset fields are left off the wire.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParameters {
    pub output: Option<SelectQuery>,
    pub filter: Option<Map<String, Value>>,
    pub search: Option<Map<String, Value>>,
    pub limit: Option<u32>,
    pub sortfield: Option<Vec<String>>,
    pub sortorder: Option<SortOrder>,
    #[serde(skip_serializing_if = "is_false")]
    pub count_output: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub editable: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub exclude_search: bool,
}

impl GetParameters {
    #[must_use]
    pub fn output(mut self, output: SelectQuery) -> Self {
        self.output = Some(output);
        self
    }

    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn search(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.search
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn sort_by<I, S>(mut self, fields: I, order: SortOrder) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortfield = Some(fields.into_iter().map(Into::into).collect());
        self.sortorder = Some(order);
        self
    }
}

/// A tag attached to a trigger, problem, event or maintenance.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Tag {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub value: String,
}

/// A tag condition in get parameters; `operator` is 0 for "contains" and 1
/// for "equals".
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TagFilter {
    pub tag: String,
    pub value: String,
    pub operator: u8,
}

/// `{"hostid": ...}` reference used by create methods.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HostRef {
    pub hostid: String,
}
