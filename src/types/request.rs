//! Request types accepted by the gateway.

use serde::{Deserialize, Serialize};

/// A request for one data type of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Entity identifier (company name or symbol). Normalized by the gateway.
    #[serde(alias = "name")]
    pub entity_id: String,
    /// Data type tag, e.g. `"profile"` or `"price"`.
    pub data_type: String,
    /// Skip the fresh-cache shortcut and go upstream if the budget allows.
    #[serde(default)]
    pub force_refresh: bool,
    /// Website hint, passed through to the provider untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl DataRequest {
    pub fn new(entity_id: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            data_type: data_type.into(),
            force_refresh: false,
            website: None,
        }
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }
}

/// One entity in a [`BatchRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchEntity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Per-entity data types; falls back to the batch-wide selector when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_types: Option<Vec<String>>,
}

impl BatchEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: None,
            data_types: None,
        }
    }

    pub fn website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn data_types<I, S>(mut self, data_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_types = Some(data_types.into_iter().map(Into::into).collect());
        self
    }
}

/// An ordered list of entities fetched as one accounting unit.
///
/// Budget reservations are granted in list order, so the same budget state
/// and the same list always produce the same cache/api/budget split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub companies: Vec<BatchEntity>,
    /// Data types requested for every entity without its own selector.
    #[serde(default)]
    pub data_types: Vec<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl BatchRequest {
    pub fn new<I, S>(data_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            companies: Vec::new(),
            data_types: data_types.into_iter().map(Into::into).collect(),
            force_refresh: false,
        }
    }

    pub fn entity(mut self, entity: BatchEntity) -> Self {
        self.companies.push(entity);
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Expand into `(entity, data_types)` pairs in request order.
    pub fn items(&self) -> impl Iterator<Item = (&BatchEntity, &[String])> {
        self.companies.iter().map(|entity| {
            let types = entity.data_types.as_deref().unwrap_or(&self.data_types);
            (entity, types)
        })
    }
}
