use std::collections::HashMap;

use crate::error::ParamError;

/// Named path parameters captured from a matched request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Value captured for `name`. Fails if the matched template never declared it.
    pub fn get(&self, name: &str) -> Result<&str, ParamError> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
