//! Construction-time configuration for vessels.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Result, VesselError};

/// Options a vessel is constructed with.
///
/// `label` is the namespace outputs are registered under (an output named
/// `min` on a vessel labelled `d1` becomes `d1.min`). `parameters` holds the
/// vessel's keyword arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VesselOptions {
    pub name: String,
    pub label: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameters: BTreeMap<String, String>,
}

impl VesselOptions {
    /// Options with no keyword parameters.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        VesselOptions {
            name: name.into(),
            label: label.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Build options from a whitespace-separated `KEY=VALUE` string.
    ///
    /// ```
    /// use cv_vessel::VesselOptions;
    ///
    /// let opts = VesselOptions::parse("MIN", "d1", "BETA=0.5 NN=6").unwrap();
    /// assert_eq!(opts.parameter::<f64>("BETA").unwrap(), Some(0.5));
    /// assert_eq!(opts.parameter::<u32>("MM").unwrap(), None);
    /// ```
    pub fn parse(
        name: impl Into<String>,
        label: impl Into<String>,
        params: &str,
    ) -> Result<Self> {
        let mut opts = Self::new(name, label);
        for word in params.split_whitespace() {
            let Some((key, value)) = word.split_once('=') else {
                return Err(VesselError::MalformedParameter(word.to_owned()));
            };
            if key.is_empty() || value.is_empty() {
                return Err(VesselError::MalformedParameter(word.to_owned()));
            }
            if opts
                .parameters
                .insert(key.to_owned(), value.to_owned())
                .is_some()
            {
                return Err(VesselError::RepeatedParameter(key.to_owned()));
            }
        }
        Ok(opts)
    }

    /// Parse parameter `key`, or `None` if it was not given.
    pub fn parameter<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.parameters.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| VesselError::InvalidParameter {
                    key: key.to_owned(),
                    value: raw.clone(),
                }),
        }
    }

    /// The label an output called `name` is registered under.
    pub fn output_label(&self, name: &str) -> String {
        if self.label.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{}", self.label, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bare_words() {
        let err = VesselOptions::parse("MIN", "d1", "BETA=1 NOPBC").unwrap_err();
        assert_eq!(err, VesselError::MalformedParameter("NOPBC".into()));
    }

    #[test]
    fn rejects_repeats() {
        let err = VesselOptions::parse("MIN", "d1", "BETA=1 BETA=2").unwrap_err();
        assert_eq!(err, VesselError::RepeatedParameter("BETA".into()));
    }

    #[test]
    fn bad_parameter_type() {
        let opts = VesselOptions::parse("MIN", "d1", "NN=six").unwrap();
        assert!(matches!(
            opts.parameter::<u32>("NN"),
            Err(VesselError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn output_labels() {
        assert_eq!(VesselOptions::new("MIN", "d1").output_label("min"), "d1.min");
        assert_eq!(VesselOptions::new("MIN", "").output_label("min"), "min");
    }
}
