//! Tagged data sections.

use serde::{Deserialize, Serialize};

/// How a section or property combines with existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataOperator {
    /// `=`: define or overwrite.
    #[default]
    Assignment,
    /// `+=`: extend an existing definition or list.
    Addition,
    /// `-=`: remove from a list.
    Subtraction,
}

impl DataOperator {
    /// Source-style spelling of the operator, for diagnostics.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Assignment => "=",
            Self::Addition => "+=",
            Self::Subtraction => "-=",
        }
    }
}

/// A single key/value property inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProperty {
    /// Property key.
    pub key: String,
    /// Operator used for this property.
    #[serde(default)]
    pub operator: DataOperator,
    /// Raw property value.
    pub value: String,
}

impl DataProperty {
    /// Create an assignment property.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: DataOperator::Assignment,
            value: value.into(),
        }
    }

    /// Create a property with an explicit operator.
    #[must_use]
    pub fn with_operator(
        key: impl Into<String>,
        operator: DataOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            value: value.into(),
        }
    }
}

/// A tagged section: either a top-level instance definition or a nested block.
///
/// # Example RON
///
/// ```ron
/// (
///     tag: "orc_spear",
///     properties: [
///         (key: "class", value: "point_to_point"),
///         (key: "aliases", operator: Addition, value: "spear"),
///     ],
///     sections: [
///         (tag: "image", properties: [(key: "file", value: "missiles/spear.png")]),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataSection {
    /// Section tag; for top-level sections this is the instance identifier.
    pub tag: String,
    /// Operator used for the section as a whole.
    #[serde(default)]
    pub operator: DataOperator,
    /// Flat key/value properties, in source order.
    #[serde(default)]
    pub properties: Vec<DataProperty>,
    /// Nested subsections, in source order.
    #[serde(default)]
    pub sections: Vec<DataSection>,
}

impl DataSection {
    /// Create an empty assignment section.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder method to set the section operator.
    #[must_use]
    pub fn with_operator(mut self, operator: DataOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Builder method to append an assignment property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push(DataProperty::new(key, value));
        self
    }

    /// Builder method to append a property with an explicit operator.
    #[must_use]
    pub fn with_operator_property(
        mut self,
        key: impl Into<String>,
        operator: DataOperator,
        value: impl Into<String>,
    ) -> Self {
        self.properties
            .push(DataProperty::with_operator(key, operator, value));
        self
    }

    /// Builder method to append a nested section.
    #[must_use]
    pub fn with_section(mut self, section: DataSection) -> Self {
        self.sections.push(section);
        self
    }

    /// First property value for a key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// First nested section with a tag.
    #[must_use]
    pub fn section(&self, tag: &str) -> Option<&DataSection> {
        self.sections.iter().find(|s| s.tag == tag)
    }
}
