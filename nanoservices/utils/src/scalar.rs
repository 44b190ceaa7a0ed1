use serde::{Deserialize, Serialize};

/// A single value returned by a warehouse scalar query, in its native
/// representation. Quality checks compare these against configured
/// thresholds without coercing across numeric/text boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Scalar {
    /// Numeric view of the scalar, if it has one. Int and Float are both
    /// numeric; Text and Null are not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Text(_) | Scalar::Null => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Short type name used in evaluation-error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
            Scalar::Null => "null",
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => write!(f, "{v}"),
            Scalar::Null => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_view_covers_int_and_float() {
        assert_eq!(Scalar::Int(5).as_f64(), Some(5.0));
        assert_eq!(Scalar::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Scalar::Text("5".into()).as_f64(), None);
        assert_eq!(Scalar::Null.as_f64(), None);
    }

    #[test]
    fn yaml_thresholds_deserialize_untagged() {
        let int: Scalar = serde_yaml::from_str("0").unwrap();
        assert_eq!(int, Scalar::Int(0));

        let float: Scalar = serde_yaml::from_str("0.5").unwrap();
        assert_eq!(float, Scalar::Float(0.5));

        let text: Scalar = serde_yaml::from_str("\"paid\"").unwrap();
        assert_eq!(text, Scalar::Text("paid".into()));
    }
}
