//! Nested parameter lists
use std::fmt;

/// A parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Real number
    Real(f64),
    /// String
    Str(String),
    /// Nested list
    List(ParameterList),
}

impl ParameterValue {
    /// The value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Str(s) => Some(s),
            _ => None,
        }
    }
    /// The value as an integer, if it is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(i) => Some(*i),
            _ => None,
        }
    }
    /// The value as a real number; integers are converted
    pub fn as_real(&self) -> Option<f64> {
        match self {
            ParameterValue::Real(r) => Some(*r),
            ParameterValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
    /// The value as a boolean, if it is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
    /// The value as a nested list, if it is one
    pub fn as_list(&self) -> Option<&ParameterList> {
        match self {
            ParameterValue::List(l) => Some(l),
            _ => None,
        }
    }
    /// Check if the value is a nested list
    pub fn is_list(&self) -> bool {
        matches!(self, ParameterValue::List(_))
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{}", i32::from(*b)),
            ParameterValue::Int(i) => write!(f, "{i}"),
            ParameterValue::Real(r) => write!(f, "{r:?}"),
            ParameterValue::Str(s) => write!(f, "{s}"),
            ParameterValue::List(_) => write!(f, "..."),
        }
    }
}

macro_rules! value_from {
    ($($dtype:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$dtype> for ParameterValue {
                fn from(value: $dtype) -> Self {
                    ParameterValue::$variant($conv(value))
                }
            }
        )*
    };
}

value_from!(
    bool => Bool(std::convert::identity),
    i32 => Int(i64::from),
    i64 => Int(std::convert::identity),
    f64 => Real(std::convert::identity),
    &str => Str(str::to_string),
    String => Str(std::convert::identity),
    ParameterList => List(std::convert::identity),
);

/// An ordered list of named parameters, which may themselves be lists.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterList {
    name: String,
    entries: Vec<(String, ParameterValue)>,
}

impl ParameterList {
    /// Create an empty list
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: vec![],
        }
    }

    /// The name of the list
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a parameter, replacing any existing value with the same name
    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    /// Get a parameter
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Check if a parameter that is not a list exists
    pub fn is_parameter(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_list())
    }

    /// Check if a nested list exists
    pub fn is_sublist(&self, name: &str) -> bool {
        self.get(name).is_some_and(ParameterValue::is_list)
    }

    /// Get a nested list
    pub fn sublist(&self, name: &str) -> Option<&ParameterList> {
        self.get(name).and_then(ParameterValue::as_list)
    }

    /// Get a nested list, creating it if it does not exist.
    ///
    /// A non-list parameter of the same name is replaced.
    pub fn sublist_mut(&mut self, name: &str) -> &mut ParameterList {
        let position = match self.entries.iter().position(|(n, _)| n == name) {
            Some(i) => {
                if !self.entries[i].1.is_list() {
                    self.entries[i].1 = ParameterValue::List(ParameterList::new(name));
                }
                i
            }
            None => {
                self.entries
                    .push((name.to_string(), ParameterValue::List(ParameterList::new(name))));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[position].1 {
            ParameterValue::List(l) => l,
            _ => unreachable!(),
        }
    }

    /// Iterate over the parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// The number of parameters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no parameters
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the parameters as `name=value` pairs separated by `", "`.
    ///
    /// Nested lists are rendered as `...`.
    pub fn to_options_string(&self) -> String {
        self.iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod test {
    use super::{ParameterList, ParameterValue};

    #[test]
    fn test_set_and_get() {
        let mut params = ParameterList::new("main");
        params.set("max_iters", 100).set("tolerance", 1e-8);
        params.set("max_iters", 50);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("max_iters").unwrap().as_int(), Some(50));
        assert_eq!(params.get("tolerance").unwrap().as_real(), Some(1e-8));
        assert!(params.is_parameter("tolerance"));
        assert!(!params.is_parameter("solver"));
    }

    #[test]
    fn test_sublists() {
        let mut params = ParameterList::new("main");
        params.sublist_mut("amgx:params").set("solver", "PCG");
        params.sublist_mut("amgx:params").set("max_iters", 10);
        assert!(params.is_sublist("amgx:params"));
        assert!(!params.is_parameter("amgx:params"));
        let sub = params.sublist("amgx:params").unwrap();
        assert_eq!(sub.name(), "amgx:params");
        assert_eq!(sub.get("solver").unwrap().as_str(), Some("PCG"));
        assert_eq!(sub.len(), 2);
    }

    #[test]
    fn test_options_string() {
        let mut params = ParameterList::new("amgx:params");
        params
            .set("solver", "PCG")
            .set("max_iters", 20)
            .set("tolerance", 1e-10)
            .set("monitor_residual", true);
        params.sublist_mut("smoother").set("relaxation_factor", 0.8);
        assert_eq!(
            params.to_options_string(),
            "solver=PCG, max_iters=20, tolerance=1e-10, monitor_residual=1, smoother=..."
        );
        assert_eq!(ParameterList::new("empty").to_options_string(), "");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(ParameterValue::from(0.5).to_string(), "0.5");
        assert_eq!(ParameterValue::from(false).to_string(), "0");
        assert_eq!(ParameterValue::from("x").to_string(), "x");
    }
}
