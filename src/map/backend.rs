//! Selection of the map representation
use crate::map::{CompactMap, HashedMap};
use crate::params::ParameterList;
use crate::traits::{Comm, DistributedMap, MapFactory};
use crate::types::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Factory for [HashedMap]
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedMapFactory;

impl MapFactory for HashedMapFactory {
    fn name(&self) -> &'static str {
        "hashed"
    }
    fn build(
        &self,
        global_size: Option<usize>,
        elements: &[usize],
        index_base: usize,
        comm: &dyn Comm,
    ) -> Result<Arc<dyn DistributedMap>> {
        Ok(Arc::new(HashedMap::new(
            global_size,
            elements,
            index_base,
            comm,
        )?))
    }
}

/// Factory for [CompactMap]
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactMapFactory;

impl MapFactory for CompactMapFactory {
    fn name(&self) -> &'static str {
        "compact"
    }
    fn build(
        &self,
        global_size: Option<usize>,
        elements: &[usize],
        index_base: usize,
        comm: &dyn Comm,
    ) -> Result<Arc<dyn DistributedMap>> {
        Ok(Arc::new(CompactMap::new(
            global_size,
            elements,
            index_base,
            comm,
        )?))
    }
}

/// The available map representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapBackend {
    /// Arbitrary global indices with hashed lookup
    #[default]
    Hashed,
    /// 32-bit global ordinals
    Compact,
}

impl MapBackend {
    /// Parameter name used by [MapBackend::from_parameters]
    pub const PARAMETER: &'static str = "map backend";

    /// The factory for this representation
    pub fn factory(&self) -> Box<dyn MapFactory> {
        match self {
            MapBackend::Hashed => Box::new(HashedMapFactory),
            MapBackend::Compact => Box::new(CompactMapFactory),
        }
    }

    /// Read the backend from a parameter list, defaulting to [MapBackend::Hashed]
    pub fn from_parameters(params: &ParameterList) -> Result<Self> {
        match params.get(Self::PARAMETER) {
            None => Ok(Self::default()),
            Some(value) => match value.as_str() {
                Some(name) => name.parse(),
                None => Err(Error::Parameter(format!(
                    "\"{}\" must be a string",
                    Self::PARAMETER
                ))),
            },
        }
    }
}

impl FromStr for MapBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashed" => Ok(MapBackend::Hashed),
            "compact" => Ok(MapBackend::Compact),
            other => Err(Error::Parameter(format!("unknown map backend: {other}"))),
        }
    }
}

impl fmt::Display for MapBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.factory().name())
    }
}

#[cfg(test)]
mod test {
    use super::MapBackend;
    use crate::comm::SelfComm;
    use crate::params::ParameterList;

    #[test]
    fn test_parse() {
        assert_eq!("hashed".parse::<MapBackend>().unwrap(), MapBackend::Hashed);
        assert_eq!(" Compact".parse::<MapBackend>().unwrap(), MapBackend::Compact);
        assert!("tpetra".parse::<MapBackend>().is_err());
        assert_eq!(MapBackend::Compact.to_string(), "compact");
    }

    #[test]
    fn test_from_parameters() {
        let mut params = ParameterList::new("test");
        assert_eq!(
            MapBackend::from_parameters(&params).unwrap(),
            MapBackend::Hashed
        );
        params.set(MapBackend::PARAMETER, "compact");
        assert_eq!(
            MapBackend::from_parameters(&params).unwrap(),
            MapBackend::Compact
        );
        params.set(MapBackend::PARAMETER, 3);
        assert!(MapBackend::from_parameters(&params).is_err());
    }

    #[test]
    fn test_factories_agree() {
        for backend in [MapBackend::Hashed, MapBackend::Compact] {
            let map = backend
                .factory()
                .build(Some(3), &[2, 0, 1], 0, &SelfComm)
                .unwrap();
            assert_eq!(map.global_size(), 3);
            assert_eq!(map.local_index(0), Some(1));
            assert_eq!(map.global_indices(), vec![2, 0, 1]);
        }
    }
}
