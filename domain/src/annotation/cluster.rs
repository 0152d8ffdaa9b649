//! Cluster identifiers and marker-gene evidence.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Opaque key identifying one cluster within one annotation run.
///
/// # Example
///
/// ```
/// use celltype_domain::ClusterId;
///
/// let id = ClusterId::from("3");
/// assert_eq!(id.as_str(), "3");
/// assert_eq!(id.to_string(), "3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClusterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ClusterId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One cluster and its ordered marker genes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub markers: Vec<String>,
}

/// Mapping ClusterId → ordered marker genes, supplied once per run.
///
/// Insertion order is preserved so reports come out in the same order the
/// clusters were given. Deserializes from a JSON/TOML map in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    clusters: Vec<Cluster>,
    index: HashMap<ClusterId, usize>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cluster. A repeated id extends the existing gene list
    /// instead of creating a second entry.
    pub fn insert<I, S>(&mut self, id: impl Into<ClusterId>, markers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let genes = markers.into_iter().map(Into::into);
        match self.index.get(&id) {
            Some(&pos) => self.clusters[pos].markers.extend(genes),
            None => {
                self.index.insert(id.clone(), self.clusters.len());
                self.clusters.push(Cluster {
                    id,
                    markers: genes.collect(),
                });
            }
        }
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with_cluster<I, S>(mut self, id: impl Into<ClusterId>, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(id, markers);
        self
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn markers(&self, id: &str) -> Option<&[String]> {
        self.index
            .get(id)
            .map(|&pos| self.clusters[pos].markers.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    /// Cluster ids in insertion order.
    pub fn ids(&self) -> Vec<ClusterId> {
        self.clusters.iter().map(|c| c.id.clone()).collect()
    }

    /// A new set restricted to `ids`, keeping this set's order.
    pub fn subset(&self, ids: &[ClusterId]) -> MarkerSet {
        let mut subset = MarkerSet::new();
        for cluster in self.clusters.iter().filter(|c| ids.contains(&c.id)) {
            subset.insert(cluster.id.clone(), cluster.markers.iter().cloned());
        }
        subset
    }
}

impl Serialize for MarkerSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.clusters.len()))?;
        for cluster in &self.clusters {
            map.serialize_entry(cluster.id.as_str(), &cluster.markers)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MarkerSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MarkerSetVisitor;

        impl<'de> Visitor<'de> for MarkerSetVisitor {
            type Value = MarkerSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of cluster id to a list of marker genes")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut set = MarkerSet::new();
                while let Some((id, genes)) = access.next_entry::<String, Vec<String>>()? {
                    set.insert(id, genes);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(MarkerSetVisitor)
    }
}
