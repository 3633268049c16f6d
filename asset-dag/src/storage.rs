//! Snapshot storage
//!
//! The whole DAG is written as one JSON document after every admission:
//!
//! ```text
//! {
//!   "nodes": { "<node_id>": { ...node fields... }, ... },   // admission order
//!   "tips":  [ "<node_id>", ... ]
//! }
//! ```
//!
//! Writes go to `<path>.tmp` and are renamed over the target, so a reader
//! never sees a half-written snapshot. Loading trusts the file: nodes are
//! deserialized one by one and not re-validated.

use crate::{
    config::StorageConfig,
    dag::Dag,
    error::{Error, Result},
    node::Node,
    types::NodeId,
};
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::collections::BTreeSet;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Borrowed snapshot, for writing
#[derive(Serialize)]
struct SnapshotRef<'a> {
    #[serde(serialize_with = "serialize_nodes")]
    nodes: &'a [Node],
    tips: &'a BTreeSet<NodeId>,
}

/// Owned snapshot, as read from disk
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    /// Nodes in file order
    #[serde(deserialize_with = "deserialize_nodes")]
    pub nodes: Vec<Node>,

    /// Tip ids
    pub tips: Vec<NodeId>,
}

impl Snapshot {
    /// Rebuild the in-memory DAG
    pub fn into_dag(self) -> Dag {
        Dag::from_parts(self.nodes, self.tips)
    }
}

fn serialize_nodes<S: Serializer>(nodes: &&[Node], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(nodes.len()))?;
    for node in nodes.iter() {
        map.serialize_entry(&node.node_id(), node)?;
    }
    map.end()
}

fn deserialize_nodes<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Node>, D::Error> {
    struct NodesVisitor;

    impl<'de> Visitor<'de> for NodesVisitor {
        type Value = Vec<Node>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of node_id to node")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
            let mut nodes = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, node)) = access.next_entry::<NodeId, Node>()? {
                if key != node.node_id() {
                    return Err(serde::de::Error::custom(format!(
                        "snapshot key {} does not match node_id {}",
                        key,
                        node.node_id()
                    )));
                }
                nodes.push(node);
            }
            Ok(nodes)
        }
    }

    deserializer.deserialize_map(NodesVisitor)
}

/// File-backed snapshot store
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    pretty: bool,
    create_dirs: bool,
}

impl SnapshotStore {
    /// Store for the snapshot at `path`
    pub fn new(path: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        Self {
            path: path.into(),
            pretty: config.pretty,
            create_dirs: config.create_dirs,
        }
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read the snapshot; `None` if the file does not exist
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read snapshot {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            path = %self.path.display(),
            nodes = snapshot.nodes.len(),
            tips = snapshot.tips.len(),
            "Snapshot loaded"
        );

        Ok(Some(snapshot))
    }

    /// Write the full DAG, replacing the previous snapshot atomically
    pub fn save(&self, dag: &Dag) -> Result<()> {
        let snapshot = SnapshotRef {
            nodes: dag.nodes(),
            tips: dag.tips(),
        };

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&snapshot)?
        } else {
            serde_json::to_vec(&snapshot)?
        };

        if self.create_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }

        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, &bytes).map_err(|e| self.write_error(e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            self.write_error(e)
        })?;

        tracing::debug!(
            path = %self.path.display(),
            nodes = dag.len(),
            bytes = bytes.len(),
            "Snapshot written"
        );

        Ok(())
    }

    fn write_error(&self, e: std::io::Error) -> Error {
        Error::Storage(format!(
            "Failed to write snapshot {}: {}",
            self.path.display(),
            e
        ))
    }
}
