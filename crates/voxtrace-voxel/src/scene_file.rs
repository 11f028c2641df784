//! On-disk scene files.
//!
//! A scene file is a small header followed by one bincode-encoded octree.
//! Loading validates the octree before handing it out.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use voxtrace_core::{Error, Result};

use crate::{AabbOctree, Tree64};

/// Leading bytes of every scene file.
pub const SCENE_MAGIC: [u8; 4] = *b"VXTR";

/// Format version for compatibility checking.
pub const SCENE_FORMAT_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SceneHeader {
    magic: [u8; 4],
    version: u8,
}

/// A prebuilt octree in either layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SceneFile {
    /// 64-ary tree for mask-descent traversal.
    Tree64(Tree64),
    /// Explicit box octree for stack traversal.
    Aabb(AabbOctree),
}

impl SceneFile {
    /// Short layout name for logs and CLI output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Tree64(_) => "tree64",
            Self::Aabb(_) => "aabb",
        }
    }

    /// Number of nodes in the contained octree.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Tree64(tree) => tree.node_count(),
            Self::Aabb(tree) => tree.node_count(),
        }
    }

    /// Validate the contained octree.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Tree64(tree) => tree.validate(),
            Self::Aabb(tree) => tree.validate(),
        }
    }

    /// Encode header and octree.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Decode and validate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(bytes)
    }

    /// Write to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(
            path = %path.display(),
            kind = self.kind(),
            nodes = self.node_count(),
            "Saved scene"
        );
        Ok(())
    }

    /// Read from `path` and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let scene = Self::read_from(BufReader::new(File::open(path)?))?;
        info!(
            path = %path.display(),
            kind = scene.kind(),
            nodes = scene.node_count(),
            "Loaded scene"
        );
        Ok(scene)
    }

    fn write_to(&self, mut writer: impl Write) -> Result<()> {
        let header = SceneHeader {
            magic: SCENE_MAGIC,
            version: SCENE_FORMAT_VERSION,
        };
        bincode::serialize_into(&mut writer, &header).map_err(serialization)?;
        bincode::serialize_into(&mut writer, self).map_err(serialization)
    }

    fn read_from(mut reader: impl Read) -> Result<Self> {
        let header: SceneHeader =
            bincode::deserialize_from(&mut reader).map_err(serialization)?;
        if header.magic != SCENE_MAGIC {
            return Err(Error::InvalidData("not a voxtrace scene file".into()));
        }
        if header.version != SCENE_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "scene format version {} is not supported (expected {SCENE_FORMAT_VERSION})",
                header.version
            )));
        }
        let scene: Self = bincode::deserialize_from(&mut reader).map_err(serialization)?;
        scene.validate()?;
        Ok(scene)
    }
}

impl From<Tree64> for SceneFile {
    fn from(tree: Tree64) -> Self {
        Self::Tree64(tree)
    }
}

impl From<AabbOctree> for SceneFile {
    fn from(tree: AabbOctree) -> Self {
        Self::Aabb(tree)
    }
}

fn serialization(err: bincode::Error) -> Error {
    Error::Serialization(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AabbNode, Tree64Node};
    use glam::Vec3;
    use voxtrace_core::Rgb565;

    fn small_tree() -> Tree64 {
        let nodes = vec![Tree64Node::interior(1, 1 << 21), Tree64Node::leaf(0, 0b101)];
        Tree64::new(nodes, vec![Rgb565::WHITE, Rgb565::BLACK], Vec3::ZERO, 16.0).unwrap()
    }

    #[test]
    fn tree64_scene_bytes() {
        let scene = SceneFile::from(small_tree());
        let bytes = scene.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &SCENE_MAGIC);
        assert_eq!(SceneFile::from_bytes(&bytes).unwrap(), scene);
    }

    #[test]
    fn aabb_scene_file_on_disk() {
        let scene = SceneFile::from(AabbOctree::new(vec![AabbNode::root(Vec3::ZERO, 8)]).unwrap());
        let path = std::env::temp_dir().join(format!("voxtrace-scene-{}.bin", std::process::id()));
        scene.save(&path).unwrap();
        let loaded = SceneFile::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.kind(), "aabb");
        assert_eq!(loaded, scene);
    }

    #[test]
    fn rejects_foreign_bytes() {
        let err = SceneFile::from_bytes(b"PNG\0\x01rest").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn rejects_future_version() {
        let mut bytes = SceneFile::from(small_tree()).to_bytes().unwrap();
        bytes[4] = SCENE_FORMAT_VERSION + 1;
        assert!(SceneFile::from_bytes(&bytes).is_err());
    }

    #[test]
    fn load_validates_contents() {
        let empty = Tree64::empty(Vec3::ZERO, 1.0);
        let mut bytes = SceneFile::Tree64(empty).to_bytes().unwrap();
        // Root mask follows the header, enum tag, vec length, is_leaf and child_ptr.
        // Eight children at child_ptr 0 would point the root at itself.
        let mask_offset = 5 + 4 + 8 + 4 + 4;
        bytes[mask_offset] = 0xFF;
        assert!(matches!(
            SceneFile::from_bytes(&bytes),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SceneFile::load("/nonexistent/voxtrace/scene.bin").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
