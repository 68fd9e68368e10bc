//! Scene description decoding
//!
//! Scenes are declarative RON or JSON documents listing named nodes with
//! transform data and free-form key-value pairs; the format variant is
//! picked by file extension.

use std::collections::HashMap;

use futures::future::{BoxFuture, FutureExt};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::loader::{AssetLoader, DecodeResult, extension_of};

/// A single node in a scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    /// Optional node name
    pub name: Option<String>,
    /// Position in world space
    pub position: Vec3,
    /// Orientation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
    /// Custom data as key-value pairs
    #[serde(default)]
    pub custom_data: HashMap<String, String>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            custom_data: HashMap::new(),
        }
    }
}

/// A scene containing multiple nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name
    pub name: String,
    /// Scene version for compatibility
    pub version: u32,
    /// All nodes in the scene
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    /// Create a new empty scene
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            nodes: Vec::new(),
        }
    }

    /// Add a node to the scene, returning its index
    pub fn add_node(&mut self, node: SceneNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        index
    }

    /// Get the number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the scene is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Loader for `ron` and `json` scene files
pub struct SceneLoader;

impl AssetLoader for SceneLoader {
    type Asset = Scene;

    fn extensions(&self) -> &[&str] {
        &["ron", "json"]
    }

    fn load(&self, bytes: Vec<u8>, path: &str) -> BoxFuture<'static, DecodeResult<Scene>> {
        let json = extension_of(path).as_deref() == Some("json");
        let decoded = (|| -> DecodeResult<Scene> {
            if json {
                Ok(serde_json::from_slice(&bytes)?)
            } else {
                let text = std::str::from_utf8(&bytes)?;
                Ok(ron::from_str(text)?)
            }
        })();
        futures::future::ready(decoded).boxed()
    }
}
