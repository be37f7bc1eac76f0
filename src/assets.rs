//! Scene asset delivery.
//!
//! Props are described in the config and turned into meshes off the frame
//! loop. Completion is reported over a channel that the frame loop drains
//! once per tick.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::config::SceneConfig;
use crate::controller::physics::BoxShape;
use crate::error::{Result, SceneError};
use crate::model::{AnimationClip, MeshNode};

/// Physics description of a prop: collider sized from its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropPhysics {
    pub shape: BoxShape,
    pub mass: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropAsset {
    pub mesh: MeshNode,
    pub physics: Option<PropPhysics>,
    pub tracked: bool,
    pub light_follow: bool,
}

/// Everything a finished load hands to the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScene {
    pub background: [f32; 3],
    pub props: Vec<PropAsset>,
    pub clips: Vec<AnimationClip>,
    pub autoplay_clip: Option<String>,
}

impl LoadedScene {
    pub fn from_config(config: &SceneConfig) -> Result<Self> {
        let mut props = Vec::with_capacity(config.props.len());
        for prop in &config.props {
            // Rendered boxes need real extents just like colliders do.
            BoxShape::new(prop.half_extents)?;
            let mesh = MeshNode::new(prop.name.clone(), prop.position, prop.half_extents, prop.color);

            let physics = match prop.mass {
                Some(mass) if !mass.is_finite() || mass < 0.0 => return Err(SceneError::InvalidMass(mass)),
                Some(mass) => Some(PropPhysics {
                    shape: BoxShape::from_bounds(&mesh.bounding_box(), prop.collider_scale)?,
                    mass,
                }),
                None => None,
            };
            props.push(PropAsset { mesh, physics, tracked: prop.tracked, light_follow: prop.light_follow });
        }

        let clips = config
            .clips
            .iter()
            .map(|c| {
                let mut keyframes = c.keyframes.clone();
                keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
                AnimationClip { name: c.name.clone(), duration: c.duration, target: c.target.clone(), keyframes }
            })
            .collect();

        Ok(Self {
            background: config.background,
            props,
            clips,
            autoplay_clip: config.autoplay_clip.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetEvent {
    SceneReady(LoadedScene),
    Failed(String),
}

/// Observable load state of the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneReadiness {
    Loading,
    Ready,
    Failed(String),
}

impl SceneReadiness {
    pub fn label(&self) -> &'static str {
        match self {
            SceneReadiness::Loading => "loading",
            SceneReadiness::Ready => "ready",
            SceneReadiness::Failed(_) => "failed",
        }
    }
}

fn load(config: &SceneConfig) -> AssetEvent {
    match LoadedScene::from_config(config) {
        Ok(scene) => AssetEvent::SceneReady(scene),
        Err(e) => AssetEvent::Failed(e.to_string()),
    }
}

/// Receiving end of a scene load.
pub struct AssetLoader {
    rx: Receiver<AssetEvent>,
}

impl AssetLoader {
    /// A loader fed by hand through the returned sender.
    pub fn channel() -> (Sender<AssetEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    /// Build the scene in the background.
    pub fn spawn(config: SceneConfig) -> Self {
        let (tx, loader) = Self::channel();
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                wasm_bindgen_futures::spawn_local(async move {
                    let _ = tx.send(load(&config));
                });
            } else {
                std::thread::spawn(move || {
                    let _ = tx.send(load(&config));
                });
            }
        }
        loader
    }

    /// Non-blocking check for a finished load.
    ///
    /// A loader that went away without reporting counts as a failure.
    pub fn poll(&self) -> Option<AssetEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(AssetEvent::Failed("asset loader stopped without a result".into())),
        }
    }
}
