use glam::Vec3;
use serde::Deserialize;

use super::{LightId, MeshId, MeshNode, PointLight};

/// Offset of the animated mesh from its rest position at `time` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub offset: Vec3,
}

/// A named animation clip: a looping translation track for one mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    /// Name of the mesh the track moves. A clip without one only runs its clock.
    pub target: Option<String>,
    /// Sorted by time.
    pub keyframes: Vec<Keyframe>,
}

impl AnimationClip {
    /// Linearly interpolated offset; held flat before the first and after the last key.
    pub fn offset_at(&self, time: f32) -> Vec3 {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return Vec3::ZERO;
        };
        if time <= first.time {
            return first.offset;
        }
        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if time <= b.time {
                let span = b.time - a.time;
                let t = if span > 0.0 { (time - a.time) / span } else { 1.0 };
                return a.offset.lerp(b.offset, t);
            }
        }
        last.offset
    }
}

/// Playback clock of the clip currently running. Loops forever.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlayback {
    pub clip: AnimationClip,
    pub time: f32,
    /// Animated mesh and its rest position.
    pub target: Option<(MeshId, Vec3)>,
}

impl ClipPlayback {
    pub fn new(clip: AnimationClip) -> Self {
        Self { clip, time: 0.0, target: None }
    }

    pub fn advance(&mut self, dt: f32) {
        if self.clip.duration > 0.0 {
            self.time = (self.time + dt).rem_euclid(self.clip.duration);
        }
    }
}

/// Everything the renderer draws: meshes, lights, and the backdrop.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    meshes: Vec<MeshNode>,
    lights: Vec<PointLight>,
    pub ambient: [f32; 3],
    pub background: [f32; 3],
    pub clips: Vec<AnimationClip>,
    pub playing: Option<ClipPlayback>,
}

impl Scene {
    pub fn new(ambient: [f32; 3], background: [f32; 3]) -> Self {
        Self { ambient, background, ..Default::default() }
    }

    pub fn add_mesh(&mut self, mesh: MeshNode) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshNode> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut MeshNode> {
        self.meshes.get_mut(id.0)
    }

    pub fn find_mesh(&self, name: &str) -> Option<MeshId> {
        self.meshes.iter().position(|m| m.name == name).map(MeshId)
    }

    pub fn meshes(&self) -> &[MeshNode] {
        &self.meshes
    }

    pub fn add_light(&mut self, light: PointLight) -> LightId {
        self.lights.push(light);
        LightId(self.lights.len() - 1)
    }

    pub fn light(&self, id: LightId) -> Option<&PointLight> {
        self.lights.get(id.0)
    }

    pub fn light_mut(&mut self, id: LightId) -> Option<&mut PointLight> {
        self.lights.get_mut(id.0)
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// Start looping the clip called `name`. Returns false when no such clip exists.
    ///
    /// The target mesh's current position becomes the rest position of the track.
    pub fn play_clip(&mut self, name: &str) -> bool {
        let Some(clip) = self.clips.iter().find(|c| c.name == name) else {
            return false;
        };
        let mut playback = ClipPlayback::new(clip.clone());
        playback.target = clip
            .target
            .as_deref()
            .and_then(|target| self.find_mesh(target))
            .map(|id| (id, self.meshes[id.0].position));
        if clip.target.is_some() && playback.target.is_none() {
            tracing::warn!(clip = %clip.name, "clip target mesh not found");
        }
        self.playing = Some(playback);
        true
    }

    /// Advance the playing clip and pose its target. Returns true when a mesh moved.
    pub fn advance_clip(&mut self, dt: f32) -> bool {
        let Some(playing) = self.playing.as_mut() else {
            return false;
        };
        playing.advance(dt);
        let Some((mesh, rest)) = playing.target else {
            return false;
        };
        match self.meshes.get_mut(mesh.0) {
            Some(node) => {
                node.position = rest + playing.clip.offset_at(playing.time);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(target: Option<&str>) -> AnimationClip {
        AnimationClip {
            name: "hop".into(),
            duration: 4.0,
            target: target.map(String::from),
            keyframes: vec![
                Keyframe { time: 0.0, offset: Vec3::ZERO },
                Keyframe { time: 2.0, offset: Vec3::new(0.0, 1.0, 0.0) },
                Keyframe { time: 4.0, offset: Vec3::ZERO },
            ],
        }
    }

    #[test]
    fn ids_index_meshes_in_insertion_order() {
        let mut scene = Scene::default();
        let a = scene.add_mesh(MeshNode::new("a", Vec3::ZERO, Vec3::ONE, [1.0; 4]));
        let b = scene.add_mesh(MeshNode::new("b", Vec3::X, Vec3::ONE, [1.0; 4]));
        assert_eq!(scene.mesh(b).unwrap().name, "b");
        assert_eq!(scene.find_mesh("a"), Some(a));
        assert!(scene.mesh(MeshId(7)).is_none());
    }

    #[test]
    fn named_clip_plays_and_loops() {
        let mut scene = Scene::default();
        scene.clips.push(hop(None));
        assert!(!scene.play_clip("Missing"));
        assert!(scene.play_clip("hop"));

        let playing = scene.playing.as_mut().unwrap();
        playing.advance(3.0);
        playing.advance(2.0);
        assert!((playing.time - 1.0).abs() < 1e-6);
    }

    #[test]
    fn offsets_interpolate_between_keys() {
        let clip = hop(None);
        assert_eq!(clip.offset_at(-1.0), Vec3::ZERO);
        assert_eq!(clip.offset_at(1.0), Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(clip.offset_at(2.0), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(clip.offset_at(9.0), Vec3::ZERO);
        assert_eq!(AnimationClip { keyframes: Vec::new(), ..clip }.offset_at(1.0), Vec3::ZERO);
    }

    #[test]
    fn playing_clip_moves_its_target_around_the_rest_position() {
        let mut scene = Scene::default();
        let frog = scene.add_mesh(MeshNode::new("frog", Vec3::new(3.0, 0.0, 0.0), Vec3::ONE, [1.0; 4]));
        scene.clips.push(hop(Some("frog")));
        assert!(scene.play_clip("hop"));

        assert!(scene.advance_clip(1.0));
        assert_eq!(scene.mesh(frog).unwrap().position, Vec3::new(3.0, 0.5, 0.0));
        assert!(scene.advance_clip(3.0));
        assert_eq!(scene.mesh(frog).unwrap().position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn clip_without_target_only_runs_its_clock() {
        let mut scene = Scene::default();
        let rock = scene.add_mesh(MeshNode::new("rock", Vec3::ZERO, Vec3::ONE, [1.0; 4]));
        scene.clips.push(hop(Some("missing")));
        assert!(scene.play_clip("hop"));
        assert!(!scene.advance_clip(1.0));
        assert_eq!(scene.playing.as_ref().unwrap().time, 1.0);
        assert_eq!(scene.mesh(rock).unwrap().position, Vec3::ZERO);
        assert!(!Scene::default().advance_clip(1.0));
    }
}
