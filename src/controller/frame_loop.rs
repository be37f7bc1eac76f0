use rapier3d::prelude::RigidBodyHandle;

use super::{
    BodyMeshBinding, CameraController, CameraOwner, CameraTourController, FrameReport, FrameStats, InputAction,
    InputDispatcher, InputEvent, InputState, KeyBindings, PhysicsSystem, SceneContext,
};
use crate::assets::{AssetEvent, AssetLoader, LoadedScene, SceneReadiness};
use crate::config::AppConfig;
use crate::error::Result;
use crate::model::{Camera, LightFollow, PointLight, Scene};
use crate::view::{render::MAX_POINT_LIGHTS, Renderer};

/// Longest frame the free-look controller integrates over.
const MAX_FRAME_DT: f32 = 0.1;

/// Main loop state and the per-frame update order
pub struct FrameLoopContext {
    pub ctx: SceneContext,
    fixed_delta: f32,
    bindings: Vec<BodyMeshBinding>,
    light_follows: Vec<LightFollow>,
    tracked_body: Option<RigidBodyHandle>,
    tour: CameraTourController,
    camera_controller: CameraController,
    key_bindings: KeyBindings,
    dispatcher: InputDispatcher,
    input_state: InputState,
    last_time: Option<f64>,
    stats: FrameStats,
    assets: Option<AssetLoader>,
    readiness: SceneReadiness,
}

impl FrameLoopContext {
    pub fn new(config: &AppConfig, width: u32, height: u32, assets: AssetLoader) -> Result<Self> {
        config.physics.validate()?;
        let lighting = &config.lighting;
        let ambient = lighting.ambient.map(|c| c * lighting.ambient_intensity);
        let mut scene = Scene::new(ambient, config.scene.background);
        for light in &lighting.point_lights {
            scene.add_light(PointLight::new(light.position, light.color, light.intensity, light.range));
        }
        // Target is filled in once the followed mesh has loaded.
        let light_follows = lighting
            .follow_light
            .iter()
            .map(|light| {
                let id = scene.add_light(PointLight::new(light.position, light.color, light.intensity, light.range));
                LightFollow::new(id, None)
            })
            .collect();

        if scene.lights().len() > MAX_POINT_LIGHTS {
            tracing::warn!(lights = scene.lights().len(), "only the first {MAX_POINT_LIGHTS} point lights are shaded");
        }

        let mut camera = Camera::new(width, height);
        camera.fov_y = config.camera.fov_y_degrees.to_radians();
        camera.z_near = config.camera.z_near;
        camera.z_far = config.camera.z_far;
        camera.position = config.camera.position;
        camera.rotation = config.camera.rotation;

        let tour = CameraTourController::new(config.tour.poses.clone(), config.tour.easing)?;
        let physics = PhysicsSystem::new(config.physics.gravity);

        tracing::info!(
            fixed_delta = config.physics.fixed_delta,
            poses = tour.poses().len(),
            lights = scene.lights().len(),
            "frame loop ready"
        );

        Ok(Self {
            ctx: SceneContext::new(physics, scene, camera),
            fixed_delta: config.physics.fixed_delta,
            bindings: Vec::new(),
            light_follows,
            tracked_body: None,
            tour,
            camera_controller: CameraController::new(config.free_look.movement_speed, config.free_look.look_sensitivity),
            key_bindings: KeyBindings::default(),
            dispatcher: InputDispatcher::new(config.input.nudge_step),
            input_state: InputState::new(),
            last_time: None,
            stats: FrameStats::new(),
            assets: Some(assets),
            readiness: SceneReadiness::Loading,
        })
    }

    pub fn readiness(&self) -> &SceneReadiness {
        &self.readiness
    }

    pub fn tour(&self) -> &CameraTourController {
        &self.tour
    }

    pub fn tracked_body(&self) -> Option<RigidBodyHandle> {
        self.tracked_body
    }

    pub fn bindings(&self) -> &[BodyMeshBinding] {
        &self.bindings
    }

    pub fn key_bindings(&self) -> &KeyBindings {
        &self.key_bindings
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// The tour owns the camera while one of its tweens is still running.
    pub fn camera_owner(&self, now: f64) -> CameraOwner {
        if self.tour.is_animating(now) {
            CameraOwner::Tour
        } else {
            CameraOwner::FreeLook
        }
    }

    /// Feed one input event. `now` is wall-clock seconds.
    pub fn handle_input(&mut self, event: InputEvent, now: f64) -> Option<InputAction> {
        self.input_state.process_event(&event);
        self.dispatcher
            .dispatch(&event, &mut self.ctx, self.tracked_body, &mut self.tour, now)
    }

    pub fn resize<R: Renderer>(&mut self, width: u32, height: u32, renderer: &mut R) {
        if width == 0 || height == 0 {
            return;
        }
        self.ctx.camera.set_aspect(width, height);
        renderer.resize(width, height);
    }

    /// Run one frame. Render errors are returned untouched; the host decides to stop.
    pub fn tick<R: Renderer>(&mut self, now: f64, renderer: &mut R) -> std::result::Result<FrameReport, R::Error> {
        let frame_secs = self.elapsed(now);
        // Free-look and clip playback never jump more than one clamped step.
        let dt = frame_secs.min(MAX_FRAME_DT);
        self.poll_assets();

        match self.camera_owner(now) {
            CameraOwner::FreeLook => {
                self.camera_controller
                    .update(&mut self.ctx.camera, &mut self.input_state, &self.key_bindings, dt);
            }
            CameraOwner::Tour => {
                // Look input made during a transition would fight the tween.
                self.input_state.consume_look();
            }
        }
        self.tour.update(&mut self.ctx.camera, now);

        self.ctx.physics.step(self.fixed_delta);
        for binding in &self.bindings {
            binding.sync(&self.ctx.physics, &mut self.ctx.scene);
        }
        for follow in &self.light_follows {
            follow.update(&mut self.ctx.scene);
        }
        self.ctx.scene.advance_clip(dt);

        renderer.render(&self.ctx.scene, &self.ctx.camera)?;

        self.stats.record(frame_secs);
        let report = self.report(now);
        renderer.record_frame(&report);
        Ok(report)
    }

    /// Wall-clock seconds since the previous tick, 0 on the first one.
    fn elapsed(&mut self, now: f64) -> f32 {
        let dt = match self.last_time {
            Some(last) => ((now - last) as f32).max(0.0),
            None => 0.0,
        };
        self.last_time = Some(now);
        dt
    }

    fn report(&self, now: f64) -> FrameReport {
        FrameReport {
            frame: self.stats.frames(),
            frame_ms: self.stats.last_frame_ms(),
            fps: self.stats.fps(),
            physics_steps: self.ctx.physics.step_count(),
            simulated_time: self.ctx.physics.simulated_time(),
            tour_index: self.tour.state().index(),
            camera_owner: self.camera_owner(now),
            readiness: self.readiness.label(),
            clip_time: self.ctx.scene.playing.as_ref().map(|p| p.time),
            tracked_position: self
                .tracked_body
                .and_then(|body| self.ctx.physics.body_transform(body))
                .map(|(position, _)| position),
        }
    }

    fn poll_assets(&mut self) {
        let Some(event) = self.assets.as_ref().and_then(AssetLoader::poll) else {
            return;
        };
        self.assets = None;

        self.readiness = match event {
            AssetEvent::SceneReady(loaded) => match self.install(loaded) {
                Ok(()) => {
                    tracing::info!(meshes = self.ctx.scene.meshes().len(), bodies = self.ctx.physics.body_count(), "scene ready");
                    SceneReadiness::Ready
                }
                Err(e) => {
                    tracing::error!("scene install failed: {e}");
                    SceneReadiness::Failed(e.to_string())
                }
            },
            AssetEvent::Failed(reason) => {
                tracing::error!("scene load failed: {reason}");
                SceneReadiness::Failed(reason)
            }
        };
    }

    /// Add loaded meshes, give physical props a body and a binding, and hook up trackers.
    fn install(&mut self, loaded: LoadedScene) -> Result<()> {
        let LoadedScene { background, props, clips, autoplay_clip } = loaded;
        self.ctx.scene.background = background;
        self.ctx.scene.clips = clips;

        for prop in props {
            let name = prop.mesh.name.clone();
            let body = match prop.physics {
                Some(physics) => Some(self.ctx.physics.add_physics_for(&prop.mesh, physics.shape, physics.mass)?),
                None => None,
            };
            let mesh = self.ctx.scene.add_mesh(prop.mesh);

            if let Some(body) = body {
                self.bindings.push(BodyMeshBinding::new(body, mesh));
                if prop.tracked && self.tracked_body.is_none() {
                    if self.ctx.physics.is_dynamic(body) {
                        self.tracked_body = Some(body);
                    } else {
                        tracing::warn!(prop = %name, "tracked prop has a fixed body, arrow keys will not move it");
                    }
                }
            }
            if prop.light_follow {
                if let Some(follow) = self.light_follows.iter_mut().find(|f| f.target.is_none()) {
                    follow.target = Some(mesh);
                }
            }
        }

        if let Some(name) = autoplay_clip {
            if self.ctx.scene.play_clip(&name) {
                tracing::info!(clip = %name, "playing animation");
            } else {
                tracing::warn!(clip = %name, "autoplay clip not found");
            }
        }
        // The binding owns a body-driven mesh; a clip must not fight it.
        if let Some(playing) = self.ctx.scene.playing.as_mut() {
            if let Some((mesh, _)) = playing.target {
                if self.bindings.iter().any(|b| b.mesh == Some(mesh)) {
                    tracing::warn!(clip = %playing.clip.name, "clip target is driven by physics, clip will not move it");
                    playing.target = None;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::controller::input::key;
    use crate::error::SceneError;
    use glam::Vec3;

    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<(Vec<Vec3>, Vec3)>,
        reports: Vec<FrameReport>,
        resized: Option<(u32, u32)>,
        fail: bool,
    }

    impl Renderer for RecordingRenderer {
        type Error = String;

        fn render(&mut self, scene: &Scene, camera: &Camera) -> std::result::Result<(), String> {
            if self.fail {
                return Err("device lost".into());
            }
            self.frames.push((scene.meshes().iter().map(|m| m.position).collect(), camera.position));
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.resized = Some((width, height));
        }

        fn record_frame(&mut self, report: &FrameReport) {
            self.reports.push(*report);
        }
    }

    fn loaded_frame_loop() -> FrameLoopContext {
        let config = AppConfig::default();
        let (tx, loader) = AssetLoader::channel();
        let scene = LoadedScene::from_config(&config.scene).unwrap();
        tx.send(AssetEvent::SceneReady(scene)).unwrap();
        FrameLoopContext::new(&config, 800, 600, loader).unwrap()
    }

    #[test]
    fn scene_becomes_ready_on_first_tick() {
        let config = AppConfig::default();
        let (tx, loader) = AssetLoader::channel();
        let mut frame_loop = FrameLoopContext::new(&config, 800, 600, loader).unwrap();
        let mut renderer = RecordingRenderer::default();

        frame_loop.tick(0.0, &mut renderer).unwrap();
        assert_eq!(frame_loop.readiness(), &SceneReadiness::Loading);
        assert!(frame_loop.bindings().is_empty());

        tx.send(AssetEvent::SceneReady(LoadedScene::from_config(&config.scene).unwrap())).unwrap();
        frame_loop.tick(0.016, &mut renderer).unwrap();
        assert_eq!(frame_loop.readiness(), &SceneReadiness::Ready);
        assert_eq!(frame_loop.bindings().len(), 2);
        assert!(frame_loop.tracked_body().is_some());
        assert_eq!(frame_loop.ctx.scene.playing.as_ref().map(|p| p.clip.name.as_str()), Some("The Life"));
        assert_eq!(renderer.reports.last().unwrap().readiness, "ready");
    }

    #[test]
    fn failed_load_leaves_bindings_empty() {
        let (tx, loader) = AssetLoader::channel();
        let mut frame_loop = FrameLoopContext::new(&AppConfig::default(), 800, 600, loader).unwrap();
        tx.send(AssetEvent::Failed("dragon.glb missing".into())).unwrap();

        let mut renderer = RecordingRenderer::default();
        frame_loop.tick(0.0, &mut renderer).unwrap();
        frame_loop.tick(0.1, &mut renderer).unwrap();
        assert_eq!(frame_loop.readiness(), &SceneReadiness::Failed("dragon.glb missing".into()));
        assert!(frame_loop.bindings().is_empty());
        assert_eq!(frame_loop.handle_input(InputEvent::KeyDown(key::ARROW_LEFT), 0.2), Some(InputAction::Nudge(Vec3::new(-0.1, 0.0, 0.0))));
        assert_eq!(renderer.frames.len(), 2);
    }

    #[test]
    fn meshes_are_synced_before_render() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        let body = {
            frame_loop.tick(0.0, &mut renderer).unwrap();
            frame_loop.tracked_body().unwrap()
        };
        let dragon = frame_loop.ctx.scene.find_mesh("dragon").unwrap();

        for i in 1..20 {
            frame_loop.tick(i as f64 / 60.0, &mut renderer).unwrap();
            let (body_position, _) = frame_loop.ctx.physics.body_transform(body).unwrap();
            let (rendered, _) = renderer.frames.last().unwrap();
            assert_eq!(rendered[dragon.0], body_position);
        }
        // The dragon starts at y = 1 and falls.
        assert!(renderer.frames.last().unwrap().0[dragon.0].y < 1.0);
    }

    #[test]
    fn follow_light_tracks_the_dragon() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        for i in 0..10 {
            frame_loop.tick(i as f64 * 0.02, &mut renderer).unwrap();
        }
        let dragon = frame_loop.ctx.scene.find_mesh("dragon").unwrap();
        let dragon_position = frame_loop.ctx.scene.mesh(dragon).unwrap().position;
        let follow = frame_loop.ctx.scene.lights().last().unwrap();
        assert_eq!(follow.position, dragon_position);
    }

    #[test]
    fn nudge_moves_tracked_body_and_mesh_follows() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        frame_loop.tick(0.0, &mut renderer).unwrap();
        let body = frame_loop.tracked_body().unwrap();
        let before = frame_loop.ctx.physics.body_transform(body).unwrap().0;

        frame_loop.handle_input(InputEvent::KeyDown(key::ARROW_RIGHT), 0.01);
        let after = frame_loop.ctx.physics.body_transform(body).unwrap().0;
        assert!((after.x - before.x - 0.1).abs() < 1e-5);

        frame_loop.tick(0.016, &mut renderer).unwrap();
        let dragon = frame_loop.ctx.scene.find_mesh("dragon").unwrap();
        assert!((frame_loop.ctx.scene.mesh(dragon).unwrap().position.x - after.x).abs() < 1e-3);
    }

    #[test]
    fn simulated_time_ignores_frame_duration() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        let frame_times = [0.0, 0.001, 0.5, 0.51, 3.0, 3.016, 3.2, 10.0];
        for now in frame_times {
            frame_loop.tick(now, &mut renderer).unwrap();
        }
        let report = renderer.reports.last().unwrap();
        assert_eq!(report.physics_steps, frame_times.len() as u64);
        assert!((report.simulated_time - frame_times.len() as f64 * 0.01).abs() < 1e-6);
    }

    #[test]
    fn tour_suspends_free_look_until_it_lands() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        let mut reference = CameraTourController::new(AppConfig::default().tour.poses, AppConfig::default().tour.easing).unwrap();
        let mut reference_camera = frame_loop.ctx.camera.clone();

        frame_loop.tick(0.0, &mut renderer).unwrap();
        frame_loop.handle_input(InputEvent::PointerLockChanged { locked: true }, 0.0);
        frame_loop.handle_input(InputEvent::KeyDown(key::W), 0.0);
        frame_loop.handle_input(InputEvent::PointerUp, 0.0);
        let target = reference.advance(&reference_camera, 0.0);

        for now in [0.5, 1.0, 1.5] {
            frame_loop.handle_input(InputEvent::PointerMove { dx: 30.0, dy: 5.0 }, now);
            let report = frame_loop.tick(now, &mut renderer).unwrap();
            assert_eq!(report.camera_owner, CameraOwner::Tour);
            reference.update(&mut reference_camera, now);
            assert_eq!(frame_loop.ctx.camera.position, reference_camera.position);
            assert_eq!(frame_loop.ctx.camera.rotation, reference_camera.rotation);
        }

        // Landing frame: free look is idle on rotation and the tour writes the exact target.
        frame_loop.handle_input(InputEvent::KeyUp(key::W), 2.5);
        frame_loop.tick(2.5, &mut renderer).unwrap();
        assert_eq!(frame_loop.ctx.camera.position, target.position);
        assert_eq!(frame_loop.ctx.camera.rotation, target.rotation);
        assert_eq!(frame_loop.camera_owner(2.5), CameraOwner::FreeLook);

        frame_loop.handle_input(InputEvent::KeyDown(key::R), 2.6);
        frame_loop.tick(2.6, &mut renderer).unwrap();
        assert!(frame_loop.ctx.camera.position.y > target.position.y);
        assert_eq!(frame_loop.ctx.camera.rotation, target.rotation);
    }

    #[test]
    fn render_errors_reach_the_host() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer { fail: true, ..Default::default() };
        assert_eq!(frame_loop.tick(0.0, &mut renderer), Err("device lost".to_string()));
        assert!(renderer.reports.is_empty());
    }

    #[test]
    fn resize_updates_aspect_and_renderer() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        frame_loop.resize(1000, 500, &mut renderer);
        assert_eq!(frame_loop.ctx.camera.aspect, 2.0);
        assert_eq!(renderer.resized, Some((1000, 500)));

        frame_loop.resize(0, 500, &mut renderer);
        assert_eq!(frame_loop.ctx.camera.aspect, 2.0);
    }

    #[test]
    fn scene_config_without_props_still_runs() {
        let mut config = AppConfig::default();
        config.scene = SceneConfig { props: Vec::new(), ..SceneConfig::default() };
        let (tx, loader) = AssetLoader::channel();
        tx.send(AssetEvent::SceneReady(LoadedScene::from_config(&config.scene).unwrap())).unwrap();
        let mut frame_loop = FrameLoopContext::new(&config, 800, 600, loader).unwrap();

        let report = frame_loop.tick(0.0, &mut RecordingRenderer::default()).unwrap();
        assert_eq!(report.tracked_position, None);
        assert_eq!(frame_loop.readiness(), &SceneReadiness::Ready);
    }

    #[test]
    fn slow_frames_are_reported_unclamped() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        frame_loop.tick(0.0, &mut renderer).unwrap();
        let report = frame_loop.tick(0.5, &mut renderer).unwrap();
        assert!((report.frame_ms - 500.0).abs() < 1e-3, "frame_ms {}", report.frame_ms);
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let mut config = AppConfig::default();
        config.physics.fixed_delta = 0.0;
        let (_tx, loader) = AssetLoader::channel();
        assert!(matches!(
            FrameLoopContext::new(&config, 800, 600, loader),
            Err(SceneError::InvalidTimestep(_))
        ));
    }

    #[test]
    fn fixed_prop_is_never_tracked() {
        let mut config = AppConfig::default();
        config.scene.props.retain(|p| p.name == "garden");
        config.scene.props[0].tracked = true;
        let (tx, loader) = AssetLoader::channel();
        tx.send(AssetEvent::SceneReady(LoadedScene::from_config(&config.scene).unwrap())).unwrap();
        let mut frame_loop = FrameLoopContext::new(&config, 800, 600, loader).unwrap();
        let mut renderer = RecordingRenderer::default();
        frame_loop.tick(0.0, &mut renderer).unwrap();

        assert_eq!(frame_loop.tracked_body(), None);
        let garden = frame_loop.bindings()[0].body.unwrap();
        frame_loop.handle_input(InputEvent::KeyDown(key::ARROW_RIGHT), 0.01);
        assert_eq!(frame_loop.ctx.physics.body_transform(garden).unwrap().0, Vec3::ZERO);
    }

    #[test]
    fn autoplay_clip_animates_the_butterfly() {
        let mut frame_loop = loaded_frame_loop();
        let mut renderer = RecordingRenderer::default();
        frame_loop.tick(0.0, &mut renderer).unwrap();
        let butterfly = frame_loop.ctx.scene.find_mesh("butterfly").unwrap();
        let rest = frame_loop.ctx.scene.mesh(butterfly).unwrap().position;

        let report = frame_loop.tick(1.0 / 30.0, &mut renderer).unwrap();
        let moved = frame_loop.ctx.scene.mesh(butterfly).unwrap().position;
        assert!(moved.y > rest.y && moved.x < rest.x);
        assert_eq!(renderer.frames.last().unwrap().0[butterfly.0], moved);
        assert!((report.clip_time.unwrap() - 1.0 / 30.0).abs() < 1e-5);
    }

    #[test]
    fn clip_cannot_move_a_physics_driven_mesh() {
        let mut config = AppConfig::default();
        config.scene.clips[0].target = Some("dragon".into());
        let (tx, loader) = AssetLoader::channel();
        tx.send(AssetEvent::SceneReady(LoadedScene::from_config(&config.scene).unwrap())).unwrap();
        let mut frame_loop = FrameLoopContext::new(&config, 800, 600, loader).unwrap();
        let mut renderer = RecordingRenderer::default();

        for i in 0..5 {
            frame_loop.tick(i as f64 * 0.5, &mut renderer).unwrap();
        }
        assert_eq!(frame_loop.ctx.scene.playing.as_ref().unwrap().target, None);
        let body = frame_loop.tracked_body().unwrap();
        let dragon = frame_loop.ctx.scene.find_mesh("dragon").unwrap();
        assert_eq!(
            frame_loop.ctx.scene.mesh(dragon).unwrap().position,
            frame_loop.ctx.physics.body_transform(body).unwrap().0
        );
    }
}
