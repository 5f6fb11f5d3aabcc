//! In-memory driver and engine doubles for exercising sessions without hardware.

use crate::driver::{ConfigId, ContextId, DriverResult, DriverStatus, HardwareDriver};
use crate::engine::{
    DecodeEngine, DecodedPicture, EngineOutput, OutputFormat, StreamInfo, StreamParams,
    SurfaceHost,
};
use crate::profile::{Codec, Entrypoint, HwProfile};
use crate::surface::{SurfaceId, SurfaceLease};
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use vadec_types::MediaLibError;

#[derive(Debug, Default)]
pub struct MockState {
    pub profiles: RefCell<Vec<(HwProfile, Vec<Entrypoint>)>>,
    /// RT-format attribute reported for every config; `None` for "not supported".
    pub rt_formats: Cell<Option<u32>>,
    pub profile_queries: Cell<usize>,
    pub entrypoint_queries: Cell<usize>,
    pub fail_profiles: Cell<Option<DriverStatus>>,
    pub fail_surfaces: Cell<Option<DriverStatus>>,
    pub fail_context: Cell<Option<DriverStatus>>,
    /// Surfaces whose next sync reports a decoding error.
    pub fail_sync: RefCell<HashSet<SurfaceId>>,
    pub surface_requests: RefCell<Vec<(u32, u32, usize)>>,
    pub live_surfaces: RefCell<HashSet<SurfaceId>>,
    pub live_configs: RefCell<HashSet<ConfigId>>,
    pub live_contexts: RefCell<HashSet<ContextId>>,
    next_id: Cell<u32>,
}

impl MockState {
    fn next_id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

/// Scripted driver. Clones share state, so a test keeps one clone to inspect
/// what the session did with the other.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    pub state: Rc<MockState>,
}

impl MockDriver {
    /// Driver exposing `profiles`, each with the VLD entrypoint, and 4:2:0 targets.
    pub fn with_profiles(profiles: &[HwProfile]) -> Self {
        let driver = MockDriver::default();
        *driver.state.profiles.borrow_mut() = profiles
            .iter()
            .map(|profile| (*profile, vec![Entrypoint::Vld]))
            .collect();
        driver.state.rt_formats.set(Some(0x1));
        driver
    }

    pub fn live_surfaces(&self) -> usize {
        self.state.live_surfaces.borrow().len()
    }

    pub fn live_contexts(&self) -> usize {
        self.state.live_contexts.borrow().len()
    }

    pub fn live_configs(&self) -> usize {
        self.state.live_configs.borrow().len()
    }
}

impl HardwareDriver for MockDriver {
    fn name(&self) -> String {
        "mock".to_string()
    }

    fn query_profiles(&self) -> DriverResult<Vec<HwProfile>> {
        let state = &self.state;
        state.profile_queries.set(state.profile_queries.get() + 1);
        if let Some(status) = state.fail_profiles.get() {
            return Err(status);
        }
        Ok(state.profiles.borrow().iter().map(|(p, _)| *p).collect())
    }

    fn query_entrypoints(&self, profile: HwProfile) -> DriverResult<Vec<Entrypoint>> {
        let state = &self.state;
        state.entrypoint_queries.set(state.entrypoint_queries.get() + 1);
        state
            .profiles
            .borrow()
            .iter()
            .find(|(p, _)| *p == profile)
            .map(|(_, entrypoints)| entrypoints.clone())
            .ok_or(DriverStatus::UnsupportedProfile)
    }

    fn query_rt_formats(&self, _: HwProfile, _: Entrypoint) -> DriverResult<Option<u32>> {
        Ok(self.state.rt_formats.get())
    }

    fn create_config(&self, _: HwProfile, _: Entrypoint, _: u32) -> DriverResult<ConfigId> {
        let id = self.state.next_id();
        self.state.live_configs.borrow_mut().insert(id);
        Ok(id)
    }

    fn destroy_config(&self, config: ConfigId) {
        self.state.live_configs.borrow_mut().remove(&config);
    }

    fn create_surfaces(
        &self,
        _: u32,
        width: u32,
        height: u32,
        count: usize,
    ) -> DriverResult<Vec<SurfaceId>> {
        let state = &self.state;
        state.surface_requests.borrow_mut().push((width, height, count));
        if let Some(status) = state.fail_surfaces.get() {
            return Err(status);
        }
        let ids: Vec<SurfaceId> = (0..count).map(|_| 0x1000 + state.next_id()).collect();
        state.live_surfaces.borrow_mut().extend(ids.iter().copied());
        Ok(ids)
    }

    fn destroy_surfaces(&self, surfaces: &[SurfaceId]) {
        let mut live = self.state.live_surfaces.borrow_mut();
        for id in surfaces {
            live.remove(id);
        }
    }

    fn create_context(
        &self,
        config: ConfigId,
        _: u32,
        _: u32,
        surfaces: &[SurfaceId],
    ) -> DriverResult<ContextId> {
        let state = &self.state;
        if let Some(status) = state.fail_context.get() {
            return Err(status);
        }
        if !state.live_configs.borrow().contains(&config) {
            return Err(DriverStatus::InvalidConfig);
        }
        if surfaces
            .iter()
            .any(|id| !state.live_surfaces.borrow().contains(id))
        {
            return Err(DriverStatus::InvalidSurface);
        }
        let id = state.next_id();
        state.live_contexts.borrow_mut().insert(id);
        Ok(id)
    }

    fn destroy_context(&self, context: ContextId) {
        self.state.live_contexts.borrow_mut().remove(&context);
    }

    fn sync_surface(&self, surface: SurfaceId) -> DriverResult<()> {
        if !self.state.live_surfaces.borrow().contains(&surface) {
            return Err(DriverStatus::InvalidSurface);
        }
        if self.state.fail_sync.borrow_mut().remove(&surface) {
            return Err(DriverStatus::DecodingError);
        }
        Ok(())
    }
}

pub fn h264_params(profile: i32, refs: u32) -> StreamParams {
    StreamParams {
        codec: Codec::H264,
        profile,
        coded_width: 1920,
        coded_height: 1088,
        reference_frames: refs,
    }
}

/// One scripted engine event.
#[derive(Debug, Clone)]
pub enum Step {
    /// Ask the host for an output format.
    Negotiate(StreamParams),
    /// Decode one picture into a fresh surface and output it.
    Picture {
        width: u32,
        height: u32,
        crop_offset: (u32, u32),
    },
    /// Like `Picture` at full coded size, as a field pair.
    Interlaced { top_field_first: bool },
    /// Decode one picture into a fresh surface but keep it as a reference
    /// without outputting anything.
    Reference,
    /// Output a picture that has no surface (software decoding).
    SoftwarePicture,
    /// Forget all held references.
    FlushReferences,
    NeedInput,
    /// Fail this step with the given error.
    Fail(MediaLibError),
    Eos,
}

/// Replays a script of steps. Like a real decoder it keeps its own clone of
/// each decoded surface, up to `max_refs`, dropping the oldest beyond that.
#[derive(Debug)]
pub struct ScriptedEngine {
    script: VecDeque<Step>,
    max_refs: usize,
    pub refs: VecDeque<Arc<SurfaceLease>>,
    pub formats: Vec<OutputFormat>,
    pts: i64,
    info: Option<StreamInfo>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<Step>, max_refs: usize) -> Self {
        Self {
            script: script.into(),
            max_refs,
            refs: VecDeque::new(),
            formats: Vec::new(),
            pts: 0,
            info: None,
        }
    }

    fn decode_into(&mut self, host: &mut dyn SurfaceHost) -> Result<Arc<SurfaceLease>, MediaLibError> {
        let surface = host.get_buffer()?;
        if self.max_refs > 0 {
            if self.refs.len() == self.max_refs {
                self.refs.pop_front();
            }
            self.refs.push_back(Arc::clone(&surface));
        }
        Ok(surface)
    }
}

impl DecodeEngine for ScriptedEngine {
    fn info(&self) -> Option<StreamInfo> {
        self.info.clone()
    }

    fn decode_step(&mut self, host: &mut dyn SurfaceHost) -> Result<EngineOutput, MediaLibError> {
        loop {
            let Some(step) = self.script.pop_front() else {
                return Ok(EngineOutput::EndOfStream);
            };
            match step {
                Step::Negotiate(params) => {
                    let format = host.negotiate_format(&params)?;
                    self.formats.push(format);
                    self.info = Some(StreamInfo {
                        codec_name: params.codec.name().to_string(),
                        profile: params.profile,
                        width: params.coded_width,
                        height: params.coded_height,
                    });
                }
                Step::Picture {
                    width,
                    height,
                    crop_offset,
                } => {
                    let surface = self.decode_into(host)?;
                    self.pts += 1;
                    return Ok(EngineOutput::Picture(DecodedPicture {
                        surface: Some(surface),
                        width,
                        height,
                        crop_offset,
                        pts: Some(self.pts),
                        interlaced: false,
                        top_field_first: false,
                    }));
                }
                Step::Interlaced { top_field_first } => {
                    let surface = self.decode_into(host)?;
                    let (width, height) = (surface.surface().width, surface.surface().height);
                    self.pts += 1;
                    return Ok(EngineOutput::Picture(DecodedPicture {
                        surface: Some(surface),
                        width,
                        height,
                        pts: Some(self.pts),
                        interlaced: true,
                        top_field_first,
                        ..DecodedPicture::default()
                    }));
                }
                Step::Reference => {
                    self.decode_into(host)?;
                }
                Step::SoftwarePicture => {
                    return Ok(EngineOutput::Picture(DecodedPicture {
                        width: 64,
                        height: 64,
                        ..DecodedPicture::default()
                    }));
                }
                Step::FlushReferences => self.refs.clear(),
                Step::NeedInput => return Ok(EngineOutput::NeedMoreInput),
                Step::Fail(e) => return Err(e),
                Step::Eos => return Ok(EngineOutput::EndOfStream),
            }
        }
    }
}
