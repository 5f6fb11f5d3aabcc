//! Decode session: the state machine that ties a negotiated hardware profile,
//! a decode context and a surface pool to one decode engine.
//!
//! ```text
//! Unopened --negotiate--> Negotiating --ok--> Ready --close--> Closed
//!     ^                        |
//!     +------ not supported ---+
//! ```
//!
//! Any fatal error (allocation failure, re-negotiation after `Ready`) closes the
//! session. Closing is immediate and irreversible; frame handles still held by
//! the caller become stale and release nothing when dropped.

mod config;
mod frame;

pub use config::{SessionConfig, DEFAULT_SCRATCH_SURFACES};
pub use frame::{compute_crop_rect, FrameHandle};

use crate::driver::{ConfigId, ContextId, DriverStatus, HardwareDriver};
use crate::engine::{
    DecodeEngine, DecodedPicture, EngineOutput, OutputFormat, StreamInfo, StreamParams,
    SurfaceHost,
};
use crate::profile::{CapabilityNegotiator, NegotiatedProfile};
use crate::surface::{SharedPool, SurfaceId, SurfaceLease, SurfacePool};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vadec_types::{ErrorKind, MediaLibError, PoolStats};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Negotiating,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unopened => "unopened",
            SessionState::Negotiating => "negotiating",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Result of one [`DecodeSession::get_next_frame`] call.
#[derive(Debug)]
pub enum FrameStatus {
    Frame(FrameHandle),
    /// The engine consumed input without producing a picture; call again.
    Retry,
    EndOfStream,
}

/// Driver failures while allocating the decode context or its surfaces end the
/// session whatever status the driver reported.
fn allocation_error(status: DriverStatus, what: &str) -> MediaLibError {
    let e = status.to_error(what);
    if e.is_fatal() {
        e
    } else {
        MediaLibError::OutOfMemory(e.message().as_str().into())
    }
}

#[derive(Debug)]
struct HwResources {
    negotiated: NegotiatedProfile,
    config: ConfigId,
    context: ContextId,
    width: u32,
    height: u32,
}

/// Everything in a session except the engine. The engine borrows it mutably as
/// its [`SurfaceHost`] during a decode step.
pub struct SessionCore<D: HardwareDriver> {
    id: u64,
    driver: D,
    config: SessionConfig,
    negotiator: CapabilityNegotiator,
    state: SessionState,
    started: bool,
    pool: SharedPool,
    hw: Option<HwResources>,
}

impl<D: HardwareDriver> SessionCore<D> {
    fn new(driver: D, config: SessionConfig) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            driver,
            config,
            negotiator: CapabilityNegotiator::new(),
            state: SessionState::Unopened,
            started: false,
            pool: SurfacePool::new().into_shared(),
            hw: None,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("session {}: {} -> {}", self.id, self.state, next);
            self.state = next;
        }
    }

    /// Picks a hardware profile for the stream and, if one fits, allocates the
    /// decode context and the surface pool.
    ///
    /// `Ok(None)` means the stream should be decoded in software; the session
    /// is back in `Unopened`. Fatal failures close the session.
    pub fn negotiate(
        &mut self,
        params: &StreamParams,
    ) -> Result<Option<NegotiatedProfile>, MediaLibError> {
        match self.state {
            SessionState::Unopened => {}
            SessionState::Ready | SessionState::Negotiating => {
                let e = MediaLibError::InvalidState(
                    format!(
                        "format re-negotiation for {} {}x{} in state {}",
                        params.codec, params.coded_width, params.coded_height, self.state
                    )
                    .into(),
                );
                error!("session {}: {}", self.id, e);
                self.close();
                return Err(e);
            }
            SessionState::Closed => {
                return Err(MediaLibError::InvalidState("session is closed".into()));
            }
        }
        self.transition(SessionState::Negotiating);

        let negotiated = match self.negotiator.negotiate(
            &self.driver,
            params.codec,
            params.profile,
            self.config.entrypoint,
        ) {
            Ok(Some(negotiated)) => negotiated,
            Ok(None) => {
                self.transition(SessionState::Unopened);
                return Ok(None);
            }
            Err(status) => {
                return Err(self.fail_negotiation(status.to_error("capability query")));
            }
        };

        let rt_formats = match self
            .driver
            .query_rt_formats(negotiated.profile, negotiated.entrypoint)
        {
            Ok(rt_formats) => rt_formats,
            Err(status) => {
                return Err(self.fail_negotiation(status.to_error("vaGetConfigAttributes()")));
            }
        };
        if !rt_formats.is_some_and(|mask| self.config.chroma.is_supported_by(mask)) {
            let e = MediaLibError::Unsupported(
                format!(
                    "{} does not support {:?} render targets",
                    negotiated.profile, self.config.chroma
                )
                .into(),
            );
            return Err(self.fail_negotiation(e));
        }

        match self.allocate(negotiated, params) {
            Ok(hw) => {
                self.hw = Some(hw);
                self.transition(SessionState::Ready);
                Ok(Some(negotiated))
            }
            Err(e) => Err(self.fail_negotiation(e)),
        }
    }

    fn fail_negotiation(&mut self, e: MediaLibError) -> MediaLibError {
        if e.is_fatal() {
            error!("session {}: negotiation failed: {}", self.id, e);
            self.close();
        } else {
            debug!("session {}: negotiation declined: {}", self.id, e);
            self.transition(SessionState::Unopened);
        }
        e
    }

    fn allocate(
        &mut self,
        negotiated: NegotiatedProfile,
        params: &StreamParams,
    ) -> Result<HwResources, MediaLibError> {
        let rt_format = self.config.chroma.rt_format();
        let (width, height) = (params.coded_width, params.coded_height);
        let count = self.config.pool_size(params.reference_frames);

        let config = self
            .driver
            .create_config(negotiated.profile, negotiated.entrypoint, rt_format)
            .map_err(|status| allocation_error(status, "vaCreateConfig()"))?;

        let ids = match self.driver.create_surfaces(rt_format, width, height, count) {
            Ok(ids) => ids,
            Err(status) => {
                error!(
                    "could not allocate {} surfaces of {}x{} for {}",
                    count, width, height, negotiated.profile
                );
                self.driver.destroy_config(config);
                return Err(allocation_error(status, "vaCreateSurfaces()"));
            }
        };

        {
            let mut pool = self.pool.lock();
            pool.ensure_capacity(count);
            if let Err(e) = pool.populate(&ids, self.config.chroma, width, height) {
                error!("{} (profile {}, pool of {})", e, negotiated.profile, count);
                pool.clear();
                drop(pool);
                self.driver.destroy_surfaces(&ids);
                self.driver.destroy_config(config);
                return Err(e);
            }
        }

        let context = match self.driver.create_context(config, width, height, &ids) {
            Ok(context) => context,
            Err(status) => {
                let ids = self.pool.lock().clear();
                self.driver.destroy_surfaces(&ids);
                self.driver.destroy_config(config);
                return Err(allocation_error(status, "vaCreateContext()"));
            }
        };

        info!(
            "session {}: {} surfaces of {:?} {}x{} for {} ({} refs + {} scratch)",
            self.id,
            count,
            self.config.chroma,
            width,
            height,
            negotiated.profile,
            params.reference_frames,
            self.config.scratch_surfaces
        );
        Ok(HwResources {
            negotiated,
            config,
            context,
            width,
            height,
        })
    }

    fn start(&mut self) {
        if !self.started {
            debug!("session {}: started", self.id);
            self.started = true;
        }
    }

    /// Releases the decode context and every surface. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Some(hw) = self.hw.take() {
            self.driver.destroy_context(hw.context);
            let ids = self.pool.lock().clear();
            self.driver.destroy_surfaces(&ids);
            self.driver.destroy_config(hw.config);
            debug!(
                "session {}: released {} surfaces of {}",
                self.id,
                ids.len(),
                hw.negotiated.profile
            );
        }
        if self.started {
            debug!("session {}: stopped", self.id);
            self.started = false;
        }
        self.transition(SessionState::Closed);
    }

    fn wrap_picture(&mut self, picture: DecodedPicture) -> Result<FrameHandle, MediaLibError> {
        let Some(surface) = picture.surface else {
            return Err(MediaLibError::Unsupported(
                "picture was decoded in software and has no surface".into(),
            ));
        };
        if !surface.belongs_to(&self.pool) {
            error!(
                "session {}: engine returned surface {:#x} from another pool (pool of {})",
                self.id,
                surface.id(),
                self.pool.lock().len()
            );
            return Err(MediaLibError::Bug(
                format!("surface {:#x} is not part of this session", surface.id()).into(),
            ));
        }
        if let Err(status) = self.driver.sync_surface(surface.id()) {
            warn!(
                "session {}: surface {:#x} did not decode: {}",
                self.id,
                surface.id(),
                status
            );
            return Err(MediaLibError::DecodeError(
                format!("vaSyncSurface(): {}", status).into(),
            ));
        }

        let coded = (surface.surface().width, surface.surface().height);
        let crop_rect = compute_crop_rect(coded, (picture.width, picture.height), picture.crop_offset);
        Ok(FrameHandle {
            session_id: self.id,
            surface,
            crop_rect,
            pts: picture.pts,
            interlaced: picture.interlaced,
            top_field_first: picture.top_field_first,
        })
    }
}

impl<D: HardwareDriver> SurfaceHost for SessionCore<D> {
    fn negotiate_format(&mut self, params: &StreamParams) -> Result<OutputFormat, MediaLibError> {
        match self.negotiate(params) {
            Ok(Some(_)) => Ok(OutputFormat::Hardware),
            Ok(None) => Ok(OutputFormat::Software),
            Err(e) if e.kind() == ErrorKind::Unsupported && !e.is_fatal() => {
                Ok(OutputFormat::Software)
            }
            Err(e) => Err(e),
        }
    }

    fn get_buffer(&mut self) -> Result<Arc<SurfaceLease>, MediaLibError> {
        let Some(hw) = self.hw.as_ref() else {
            return Err(MediaLibError::InvalidState(
                format!("surface requested in state {}", self.state).into(),
            ));
        };
        SurfaceLease::acquire(&self.pool).map_err(|e| {
            error!(
                "session {}: {} (profile {}, pool of {})",
                self.id,
                e,
                hw.negotiated.profile,
                self.pool.lock().len()
            );
            MediaLibError::Bug(e.to_string().into())
        })
    }
}

impl<D: HardwareDriver> Drop for SessionCore<D> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pull-based decoder over one engine and one hardware driver.
pub struct DecodeSession<D: HardwareDriver, E: DecodeEngine> {
    // Declared first so the engine lets go of its surfaces before the core
    // destroys them.
    engine: E,
    core: SessionCore<D>,
}

impl<D: HardwareDriver, E: DecodeEngine> DecodeSession<D, E> {
    pub fn new(driver: D, engine: E, config: SessionConfig) -> Self {
        let core = SessionCore::new(driver, config);
        debug!(
            "session {}: created on {} with {:?}",
            core.id,
            core.driver.name(),
            config
        );
        Self { engine, core }
    }

    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn state(&self) -> SessionState {
        self.core.state
    }

    pub fn is_started(&self) -> bool {
        self.core.started
    }

    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }

    pub fn driver(&self) -> &D {
        &self.core.driver
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn negotiated(&self) -> Option<NegotiatedProfile> {
        self.core.hw.as_ref().map(|hw| hw.negotiated)
    }

    /// Coded size the surfaces were allocated with.
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.core.hw.as_ref().map(|hw| (hw.width, hw.height))
    }

    pub fn info(&self) -> Option<StreamInfo> {
        self.engine.info()
    }

    pub fn stats(&self) -> PoolStats {
        self.core.pool.lock().stats()
    }

    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        self.core.pool.lock().surfaces().iter().map(|s| s.id).collect()
    }

    /// Same as the engine's format callback. Exposed for engines that know
    /// their stream parameters up front.
    pub fn negotiate(
        &mut self,
        params: &StreamParams,
    ) -> Result<Option<NegotiatedProfile>, MediaLibError> {
        self.core.negotiate(params)
    }

    /// Steps the engine once.
    pub fn get_next_frame(&mut self) -> Result<FrameStatus, MediaLibError> {
        if self.core.state == SessionState::Closed {
            return Err(MediaLibError::InvalidState("session is closed".into()));
        }
        self.core.start();

        match self.engine.decode_step(&mut self.core) {
            Ok(EngineOutput::Picture(picture)) => {
                self.core.wrap_picture(picture).map(FrameStatus::Frame)
            }
            Ok(EngineOutput::NeedMoreInput) => Ok(FrameStatus::Retry),
            Ok(EngineOutput::EndOfStream) => Ok(FrameStatus::EndOfStream),
            Err(e) => {
                if e.is_fatal() && self.core.state != SessionState::Closed {
                    error!("session {}: {}", self.core.id, e);
                    self.core.close();
                }
                Err(e)
            }
        }
    }

    /// Gives a frame back. Handles from another session are handed back
    /// untouched.
    pub fn release_frame(&mut self, handle: FrameHandle) -> Result<(), FrameHandle> {
        if handle.session_id != self.core.id {
            warn!(
                "session {}: ignoring release of surface {:#x} from session {}",
                self.core.id,
                handle.surface_id(),
                handle.session_id
            );
            return Err(handle);
        }
        drop(handle);
        Ok(())
    }

    pub fn close(&mut self) {
        self.core.close();
    }
}
