use super::display::VaDisplay;
use super::library::{
    VaConfigAttrib, VaStatus, VA_ATTRIB_NOT_SUPPORTED, VA_CONFIG_ATTRIB_RT_FORMAT,
    VA_PROGRESSIVE,
};
use crate::driver::{ConfigId, ContextId, DriverResult, DriverStatus, HardwareDriver, INVALID_ID};
use crate::profile::{Entrypoint, HwProfile};
use crate::surface::{SurfaceId, INVALID_SURFACE_ID};
use log::{error, trace};
use std::ptr::null_mut;

/// [`HardwareDriver`] backed by libva.
pub struct VaDriver {
    display: VaDisplay,
}

impl VaDriver {
    pub fn new(display: VaDisplay) -> Self {
        Self { display }
    }

    pub fn open(device: &str) -> Result<Self, vadec_types::MediaLibError> {
        VaDisplay::open(device).map(Self::new)
    }

    pub fn display(&self) -> &VaDisplay {
        &self.display
    }

    /// Logs failures, except the ones drivers return routinely while probing.
    fn check(&self, status: VaStatus, what: &str) -> DriverResult<()> {
        match DriverStatus::from_raw(status) {
            None => Ok(()),
            Some(failure) => {
                if !failure.is_quiet() {
                    error!(
                        "{}: {}",
                        what,
                        self.display.library().error_str(status)
                    );
                }
                Err(failure)
            }
        }
    }
}

impl HardwareDriver for VaDriver {
    fn name(&self) -> String {
        format!(
            "VA-API {}.{} ({})",
            self.display.version().0,
            self.display.version().1,
            self.display.vendor()
        )
    }

    fn query_profiles(&self) -> DriverResult<Vec<HwProfile>> {
        let lib = self.display.library();
        let dpy = self.display.handle();
        let max = unsafe { (lib.max_num_profiles)(dpy) }.max(0) as usize;
        let mut raw = vec![0; max];
        let mut count = 0;
        let status = unsafe { (lib.query_config_profiles)(dpy, raw.as_mut_ptr(), &mut count) };
        self.check(status, "vaQueryConfigProfiles()")?;
        raw.truncate(count.clamp(0, max as i32) as usize);
        trace!("raw VA profiles: {:?}", raw);
        Ok(raw.into_iter().filter_map(HwProfile::from_raw).collect())
    }

    fn query_entrypoints(&self, profile: HwProfile) -> DriverResult<Vec<Entrypoint>> {
        let lib = self.display.library();
        let dpy = self.display.handle();
        let max = unsafe { (lib.max_num_entrypoints)(dpy) }.max(0) as usize;
        let mut raw = vec![0; max];
        let mut count = 0;
        let status = unsafe {
            (lib.query_config_entrypoints)(dpy, profile.as_raw(), raw.as_mut_ptr(), &mut count)
        };
        self.check(status, "vaQueryConfigEntrypoints()")?;
        raw.truncate(count.clamp(0, max as i32) as usize);
        Ok(raw.into_iter().filter_map(Entrypoint::from_raw).collect())
    }

    fn query_rt_formats(
        &self,
        profile: HwProfile,
        entrypoint: Entrypoint,
    ) -> DriverResult<Option<u32>> {
        let lib = self.display.library();
        let mut attrib = VaConfigAttrib {
            attrib_type: VA_CONFIG_ATTRIB_RT_FORMAT,
            value: 0,
        };
        let status = unsafe {
            (lib.get_config_attributes)(
                self.display.handle(),
                profile.as_raw(),
                entrypoint.as_raw(),
                &mut attrib,
                1,
            )
        };
        self.check(status, "vaGetConfigAttributes()")?;
        if attrib.value == VA_ATTRIB_NOT_SUPPORTED {
            return Ok(None);
        }
        Ok(Some(attrib.value))
    }

    fn create_config(
        &self,
        profile: HwProfile,
        entrypoint: Entrypoint,
        rt_format: u32,
    ) -> DriverResult<ConfigId> {
        let lib = self.display.library();
        let mut attrib = VaConfigAttrib {
            attrib_type: VA_CONFIG_ATTRIB_RT_FORMAT,
            value: rt_format,
        };
        let mut config = INVALID_ID;
        let status = unsafe {
            (lib.create_config)(
                self.display.handle(),
                profile.as_raw(),
                entrypoint.as_raw(),
                &mut attrib,
                1,
                &mut config,
            )
        };
        self.check(status, "vaCreateConfig()")?;
        Ok(config)
    }

    fn destroy_config(&self, config: ConfigId) {
        if config == INVALID_ID {
            return;
        }
        let status =
            unsafe { (self.display.library().destroy_config)(self.display.handle(), config) };
        let _ = self.check(status, "vaDestroyConfig()");
    }

    fn create_surfaces(
        &self,
        rt_format: u32,
        width: u32,
        height: u32,
        count: usize,
    ) -> DriverResult<Vec<SurfaceId>> {
        let mut surfaces = vec![INVALID_SURFACE_ID; count];
        let status = unsafe {
            (self.display.library().create_surfaces)(
                self.display.handle(),
                rt_format,
                width,
                height,
                surfaces.as_mut_ptr(),
                count as u32,
                null_mut(),
                0,
            )
        };
        self.check(status, "vaCreateSurfaces()")?;
        Ok(surfaces)
    }

    fn destroy_surfaces(&self, surfaces: &[SurfaceId]) {
        if surfaces.is_empty() {
            return;
        }
        let mut surfaces = surfaces.to_vec();
        let status = unsafe {
            (self.display.library().destroy_surfaces)(
                self.display.handle(),
                surfaces.as_mut_ptr(),
                surfaces.len() as i32,
            )
        };
        let _ = self.check(status, "vaDestroySurfaces()");
    }

    fn create_context(
        &self,
        config: ConfigId,
        width: u32,
        height: u32,
        surfaces: &[SurfaceId],
    ) -> DriverResult<ContextId> {
        let mut surfaces = surfaces.to_vec();
        let mut context = INVALID_ID;
        let status = unsafe {
            (self.display.library().create_context)(
                self.display.handle(),
                config,
                width as i32,
                height as i32,
                VA_PROGRESSIVE,
                surfaces.as_mut_ptr(),
                surfaces.len() as i32,
                &mut context,
            )
        };
        self.check(status, "vaCreateContext()")?;
        Ok(context)
    }

    fn destroy_context(&self, context: ContextId) {
        if context == INVALID_ID {
            return;
        }
        let status =
            unsafe { (self.display.library().destroy_context)(self.display.handle(), context) };
        let _ = self.check(status, "vaDestroyContext()");
    }

    fn sync_surface(&self, surface: SurfaceId) -> DriverResult<()> {
        let status =
            unsafe { (self.display.library().sync_surface)(self.display.handle(), surface) };
        self.check(status, "vaSyncSurface()")
    }
}
