use log::{debug, info};
use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::sync::OnceLock;
use vadec_types::MediaLibError;

pub type VaStatus = c_int;
pub type VaDisplayHandle = *mut c_void;
pub type VaGenericId = c_uint;
pub type VaProfile = c_int;
pub type VaEntrypoint = c_int;

pub const VA_STATUS_SUCCESS: VaStatus = 0;
pub const VA_ATTRIB_NOT_SUPPORTED: c_uint = 0x8000_0000;
pub const VA_CONFIG_ATTRIB_RT_FORMAT: c_int = 0;
pub const VA_PROGRESSIVE: c_int = 0x1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VaConfigAttrib {
    pub attrib_type: c_int,
    pub value: c_uint,
}

type VaGetDisplayDrmFn = unsafe extern "C" fn(c_int) -> VaDisplayHandle;
pub(super) type VaInitializeFn = unsafe extern "C" fn(VaDisplayHandle, *mut c_int, *mut c_int) -> VaStatus;
pub(super) type VaTerminateFn = unsafe extern "C" fn(VaDisplayHandle) -> VaStatus;
type VaQueryVendorStringFn = unsafe extern "C" fn(VaDisplayHandle) -> *const c_char;
type VaMaxNumFn = unsafe extern "C" fn(VaDisplayHandle) -> c_int;
type VaQueryConfigProfilesFn =
    unsafe extern "C" fn(VaDisplayHandle, *mut VaProfile, *mut c_int) -> VaStatus;
type VaQueryConfigEntrypointsFn =
    unsafe extern "C" fn(VaDisplayHandle, VaProfile, *mut VaEntrypoint, *mut c_int) -> VaStatus;
type VaGetConfigAttributesFn = unsafe extern "C" fn(
    VaDisplayHandle,
    VaProfile,
    VaEntrypoint,
    *mut VaConfigAttrib,
    c_int,
) -> VaStatus;
type VaCreateConfigFn = unsafe extern "C" fn(
    VaDisplayHandle,
    VaProfile,
    VaEntrypoint,
    *mut VaConfigAttrib,
    c_int,
    *mut VaGenericId,
) -> VaStatus;
type VaDestroyFn = unsafe extern "C" fn(VaDisplayHandle, VaGenericId) -> VaStatus;
type VaCreateSurfacesFn = unsafe extern "C" fn(
    VaDisplayHandle,
    c_uint,
    c_uint,
    c_uint,
    *mut VaGenericId,
    c_uint,
    *mut c_void,
    c_uint,
) -> VaStatus;
type VaDestroySurfacesFn =
    unsafe extern "C" fn(VaDisplayHandle, *mut VaGenericId, c_int) -> VaStatus;
type VaCreateContextFn = unsafe extern "C" fn(
    VaDisplayHandle,
    VaGenericId,
    c_int,
    c_int,
    c_int,
    *mut VaGenericId,
    c_int,
    *mut VaGenericId,
) -> VaStatus;
type VaSyncSurfaceFn = unsafe extern "C" fn(VaDisplayHandle, VaGenericId) -> VaStatus;
type VaErrorStrFn = unsafe extern "C" fn(VaStatus) -> *const c_char;

/// libva entry points resolved at runtime, so the crate builds and runs on
/// machines without VA-API installed.
pub struct VaLibrary {
    _libva: libloading::Library,
    _libva_drm: libloading::Library,

    pub get_display_drm: VaGetDisplayDrmFn,
    pub initialize: VaInitializeFn,
    pub terminate: VaTerminateFn,
    pub query_vendor_string: VaQueryVendorStringFn,
    pub max_num_profiles: VaMaxNumFn,
    pub max_num_entrypoints: VaMaxNumFn,
    pub query_config_profiles: VaQueryConfigProfilesFn,
    pub query_config_entrypoints: VaQueryConfigEntrypointsFn,
    pub get_config_attributes: VaGetConfigAttributesFn,
    pub create_config: VaCreateConfigFn,
    pub destroy_config: VaDestroyFn,
    pub create_surfaces: VaCreateSurfacesFn,
    pub destroy_surfaces: VaDestroySurfacesFn,
    pub create_context: VaCreateContextFn,
    pub destroy_context: VaDestroyFn,
    pub sync_surface: VaSyncSurfaceFn,
    error_str: VaErrorStrFn,
}

unsafe impl Send for VaLibrary {}
unsafe impl Sync for VaLibrary {}

static VA_LIBRARY: OnceLock<Result<VaLibrary, String>> = OnceLock::new();

const LIBVA_NAMES: [&str; 2] = ["libva.so.2", "libva.so"];
const LIBVA_DRM_NAMES: [&str; 2] = ["libva-drm.so.2", "libva-drm.so"];

fn open_first(names: &[&str]) -> Result<libloading::Library, String> {
    let mut last_error = String::new();
    for name in names {
        match unsafe { libloading::Library::new(name) } {
            Ok(library) => {
                debug!("loaded {}", name);
                return Ok(library);
            }
            Err(e) => last_error = format!("{}: {}", name, e),
        }
    }
    Err(last_error)
}

macro_rules! symbol {
    ($lib:expr, $name:literal) => {
        *$lib
            .get(concat!($name, "\0").as_bytes())
            .map_err(|e| format!("{}: {}", $name, e))?
    };
}

impl VaLibrary {
    /// Loads libva once per process.
    pub fn get() -> Result<&'static VaLibrary, MediaLibError> {
        VA_LIBRARY
            .get_or_init(Self::load)
            .as_ref()
            .map_err(|e| MediaLibError::Unsupported(format!("VA-API unavailable: {}", e).into()))
    }

    fn load() -> Result<VaLibrary, String> {
        let libva = open_first(&LIBVA_NAMES)?;
        let libva_drm = open_first(&LIBVA_DRM_NAMES)?;

        let library = unsafe {
            VaLibrary {
                get_display_drm: symbol!(libva_drm, "vaGetDisplayDRM"),
                initialize: symbol!(libva, "vaInitialize"),
                terminate: symbol!(libva, "vaTerminate"),
                query_vendor_string: symbol!(libva, "vaQueryVendorString"),
                max_num_profiles: symbol!(libva, "vaMaxNumProfiles"),
                max_num_entrypoints: symbol!(libva, "vaMaxNumEntrypoints"),
                query_config_profiles: symbol!(libva, "vaQueryConfigProfiles"),
                query_config_entrypoints: symbol!(libva, "vaQueryConfigEntrypoints"),
                get_config_attributes: symbol!(libva, "vaGetConfigAttributes"),
                create_config: symbol!(libva, "vaCreateConfig"),
                destroy_config: symbol!(libva, "vaDestroyConfig"),
                create_surfaces: symbol!(libva, "vaCreateSurfaces"),
                destroy_surfaces: symbol!(libva, "vaDestroySurfaces"),
                create_context: symbol!(libva, "vaCreateContext"),
                destroy_context: symbol!(libva, "vaDestroyContext"),
                sync_surface: symbol!(libva, "vaSyncSurface"),
                error_str: symbol!(libva, "vaErrorStr"),
                _libva: libva,
                _libva_drm: libva_drm,
            }
        };
        info!("VA-API library loaded");
        Ok(library)
    }

    pub fn error_str(&self, status: VaStatus) -> String {
        let message = unsafe { (self.error_str)(status) };
        if message.is_null() {
            return format!("status {:#x}", status);
        }
        unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    }
}
