use super::library::{
    VaDisplayHandle, VaInitializeFn, VaLibrary, VaStatus, VaTerminateFn, VA_STATUS_SUCCESS,
};
use log::{debug, info};
use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use vadec_types::MediaLibError;

pub const DEFAULT_DRM_DEVICE: &str = "/dev/dri/renderD128";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayType {
    Drm,
}

/// An initialized VA display on top of a DRM render node. Terminates the
/// display, then closes the node, when dropped.
pub struct VaDisplay {
    library: &'static VaLibrary,
    handle: VaDisplayHandle,
    // Must outlive `handle`.
    _device: File,
    device_path: PathBuf,
    version: (i32, i32),
    vendor: String,
}

impl VaDisplay {
    /// Opens `device`, or the default render node when it is empty.
    pub fn open(device: &str) -> Result<Self, MediaLibError> {
        let device_path = if device.is_empty() {
            PathBuf::from(DEFAULT_DRM_DEVICE)
        } else {
            PathBuf::from(device)
        };
        let library = VaLibrary::get()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&device_path)
            .map_err(|e| {
                MediaLibError::InvalidArgument(
                    format!("cannot open {}: {}", device_path.display(), e).into(),
                )
            })?;

        let handle = unsafe { (library.get_display_drm)(file.as_raw_fd()) };
        if handle.is_null() {
            return Err(MediaLibError::Unsupported(
                format!("no VA display for {}", device_path.display()).into(),
            ));
        }

        let (major, minor) =
            unsafe { initialize_display(library.initialize, library.terminate, handle) }.map_err(
                |status| {
                    MediaLibError::Unsupported(
                        format!("vaInitialize(): {}", library.error_str(status)).into(),
                    )
                },
            )?;

        let vendor = unsafe {
            let vendor = (library.query_vendor_string)(handle);
            if vendor.is_null() {
                String::new()
            } else {
                CStr::from_ptr(vendor).to_string_lossy().into_owned()
            }
        };
        info!(
            "VA-API {}.{} on {}: {}",
            major,
            minor,
            device_path.display(),
            vendor
        );

        Ok(Self {
            library,
            handle,
            _device: file,
            device_path,
            version: (major, minor),
            vendor,
        })
    }

    pub fn library(&self) -> &'static VaLibrary {
        self.library
    }

    pub fn handle(&self) -> VaDisplayHandle {
        self.handle
    }

    pub fn display_type(&self) -> DisplayType {
        DisplayType::Drm
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    pub fn version(&self) -> (i32, i32) {
        self.version
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }
}

/// Initializes `handle`, terminating it again if initialization fails.
pub(super) unsafe fn initialize_display(
    initialize: VaInitializeFn,
    terminate: VaTerminateFn,
    handle: VaDisplayHandle,
) -> Result<(i32, i32), VaStatus> {
    let mut major = 0;
    let mut minor = 0;
    let status = initialize(handle, &mut major, &mut minor);
    if status != VA_STATUS_SUCCESS {
        terminate(handle);
        return Err(status);
    }
    Ok((major, minor))
}

impl Drop for VaDisplay {
    fn drop(&mut self) {
        unsafe {
            (self.library.terminate)(self.handle);
        }
        debug!("closed VA display on {}", self.device_path.display());
    }
}

// libva serialises access to a display internally.
unsafe impl Send for VaDisplay {}
