//! VA-API backend, loaded at runtime with `libloading`.

mod display;
mod driver;
mod library;

pub use display::{DisplayType, VaDisplay, DEFAULT_DRM_DEVICE};
pub use driver::VaDriver;
pub use library::{VaDisplayHandle, VaLibrary};

use crate::driver::HardwareDriver;
use crate::profile::Entrypoint;
use vadec_types::{MediaLibError, ProfileSupport};

/// Lists the decode profiles the driver behind `device` exposes.
pub fn probe_profiles(device: &str) -> Result<Vec<ProfileSupport>, MediaLibError> {
    let driver = VaDriver::open(device)?;
    let profiles = driver
        .query_profiles()
        .map_err(|status| status.to_error("vaQueryConfigProfiles()"))?;

    let mut supported = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let decode = driver
            .query_entrypoints(profile)
            .map(|entrypoints| entrypoints.contains(&Entrypoint::Vld))
            .unwrap_or(false);
        supported.push(ProfileSupport {
            name: profile.name().into(),
            raw_profile: profile.as_raw(),
            decode,
        });
    }
    Ok(supported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "needs libva and a DRM render node"]
    fn probe_default_device() {
        let profiles = probe_profiles("").expect("probe");
        assert!(!profiles.is_empty());
        for profile in &profiles {
            println!("{} ({}): decode={}", profile.name, profile.raw_profile, profile.decode);
        }
    }

    #[test]
    fn missing_device_is_an_invalid_argument() {
        // Fails before or after loading libva, depending on the machine.
        let err = VaDisplay::open("/nonexistent/renderD999").err().expect("no such device");
        assert!(matches!(
            err.kind(),
            vadec_types::ErrorKind::InvalidArgument | vadec_types::ErrorKind::Unsupported
        ));
    }
}
