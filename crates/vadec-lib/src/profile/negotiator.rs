use super::{Codec, CodecProfile, Entrypoint, HwProfile};
use crate::driver::{DriverStatus, HardwareDriver};
use log::{debug, warn};
use std::collections::HashMap;

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedProfile {
    pub profile: HwProfile,
    pub entrypoint: Entrypoint,
    pub requested: CodecProfile,
}

/// Picks a hardware (profile, entrypoint) for a stream.
///
/// Driver capability lists are fetched lazily and cached for as long as the
/// negotiator lives, which is one decode session. A failed query is not cached
/// and will be retried on the next call.
#[derive(Debug, Default)]
pub struct CapabilityNegotiator {
    profiles: Option<Vec<HwProfile>>,
    entrypoints: HashMap<HwProfile, Vec<Entrypoint>>,
    profile_queries: usize,
}

impl CapabilityNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of driver profile-list queries issued so far.
    pub fn profile_queries(&self) -> usize {
        self.profile_queries
    }

    pub fn supported_profiles<D: HardwareDriver + ?Sized>(
        &mut self,
        driver: &D,
    ) -> Result<&[HwProfile], DriverStatus> {
        if self.profiles.is_none() {
            self.profile_queries += 1;
            let profiles = driver.query_profiles()?;
            debug!(
                "{} reports {} decode profiles: {:?}",
                driver.name(),
                profiles.len(),
                profiles
            );
            self.profiles = Some(profiles);
        }
        Ok(self.profiles.as_deref().unwrap_or_default())
    }

    /// Whether the driver lists `profile` and accepts `entrypoint` for it.
    pub fn has_config<D: HardwareDriver + ?Sized>(
        &mut self,
        driver: &D,
        profile: HwProfile,
        entrypoint: Entrypoint,
    ) -> Result<bool, DriverStatus> {
        if !self.supported_profiles(driver)?.contains(&profile) {
            return Ok(false);
        }
        if !self.entrypoints.contains_key(&profile) {
            let entrypoints = driver.query_entrypoints(profile)?;
            self.entrypoints.insert(profile, entrypoints);
        }
        Ok(self
            .entrypoints
            .get(&profile)
            .map(|entrypoints| entrypoints.contains(&entrypoint))
            .unwrap_or(false))
    }

    /// Returns `Ok(None)` when no candidate profile is usable, which sends the
    /// stream down the software path.
    pub fn negotiate<D: HardwareDriver + ?Sized>(
        &mut self,
        driver: &D,
        codec: Codec,
        profile: i32,
        entrypoint: Entrypoint,
    ) -> Result<Option<NegotiatedProfile>, DriverStatus> {
        let Some(requested) = CodecProfile::from_ffmpeg(codec, profile) else {
            debug!("no hardware profile for {} profile {}", codec, profile);
            return Ok(None);
        };
        let candidates = requested.candidates();

        for candidate in &candidates {
            match self.has_config(driver, *candidate, entrypoint) {
                Ok(true) => {
                    debug!(
                        "negotiated {} for {:?} (candidates {:?})",
                        candidate, requested, candidates
                    );
                    return Ok(Some(NegotiatedProfile {
                        profile: *candidate,
                        entrypoint,
                        requested,
                    }));
                }
                Ok(false) => {}
                Err(status) if status.is_quiet() => {}
                Err(status) => {
                    warn!("capability query for {} failed: {}", candidate, status);
                    return Err(status);
                }
            }
        }
        debug!(
            "none of {:?} is available for {:?}, using software decoding",
            candidates, requested
        );
        Ok(None)
    }
}
