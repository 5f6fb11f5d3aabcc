use crate::va::VaDisplayHandle;
use ffmpeg_next::ffi::{
    av_buffer_ref, av_buffer_unref, av_hwdevice_ctx_alloc, av_hwdevice_ctx_init, AVBufferRef,
    AVHWDeviceContext, AVHWDeviceType,
};
use vadec_types::MediaLibError;

/// RAII wrapper for an FFmpeg VAAPI device context built on a display this
/// crate already owns. FFmpeg never terminates the display; the owning
/// [`crate::va::VaDisplay`] does, and must outlive this context.
pub struct HardwareContext {
    ctx: *mut AVBufferRef,
}

impl HardwareContext {
    pub fn new(display: VaDisplayHandle) -> Result<Self, MediaLibError> {
        unsafe {
            let mut ctx = av_hwdevice_ctx_alloc(AVHWDeviceType::AV_HWDEVICE_TYPE_VAAPI);
            if ctx.is_null() {
                return Err(MediaLibError::OutOfMemory(
                    "failed to allocate VAAPI device context".into(),
                ));
            }
            let device = (*ctx).data as *mut AVHWDeviceContext;
            // AVVAAPIDeviceContext starts with the VADisplay.
            *((*device).hwctx as *mut VaDisplayHandle) = display;

            let ret = av_hwdevice_ctx_init(ctx);
            if ret < 0 {
                av_buffer_unref(&mut ctx);
                return Err(MediaLibError::FFmpegError(
                    format!(
                        "failed to initialize VAAPI device context: {}",
                        ffmpeg_next::Error::from(ret)
                    )
                    .into(),
                ));
            }
            Ok(Self { ctx })
        }
    }

    /// New reference for a codec context to own.
    pub fn new_ref(&self) -> Result<*mut AVBufferRef, MediaLibError> {
        let hw_ref = unsafe { av_buffer_ref(self.ctx) };
        if hw_ref.is_null() {
            return Err(MediaLibError::OutOfMemory(
                "failed to reference hardware context".into(),
            ));
        }
        Ok(hw_ref)
    }
}

impl Drop for HardwareContext {
    fn drop(&mut self) {
        unsafe {
            if !self.ctx.is_null() {
                av_buffer_unref(&mut self.ctx);
            }
        }
    }
}

unsafe impl Send for HardwareContext {}
