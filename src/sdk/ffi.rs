//! Raw FFI bindings for the vendor REX engine
//!
//! The engine exposes a small C API. The function pointers are collected in
//! [`RexApi`], which is normally filled by [`crate::sdk::RexLibrary`] but can
//! be built from any set of functions with the same C signatures.
//!
//! Reference: REX SDK `REX.h` (structures are packed to 8, all fields are
//! 32-bit, so `#[repr(C)]` matches).

use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use std::sync::Arc;

use super::engine::{CreateOutcome, EngineResult, RexEngine};
use super::library::RexLibrary;
use super::types::{CreatorInfo, LoopInfo, RawHandle, RexErrorCode, REX_STRING_SIZE};

// ---------------------------------------------------------------------------
// C types
// ---------------------------------------------------------------------------

/// Engine object handle (opaque pointer)
pub type RexHandlePtr = *mut c_void;

/// Engine status value (`REXError`)
pub type RexStatus = i32;

/// `REXCallbackResult`: abort construction
pub const REX_CALLBACK_ABORT: i32 = 1;

/// `REXCallbackResult`: continue construction
pub const REX_CALLBACK_CONTINUE: i32 = 2;

/// `REXInfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RexInfoRaw {
    pub channels: i32,
    pub sample_rate: i32,
    pub slice_count: i32,
    pub tempo: i32,
    pub original_tempo: i32,
    pub ppq_length: i32,
    pub time_sign_nom: i32,
    pub time_sign_denom: i32,
    pub bit_depth: i32,
}

impl From<RexInfoRaw> for LoopInfo {
    fn from(raw: RexInfoRaw) -> Self {
        LoopInfo {
            channels: raw.channels,
            sample_rate: raw.sample_rate,
            slice_count: raw.slice_count,
            tempo: raw.tempo,
            original_tempo: raw.original_tempo,
            ppq_length: raw.ppq_length,
            time_sign_numerator: raw.time_sign_nom,
            time_sign_denominator: raw.time_sign_denom,
            bit_depth: raw.bit_depth,
        }
    }
}

/// `REXCreatorInfo`
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RexCreatorInfoRaw {
    pub name: [c_char; REX_STRING_SIZE + 1],
    pub copyright: [c_char; REX_STRING_SIZE + 1],
    pub url: [c_char; REX_STRING_SIZE + 1],
    pub email: [c_char; REX_STRING_SIZE + 1],
    pub free_text: [c_char; REX_STRING_SIZE + 1],
}

impl Default for RexCreatorInfoRaw {
    fn default() -> Self {
        Self {
            name: [0; REX_STRING_SIZE + 1],
            copyright: [0; REX_STRING_SIZE + 1],
            url: [0; REX_STRING_SIZE + 1],
            email: [0; REX_STRING_SIZE + 1],
            free_text: [0; REX_STRING_SIZE + 1],
        }
    }
}

impl From<&RexCreatorInfoRaw> for CreatorInfo {
    fn from(raw: &RexCreatorInfoRaw) -> Self {
        let name = c_field(&raw.name);
        let copyright = c_field(&raw.copyright);
        let url = c_field(&raw.url);
        let email = c_field(&raw.email);
        let free_text = c_field(&raw.free_text);
        CreatorInfo::from_fields(&name, &copyright, &url, &email, &free_text)
    }
}

/// Decode a fixed-size C string field; missing terminator reads the whole field
fn c_field(field: &[c_char; REX_STRING_SIZE + 1]) -> String {
    // c_char is i8 or u8 depending on target; reinterpret as bytes.
    let bytes: Vec<u8> = field.iter().map(|&c| c as u8).collect();
    match CStr::from_bytes_until_nul(&bytes) {
        Ok(s) => s.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// `REXCreateCallback`
pub type RexCreateCallback = unsafe extern "C" fn(percent_finished: i32, user_data: *mut c_void) -> i32;

pub type RexCreateFn = unsafe extern "C" fn(
    handle: *mut RexHandlePtr,
    buffer: *const c_char,
    size: i32,
    callback: Option<RexCreateCallback>,
    user_data: *mut c_void,
) -> RexStatus;
pub type RexDeleteFn = unsafe extern "C" fn(handle: *mut RexHandlePtr);
pub type RexGetInfoFn =
    unsafe extern "C" fn(handle: RexHandlePtr, info_size: i32, info: *mut RexInfoRaw) -> RexStatus;
pub type RexGetInfoFromBufferFn = unsafe extern "C" fn(
    buffer_size: i32,
    buffer: *const c_char,
    info_size: i32,
    info: *mut RexInfoRaw,
) -> RexStatus;
pub type RexGetCreatorInfoFn = unsafe extern "C" fn(
    handle: RexHandlePtr,
    info_size: i32,
    info: *mut RexCreatorInfoRaw,
) -> RexStatus;
pub type RexSetIntFn = unsafe extern "C" fn(handle: RexHandlePtr, value: i32) -> RexStatus;
pub type RexPreviewFn = unsafe extern "C" fn(handle: RexHandlePtr) -> RexStatus;
pub type RexRenderPreviewBatchFn = unsafe extern "C" fn(
    handle: RexHandlePtr,
    frames: i32,
    output_buffers: *mut *mut f32,
) -> RexStatus;

/// Function table of the engine's C API
#[derive(Clone, Copy)]
pub struct RexApi {
    pub create: RexCreateFn,
    pub delete: RexDeleteFn,
    pub get_info: RexGetInfoFn,
    pub get_info_from_buffer: RexGetInfoFromBufferFn,
    pub get_creator_info: RexGetCreatorInfoFn,
    pub set_output_sample_rate: RexSetIntFn,
    pub set_preview_tempo: RexSetIntFn,
    pub start_preview: RexPreviewFn,
    pub stop_preview: RexPreviewFn,
    pub render_preview_batch: RexRenderPreviewBatchFn,
}

/// Progress callback handed to `REXCreate`; construction is never aborted
unsafe extern "C" fn continue_callback(_percent_finished: i32, _user_data: *mut c_void) -> i32 {
    REX_CALLBACK_CONTINUE
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// [`RexEngine`] backed by the C API
pub struct FfiEngine {
    api: RexApi,
    // Keeps the shared library mapped while any engine object may exist.
    _library: Option<Arc<RexLibrary>>,
}

impl FfiEngine {
    /// Build an engine from a function table
    ///
    /// # Safety
    /// Every pointer in `api` must be a function with the documented REX C
    /// signature that stays callable for the lifetime of the engine, and the
    /// engine behind it must already be initialized.
    pub unsafe fn from_api(api: RexApi) -> Self {
        Self {
            api,
            _library: None,
        }
    }

    pub(crate) fn with_library(library: Arc<RexLibrary>) -> Self {
        Self {
            api: *library.api(),
            _library: Some(library),
        }
    }

    fn ptr(handle: RawHandle) -> RexHandlePtr {
        handle.get() as RexHandlePtr
    }

    fn buffer_len(data: &[u8]) -> EngineResult<i32> {
        i32::try_from(data.len()).map_err(|_| RexErrorCode::InvalidSize)
    }
}

const INFO_SIZE: i32 = std::mem::size_of::<RexInfoRaw>() as i32;
const CREATOR_INFO_SIZE: i32 = std::mem::size_of::<RexCreatorInfoRaw>() as i32;

impl RexEngine for FfiEngine {
    fn info_from_buffer(&self, data: &[u8]) -> EngineResult<LoopInfo> {
        let len = Self::buffer_len(data)?;
        let mut info = RexInfoRaw::default();
        // SAFETY: `data` is valid for `len` bytes and `info` is a live,
        // correctly sized REXInfo. The engine only reads the buffer.
        let status = unsafe {
            (self.api.get_info_from_buffer)(len, data.as_ptr().cast(), INFO_SIZE, &mut info)
        };
        RexErrorCode::check(status)?;
        Ok(info.into())
    }

    fn create(&self, data: &[u8]) -> CreateOutcome {
        let len = match Self::buffer_len(data) {
            Ok(len) => len,
            Err(code) => {
                return CreateOutcome {
                    handle: None,
                    status: Err(code),
                }
            }
        };

        let mut handle: RexHandlePtr = ptr::null_mut();
        // SAFETY: `handle` is a valid out-pointer, `data` outlives the call
        // and the callback is a plain function that ignores its user data.
        let status = unsafe {
            (self.api.create)(
                &mut handle,
                data.as_ptr().cast(),
                len,
                Some(continue_callback),
                ptr::null_mut(),
            )
        };

        CreateOutcome {
            handle: RawHandle::new(handle as usize),
            status: RexErrorCode::check(status),
        }
    }

    fn info(&self, handle: RawHandle) -> EngineResult<LoopInfo> {
        let mut info = RexInfoRaw::default();
        // SAFETY: handle is a live engine object owned by the caller; `info`
        // is a correctly sized REXInfo.
        let status = unsafe { (self.api.get_info)(Self::ptr(handle), INFO_SIZE, &mut info) };
        RexErrorCode::check(status)?;
        Ok(info.into())
    }

    fn creator_info(&self, handle: RawHandle) -> EngineResult<CreatorInfo> {
        let mut raw = RexCreatorInfoRaw::default();
        // SAFETY: handle is live; `raw` is a correctly sized REXCreatorInfo.
        let status = unsafe {
            (self.api.get_creator_info)(Self::ptr(handle), CREATOR_INFO_SIZE, &mut raw)
        };
        RexErrorCode::check(status)?;
        Ok(CreatorInfo::from(&raw))
    }

    fn set_output_sample_rate(&self, handle: RawHandle, sample_rate: i32) -> EngineResult<()> {
        // SAFETY: handle is a live engine object.
        let status = unsafe { (self.api.set_output_sample_rate)(Self::ptr(handle), sample_rate) };
        RexErrorCode::check(status)
    }

    fn set_preview_tempo(&self, handle: RawHandle, tempo: i32) -> EngineResult<()> {
        // SAFETY: handle is a live engine object.
        let status = unsafe { (self.api.set_preview_tempo)(Self::ptr(handle), tempo) };
        RexErrorCode::check(status)
    }

    fn start_preview(&self, handle: RawHandle) -> EngineResult<()> {
        // SAFETY: handle is a live engine object.
        let status = unsafe { (self.api.start_preview)(Self::ptr(handle)) };
        RexErrorCode::check(status)
    }

    fn render_preview_batch(
        &self,
        handle: RawHandle,
        left: &mut [f32],
        right: Option<&mut [f32]>,
    ) -> EngineResult<()> {
        let frames = i32::try_from(left.len()).map_err(|_| RexErrorCode::InvalidArgument)?;
        let right_ptr = match right {
            Some(r) if r.len() != left.len() => return Err(RexErrorCode::InvalidArgument),
            Some(r) => r.as_mut_ptr(),
            None => ptr::null_mut(),
        };
        let mut buffers: [*mut f32; 2] = [left.as_mut_ptr(), right_ptr];
        // SAFETY: both non-null pointers address `frames` writable floats that
        // stay borrowed for the duration of the call; the right pointer is
        // null for mono objects, which the engine does not dereference.
        let status = unsafe {
            (self.api.render_preview_batch)(Self::ptr(handle), frames, buffers.as_mut_ptr())
        };
        RexErrorCode::check(status)
    }

    fn stop_preview(&self, handle: RawHandle) -> EngineResult<()> {
        // SAFETY: handle is a live engine object.
        let status = unsafe { (self.api.stop_preview)(Self::ptr(handle)) };
        RexErrorCode::check(status)
    }

    fn destroy(&self, handle: RawHandle) {
        let mut ptr = Self::ptr(handle);
        // SAFETY: handle is live and owned by the caller, which never
        // destroys it twice.
        unsafe { (self.api.delete)(&mut ptr) };
    }
}
