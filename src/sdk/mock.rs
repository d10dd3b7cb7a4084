//! In-process mock engine for testing
//!
//! The mock does no real slice rendering. A "file" is a short magic prefix
//! followed by a JSON-encoded [`MockLoop`], which describes the metadata the
//! engine should report and how it should misbehave (hang, soft errors, null
//! handles, failing batches, silent or over-range output).
//!
//! The engine keeps a call log and handle counters so tests can verify the
//! rendering protocol and that no engine object leaks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::engine::{CreateOutcome, EngineResult, RexEngine};
use super::types::{CreatorInfo, LoopInfo, RawHandle, RexErrorCode, REX_PPQ};

/// Prefix identifying a mock loop file
pub const MOCK_MAGIC: &[u8; 8] = b"MOCKREX1";

/// Signal the mock renders during preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Waveform {
    /// Sine wave; the right channel is rendered at 80% of the left amplitude
    Sine { frequency: f32, amplitude: f32 },
    /// Every sample has the same value
    Constant(f32),
    /// All slices muted
    Silence,
}

/// Description of a mock loop file and the engine behavior it triggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockLoop {
    /// Metadata returned by both the header query and the full object
    pub info: LoopInfo,
    /// Metadata the full object reports, when it differs from the header
    pub object_info: Option<LoopInfo>,
    pub creator: Option<CreatorInfo>,
    /// Raw status the creator info query fails with
    pub creator_status: Option<i32>,
    pub waveform: Waveform,
    /// Raw status the header query fails with
    pub header_status: Option<i32>,
    /// How long `create` blocks before returning
    pub create_delay_ms: u64,
    /// Raw status `create` reports alongside its handle
    pub create_status: Option<i32>,
    /// `create` returns no handle
    pub null_handle: bool,
    /// Number of preview batches that succeed before rendering fails
    pub fail_batch_after: Option<usize>,
}

impl Default for MockLoop {
    fn default() -> Self {
        Self {
            info: LoopInfo {
                channels: 2,
                sample_rate: 44100,
                slice_count: 8,
                tempo: 120_000,
                original_tempo: 120_000,
                ppq_length: REX_PPQ * 4,
                time_sign_numerator: 4,
                time_sign_denominator: 4,
                bit_depth: 16,
            },
            object_info: None,
            creator: None,
            creator_status: None,
            waveform: Waveform::Sine {
                frequency: 440.0,
                amplitude: 0.5,
            },
            header_status: None,
            create_delay_ms: 0,
            create_status: None,
            null_handle: false,
            fail_batch_after: None,
        }
    }
}

impl MockLoop {
    /// A loop with the given metadata and default behavior
    pub fn with_info(info: LoopInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    /// Encode as a mock "file"
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let mut bytes = MOCK_MAGIC.to_vec();
        // Serializing plain data with derived impls cannot fail.
        bytes.extend(serde_json::to_vec(self).unwrap_or_default());
        bytes
    }

    /// Decode a mock "file"; anything else is reported as corrupt
    pub fn from_file_bytes(data: &[u8]) -> EngineResult<Self> {
        let body = data
            .strip_prefix(MOCK_MAGIC.as_slice())
            .ok_or(RexErrorCode::FileCorrupt)?;
        serde_json::from_slice(body).map_err(|_| RexErrorCode::FileCorrupt)
    }
}

/// One recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    InfoFromBuffer,
    Create,
    Info,
    CreatorInfo,
    SetOutputSampleRate(i32),
    SetPreviewTempo(i32),
    StartPreview,
    RenderBatch {
        frames: usize,
        stereo: bool,
        previewing: bool,
    },
    StopPreview,
    Destroy,
}

struct MockObject {
    spec: MockLoop,
    sample_rate: i32,
    tempo: i32,
    previewing: bool,
    frame_pos: u64,
    batches: usize,
}

/// Mock implementation of [`RexEngine`]
#[derive(Default)]
pub struct MockEngine {
    next_handle: AtomicUsize,
    objects: Mutex<HashMap<usize, MockObject>>,
    calls: Mutex<Vec<MockCall>>,
    created: AtomicUsize,
    destroy_calls: AtomicUsize,
    double_destroys: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine objects created and not yet destroyed
    pub fn live_handles(&self) -> usize {
        self.lock_objects().len()
    }

    /// Total objects ever created
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    /// `destroy` calls for handles that were already released
    pub fn double_destroys(&self) -> usize {
        self.double_destroys.load(Ordering::SeqCst)
    }

    /// Snapshot of the call log
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock_calls().clone()
    }

    /// Block until `count` destroy calls were made or the timeout passes
    ///
    /// Abandoned sandbox workers create and release their objects
    /// asynchronously, so `live_handles() == 0` alone does not mean the
    /// worker is done.
    pub fn wait_for_destroys(&self, count: usize, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.destroy_calls() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.destroy_calls() >= count
    }

    fn record(&self, call: MockCall) {
        self.lock_calls().push(call);
    }

    fn lock_objects(&self) -> MutexGuard<'_, HashMap<usize, MockObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_object<T>(
        &self,
        handle: RawHandle,
        f: impl FnOnce(&mut MockObject) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut objects = self.lock_objects();
        let object = objects
            .get_mut(&handle.get())
            .ok_or(RexErrorCode::InvalidHandle)?;
        f(object)
    }
}

impl RexEngine for MockEngine {
    fn info_from_buffer(&self, data: &[u8]) -> EngineResult<LoopInfo> {
        self.record(MockCall::InfoFromBuffer);
        let spec = MockLoop::from_file_bytes(data)?;
        if let Some(raw) = spec.header_status {
            RexErrorCode::check(raw)?;
        }
        Ok(spec.info)
    }

    fn create(&self, data: &[u8]) -> CreateOutcome {
        self.record(MockCall::Create);
        let spec = match MockLoop::from_file_bytes(data) {
            Ok(spec) => spec,
            Err(code) => {
                return CreateOutcome {
                    handle: None,
                    status: Err(code),
                }
            }
        };

        if spec.create_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(spec.create_delay_ms));
        }

        let status = spec.create_status.map_or(Ok(()), RexErrorCode::check);
        if spec.null_handle {
            return CreateOutcome {
                handle: None,
                status,
            };
        }

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = RawHandle::new(id);
        self.lock_objects().insert(
            id,
            MockObject {
                sample_rate: spec.info.sample_rate,
                spec,
                tempo: 0,
                previewing: false,
                frame_pos: 0,
                batches: 0,
            },
        );
        self.created.fetch_add(1, Ordering::SeqCst);

        CreateOutcome { handle, status }
    }

    fn info(&self, handle: RawHandle) -> EngineResult<LoopInfo> {
        self.record(MockCall::Info);
        self.with_object(handle, |obj| Ok(obj.spec.object_info.unwrap_or(obj.spec.info)))
    }

    fn creator_info(&self, handle: RawHandle) -> EngineResult<CreatorInfo> {
        self.record(MockCall::CreatorInfo);
        self.with_object(handle, |obj| {
            if let Some(raw) = obj.spec.creator_status {
                RexErrorCode::check(raw)?;
            }
            obj.spec
                .creator
                .clone()
                .ok_or(RexErrorCode::NoCreatorInfoAvailable)
        })
    }

    fn set_output_sample_rate(&self, handle: RawHandle, sample_rate: i32) -> EngineResult<()> {
        self.record(MockCall::SetOutputSampleRate(sample_rate));
        self.with_object(handle, |obj| {
            if !(11025..=1_000_000).contains(&sample_rate) {
                return Err(RexErrorCode::InvalidSampleRate);
            }
            obj.sample_rate = sample_rate;
            Ok(())
        })
    }

    fn set_preview_tempo(&self, handle: RawHandle, tempo: i32) -> EngineResult<()> {
        self.record(MockCall::SetPreviewTempo(tempo));
        self.with_object(handle, |obj| {
            if !(20_000..=450_000).contains(&tempo) {
                return Err(RexErrorCode::InvalidTempo);
            }
            obj.tempo = tempo;
            Ok(())
        })
    }

    fn start_preview(&self, handle: RawHandle) -> EngineResult<()> {
        self.record(MockCall::StartPreview);
        self.with_object(handle, |obj| {
            if obj.previewing {
                return Err(RexErrorCode::IsBeingPreviewed);
            }
            obj.previewing = true;
            obj.frame_pos = 0;
            Ok(())
        })
    }

    fn render_preview_batch(
        &self,
        handle: RawHandle,
        left: &mut [f32],
        right: Option<&mut [f32]>,
    ) -> EngineResult<()> {
        let frames = left.len();
        let mut right = right;
        self.with_object(handle, |obj| {
            self.record(MockCall::RenderBatch {
                frames,
                stereo: right.is_some(),
                previewing: obj.previewing,
            });

            if let Some(r) = right.as_deref() {
                if r.len() != frames {
                    return Err(RexErrorCode::InvalidArgument);
                }
            }

            if !obj.previewing {
                // Post-stop flush: the engine drains internal state silently.
                left.fill(0.0);
                if let Some(r) = right.as_deref_mut() {
                    r.fill(0.0);
                }
                return Ok(());
            }

            if let Some(limit) = obj.spec.fail_batch_after {
                if obj.batches >= limit {
                    return Err(RexErrorCode::BufferTooSmall);
                }
            }

            let rate = obj.sample_rate.max(1) as f32;
            for i in 0..frames {
                let t = (obj.frame_pos + i as u64) as f32 / rate;
                let (l, r) = match obj.spec.waveform {
                    Waveform::Sine {
                        frequency,
                        amplitude,
                    } => {
                        let s = amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin();
                        (s, s * 0.8)
                    }
                    Waveform::Constant(v) => (v, v),
                    Waveform::Silence => (0.0, 0.0),
                };
                left[i] = l;
                if let Some(right) = right.as_deref_mut() {
                    right[i] = r;
                }
            }

            obj.frame_pos += frames as u64;
            obj.batches += 1;
            Ok(())
        })
    }

    fn stop_preview(&self, handle: RawHandle) -> EngineResult<()> {
        self.record(MockCall::StopPreview);
        self.with_object(handle, |obj| {
            if !obj.previewing {
                return Err(RexErrorCode::NotBeingPreviewed);
            }
            obj.previewing = false;
            Ok(())
        })
    }

    fn destroy(&self, handle: RawHandle) {
        self.record(MockCall::Destroy);
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if self.lock_objects().remove(&handle.get()).is_none() {
            self.double_destroys.fetch_add(1, Ordering::SeqCst);
        }
    }
}
