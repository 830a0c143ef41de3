// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 capture
//!
//! Opens `/dev/video<index>` with the v4l crate, negotiates the closest
//! format to the requested resolution and frame rate, and streams
//! memory-mapped buffers that are converted to RGB frames.

use super::CaptureDevice;
use super::format_converters;
use super::types::{CameraDevice, CameraFormat, CaptureSettings, Frame, PixelFormat};
use crate::errors::CameraError;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;
use v4l::{Format, FourCC};

/// Number of memory-mapped buffers queued with the driver
const STREAM_BUFFERS: u32 = 4;

/// An open V4L2 capture stream
pub struct V4l2Capture {
    index: usize,
    format: CameraFormat,
    // Field order matters: the stream must be dropped before the device
    stream: MmapStream<'static>,
    _device: Device,
}

impl V4l2Capture {
    /// Open and configure a device
    ///
    /// Width, height and frame rate are requests; drivers pick the nearest
    /// supported mode and the result is available via [`CaptureDevice::format`].
    pub fn open(settings: &CaptureSettings) -> Result<Self, CameraError> {
        let index = settings.device_index;
        let unavailable = |reason: String| CameraError::DeviceUnavailable { index, reason };

        info!(
            index,
            width = settings.width,
            height = settings.height,
            fps = settings.framerate,
            "Opening V4L2 device"
        );

        let device = Device::new(index).map_err(|e| unavailable(e.to_string()))?;

        let pixel_format = choose_pixel_format(&device)
            .ok_or_else(|| unavailable("no supported pixel format".to_string()))?;

        let requested = Format::new(
            settings.width,
            settings.height,
            FourCC::new(&pixel_format.fourcc()),
        );
        let actual = device
            .set_format(&requested)
            .map_err(|e| unavailable(format!("failed to set format: {}", e)))?;

        if actual.width != settings.width || actual.height != settings.height {
            warn!(
                requested_width = settings.width,
                requested_height = settings.height,
                width = actual.width,
                height = actual.height,
                "Requested resolution not supported, using nearest mode"
            );
        }

        let pixel_format = PixelFormat::from_fourcc(&actual.fourcc.repr)
            .ok_or_else(|| unavailable(format!("driver switched to {}", actual.fourcc)))?;

        let framerate = match device.set_params(&Parameters::with_fps(settings.framerate)) {
            Ok(params) => {
                let interval = params.interval;
                let fps = if interval.numerator == 0 {
                    None
                } else {
                    Some(interval.denominator / interval.numerator)
                };
                if fps != Some(settings.framerate) {
                    warn!(
                        requested = settings.framerate,
                        actual = ?fps,
                        "Requested frame rate not supported"
                    );
                }
                fps
            }
            Err(e) => {
                warn!(error = %e, "Device does not support setting the frame rate");
                None
            }
        };

        let format = CameraFormat {
            width: actual.width,
            height: actual.height,
            framerate,
            pixel_format,
        };

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;

        info!(index, format = %format, "V4L2 capture stream started");

        Ok(Self {
            index,
            format,
            stream,
            _device: device,
        })
    }
}

impl CaptureDevice for V4l2Capture {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let captured_at = Instant::now();
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::ReadFailed(e.to_string()))?;

        // Drivers report the payload size; the mapped buffer may be larger
        let used = (meta.bytesused as usize).min(buf.len());
        let payload = if used == 0 { buf } else { &buf[..used] };

        let rgb = format_converters::to_rgb(
            payload,
            self.format.width,
            self.format.height,
            self.format.pixel_format,
        )?;

        let mut frame = Frame::from_rgb(self.format.width, self.format.height, rgb)
            .ok_or_else(|| CameraError::ReadFailed("converted frame has wrong size".into()))?;
        frame.captured_at = captured_at;
        Ok(frame)
    }

    fn format(&self) -> CameraFormat {
        self.format
    }
}

impl Drop for V4l2Capture {
    fn drop(&mut self) {
        debug!(index = self.index, "Releasing V4L2 device");
    }
}

/// Pick the most convenient format the device offers
fn choose_pixel_format(device: &Device) -> Option<PixelFormat> {
    let offered: Vec<PixelFormat> = device
        .enum_formats()
        .into_iter()
        .flatten()
        .filter_map(|desc| PixelFormat::from_fourcc(&desc.fourcc.repr))
        .collect();

    PixelFormat::PREFERRED
        .into_iter()
        .find(|format| offered.contains(format))
}

/// List V4L2 capture devices
pub fn list_devices() -> Vec<CameraDevice> {
    let mut devices: Vec<CameraDevice> = v4l::context::enum_devices()
        .into_iter()
        .filter_map(|node| {
            let device = Device::new(node.index()).ok()?;
            let caps = device.query_caps().ok()?;
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                return None;
            }
            Some(CameraDevice {
                index: node.index(),
                name: node.name().unwrap_or(caps.card),
                path: node.path().to_string_lossy().to_string(),
            })
        })
        .collect();

    devices.sort_by_key(|d| d.index);
    debug!(count = devices.len(), "Enumerated V4L2 capture devices");
    devices
}
