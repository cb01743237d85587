// This is free and unencumbered software released into the public domain.

use bytes::{Bytes, BytesMut};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Y plane followed by interleaved V/U samples.
    Nv21,
    /// Three planes: Y, U, V, chroma subsampled 2x2.
    Yuv420,
}

/// A frame as produced by a camera device, before any backend repacking.
#[derive(Clone, Debug)]
pub struct RawFrame {
    /// Y, U and V planes.
    pub planes: [Bytes; 3],
    /// Row stride in bytes of each plane.
    pub strides: [usize; 3],
    pub width: u32,
    pub height: u32,
    pub timestamp_ns: u64,
}

impl RawFrame {
    /// Repacks the planes into a tightly packed NV21 buffer.
    pub fn to_nv21(&self) -> Bytes {
        let w = self.width as usize;
        let h = self.height as usize;
        let cw = w.div_ceil(2);
        let ch = h.div_ceil(2);

        let mut out = BytesMut::with_capacity(w * h + cw * ch * 2);
        let [y, u, v] = &self.planes;
        let [y_stride, u_stride, v_stride] = self.strides;

        for row in 0..h {
            let start = row * y_stride;
            out.extend_from_slice(&y[start..start + w]);
        }
        for row in 0..ch {
            for col in 0..cw {
                out.extend_from_slice(&[v[row * v_stride + col], u[row * u_stride + col]]);
            }
        }
        out.freeze()
    }
}

/// Preview frame delivered to listeners.
#[derive(Clone, Debug)]
pub enum PreviewFrame {
    /// Single packed buffer (NV21).
    Packed { data: Bytes },
    /// Separate planes with their row strides.
    Planar {
        planes: Vec<Bytes>,
        strides: Vec<usize>,
        width: u32,
        height: u32,
    },
}

impl PreviewFrame {
    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            PreviewFrame::Packed { .. } => PixelFormat::Nv21,
            PreviewFrame::Planar { .. } => PixelFormat::Yuv420,
        }
    }
}

impl From<RawFrame> for PreviewFrame {
    fn from(frame: RawFrame) -> Self {
        PreviewFrame::Planar {
            planes: frame.planes.to_vec(),
            strides: frame.strides.to_vec(),
            width: frame.width,
            height: frame.height,
        }
    }
}
