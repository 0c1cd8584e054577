use std::time::Instant;

use crate::foundation::core::RgbaFrame;
use crate::gates::reason::ReasonCode;

/// Named structural gate, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardGate {
    FileSize,
    Decodable,
    ColorDepth,
    Dimensions,
    NotFullyTransparent,
}

impl HardGate {
    pub const ORDER: [HardGate; 5] = [
        HardGate::FileSize,
        HardGate::Decodable,
        HardGate::ColorDepth,
        HardGate::Dimensions,
        HardGate::NotFullyTransparent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HardGate::FileSize => "file_size",
            HardGate::Decodable => "decodable",
            HardGate::ColorDepth => "color_depth",
            HardGate::Dimensions => "dimensions",
            HardGate::NotFullyTransparent => "not_fully_transparent",
        }
    }
}

impl std::fmt::Display for HardGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Limits applied by the hard gates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HardGateOpts {
    pub expected_width: u32,
    pub expected_height: u32,
    pub min_file_bytes: u64,
    pub max_file_bytes: u64,
    pub alpha_threshold: u8,
}

/// One executed gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GateCheck {
    pub gate: HardGate,
    pub passed: bool,
    pub elapsed_us: u64,
}

/// Candidate that cleared every hard gate.
#[derive(Clone, Debug)]
pub struct HardGatePass {
    pub frame: RgbaFrame,
    pub checks: Vec<GateCheck>,
}

/// First failing hard gate. Later gates were not run.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("hard gate {gate} failed ({code}): {detail}")]
pub struct HardGateFailure {
    pub gate: HardGate,
    pub code: ReasonCode,
    pub detail: String,
    pub checks: Vec<GateCheck>,
}

impl HardGateFailure {
    /// True when the failure points at the adapter (wrong canvas, wrong pixel format).
    pub fn is_adapter_fault(&self) -> bool {
        self.code.is_adapter_fault()
    }
}

struct GateRun {
    checks: Vec<GateCheck>,
}

impl GateRun {
    fn check<T>(
        &mut self,
        gate: HardGate,
        f: impl FnOnce() -> Result<T, (ReasonCode, String)>,
    ) -> Result<T, HardGateFailure> {
        let start = Instant::now();
        let res = f();
        let elapsed_us = start.elapsed().as_micros() as u64;
        self.checks.push(GateCheck {
            gate,
            passed: res.is_ok(),
            elapsed_us,
        });
        tracing::debug!(gate = gate.name(), passed = res.is_ok(), elapsed_us, "hard gate");
        res.map_err(|(code, detail)| HardGateFailure {
            gate,
            code,
            detail,
            checks: self.checks.clone(),
        })
    }
}

/// Run the hard gates over encoded candidate bytes, stopping at the first failure.
///
/// On success returns the decoded RGBA8 frame so later stages never decode twice.
pub fn evaluate_hard_gates(
    bytes: &[u8],
    opts: &HardGateOpts,
) -> Result<HardGatePass, HardGateFailure> {
    let mut run = GateRun {
        checks: Vec::with_capacity(HardGate::ORDER.len()),
    };

    run.check(HardGate::FileSize, || {
        let len = bytes.len() as u64;
        if len < opts.min_file_bytes || len > opts.max_file_bytes {
            return Err((
                ReasonCode::FileSizeOutOfBounds,
                format!(
                    "{len} bytes outside [{}, {}]",
                    opts.min_file_bytes, opts.max_file_bytes
                ),
            ));
        }
        Ok(())
    })?;

    let decoded = run.check(HardGate::Decodable, || {
        image::load_from_memory(bytes)
            .map_err(|e| (ReasonCode::Undecodable, format!("decode failed: {e}")))
    })?;

    let rgba = run.check(HardGate::ColorDepth, || {
        let color = decoded.color();
        if !color.has_alpha() {
            return Err((
                ReasonCode::NoAlphaChannel,
                format!("color type {color:?} has no alpha channel"),
            ));
        }
        if color != image::ColorType::Rgba8 {
            return Err((
                ReasonCode::ColorDepthMismatch,
                format!(
                    "color type {color:?} is {} bits per pixel, expected 32-bit RGBA",
                    color.bits_per_pixel()
                ),
            ));
        }
        Ok(decoded.into_rgba8())
    })?;

    run.check(HardGate::Dimensions, || {
        let (w, h) = rgba.dimensions();
        if w != opts.expected_width || h != opts.expected_height {
            return Err((
                ReasonCode::DimensionMismatch,
                format!(
                    "{w}x{h}, expected {}x{}",
                    opts.expected_width, opts.expected_height
                ),
            ));
        }
        Ok(())
    })?;

    run.check(HardGate::NotFullyTransparent, || {
        let visible = rgba
            .as_raw()
            .chunks_exact(4)
            .any(|px| px[3] >= opts.alpha_threshold);
        if !visible {
            return Err((
                ReasonCode::FullyTransparent,
                format!("no pixel reaches alpha {}", opts.alpha_threshold),
            ));
        }
        Ok(())
    })?;

    Ok(HardGatePass {
        frame: RgbaFrame::from_rgba_image(rgba),
        checks: run.checks,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/gates/hard.rs"]
mod tests;
