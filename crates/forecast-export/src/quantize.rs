//! Fixed-point encoding of exported fields.
//!
//! Integer policies store `trunc(clip(value * scale))` with the type's maximum
//! reserved as the missing-value code. Float policies keep the value as is.

use serde::{Serialize, Serializer};

use crate::tables::{OutputDtype, VariablePolicy};

/// Kelvin→Celsius offset.
pub const KELVIN_OFFSET: f32 = 273.15;

/// Quantized values of one variable at one timestep, in valid-point order.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizedField {
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
}

impl QuantizedField {
    /// Storage type of the values.
    pub fn dtype(&self) -> OutputDtype {
        match self {
            Self::Int16(_) => OutputDtype::Int16,
            Self::Uint16(_) => OutputDtype::Uint16,
            Self::Uint32(_) => OutputDtype::Uint32,
            Self::Float32(_) => OutputDtype::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int16(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Uint32(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for QuantizedField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int16(v) => v.serialize(serializer),
            Self::Uint16(v) => v.serialize(serializer),
            Self::Uint32(v) => v.serialize(serializer),
            // Widened so readers see the exact float32 value; NaN → null.
            Self::Float32(v) => serializer.collect_seq(
                v.iter()
                    .map(|&x| if x.is_nan() { None } else { Some(x as f64) }),
            ),
        }
    }
}

fn scaled(value: f32, policy: &VariablePolicy) -> f32 {
    let value = if policy.convert_temp {
        value - KELVIN_OFFSET
    } else {
        value
    };
    value * policy.scale as f32
}

/// Encode values according to a variable policy.
///
/// Integer dtypes store `trunc(clamp(v * scale))` and write NaN as the dtype
/// maximum. A real value whose scaled form reaches that maximum (for example
/// 700 mm of accumulated rain at scale 100 in uint16) saturates to the same
/// code and reads back as missing.
pub fn quantize(values: &[f32], policy: &VariablePolicy) -> QuantizedField {
    // `as` truncates toward zero; the clamp mirrors the saturation bounds.
    match policy.dtype {
        OutputDtype::Int16 => QuantizedField::Int16(
            values
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        i16::MAX
                    } else {
                        scaled(v, policy).clamp(i16::MIN as f32, i16::MAX as f32) as i16
                    }
                })
                .collect(),
        ),
        OutputDtype::Uint16 => QuantizedField::Uint16(
            values
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        u16::MAX
                    } else {
                        scaled(v, policy).clamp(0.0, u16::MAX as f32) as u16
                    }
                })
                .collect(),
        ),
        OutputDtype::Uint32 => QuantizedField::Uint32(
            values
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        u32::MAX
                    } else {
                        scaled(v, policy).clamp(0.0, u32::MAX as f32) as u32
                    }
                })
                .collect(),
        ),
        OutputDtype::Float32 => QuantizedField::Float32(
            values
                .iter()
                .map(|&v| {
                    if policy.convert_temp {
                        v - KELVIN_OFFSET
                    } else {
                        v
                    }
                })
                .collect(),
        ),
    }
}

/// Decode quantized values back to physical units. Sentinels become NaN.
///
/// Values saturated to the dtype maximum by [`quantize`] also decode as NaN.
pub fn dequantize(field: &QuantizedField, policy: &VariablePolicy) -> Vec<f32> {
    let offset = if policy.convert_temp { KELVIN_OFFSET } else { 0.0 };
    let scale = policy.scale as f32;
    let decode = |raw: f32| raw / scale + offset;

    match field {
        QuantizedField::Int16(v) => v
            .iter()
            .map(|&x| if x == i16::MAX { f32::NAN } else { decode(x as f32) })
            .collect(),
        QuantizedField::Uint16(v) => v
            .iter()
            .map(|&x| if x == u16::MAX { f32::NAN } else { decode(x as f32) })
            .collect(),
        QuantizedField::Uint32(v) => v
            .iter()
            .map(|&x| if x == u32::MAX { f32::NAN } else { decode(x as f32) })
            .collect(),
        QuantizedField::Float32(v) => v.iter().map(|&x| x + offset).collect(),
    }
}
