//! The Flate filter and row predictors.

use crate::object::Dict;
use crate::object::dict::keys::{BITS_PER_COMPONENT, COLORS, COLUMNS, PREDICTOR};
use flate2::Compression;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use log::warn;
use std::io::{Read, Write};

struct PredictorParams {
    predictor: u8,
    colors: u8,
    bits_per_component: u8,
    columns: usize,
}

impl PredictorParams {
    fn from_params(dict: &Dict) -> Option<Self> {
        let int = |key: &[u8], default: i64| dict.get_int(key).unwrap_or(default);

        Some(Self {
            predictor: u8::try_from(int(PREDICTOR, 1)).ok()?,
            colors: u8::try_from(int(COLORS, 1)).ok()?.max(1),
            bits_per_component: u8::try_from(int(BITS_PER_COMPONENT, 8)).ok()?,
            columns: usize::try_from(int(COLUMNS, 1)).ok()?.max(1),
        })
    }

    fn bits_per_pixel(&self) -> usize {
        usize::from(self.bits_per_component) * usize::from(self.colors)
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel().div_ceil(8).max(1)
    }

    fn row_length_in_bytes(&self) -> usize {
        (self.columns * self.bits_per_pixel()).div_ceil(8)
    }
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

pub(crate) fn decode(data: &[u8], params: Option<&Dict>) -> Option<Vec<u8>> {
    let decoded = zlib(data).or_else(|| deflate(data))?;
    let params = match params {
        Some(p) => PredictorParams::from_params(p)?,
        None => PredictorParams::default(),
    };

    apply_predictor(decoded, &params)
}

pub(crate) fn encode(data: &[u8]) -> Option<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).ok()?;

    encoder.finish().ok()
}

fn zlib(data: &[u8]) -> Option<Vec<u8>> {
    inflate(ZlibDecoder::new(data))
}

fn deflate(data: &[u8]) -> Option<Vec<u8>> {
    inflate(DeflateDecoder::new(data))
}

fn inflate(mut decoder: impl Read) -> Option<Vec<u8>> {
    let mut out = Vec::new();

    match decoder.read_to_end(&mut out) {
        Ok(_) => Some(out),
        // Truncated streams are common, keep what could be recovered.
        Err(_) if !out.is_empty() => {
            warn!("flate stream is corrupt, recovered {} bytes", out.len());

            Some(out)
        }
        Err(_) => None,
    }
}

fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    match params.predictor {
        1 => Some(data),
        2 => apply_tiff(data, params),
        10..=15 => Some(apply_png(&data, params)),
        other => {
            warn!("unknown predictor {other}");

            None
        }
    }
}

fn apply_tiff(mut data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    if params.bits_per_component != 8 {
        warn!(
            "tiff predictor with {} bits per component is unsupported",
            params.bits_per_component
        );

        return None;
    }

    let colors = usize::from(params.colors);

    for row in data.chunks_mut(params.row_length_in_bytes()) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }

    Some(data)
}

// Each row starts with a byte that selects the PNG filter used for that row.
fn apply_png(data: &[u8], params: &PredictorParams) -> Vec<u8> {
    let row_len = params.row_length_in_bytes();
    let bpp = params.bytes_per_pixel();

    let mut out = Vec::with_capacity(data.len());
    let mut prev_row = vec![0; row_len];
    let mut cur_row = vec![0; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (filter, row) = (chunk[0], &chunk[1..]);
        let cur_row = &mut cur_row[..row.len()];

        for i in 0..row.len() {
            let left = if i >= bpp { cur_row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            let predicted = match filter {
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => 0,
            };

            cur_row[i] = row[i].wrapping_add(predicted);
        }

        out.extend_from_slice(cur_row);
        prev_row[..cur_row.len()].copy_from_slice(cur_row);
    }

    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
