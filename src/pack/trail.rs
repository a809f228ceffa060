//! `.trl` trail binaries.
//!
//! layout (little endian):
//! 1. bytes 0..4: version. we don't use it.
//! 2. bytes 4..8: map id as i32.
//! 3. bytes 8.. : series of `[f32; 3]` positions, 12 bytes each. no count field.
//!
//! A trailing partial position is dropped instead of failing the whole file. Packs in the
//! wild ship truncated trails and TacO still draws them.

use camino::Utf8PathBuf;
use glam::Vec3;

/// version + map id
pub const TRL_HEADER_LEN: usize = 8;
/// three f32s
pub const TRL_NODE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum TrailError {
    #[error("trail data is {len} bytes long, too short to hold the {TRL_HEADER_LEN} byte header")]
    MalformedTrailData { len: usize },
    #[error("failed to read trail file {path}: {source}")]
    MissingTrailFile {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trail path '{trail_data}' points outside the pack")]
    OutsidePack { trail_data: String },
}

/// A decoded trail binary. positions are in file order, which is also the order the path is walked in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trl {
    pub map_id: i32,
    pub positions: Vec<Vec3>,
}

impl Trl {
    /// positions as plain `[x, y, z]` arrays, ready for the burrito output
    pub fn points(&self) -> Vec<[f32; 3]> {
        self.positions.iter().map(|p| p.to_array()).collect()
    }
}

/// Decodes a trail binary. Every call starts from an empty position list.
pub fn decode(bytes: &[u8]) -> Result<Trl, TrailError> {
    let content_length = bytes.len();
    if content_length < TRL_HEADER_LEN {
        return Err(TrailError::MalformedTrailData {
            len: content_length,
        });
    }
    let mut map_id_bytes = [0_u8; 4];
    map_id_bytes.copy_from_slice(&bytes[4..8]);
    let map_id = i32::from_le_bytes(map_id_bytes);

    // chunks_exact leaves out the remainder, so a truncated last node just disappears
    let positions = bytes[TRL_HEADER_LEN..]
        .chunks_exact(TRL_NODE_LEN)
        .map(|float_bytes| {
            let mut arr = [0.0_f32; 3];
            for (component, le_bytes) in arr.iter_mut().zip(float_bytes.chunks_exact(4)) {
                *component =
                    f32::from_le_bytes([le_bytes[0], le_bytes[1], le_bytes[2], le_bytes[3]]);
            }
            Vec3::from_array(arr)
        })
        .collect();

    Ok(Trl { map_id, positions })
}
