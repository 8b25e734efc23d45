use crate::error::ExtractError;
use crate::formats::rtf;

use super::{ExtractionMethod, Payload};

/// Decoded `\objdata` payloads as `rtf_object_<n>.bin`, numbered from 1.
pub fn extract(data: &[u8]) -> Result<Vec<Payload>, ExtractError> {
    Ok(rtf::objdata_payloads(data)
        .iter()
        .enumerate()
        .map(|(index, payload)| {
            Payload::new(
                format!("rtf_object_{}.bin", index + 1),
                rtf::strip_ole1_wrapper(payload).to_vec(),
                ExtractionMethod::RtfObjdata,
            )
        })
        .collect())
}
