use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_serialize::CanonicalDeserialize;
use std::cmp;

use crate::{
    consts::{BYTES_PER_CHUNK, BYTES_PER_FIELD_ELEMENT, BYTES_PER_SYMBOL},
    errors::{CodecError, PolynomialError},
};

// Internally pads the input data by prepending a 0x00 to each chunk of 31 bytes. This guarantees that
// the data will be a valid field element for the bn254 curve
//
// # Additionally, this function will add necessary padding to align the output to 32 bytes
pub fn pad_payload(input_data: &[u8]) -> Vec<u8> {
    let chunk_count = input_data.len().div_ceil(BYTES_PER_CHUNK);
    let output_length = chunk_count * BYTES_PER_FIELD_ELEMENT;

    let mut padded_output = vec![0u8; output_length];

    for chunk_idx in 0..chunk_count {
        let input_start = chunk_idx * BYTES_PER_CHUNK;
        let input_end = cmp::min(input_start + BYTES_PER_CHUNK, input_data.len());
        let output_start = chunk_idx * BYTES_PER_FIELD_ELEMENT + 1;

        padded_output[output_start..output_start + (input_end - input_start)]
            .copy_from_slice(&input_data[input_start..input_end]);
    }

    padded_output
}

/// Removes internal padding from data that was processed by [pad_payload].
///
/// Drops the leading byte of every 32-byte group. A trailing group shorter
/// than 32 bytes is accepted and loses its leading byte too. If any group does
/// not start with `0x00`, it could not have been produced by [pad_payload],
/// and an [CodecError::InvalidInternalPadding] is returned.
///
/// # Example
/// ```
/// use rust_eigenda_primitives::helpers::{pad_payload, remove_internal_padding};
///
/// let original = b"hello world";
/// let padded = pad_payload(original);
/// let recovered = remove_internal_padding(&padded).unwrap();
/// assert_eq!(original, &recovered[..original.len()]);
/// ```
pub fn remove_internal_padding(padded_data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let group_count = padded_data.len().div_ceil(BYTES_PER_FIELD_ELEMENT);
    let mut output_data = Vec::with_capacity(padded_data.len() - group_count);

    for (i, chunk) in padded_data.chunks(BYTES_PER_FIELD_ELEMENT).enumerate() {
        if chunk[0] != 0x00 {
            return Err(CodecError::InvalidInternalPadding(format!(
                "field element {} starts with byte {:#04x}, expected 0x00",
                i, chunk[0]
            )));
        }
        output_data.extend_from_slice(&chunk[1..]);
    }

    Ok(output_data)
}

/// Returns the length of the data once padded by [pad_payload].
pub fn get_padded_data_length(input_len: usize) -> usize {
    input_len.div_ceil(BYTES_PER_CHUNK) * BYTES_PER_FIELD_ELEMENT
}

/// Returns the maximum number of payload bytes held by `padded_len` bytes of
/// padded data. `padded_len` must be a multiple of 32.
pub fn get_unpadded_data_length(padded_len: usize) -> Result<usize, CodecError> {
    if padded_len % BYTES_PER_FIELD_ELEMENT != 0 {
        return Err(CodecError::InvalidInputLength(format!(
            "padded length {} is not a multiple of {}",
            padded_len, BYTES_PER_FIELD_ELEMENT
        )));
    }
    Ok(padded_len / BYTES_PER_FIELD_ELEMENT * BYTES_PER_CHUNK)
}

/// Returns the number of symbols of a blob holding `data_len` bytes, rounded
/// up to a power of 2.
pub fn get_blob_length_power_of_2(data_len: usize) -> usize {
    if data_len == 0 {
        return 0;
    }
    data_len.div_ceil(BYTES_PER_SYMBOL).next_power_of_two()
}

/// Returns the size in bytes of the blob built from a payload of
/// `payload_len` bytes: header, padded body, rounded up to a power of 2.
pub fn payload_size_to_blob_size(payload_len: usize) -> usize {
    (get_padded_data_length(payload_len) + BYTES_PER_SYMBOL).next_power_of_two()
}

/// Returns the largest payload that still fits in a blob of `blob_size` bytes.
pub fn blob_size_to_max_payload_size(blob_size: usize) -> Result<usize, CodecError> {
    if blob_size < BYTES_PER_SYMBOL || !blob_size.is_power_of_two() {
        return Err(CodecError::InvalidInputLength(format!(
            "blob size {} must be a power of 2 of at least {} bytes",
            blob_size, BYTES_PER_SYMBOL
        )));
    }
    get_unpadded_data_length(blob_size - BYTES_PER_SYMBOL)
}

/// Returns every legal blob size in `[min_blob_size, max_blob_size]`.
pub fn find_legal_blob_sizes(
    min_blob_size: usize,
    max_blob_size: usize,
) -> Result<Vec<usize>, CodecError> {
    if min_blob_size > max_blob_size {
        return Err(CodecError::InvalidInputLength(format!(
            "min blob size {} exceeds max blob size {}",
            min_blob_size, max_blob_size
        )));
    }

    let mut sizes = Vec::new();
    let mut size = cmp::max(min_blob_size, BYTES_PER_SYMBOL).next_power_of_two();
    while size <= max_blob_size {
        sizes.push(size);
        size *= 2;
    }
    Ok(sizes)
}

/// For each legal blob size, the largest payload producing a blob of that size.
pub fn find_max_payload_sizes(
    min_blob_size: usize,
    max_blob_size: usize,
) -> Result<Vec<usize>, CodecError> {
    find_legal_blob_sizes(min_blob_size, max_blob_size)?
        .into_iter()
        .map(blob_size_to_max_payload_size)
        .collect()
}

/// For each legal blob size, the smallest payload producing a blob of that size.
pub fn find_min_payload_sizes(
    min_blob_size: usize,
    max_blob_size: usize,
) -> Result<Vec<usize>, CodecError> {
    find_legal_blob_sizes(min_blob_size, max_blob_size)?
        .into_iter()
        .map(|blob_size| {
            if blob_size == BYTES_PER_SYMBOL {
                Ok(0)
            } else {
                Ok(blob_size_to_max_payload_size(blob_size / 2)? + 1)
            }
        })
        .collect()
}

/// Reads a single canonical field element from 32 big-endian bytes.
///
/// Arkworks deserializes little-endian, so the bytes are reversed first.
/// Values greater than or equal to the modulus are rejected instead of being
/// reduced.
pub fn read_fr_from_bytes_be(bytes: &[u8]) -> Option<Fr> {
    if bytes.len() != BYTES_PER_FIELD_ELEMENT {
        return None;
    }
    let mut bytes_le = [0u8; BYTES_PER_FIELD_ELEMENT];
    bytes_le.copy_from_slice(bytes);
    bytes_le.reverse();
    Fr::deserialize_uncompressed(&bytes_le[..]).ok()
}

/// Converts bytes to field elements, 32 bytes at a time. A trailing group
/// shorter than 32 bytes is right-padded with zeros.
///
/// Every group must be strictly less than the bn254 scalar field modulus.
pub fn to_fr_array(data: &[u8]) -> Result<Vec<Fr>, PolynomialError> {
    data.chunks(BYTES_PER_FIELD_ELEMENT)
        .enumerate()
        .map(|(i, chunk)| {
            let element = if chunk.len() < BYTES_PER_FIELD_ELEMENT {
                let mut padded = [0u8; BYTES_PER_FIELD_ELEMENT];
                padded[..chunk.len()].copy_from_slice(chunk);
                read_fr_from_bytes_be(&padded)
            } else {
                read_fr_from_bytes_be(chunk)
            };
            element.ok_or_else(|| {
                PolynomialError::InvalidFieldElement(format!(
                    "field element at position {} is not canonical",
                    i
                ))
            })
        })
        .collect()
}

/// Converts a slice of field elements to a byte array with size constraints
///
/// # Arguments
/// * `data_fr` - Slice of field elements to convert to bytes
/// * `max_output_size` - Maximum allowed size in bytes for the output buffer
///
/// # Returns
/// * `Vec<u8>` - Byte array containing the encoded field elements, truncated if needed
pub fn to_byte_array(data_fr: &[Fr], max_output_size: usize) -> Vec<u8> {
    let data_size = cmp::min(data_fr.len() * BYTES_PER_FIELD_ELEMENT, max_output_size);
    let mut data = vec![0u8; data_size];

    for (i, element) in data_fr.iter().enumerate() {
        let start = i * BYTES_PER_FIELD_ELEMENT;
        if start >= data_size {
            break;
        }
        let v: Vec<u8> = element.into_bigint().to_bytes_be();
        let end = cmp::min(start + BYTES_PER_FIELD_ELEMENT, data_size);
        data[start..end].copy_from_slice(&v[..end - start]);
    }

    data
}

/// Validates that the data contains valid bn254 field elements. The data
/// provided is expected to be in big-endian format and a multiple of 32 bytes.
pub fn validate_blob_data_as_canonical_field_elements(data: &[u8]) -> Result<(), CodecError> {
    if data.len() % BYTES_PER_FIELD_ELEMENT != 0 {
        return Err(CodecError::InvalidInputLength(format!(
            "data length {} is not a multiple of {}",
            data.len(),
            BYTES_PER_FIELD_ELEMENT
        )));
    }

    for (i, chunk) in data.chunks_exact(BYTES_PER_FIELD_ELEMENT).enumerate() {
        if read_fr_from_bytes_be(chunk).is_none() {
            return Err(CodecError::InvalidFieldElement(format!(
                "field element at position {} is not canonical or invalid",
                i
            )));
        }
    }
    Ok(())
}
