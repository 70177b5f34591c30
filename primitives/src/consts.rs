pub const BYTES_PER_FIELD_ELEMENT: usize = 32;
/// A symbol is one field element.
pub const BYTES_PER_SYMBOL: usize = BYTES_PER_FIELD_ELEMENT;
/// Usable bytes per field element once the leading zero byte is accounted for.
pub const BYTES_PER_CHUNK: usize = BYTES_PER_FIELD_ELEMENT - 1;

pub const ENCODED_PAYLOAD_HEADER_LEN_BYTES: usize = 32;
pub const PAYLOAD_ENCODING_VERSION_0: u8 = 0;

/// 16 MiB of field elements, the largest blob the network accepts.
pub const MAX_BLOB_SIZE_BYTES: usize = 16 * 1024 * 1024;
pub const MAX_POLYNOMIAL_SIZE: usize = MAX_BLOB_SIZE_BYTES / BYTES_PER_FIELD_ELEMENT;
