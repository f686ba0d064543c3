#[derive(thiserror::Error, Debug)]
pub enum SidxError {
    #[error("Segment index data length {actual} does not match declared range length {expected}")]
    NoData { expected: u64, actual: u64 },

    #[error("Invalid box type: {0:?}")]
    InvalidBoxType([u8; 4]),

    #[error("Segment index declares a zero timescale")]
    ZeroTimescale,

    #[error("Segment index consumed {consumed} bytes of {expected}")]
    Misaligned { consumed: u64, expected: u64 },

    #[error("Truncated segment index: {0}")]
    UnexpectedEof(#[from] std::io::Error),
}

pub type SidxResult<T> = std::result::Result<T, SidxError>;
