pub mod capture;
pub mod preprocess;

pub use capture::{CaptureBuffer, CaptureEncoding};
pub use preprocess::{
    to_tensor, InputTensor, PreprocessError, TENSOR_CHANNELS, TENSOR_HEIGHT, TENSOR_LEN,
    TENSOR_WIDTH,
};
