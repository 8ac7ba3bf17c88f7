#[cfg(feature = "mic")]
pub mod capture;
pub mod decode;
pub mod frame;
pub mod loudness;
pub mod source;
pub mod spectrum;
